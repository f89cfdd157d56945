use std::path::Path;

use crate::error::WavError;
use crate::format::WavFormat;
use crate::wav::WavFile;

/// Creates empty, correctly initialised WAV files.
pub trait WaveFileCreator {
    /// Write a header-only file at `path`, replacing any existing content.
    fn create_empty(&self, path: &Path) -> Result<WavFile, WavError>;
}

/// Creates linear PCM files in a fixed format.
#[derive(Clone, Copy, Debug, Default)]
pub struct PcmWaveCreator {
    format: WavFormat,
}

impl PcmWaveCreator {
    pub fn new(format: WavFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> WavFormat {
        self.format
    }
}

impl WaveFileCreator for PcmWaveCreator {
    fn create_empty(&self, path: &Path) -> Result<WavFile, WavError> {
        WavFile::create(path, self.format)
    }
}
