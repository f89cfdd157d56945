//! Reading and writing the header and metadata region of PCM WAV files.
//!
//! [`WavFile`] is the container. It is either opened from an existing file or
//! created empty and finalised once the length of the streamed audio is known.
//! [`AudioFileReader`] and [`WaveFileCreator`] are the capabilities callers
//! program against.

mod creator;
mod error;
mod format;
mod metadata;
mod reader;
mod riff;
mod wav;

pub use creator::{PcmWaveCreator, WaveFileCreator};
pub use error::{InvalidFormatReason, WavError};
pub use format::{WavFormat, WavFormatBuilder, MAX_BITS_PER_SAMPLE};
pub use metadata::MetadataChunk;
pub use reader::{AudioFileReader, PcmReader};
pub use riff::{RawChunk, RiffChunk, CHUNK_HEADER_SIZE};
pub use wav::{WavFile, WavHeader, HEADER_SIZE, PCM_FORMAT};
