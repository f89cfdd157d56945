use std::io::{self, Read, Seek, SeekFrom};

use crate::error::WavError;
use crate::format::WavFormat;
use crate::wav::{WavFile, HEADER_SIZE};

/// Incremental access to decoded PCM frames.
///
/// Format attributes are fixed for the lifetime of a reader. The frame
/// position only moves through [`AudioFileReader::read_pcm`] and
/// [`AudioFileReader::seek`].
pub trait AudioFileReader {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Bits per sample.
    fn sample_size(&self) -> u16;

    fn total_frames(&self) -> u64;

    fn frame_position(&self) -> u64;

    fn has_remaining(&self) -> bool {
        self.frame_position() < self.total_frames()
    }

    /// Fill `buffer` with whole frames from the current position and return
    /// the number of bytes written.
    ///
    /// Returns `0` once the stream is exhausted or when `buffer` cannot hold a
    /// single frame.
    fn read_pcm(&mut self, buffer: &mut [u8]) -> Result<usize, WavError>;

    /// Move to the absolute frame index `sample`.
    ///
    /// Seeking to `total_frames()` positions the reader at the end of the
    /// stream; anything beyond fails with [`WavError::SeekOutOfRange`] and
    /// leaves the position unchanged.
    fn seek(&mut self, sample: u64) -> Result<(), WavError>;
}

/// [`AudioFileReader`] over the audio payload of a [`WavFile`].
///
/// The byte source is any `Read + Seek`; pass `&mut file` to keep ownership
/// of the handle with the caller.
#[derive(Debug)]
pub struct PcmReader<R> {
    source: R,
    format: WavFormat,
    total_frames: u64,
    frame_position: u64,
}

impl<R: Read + Seek> PcmReader<R> {
    /// Position `source` at the first frame of `wav`'s audio payload.
    pub fn new(mut source: R, wav: &WavFile) -> Result<Self, WavError> {
        source.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        Ok(Self {
            source,
            format: wav.format(),
            total_frames: wav.total_frames(),
            frame_position: 0,
        })
    }

    /// Release the byte source.
    pub fn into_inner(self) -> R {
        self.source
    }

    fn frame_size(&self) -> u64 {
        u64::from(self.format.frame_size())
    }
}

impl<R: Read + Seek> AudioFileReader for PcmReader<R> {
    fn sample_rate(&self) -> u32 {
        self.format.sample_rate()
    }

    fn channels(&self) -> u16 {
        self.format.channels()
    }

    fn sample_size(&self) -> u16 {
        self.format.bits_per_sample()
    }

    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn frame_position(&self) -> u64 {
        self.frame_position
    }

    fn read_pcm(&mut self, buffer: &mut [u8]) -> Result<usize, WavError> {
        let frame_size = self.frame_size();
        if frame_size == 0 {
            return Ok(0);
        }

        let remaining = self.total_frames - self.frame_position;
        let frames = (buffer.len() as u64 / frame_size).min(remaining);
        if frames == 0 {
            return Ok(0);
        }

        let wanted = (frames * frame_size) as usize;
        let filled = fill(&mut self.source, &mut buffer[..wanted])?;
        let frames_read = filled as u64 / frame_size;
        if frames_read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "audio ended at frame {} of {}",
                    self.frame_position, self.total_frames
                ),
            )
            .into());
        }

        let read = (frames_read * frame_size) as usize;
        if read != filled {
            // Rewind over the trailing partial frame.
            self.source.seek(SeekFrom::Current(-((filled - read) as i64)))?;
        }
        self.frame_position += frames_read;
        Ok(read)
    }

    fn seek(&mut self, sample: u64) -> Result<(), WavError> {
        if sample > self.total_frames {
            return Err(WavError::SeekOutOfRange {
                requested: sample,
                total: self.total_frames,
            });
        }

        let offset = HEADER_SIZE as u64 + sample * self.frame_size();
        self.source.seek(SeekFrom::Start(offset))?;
        self.frame_position = sample;
        Ok(())
    }
}

/// Read until `buffer` is full or the source is exhausted.
fn fill<R: Read>(source: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match source.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
