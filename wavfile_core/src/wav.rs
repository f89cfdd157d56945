use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use tempfile::NamedTempFile;

use crate::error::{InvalidFormatReason, WavError};
use crate::format::WavFormat;
use crate::metadata::MetadataChunk;
use crate::reader::PcmReader;
use crate::riff::RiffChunk;

/// Size of the fixed header written at the start of every file.
pub const HEADER_SIZE: usize = 44;

/// Bytes of the header counted by the RIFF length field.
const RIFF_LENGTH_BASE: u64 = HEADER_SIZE as u64 - 8;

/// Audio format code for linear PCM.
pub const PCM_FORMAT: u16 = 1;

const RIFF_TAG: &[u8; 4] = b"RIFF";
const WAVE_TAG: &[u8; 4] = b"WAVE";
const FMT_TAG: &[u8; 4] = b"fmt ";
const DATA_TAG: &[u8; 4] = b"data";

/// The decoded fields of the 44-byte header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavHeader {
    pub format: WavFormat,
    /// Value of the RIFF length field: every byte after offset 8.
    pub total_data_length: u32,
    /// Length of the PCM payload declared by the `data` chunk.
    pub total_audio_length: u32,
}

impl WavHeader {
    /// Decode and validate a header from the front of `bytes`.
    ///
    /// Checks run in file order (RIFF, WAVE, fmt, format code) and the first
    /// failure is reported.
    pub fn parse(bytes: &[u8]) -> Result<Self, WavError> {
        if bytes.len() < HEADER_SIZE {
            return Err(InvalidFormatReason::TooShort {
                len: bytes.len() as u64,
            }
            .into());
        }

        if &bytes[0..4] != RIFF_TAG {
            return Err(InvalidFormatReason::MissingRiffTag.into());
        }
        if &bytes[8..12] != WAVE_TAG {
            return Err(InvalidFormatReason::MissingWaveTag.into());
        }
        if &bytes[12..16] != FMT_TAG {
            return Err(InvalidFormatReason::MissingFmtTag.into());
        }
        let code = read_u16(bytes, 20);
        if code != PCM_FORMAT {
            return Err(InvalidFormatReason::NotPcm { code }.into());
        }

        let format = WavFormat::from_header(read_u32(bytes, 24), read_u16(bytes, 22), read_u16(bytes, 34));

        Ok(Self {
            format,
            total_data_length: read_u32(bytes, 4),
            total_audio_length: read_u32(bytes, 40),
        })
    }

    /// Encode the header.
    ///
    /// The fmt chunk size field holds the bits per sample rather than the
    /// conventional 16; files written by earlier releases depend on it.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let format = &self.format;
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(RIFF_TAG);
        bytes[4..8].copy_from_slice(&self.total_data_length.to_le_bytes());
        bytes[8..12].copy_from_slice(WAVE_TAG);
        bytes[12..16].copy_from_slice(FMT_TAG);
        bytes[16..20].copy_from_slice(&u32::from(format.bits_per_sample()).to_le_bytes());
        bytes[20..22].copy_from_slice(&PCM_FORMAT.to_le_bytes());
        bytes[22..24].copy_from_slice(&format.channels().to_le_bytes());
        bytes[24..28].copy_from_slice(&format.sample_rate().to_le_bytes());
        bytes[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
        bytes[32..34].copy_from_slice(&format.frame_size().to_le_bytes());
        bytes[34..36].copy_from_slice(&format.bits_per_sample().to_le_bytes());
        bytes[36..40].copy_from_slice(DATA_TAG);
        bytes[40..44].copy_from_slice(&self.total_audio_length.to_le_bytes());
        bytes
    }

    /// Offset and length of the metadata region implied by the two length
    /// fields, or `None` when the RIFF length leaves no room after the audio.
    pub fn metadata_span(&self) -> Option<(u64, u64)> {
        let data = u64::from(self.total_data_length);
        let audio = u64::from(self.total_audio_length);
        if data <= audio + RIFF_LENGTH_BASE {
            return None;
        }
        Some((HEADER_SIZE as u64 + audio, data - audio - RIFF_LENGTH_BASE))
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// A PCM WAV file on disk.
///
/// Built either by [`WavFile::open`], which reads and validates an existing
/// file, or by [`WavFile::create`], which writes an empty file to be filled by
/// an external writer and completed with [`WavFile::finish_write`]. Each disk
/// operation opens the file for its own duration only.
#[derive(Debug)]
pub struct WavFile {
    path: PathBuf,
    format: WavFormat,
    total_audio_length: u32,
    total_data_length: u32,
    metadata: Option<MetadataChunk>,
}

impl WavFile {
    /// Parse the header and trailing metadata of an existing file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WavError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;

        let len = file.metadata()?.len();
        if len < HEADER_SIZE as u64 {
            return Err(InvalidFormatReason::TooShort { len }.into());
        }

        let mut buffer = [0u8; HEADER_SIZE];
        file.read_exact(&mut buffer)?;
        let header = WavHeader::parse(&buffer)?;
        debug!(
            "parsed header of '{}': {} Hz, {} channel(s), {} bit(s), {} audio byte(s), riff length {}",
            path.display(),
            header.format.sample_rate(),
            header.format.channels(),
            header.format.bits_per_sample(),
            header.total_audio_length,
            header.total_data_length
        );

        let metadata = match header.metadata_span() {
            Some((offset, size)) => {
                debug!("reading {size} metadata byte(s) at offset {offset}");
                if offset.saturating_add(size) > len {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "header declares {size} metadata byte(s) at offset {offset}, file holds {len}"
                        ),
                    )
                    .into());
                }
                let mut region = vec![0u8; usize::try_from(size).map_err(|_| WavError::LengthOverflow)?];
                file.seek(SeekFrom::Start(offset))?;
                file.read_exact(&mut region)?;

                let mut metadata = MetadataChunk::new();
                metadata.parse(&region)?;
                Some(metadata)
            }
            None => None,
        };

        Ok(Self {
            path,
            format: header.format,
            total_audio_length: header.total_audio_length,
            total_data_length: header.total_data_length,
            metadata,
        })
    }

    /// Write an empty file holding only the header for `format`.
    ///
    /// Existing content at `path` is replaced atomically.
    pub fn create<P: AsRef<Path>>(path: P, format: WavFormat) -> Result<Self, WavError> {
        let wav = Self {
            path: path.as_ref().to_path_buf(),
            format,
            total_audio_length: 0,
            total_data_length: RIFF_LENGTH_BASE as u32,
            metadata: None,
        };

        replace_contents(&wav.path, &wav.generate_header())?;
        info!(
            "created '{}' ({} Hz, {} channel(s), {} bit(s))",
            wav.path.display(),
            format.sample_rate(),
            format.channels(),
            format.bits_per_sample()
        );
        Ok(wav)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> WavFormat {
        self.format
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate()
    }

    pub fn channels(&self) -> u16 {
        self.format.channels()
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.format.bits_per_sample()
    }

    pub fn frame_size_in_bytes(&self) -> u16 {
        self.format.frame_size()
    }

    pub fn total_audio_length(&self) -> u32 {
        self.total_audio_length
    }

    pub fn total_data_length(&self) -> u32 {
        self.total_data_length
    }

    pub fn metadata(&self) -> Option<&MetadataChunk> {
        self.metadata.as_ref()
    }

    pub fn has_metadata(&self) -> bool {
        self.metadata.is_some()
    }

    /// Encoded size of the metadata region, zero when there is none.
    pub fn metadata_size(&self) -> u64 {
        self.metadata.as_ref().map_or(0, RiffChunk::total_size)
    }

    /// Number of whole frames in the audio payload.
    pub fn total_frames(&self) -> u64 {
        match self.frame_size_in_bytes() {
            0 => 0,
            frame => u64::from(self.total_audio_length) / u64::from(frame),
        }
    }

    /// Byte offset of frame `sample` within the audio payload, or `None` when
    /// it does not fit a `u64`.
    pub fn sample_index(&self, sample: u64) -> Option<u64> {
        sample.checked_mul(u64::from(self.frame_size_in_bytes()))
    }

    /// Playback length of the audio payload.
    pub fn duration(&self) -> Duration {
        let byte_rate = u128::from(self.format.byte_rate());
        if byte_rate == 0 {
            return Duration::ZERO;
        }
        let nanos = u128::from(self.total_audio_length) * 1_000_000_000 / byte_rate;
        Duration::from_nanos(nanos as u64)
    }

    /// The header bytes for the current lengths.
    pub fn generate_header(&self) -> [u8; HEADER_SIZE] {
        WavHeader {
            format: self.format,
            total_data_length: self.total_data_length,
            total_audio_length: self.total_audio_length,
        }
        .to_bytes()
    }

    /// Record the final audio length and recompute the RIFF length.
    ///
    /// Only the in-memory values change; see [`WavFile::write_header`].
    pub fn finish_write(&mut self, total_audio_length: u32) -> Result<(), WavError> {
        self.total_data_length = riff_length(total_audio_length, self.metadata_size())?;
        self.total_audio_length = total_audio_length;
        Ok(())
    }

    /// Overwrite the header on disk with the current lengths, leaving the
    /// audio and metadata untouched.
    pub fn write_header(&self) -> Result<(), WavError> {
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.write_all(&self.generate_header())?;
        file.flush()?;
        info!(
            "wrote header of '{}' with {} audio byte(s)",
            self.path.display(),
            self.total_audio_length
        );
        Ok(())
    }

    /// Replace the metadata region after the audio payload and update the
    /// header to match.
    ///
    /// The region starts right after the recorded audio length, and the file
    /// is truncated there first. Call [`WavFile::finish_write`] with the
    /// streamed length before this, or audio past the recorded length is
    /// discarded. Fails with `UnexpectedEof` when the file is shorter than the
    /// recorded audio. An empty chunk removes any existing metadata.
    pub fn write_metadata(&mut self, metadata: MetadataChunk) -> Result<(), WavError> {
        let total_data_length = riff_length(self.total_audio_length, metadata.total_size())?;
        let audio_end = HEADER_SIZE as u64 + u64::from(self.total_audio_length);

        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        let len = file.metadata()?.len();
        if len < audio_end {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("file holds {len} byte(s), recorded audio ends at {audio_end}"),
            )
            .into());
        }
        file.set_len(audio_end)?;
        file.seek(SeekFrom::Start(audio_end))?;
        file.write_all(&metadata.to_bytes())?;

        self.total_data_length = total_data_length;
        self.metadata = if metadata.is_empty() { None } else { Some(metadata) };

        file.seek(SeekFrom::Start(0))?;
        file.write_all(&self.generate_header())?;
        file.flush()?;
        info!(
            "wrote {} metadata byte(s) to '{}'",
            self.metadata_size(),
            self.path.display()
        );
        Ok(())
    }

    /// Open a reader over the audio payload.
    pub fn reader(&self) -> Result<PcmReader<BufReader<File>>, WavError> {
        let file = File::open(&self.path)?;
        PcmReader::new(BufReader::new(file), self)
    }
}

fn riff_length(total_audio_length: u32, metadata_size: u64) -> Result<u32, WavError> {
    let length = RIFF_LENGTH_BASE + u64::from(total_audio_length) + metadata_size;
    u32::try_from(length).map_err(|_| WavError::LengthOverflow)
}

fn replace_contents(path: &Path, contents: &[u8]) -> Result<(), WavError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
