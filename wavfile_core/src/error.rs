use std::fmt;

use thiserror::Error;

/// Errors that can occur while reading or writing WAV files.
#[derive(Debug, Error)]
pub enum WavError {
    /// The file does not carry a structurally valid PCM WAV header.
    #[error("invalid WAV header: {0}")]
    InvalidFormat(InvalidFormatReason),

    /// Wrapper around IO errors encountered while reading or writing files.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A RIFF chunk could not be decoded from the supplied bytes.
    #[error("malformed chunk: {reason}")]
    MalformedChunk { reason: String },

    /// Format parameters rejected when building a [`crate::WavFormat`].
    #[error("unsupported format: {reason}")]
    UnsupportedFormat { reason: String },

    /// A length no longer fits the 32-bit fields of the RIFF header.
    #[error("audio length exceeds the 32-bit RIFF size limit")]
    LengthOverflow,

    /// Error returned when a reader is asked to seek past the end of the audio.
    #[error("cannot seek to frame {requested}, the stream holds {total} frame(s)")]
    SeekOutOfRange { requested: u64, total: u64 },
}

impl WavError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedChunk {
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            reason: reason.into(),
        }
    }
}

/// The structural check that rejected a header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidFormatReason {
    /// Fewer than 44 bytes were available.
    TooShort { len: u64 },
    MissingRiffTag,
    MissingWaveTag,
    MissingFmtTag,
    /// The format code at offset 20 is not linear PCM.
    NotPcm { code: u16 },
}

impl fmt::Display for InvalidFormatReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len } => {
                write!(f, "expected at least 44 bytes, found {len}")
            }
            Self::MissingRiffTag => f.write_str("missing RIFF tag"),
            Self::MissingWaveTag => f.write_str("missing WAVE tag"),
            Self::MissingFmtTag => f.write_str("missing fmt chunk tag"),
            Self::NotPcm { code } => {
                write!(f, "audio format code {code} is not linear PCM")
            }
        }
    }
}

impl From<InvalidFormatReason> for WavError {
    fn from(reason: InvalidFormatReason) -> Self {
        Self::InvalidFormat(reason)
    }
}
