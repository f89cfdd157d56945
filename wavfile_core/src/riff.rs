//! RIFF chunk primitives.
//!
//! Every chunk is a four byte ASCII identifier, a little-endian `u32` payload
//! length and the payload itself, padded with a zero byte to an even length.

use crate::error::WavError;

/// Size of a chunk's identifier and length prefix.
pub const CHUNK_HEADER_SIZE: usize = 8;

/// A binary sub-chunk that can decode itself from, and encode itself to, bytes.
///
/// Implementations must keep [`RiffChunk::total_size`] equal to the length of
/// [`RiffChunk::to_bytes`] at all times.
pub trait RiffChunk {
    /// Populate the chunk from a buffer positioned at the start of its encoded
    /// region.
    fn parse(&mut self, buffer: &[u8]) -> Result<(), WavError>;

    /// The exact bytes this chunk occupies on disk.
    fn to_bytes(&self) -> Vec<u8>;

    /// Number of bytes produced by [`RiffChunk::to_bytes`].
    fn total_size(&self) -> u64;
}

/// An opaque chunk: an identifier and an uninterpreted payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawChunk {
    id: [u8; 4],
    payload: Vec<u8>,
    /// Whether an odd payload is followed by its pad byte. Only false for a
    /// chunk decoded from a region that ended without one.
    padded: bool,
}

impl Default for RawChunk {
    fn default() -> Self {
        Self {
            id: [0; 4],
            payload: Vec::new(),
            padded: true,
        }
    }
}

impl RawChunk {
    /// Create a chunk, rejecting payloads whose length does not fit the `u32`
    /// length field.
    pub fn new(id: [u8; 4], payload: impl Into<Vec<u8>>) -> Result<Self, WavError> {
        let payload = payload.into();
        if u32::try_from(payload.len()).is_err() {
            return Err(WavError::LengthOverflow);
        }
        Ok(Self {
            id,
            payload,
            padded: true,
        })
    }

    pub fn id(&self) -> [u8; 4] {
        self.id
    }

    /// The identifier rendered as text, with non-ASCII bytes replaced.
    pub fn id_str(&self) -> String {
        String::from_utf8_lossy(&self.id).into_owned()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn padding(&self) -> usize {
        if self.padded {
            self.payload.len() % 2
        } else {
            0
        }
    }

    /// Re-add the pad byte dropped by [`RawChunk::decode`], for a chunk that
    /// is no longer the last one in its region.
    pub(crate) fn restore_pad(&mut self) {
        self.padded = true;
    }

    /// Decode one chunk from the front of `buffer`, returning it together with
    /// the number of bytes consumed.
    ///
    /// A missing pad byte is tolerated when the payload ends the buffer; the
    /// chunk then re-encodes without it so its size matches the bytes read.
    pub(crate) fn decode(buffer: &[u8]) -> Result<(Self, usize), WavError> {
        if buffer.len() < CHUNK_HEADER_SIZE {
            return Err(WavError::malformed(format!(
                "chunk header needs {CHUNK_HEADER_SIZE} bytes, found {}",
                buffer.len()
            )));
        }

        let mut id = [0u8; 4];
        id.copy_from_slice(&buffer[0..4]);
        let declared = u32::from_le_bytes([buffer[4], buffer[5], buffer[6], buffer[7]]) as usize;

        let body = &buffer[CHUNK_HEADER_SIZE..];
        if body.len() < declared {
            return Err(WavError::malformed(format!(
                "chunk '{}' declares {declared} byte(s) but only {} remain",
                String::from_utf8_lossy(&id),
                body.len()
            )));
        }

        let mut consumed = CHUNK_HEADER_SIZE + declared;
        let mut padded = true;
        if declared % 2 == 1 {
            if body.len() > declared {
                consumed += 1;
            } else {
                padded = false;
            }
        }

        let chunk = Self {
            id,
            payload: body[..declared].to_vec(),
            padded,
        };
        Ok((chunk, consumed))
    }
}

impl RiffChunk for RawChunk {
    fn parse(&mut self, buffer: &[u8]) -> Result<(), WavError> {
        let (chunk, _) = Self::decode(buffer)?;
        *self = chunk;
        Ok(())
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.total_size() as usize);
        bytes.extend_from_slice(&self.id);
        bytes.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&self.payload);
        if self.padding() == 1 {
            bytes.push(0);
        }
        bytes
    }

    fn total_size(&self) -> u64 {
        (CHUNK_HEADER_SIZE + self.payload.len() + self.padding()) as u64
    }
}
