use crate::error::WavError;
use crate::riff::{RawChunk, RiffChunk};

/// The metadata region appended after the PCM payload.
///
/// The region is a run of ordinary RIFF chunks. Their contents are kept
/// opaque; only identifiers and byte spans are interpreted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataChunk {
    chunks: Vec<RawChunk>,
}

impl MetadataChunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunks(&self) -> &[RawChunk] {
        &self.chunks
    }

    /// First chunk carrying `id`, if any.
    pub fn find(&self, id: &[u8; 4]) -> Option<&RawChunk> {
        self.chunks.iter().find(|chunk| &chunk.id() == id)
    }

    /// Append a chunk. A preceding chunk decoded without its pad byte gets it
    /// back so the region stays word aligned.
    pub fn push(&mut self, chunk: RawChunk) {
        if let Some(last) = self.chunks.last_mut() {
            last.restore_pad();
        }
        self.chunks.push(chunk);
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl RiffChunk for MetadataChunk {
    fn parse(&mut self, buffer: &[u8]) -> Result<(), WavError> {
        let mut chunks = Vec::new();
        let mut offset = 0;
        while offset < buffer.len() {
            let (chunk, consumed) = RawChunk::decode(&buffer[offset..]).map_err(|err| match err {
                WavError::MalformedChunk { reason } => {
                    WavError::malformed(format!("metadata at byte {offset}: {reason}"))
                }
                other => other,
            })?;
            offset += consumed;
            chunks.push(chunk);
        }

        self.chunks = chunks;
        Ok(())
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.total_size() as usize);
        for chunk in &self.chunks {
            bytes.extend_from_slice(&chunk.to_bytes());
        }
        bytes
    }

    fn total_size(&self) -> u64 {
        self.chunks.iter().map(RiffChunk::total_size).sum()
    }
}
