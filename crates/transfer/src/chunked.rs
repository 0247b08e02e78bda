use sha2::{Digest, Sha256};

use crate::TransferError;

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Running SHA-256 over chunks fed in offset order.
#[derive(Default)]
pub struct PayloadDigest {
    hasher: Sha256,
    bytes: u64,
}

impl PayloadDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    /// Bytes hashed so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Hex digest of everything fed so far.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

// ---------------------------------------------------------------------------
// ChunkRange / ChunkPlan
// ---------------------------------------------------------------------------

/// A contiguous byte range of a payload. `last_byte` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkRange {
    pub offset: u64,
    pub last_byte: u64,
    pub total_size: u64,
}

impl ChunkRange {
    /// Number of bytes in the range (never zero).
    pub fn len(&self) -> u64 {
        self.last_byte - self.offset + 1
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.last_byte + 1
    }

    /// `true` when this range ends at the last byte of the payload.
    pub fn is_last(&self) -> bool {
        self.last_byte + 1 == self.total_size
    }

    /// Value of the `Content-Range` header: `bytes {offset}-{last}/{total}`.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.offset, self.last_byte, self.total_size)
    }
}

/// Lazy sequence of ranges tiling `[0, total_size)`.
///
/// Consumed by iteration; there is no way to rewind it.
#[derive(Debug)]
pub struct ChunkPlan {
    next_offset: u64,
    total_size: u64,
    chunk_size: u64,
}

/// Plans the chunks of a payload of `total_size` bytes.
///
/// Each range spans `min(max_chunk_size, remaining)` bytes. An empty
/// payload yields no ranges at all.
pub fn plan(total_size: u64, max_chunk_size: u64) -> Result<ChunkPlan, TransferError> {
    if max_chunk_size == 0 {
        return Err(TransferError::InvalidChunkSize);
    }
    Ok(ChunkPlan {
        next_offset: 0,
        total_size,
        chunk_size: max_chunk_size,
    })
}

impl ChunkPlan {
    /// Ranges not yet yielded.
    pub fn remaining_chunks(&self) -> u64 {
        let remaining = self.total_size - self.next_offset;
        remaining.div_ceil(self.chunk_size)
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }
}

impl Iterator for ChunkPlan {
    type Item = ChunkRange;

    fn next(&mut self) -> Option<ChunkRange> {
        if self.next_offset >= self.total_size {
            return None;
        }
        let len = self.chunk_size.min(self.total_size - self.next_offset);
        let range = ChunkRange {
            offset: self.next_offset,
            last_byte: self.next_offset + len - 1,
            total_size: self.total_size,
        };
        self.next_offset += len;
        Some(range)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining_chunks()) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl std::iter::FusedIterator for ChunkPlan {}
