//! Chunk planning, payload sources and transfer bookkeeping.
//!
//! A payload is split into contiguous byte ranges by [`plan`]; each range
//! is read on demand through the [`Payload`] trait so that arbitrarily
//! large files never have to sit in memory at once.

mod chunked;
mod progress;
mod types;
mod validation;

pub use chunked::{ChunkPlan, ChunkRange, PayloadDigest, checksum_bytes, plan};
pub use progress::ThroughputMeter;
pub use types::{FilePayload, FileSource, MemoryPayload, Payload, PayloadSource};
pub use validation::validate_file_name;

/// Default maximum chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: u64 = 10_000;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk size must be at least one byte")]
    InvalidChunkSize,

    #[error("range {offset}-{last_byte} is outside a payload of {size} bytes")]
    RangeOutOfBounds {
        offset: u64,
        last_byte: u64,
        size: u64,
    },

    #[error("invalid file name: {0}")]
    InvalidFileName(String),
}
