//! Data types for the upload flow.

use vaultup_http::RetryPolicy;
use vaultup_protocol::{CommitResult, ContentId, TransactionId};
use vaultup_transfer::{ChunkRange, DEFAULT_CHUNK_SIZE};

/// Where a transfer stands.
///
/// `NotStarted → Authenticating → TransactionOpen → Uploading → Committing
/// → Committed`, or `Failed` from any non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferState {
    NotStarted,
    Authenticating,
    TransactionOpen,
    Uploading,
    Committing,
    Committed,
    Failed(String),
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Committed | TransferState::Failed(_))
    }
}

impl std::fmt::Display for TransferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferState::NotStarted => f.write_str("not started"),
            TransferState::Authenticating => f.write_str("authenticating"),
            TransferState::TransactionOpen => f.write_str("transaction open"),
            TransferState::Uploading => f.write_str("uploading"),
            TransferState::Committing => f.write_str("committing"),
            TransferState::Committed => f.write_str("committed"),
            TransferState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Tuning of one uploader.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOptions {
    /// Maximum bytes per `UploadFile` call. Must be non-zero.
    pub chunk_size: u64,
    /// Attempts per call (begin, each chunk, commit). 0 is treated as 1.
    pub max_attempts: u32,
    pub retry: RetryPolicy,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_attempts: 3,
            retry: RetryPolicy::default(),
        }
    }
}

/// Progress event emitted during an upload.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    StateChanged {
        content_id: ContentId,
        state: TransferState,
    },
    ChunkUploaded {
        content_id: ContentId,
        range: ChunkRange,
        bytes_sent: u64,
        total: u64,
        bytes_per_second: f64,
    },
    Completed {
        content_id: ContentId,
        result: CommitResult,
    },
    Failed {
        content_id: ContentId,
        error: String,
    },
}

/// Outcome of a committed transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    pub content_id: ContentId,
    pub transaction_id: TransactionId,
    pub result: CommitResult,
    pub file_size: u64,
    pub chunks: u64,
    /// Hex SHA-256 of every byte sent, in offset order.
    pub sha256: String,
}
