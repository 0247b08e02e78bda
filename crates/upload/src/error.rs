//! Upload error types.

use vaultup_auth::AuthError;
use vaultup_http::TransportError;
use vaultup_protocol::{TransactionId, ValidationError};
use vaultup_transfer::TransferError;

/// Network call of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Begin,
    Upload,
    Commit,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::Begin => "begin transaction",
            Phase::Upload => "chunk upload",
            Phase::Commit => "commit transaction",
        })
    }
}

/// Errors produced by one transfer.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("{phase} failed: {source}")]
    Transport {
        phase: Phase,
        #[source]
        source: TransportError,
    },

    #[error("{phase} returned an unexpected response: {detail}")]
    Protocol { phase: Phase, detail: String },

    /// Every chunk reached the vault but the transaction was not committed.
    #[error("commit of transaction {transaction_id} failed: {reason}")]
    Commit {
        transaction_id: TransactionId,
        reason: String,
        #[source]
        source: Option<TransportError>,
    },

    #[error("payload error: {0}")]
    Payload(#[from] TransferError),

    #[error("cancelled")]
    Cancelled,

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl UploadError {
    /// True when the transfer stopped because its token fired, including
    /// a commit interrupted after the last chunk.
    pub fn is_cancelled(&self) -> bool {
        match self {
            UploadError::Cancelled => true,
            UploadError::Commit {
                source: Some(source),
                ..
            } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Maps a transport failure of `phase`, folding cancellation.
    pub(crate) fn transport(phase: Phase, source: TransportError) -> Self {
        if source.is_cancelled() {
            UploadError::Cancelled
        } else {
            UploadError::Transport { phase, source }
        }
    }
}
