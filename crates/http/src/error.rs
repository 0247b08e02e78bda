//! Transport error types.

use std::time::Duration;

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureKind {
    #[error("{status} ({status_text})")]
    Status {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    /// The request could not be built (bad header value, bad URL).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("cancelled")]
    Cancelled,
}

impl FailureKind {
    /// Whether another identical attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureKind::Status { .. } | FailureKind::Timeout(_) | FailureKind::Network(_)
        )
    }
}

/// A request that did not succeed within its attempt budget.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} from {url} after {attempts} attempt(s)")]
pub struct TransportError {
    pub url: String,
    pub attempts: u32,
    pub kind: FailureKind,
}

impl TransportError {
    /// HTTP status of the last attempt, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            FailureKind::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Reason phrase of the last attempt's status.
    pub fn status_text(&self) -> Option<&str> {
        match &self.kind {
            FailureKind::Status { status_text, .. } => Some(status_text),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }
}

/// The underlying HTTP client could not be constructed.
#[derive(Debug, thiserror::Error)]
#[error("failed to build HTTP client: {0}")]
pub struct ClientBuildError(#[from] pub reqwest::Error);
