//! Vault upload engine: begin → upload chunks → commit.
//!
//! [`TransactionCoordinator`] is the state machine of a single transfer.
//! [`VaultUploader`] runs a complete transfer in one call, emitting
//! [`UploadEvent`]s and honouring the caller's cancellation token.
//!
//! # Pipeline
//!
//! 1. **Authenticate**: obtain the header set through an `AuthProvider`
//! 2. **Begin**: open a vault transaction, receive its id
//! 3. **Upload**: send each planned chunk in offset order, with retry
//! 4. **Commit**: post the multipart batch that creates the file item

pub mod coordinator;
pub mod error;
pub mod notify;
pub mod types;
pub mod uploader;

// Re-export primary types for convenience.
pub use coordinator::TransactionCoordinator;
pub use error::{Phase, UploadError};
pub use notify::{CredentialSource, Notifier, TracingNotifier, success_message};
pub use types::{TransferOptions, TransferReport, TransferState, UploadEvent};
pub use uploader::{EVENT_BUFFER, VaultUploader};
