//! Wire protocol types for the vault upload transaction.
//!
//! Everything in this crate is pure: no I/O, no async. The HTTP layer,
//! the token exchange and the transaction state machine live in the
//! sibling crates and build on these types.

pub mod constants;
pub mod envelope;
pub mod escape;
pub mod headers;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use envelope::{CommitBody, commit_boundary};
pub use escape::escape_filename;
pub use headers::{AuthHeaders, Header, HeaderSet};
pub use messages::{CommitResult, FileItem};
pub use types::{
    ContentId, ContentIdGenerator, Credentials, RandomContentIds, TransactionId, ValidationError,
};
