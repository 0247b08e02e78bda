//! Outer collaborators: where credentials come from and where the final
//! outcome is reported.

use tracing::{error, info};
use vaultup_protocol::{CommitResult, Credentials, ValidationError};

/// Produces validated credentials (form, flags, config file...).
pub trait CredentialSource {
    fn read(&self) -> Result<Credentials, ValidationError>;
}

/// Credentials that were validated up front.
impl CredentialSource for Credentials {
    fn read(&self) -> Result<Credentials, ValidationError> {
        Ok(self.clone())
    }
}

/// Reports the outcome of a transfer to the user.
pub trait Notifier: Send + Sync {
    fn report_success(&self, message: &str);
    fn report_error(&self, message: &str);
}

/// Notifier that writes to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn report_success(&self, message: &str) {
        info!("{message}");
    }

    fn report_error(&self, message: &str) {
        error!("{message}");
    }
}

/// The user-facing line for a committed file.
pub fn success_message(result: &CommitResult) -> String {
    format!(
        "Uploaded file '{}' with id '{}'",
        result.filename, result.id
    )
}
