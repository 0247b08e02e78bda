//! Authorization for vault calls.
//!
//! An [`AuthProvider`] turns validated [`Credentials`] into the header set
//! attached to every call of one transfer. [`OAuthProvider`] performs the
//! discovery and password-grant exchange; the static header variant is
//! only compiled with the `legacy-basic-auth` feature.

pub mod error;
pub mod oauth;
#[cfg(feature = "legacy-basic-auth")]
pub mod legacy;

use std::future::Future;
use std::pin::Pin;

use vaultup_protocol::{AuthHeaders, Credentials};

pub use error::{AuthError, AuthStep};
#[cfg(feature = "legacy-basic-auth")]
#[allow(deprecated)]
pub use legacy::StaticHeaderAuth;
pub use oauth::{OAuthConfig, OAuthProvider};

/// Produces the authorization headers for one transfer.
pub trait AuthProvider: Send + Sync {
    fn obtain_auth_headers<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> Pin<Box<dyn Future<Output = Result<AuthHeaders, AuthError>> + Send + 'a>>;
}
