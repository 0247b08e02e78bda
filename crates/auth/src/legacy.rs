//! Static header authentication.

use std::future::Future;
use std::pin::Pin;

use tracing::warn;
use vaultup_protocol::{AuthHeaders, Credentials};

use crate::AuthProvider;
use crate::error::AuthError;

/// Sends the user name, hashed password and database as plain headers on
/// every call. No network exchange.
#[deprecated(note = "basic header authentication is insecure; use OAuthProvider")]
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticHeaderAuth;

#[allow(deprecated)]
impl AuthProvider for StaticHeaderAuth {
    fn obtain_auth_headers<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> Pin<Box<dyn Future<Output = Result<AuthHeaders, AuthError>> + Send + 'a>> {
        Box::pin(async move {
            warn!(user = %credentials.username(), "using deprecated basic header authentication");
            Ok(AuthHeaders::basic(
                credentials.username(),
                credentials.secret(),
                credentials.database(),
            ))
        })
    }
}
