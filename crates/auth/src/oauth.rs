//! OAuth password-grant exchange.
//!
//! 1. `GET {server}/Server/OAuthServerDiscovery.aspx` → `locations[0].uri`
//! 2. `GET {uri}.well-known/openid-configuration` → `token_endpoint`
//! 3. `POST {token_endpoint}` (form-encoded password grant) → `access_token`

use std::future::Future;
use std::pin::Pin;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vaultup_http::{Request, RequestClient, Response};
use vaultup_protocol::constants::{
    DEFAULT_CLIENT_ID, DEFAULT_SCOPE, DISCOVERY_PATH, OPENID_CONFIGURATION_SUFFIX,
};
use vaultup_protocol::messages::{DiscoveryDocument, OpenIdConfiguration, TokenResponse};
use vaultup_protocol::{AuthHeaders, Credentials, HeaderSet};

use crate::AuthProvider;
use crate::error::{AuthError, AuthStep};

fn default_scope() -> String {
    DEFAULT_SCOPE.into()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.into()
}

/// Client registration used in the password grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            scope: default_scope(),
            client_id: default_client_id(),
        }
    }
}

/// Obtains a bearer token through the server's OAuth discovery.
#[derive(Debug, Clone)]
pub struct OAuthProvider {
    client: RequestClient,
    config: OAuthConfig,
    max_attempts: u32,
}

impl OAuthProvider {
    /// Each exchange call is attempted once unless
    /// [`with_max_attempts`](Self::with_max_attempts) says otherwise.
    pub fn new(client: RequestClient, config: OAuthConfig) -> Self {
        Self {
            client,
            config,
            max_attempts: 1,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Runs the three-step exchange and returns the raw access token.
    pub async fn fetch_token(&self, credentials: &Credentials) -> Result<String, AuthError> {
        let discovery_url = credentials.endpoint(DISCOVERY_PATH);
        let discovery: DiscoveryDocument = self
            .get_json(AuthStep::Discovery, Request::get(discovery_url))
            .await?;
        let provider_uri = discovery
            .provider_uri()
            .ok_or(AuthError::MissingField {
                step: AuthStep::Discovery,
                field: "locations[0].uri",
            })?;
        debug!(provider = %provider_uri, "discovered OAuth server");

        let config_url = format!("{provider_uri}{OPENID_CONFIGURATION_SUFFIX}");
        let openid: OpenIdConfiguration = self
            .get_json(AuthStep::OpenIdConfiguration, Request::get(config_url))
            .await?;
        let token_endpoint = openid
            .token_endpoint
            .filter(|e| !e.is_empty())
            .ok_or(AuthError::MissingField {
                step: AuthStep::OpenIdConfiguration,
                field: "token_endpoint",
            })?;
        debug!(endpoint = %token_endpoint, "resolved token endpoint");

        let request = Request::post(token_endpoint)
            .with_headers(
                HeaderSet::new().with("content-type", "application/x-www-form-urlencoded"),
            )
            .with_body(self.token_form(credentials));
        let token: TokenResponse = self.get_json(AuthStep::Token, request).await?;
        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingField {
                step: AuthStep::Token,
                field: "access_token",
            })?;

        info!(
            user = %credentials.username(),
            database = %credentials.database(),
            "obtained access token"
        );
        Ok(access_token)
    }

    /// Form body of the password grant. Every value is percent-encoded.
    fn token_form(&self, credentials: &Credentials) -> String {
        let params = [
            ("grant_type", "password"),
            ("scope", self.config.scope.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("username", credentials.username()),
            ("password", credentials.secret()),
            ("database", credentials.database()),
        ];
        params
            .iter()
            .map(|(k, v)| format!("{k}={}", utf8_percent_encode(v, NON_ALPHANUMERIC)))
            .collect::<Vec<_>>()
            .join("&")
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        step: AuthStep,
        request: Request,
    ) -> Result<T, AuthError> {
        let response: Response = self
            .client
            .send(&request, self.max_attempts)
            .await
            .map_err(|source| AuthError::Transport { step, source })?;
        response
            .json()
            .map_err(|source| AuthError::Json { step, source })
    }
}

impl AuthProvider for OAuthProvider {
    fn obtain_auth_headers<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> Pin<Box<dyn Future<Output = Result<AuthHeaders, AuthError>> + Send + 'a>> {
        Box::pin(async move {
            let token = self.fetch_token(credentials).await?;
            Ok(AuthHeaders::bearer(&token))
        })
    }
}
