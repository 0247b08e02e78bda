use vaultup_http::TransportError;

/// The call of the token exchange that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStep {
    Discovery,
    OpenIdConfiguration,
    Token,
}

impl std::fmt::Display for AuthStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AuthStep::Discovery => "OAuth server discovery",
            AuthStep::OpenIdConfiguration => "OpenID configuration",
            AuthStep::Token => "token request",
        })
    }
}

/// Errors produced while obtaining authorization headers.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{step} failed: {source}")]
    Transport {
        step: AuthStep,
        #[source]
        source: TransportError,
    },

    #[error("{step} returned malformed JSON: {source}")]
    Json {
        step: AuthStep,
        #[source]
        source: serde_json::Error,
    },

    #[error("{step} response has no `{field}`")]
    MissingField { step: AuthStep, field: &'static str },
}

impl AuthError {
    pub fn step(&self) -> AuthStep {
        match self {
            AuthError::Transport { step, .. }
            | AuthError::Json { step, .. }
            | AuthError::MissingField { step, .. } => *step,
        }
    }

    /// Whether the failure came from a cancelled request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AuthError::Transport { source, .. } if source.is_cancelled())
    }
}
