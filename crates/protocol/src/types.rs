use std::fmt;

use serde::{Deserialize, Serialize};

/// Rejected caller input. Never produced once a transfer has started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("please enter a server url")]
    MissingServerUrl,

    #[error("please enter a database name")]
    MissingDatabase,

    #[error("please enter a user name")]
    MissingUsername,

    #[error("please enter a password")]
    MissingSecret,

    #[error("server url must start with http:// or https://: {0}")]
    InvalidServerUrl(String),

    #[error("please select a file to upload")]
    MissingFile,

    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("invalid content id: {0}")]
    InvalidContentId(String),
}

/// Connection data for one vault server.
///
/// `secret` is whatever the server expects as the password value; the
/// caller hashes plaintext passwords before constructing this.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    server_url: String,
    database: String,
    username: String,
    secret: String,
}

impl Credentials {
    /// Validates and builds credentials. A trailing `/` on the URL is dropped.
    pub fn new(
        server_url: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let server_url = server_url.into().trim().trim_end_matches('/').to_string();
        let database = database.into().trim().to_string();
        let username = username.into().trim().to_string();
        let secret = secret.into();

        if server_url.is_empty() {
            return Err(ValidationError::MissingServerUrl);
        }
        if !(server_url.starts_with("http://") || server_url.starts_with("https://")) {
            return Err(ValidationError::InvalidServerUrl(server_url));
        }
        if database.is_empty() {
            return Err(ValidationError::MissingDatabase);
        }
        if username.is_empty() {
            return Err(ValidationError::MissingUsername);
        }
        if secret.is_empty() {
            return Err(ValidationError::MissingSecret);
        }

        Ok(Self {
            server_url,
            database,
            username,
            secret,
        })
    }

    /// Server base URL without a trailing slash.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Pre-hashed password (or token) sent to the server.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Joins an absolute path (starting with `/`) onto the server URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("server_url", &self.server_url)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Client-generated identity of the uploaded file item.
///
/// 32 uppercase hex characters; index 12 is `4` and index 16 is one of
/// `8`, `9`, `A`, `B` (the version and variant nibbles of a v4 UUID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    /// Generates a fresh random id.
    pub fn random() -> Self {
        let mut buf = uuid::Uuid::encode_buffer();
        let id = uuid::Uuid::new_v4().simple().encode_upper(&mut buf);
        Self(id.to_string())
    }

    /// Parses an existing id, enforcing the format rules.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 32
            && bytes
                .iter()
                .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(b))
            && bytes[12] == b'4'
            && matches!(bytes[16], b'8' | b'9' | b'A' | b'B');
        if well_formed {
            Ok(Self(s.to_string()))
        } else {
            Err(ValidationError::InvalidContentId(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContentId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.0
    }
}

/// Source of content ids. One id is drawn per transfer.
pub trait ContentIdGenerator: Send + Sync {
    fn new_id(&self) -> ContentId;
}

/// Default generator backed by random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomContentIds;

impl ContentIdGenerator for RandomContentIds {
    fn new_id(&self) -> ContentId {
        ContentId::random()
    }
}

/// Server-issued transaction handle. Opaque: only threaded through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
