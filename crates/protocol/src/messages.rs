//! JSON documents exchanged with the server.
//!
//! Response fields the client depends on are `Option`s so that a missing
//! field can be reported by name instead of as a generic parse failure.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::{LOCATED_FILE_VERSION, LOCATED_RELATED_ID};
use crate::types::ContentId;

/// Response of `GET /Server/OAuthServerDiscovery.aspx`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    #[serde(default)]
    pub locations: Vec<ServerLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerLocation {
    #[serde(default)]
    pub uri: Option<String>,
}

impl DiscoveryDocument {
    /// `locations[0].uri`, if present and non-empty.
    pub fn provider_uri(&self) -> Option<&str> {
        self.locations
            .first()
            .and_then(|l| l.uri.as_deref())
            .filter(|u| !u.is_empty())
    }
}

/// The subset of the OpenID provider configuration the client reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenIdConfiguration {
    #[serde(default)]
    pub token_endpoint: Option<String>,
}

/// Response of the password-grant token request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Response of `vault.BeginTransaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginTransactionResponse {
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// The file item echoed back by `vault.CommitTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResult {
    pub id: String,
    pub filename: String,
}

/// JSON payload of the request embedded in the commit batch.
///
/// Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileItem {
    pub id: String,
    pub filename: String,
    pub file_size: u64,
    #[serde(rename = "Located")]
    pub located: Vec<Located>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Located {
    pub file_version: u32,
    pub related_id: String,
}

impl FileItem {
    /// Item for a freshly uploaded file, located in the default vault.
    pub fn new(id: &ContentId, filename: &str, file_size: u64) -> Self {
        Self {
            id: id.as_str().to_string(),
            filename: filename.to_string(),
            file_size,
            located: vec![Located {
                file_version: LOCATED_FILE_VERSION,
                related_id: LOCATED_RELATED_ID.to_string(),
            }],
        }
    }
}

/// Parses `body` as JSON, falling back to the outermost `{ … }` span.
///
/// The commit endpoint answers a batch request and may wrap the JSON
/// part in multipart framing; the fallback extracts the object from it.
pub fn parse_embedded_json<T: DeserializeOwned>(body: &str) -> Result<T, serde_json::Error> {
    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(strict) => match (body.find('{'), body.rfind('}')) {
            (Some(start), Some(end)) if start < end => serde_json::from_str(&body[start..=end]),
            _ => Err(strict),
        },
    }
}
