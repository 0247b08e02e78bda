//! Multipart batch envelope sent to `vault.CommitTransaction`.
//!
//! Wire layout (every line ends in CRLF except the closing delimiter):
//!
//! ```text
//! --{boundary}
//! Content-Type: application/http
//!
//! POST {server}/Server/odata/File HTTP/1.1
//! Content-Type: application/json
//!
//! {"id":…,"filename":…,"file_size":…,"Located":[…]}
//! --{boundary}--
//! ```

use crate::constants::{BOUNDARY_PREFIX, CRLF, FILE_ENTITY_PATH};
use crate::messages::FileItem;
use crate::types::ContentId;

/// Boundary for the commit body of `id`: `batch_{id}`.
///
/// The id is random per transfer, so the boundary cannot collide with
/// anything the client itself writes into the JSON part.
pub fn commit_boundary(id: &ContentId) -> String {
    format!("{BOUNDARY_PREFIX}{id}")
}

/// Inputs of the commit body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitBody<'a> {
    pub boundary: &'a str,
    pub server_url: &'a str,
    pub content_id: &'a ContentId,
    pub file_name: &'a str,
    pub file_size: u64,
}

impl CommitBody<'_> {
    /// Serializes the envelope. Deterministic for identical inputs.
    pub fn build(&self) -> Vec<u8> {
        let item = FileItem::new(self.content_id, self.file_name, self.file_size);
        // Serializing a struct of strings and integers cannot fail.
        let json = serde_json::to_string(&item).unwrap_or_default();

        let mut body = String::with_capacity(json.len() + 256);
        body.push_str("--");
        body.push_str(self.boundary);
        body.push_str(CRLF);
        body.push_str("Content-Type: application/http");
        body.push_str(CRLF);
        body.push_str(CRLF);
        body.push_str("POST ");
        body.push_str(self.server_url);
        body.push_str(FILE_ENTITY_PATH);
        body.push_str(" HTTP/1.1");
        body.push_str(CRLF);
        body.push_str("Content-Type: application/json");
        body.push_str(CRLF);
        body.push_str(CRLF);
        body.push_str(&json);
        body.push_str(CRLF);
        body.push_str("--");
        body.push_str(self.boundary);
        body.push_str("--");
        body.into_bytes()
    }
}
