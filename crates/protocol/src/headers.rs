//! Ordered header sets and the per-call headers of the vault protocol.

use crate::constants::TRANSACTION_ID_HEADER;
use crate::escape::escape_filename;
use crate::types::TransactionId;

/// A single `(name, value)` header pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered list of headers. Duplicates are kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<Header>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push(Header::new(name, value));
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push(Header::new(name, value));
    }

    /// Returns a new set holding `self` followed by `other`.
    pub fn extended(&self, other: &HeaderSet) -> HeaderSet {
        let mut entries = Vec::with_capacity(self.entries.len() + other.entries.len());
        entries.extend(self.entries.iter().cloned());
        entries.extend(other.entries.iter().cloned());
        HeaderSet { entries }
    }

    /// First value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Authorization headers attached to every call of one transfer.
///
/// Built once per transfer; per-call headers are layered on top with
/// [`AuthHeaders::extend_with`], which never touches the original.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeaders(HeaderSet);

impl AuthHeaders {
    /// `authorization: Bearer <token>`.
    pub fn bearer(token: &str) -> Self {
        Self(HeaderSet::new().with("authorization", format!("Bearer {token}")))
    }

    /// Legacy `AUTHUSER` / `AUTHPASSWORD` / `DATABASE` triple.
    pub fn basic(username: &str, password: &str, database: &str) -> Self {
        Self(
            HeaderSet::new()
                .with("AUTHUSER", username)
                .with("AUTHPASSWORD", password)
                .with("DATABASE", database),
        )
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.0
    }

    /// Returns the auth headers followed by `extra` as a new set.
    pub fn extend_with(&self, extra: &HeaderSet) -> HeaderSet {
        self.0.extended(extra)
    }
}

impl std::fmt::Debug for AuthHeaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|h| h.name.as_str()).collect();
        f.debug_tuple("AuthHeaders").field(&names).finish()
    }
}

/// Headers of one `vault.UploadFile` call (without auth).
///
/// `last_byte` is inclusive, as in `Content-Range`.
pub fn upload_headers(
    file_name: &str,
    offset: u64,
    last_byte: u64,
    total_size: u64,
    transaction_id: &TransactionId,
) -> HeaderSet {
    HeaderSet::new()
        .with(
            "Content-Disposition",
            format!("attachment; filename*=utf-8''{}", escape_filename(file_name)),
        )
        .with(
            "Content-Range",
            format!("bytes {offset}-{last_byte}/{total_size}"),
        )
        .with("Content-Type", "application/octet-stream")
        .with(TRANSACTION_ID_HEADER, transaction_id.as_str())
}

/// Headers of the `vault.CommitTransaction` call (without auth).
pub fn commit_headers(boundary: &str, transaction_id: &TransactionId) -> HeaderSet {
    HeaderSet::new()
        .with("Content-Type", format!("multipart/mixed; boundary={boundary}"))
        .with(TRANSACTION_ID_HEADER, transaction_id.as_str())
}
