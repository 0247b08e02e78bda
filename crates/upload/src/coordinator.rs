//! Begin/upload/commit state machine for one transfer.
//!
//! The coordinator owns the content id and, once `begin` succeeds, the
//! server's transaction id. Each protocol call is one method; each method
//! checks the current [`TransferState`] and moves it forward, or to
//! `Failed` when the call fails.

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vaultup_auth::AuthProvider;
use vaultup_http::{Request, RequestClient};
use vaultup_protocol::constants::{
    BEGIN_TRANSACTION_PATH, COMMIT_TRANSACTION_PATH, UPLOAD_FILE_PATH,
};
use vaultup_protocol::headers::{commit_headers, upload_headers};
use vaultup_protocol::messages::{BeginTransactionResponse, parse_embedded_json};
use vaultup_protocol::{
    AuthHeaders, CommitBody, CommitResult, ContentId, Credentials, TransactionId,
    commit_boundary,
};
use vaultup_transfer::ChunkRange;

use crate::error::{Phase, UploadError};
use crate::types::TransferState;

/// Drives one transfer through the vault transaction protocol.
///
/// A coordinator is single-use: once `Committed` or `Failed`, every call
/// is rejected with [`UploadError::InvalidState`].
pub struct TransactionCoordinator<'a> {
    client: &'a RequestClient,
    max_attempts: u32,
    cancel: CancellationToken,
    content_id: ContentId,
    state: TransferState,
    server_url: String,
    transaction_id: Option<TransactionId>,
    next_offset: u64,
    total_size: Option<u64>,
    chunks: u64,
}

impl<'a> TransactionCoordinator<'a> {
    pub fn new(
        client: &'a RequestClient,
        max_attempts: u32,
        content_id: ContentId,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            max_attempts,
            cancel,
            content_id,
            state: TransferState::NotStarted,
            server_url: String::new(),
            transaction_id: None,
            next_offset: 0,
            total_size: None,
            chunks: 0,
        }
    }

    pub fn state(&self) -> &TransferState {
        &self.state
    }

    pub fn content_id(&self) -> &ContentId {
        &self.content_id
    }

    /// The open transaction, between a successful `begin` and `commit`.
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.transaction_id.as_ref()
    }

    /// Bytes acknowledged by the vault so far.
    pub fn bytes_uploaded(&self) -> u64 {
        self.next_offset
    }

    pub fn chunks_uploaded(&self) -> u64 {
        self.chunks
    }

    /// Obtains the authorization headers for this transfer.
    ///
    /// `NotStarted → Authenticating`.
    pub async fn authenticate(
        &mut self,
        provider: &dyn AuthProvider,
        credentials: &Credentials,
    ) -> Result<AuthHeaders, UploadError> {
        self.expect_state(&[TransferState::NotStarted], "authenticate")?;
        self.state = TransferState::Authenticating;

        let result = match self.ensure_not_cancelled() {
            Err(e) => Err(e),
            Ok(()) => tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(UploadError::Cancelled),
                headers = provider.obtain_auth_headers(credentials) => headers.map_err(UploadError::from),
            },
        };
        self.settle(result)
    }

    /// Opens a transaction on the vault.
    ///
    /// `NotStarted | Authenticating → TransactionOpen`.
    pub async fn begin(
        &mut self,
        server_url: &str,
        auth: &AuthHeaders,
    ) -> Result<TransactionId, UploadError> {
        self.expect_state(
            &[TransferState::NotStarted, TransferState::Authenticating],
            "begin a transaction",
        )?;
        let server_url = server_url.trim_end_matches('/');

        let result = self.send_begin(server_url, auth).await;
        let transaction_id = self.settle(result)?;

        info!(
            content_id = %self.content_id,
            transaction_id = %transaction_id,
            "transaction opened"
        );
        self.server_url = server_url.to_string();
        self.transaction_id = Some(transaction_id.clone());
        self.state = TransferState::TransactionOpen;
        Ok(transaction_id)
    }

    /// Uploads the bytes of `range`.
    ///
    /// Ranges must arrive in order: each one starts where the previous one
    /// ended. `TransactionOpen | Uploading → Uploading`.
    pub async fn upload_chunk(
        &mut self,
        range: ChunkRange,
        chunk: Bytes,
        file_name: &str,
        auth: &AuthHeaders,
    ) -> Result<(), UploadError> {
        self.expect_state(
            &[TransferState::TransactionOpen, TransferState::Uploading],
            "upload a chunk",
        )?;
        self.check_range(&range, chunk.len() as u64)?;

        let result = self.send_chunk(&range, chunk, file_name, auth).await;
        self.settle(result)?;

        debug!(
            content_id = %self.content_id,
            offset = range.offset,
            last_byte = range.last_byte,
            total = range.total_size,
            "chunk uploaded"
        );
        self.next_offset = range.end();
        self.total_size = Some(range.total_size);
        self.chunks += 1;
        self.state = TransferState::Uploading;
        Ok(())
    }

    /// Commits the transaction, creating the file item.
    ///
    /// Refused unless all `file_size` bytes were uploaded. The transaction
    /// id is released on success. `→ Committing → Committed`.
    pub async fn commit(
        &mut self,
        file_name: &str,
        file_size: u64,
        auth: &AuthHeaders,
    ) -> Result<CommitResult, UploadError> {
        self.expect_state(
            &[TransferState::TransactionOpen, TransferState::Uploading],
            "commit",
        )?;
        let size_matches = self.total_size.is_none_or(|total| total == file_size);
        if self.next_offset != file_size || !size_matches {
            return Err(UploadError::InvalidState(format!(
                "only {} of {file_size} bytes uploaded",
                self.next_offset
            )));
        }
        let Some(transaction_id) = self.transaction_id.clone() else {
            return Err(UploadError::InvalidState("no open transaction".into()));
        };
        let cancelled = self.ensure_not_cancelled();
        self.settle(cancelled)?;

        self.state = TransferState::Committing;
        let result = self
            .send_commit(&transaction_id, file_name, file_size, auth)
            .await;
        let committed = self.settle(result)?;

        info!(
            content_id = %self.content_id,
            transaction_id = %transaction_id,
            file_id = %committed.id,
            filename = %committed.filename,
            "transaction committed"
        );
        self.transaction_id = None;
        self.state = TransferState::Committed;
        Ok(committed)
    }

    /// Fails with [`UploadError::Cancelled`] once the token has fired.
    pub fn ensure_not_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            Err(UploadError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Moves a live transfer to `Failed` because of `err`.
    pub fn mark_failed(&mut self, err: &UploadError) {
        if !self.state.is_terminal() {
            if let Some(tx) = &self.transaction_id {
                warn!(transaction_id = %tx, error = %err, "transfer failed with an open transaction");
            }
            self.state = TransferState::Failed(err.to_string());
        }
    }

    async fn send_begin(
        &self,
        server_url: &str,
        auth: &AuthHeaders,
    ) -> Result<TransactionId, UploadError> {
        self.ensure_not_cancelled()?;
        let request = Request::post(format!("{server_url}{BEGIN_TRANSACTION_PATH}"))
            .with_headers(auth.headers().clone());
        let response = self
            .client
            .send_cancellable(&request, self.max_attempts, &self.cancel)
            .await
            .map_err(|e| UploadError::transport(Phase::Begin, e))?;

        let body: BeginTransactionResponse =
            response.json().map_err(|e| UploadError::Protocol {
                phase: Phase::Begin,
                detail: format!("malformed JSON: {e}"),
            })?;
        body.transaction_id
            .filter(|id| !id.is_empty())
            .map(TransactionId::new)
            .ok_or_else(|| UploadError::Protocol {
                phase: Phase::Begin,
                detail: "response has no `transactionId`".into(),
            })
    }

    async fn send_chunk(
        &self,
        range: &ChunkRange,
        chunk: Bytes,
        file_name: &str,
        auth: &AuthHeaders,
    ) -> Result<(), UploadError> {
        self.ensure_not_cancelled()?;
        let transaction_id = self.open_transaction()?;
        let url = format!(
            "{}{UPLOAD_FILE_PATH}?fileId={}",
            self.server_url, self.content_id
        );
        let headers = auth.extend_with(&upload_headers(
            file_name,
            range.offset,
            range.last_byte,
            range.total_size,
            transaction_id,
        ));
        let request = Request::post(url).with_headers(headers).with_body(chunk);

        self.client
            .send_cancellable(&request, self.max_attempts, &self.cancel)
            .await
            .map_err(|e| UploadError::transport(Phase::Upload, e))?;
        Ok(())
    }

    async fn send_commit(
        &self,
        transaction_id: &TransactionId,
        file_name: &str,
        file_size: u64,
        auth: &AuthHeaders,
    ) -> Result<CommitResult, UploadError> {
        let boundary = commit_boundary(&self.content_id);
        let body = CommitBody {
            boundary: &boundary,
            server_url: &self.server_url,
            content_id: &self.content_id,
            file_name,
            file_size,
        }
        .build();
        let request = Request::post(format!("{}{COMMIT_TRANSACTION_PATH}", self.server_url))
            .with_headers(auth.extend_with(&commit_headers(&boundary, transaction_id)))
            .with_body(body);

        let response = self
            .client
            .send_cancellable(&request, self.max_attempts, &self.cancel)
            .await
            .map_err(|source| {
                // The transaction stays open on the server either way.
                let reason = if source.is_cancelled() {
                    "cancelled".to_string()
                } else {
                    source.to_string()
                };
                UploadError::Commit {
                    transaction_id: transaction_id.clone(),
                    reason,
                    source: Some(source),
                }
            })?;

        let text = response.text();
        debug!(bytes = text.len(), "commit response received");
        parse_embedded_json::<CommitResult>(&text).map_err(|e| UploadError::Commit {
            transaction_id: transaction_id.clone(),
            reason: format!("unreadable commit response: {e}"),
            source: None,
        })
    }

    fn open_transaction(&self) -> Result<&TransactionId, UploadError> {
        self.transaction_id
            .as_ref()
            .ok_or_else(|| UploadError::InvalidState("no open transaction".into()))
    }

    fn check_range(&self, range: &ChunkRange, chunk_len: u64) -> Result<(), UploadError> {
        if range.offset > range.last_byte || range.last_byte >= range.total_size {
            return Err(UploadError::InvalidState(format!(
                "malformed range {}",
                range.content_range()
            )));
        }
        if let Some(total) = self.total_size
            && total != range.total_size
        {
            return Err(UploadError::InvalidState(format!(
                "range total {} differs from earlier chunks ({total})",
                range.total_size
            )));
        }
        if range.offset != self.next_offset {
            return Err(UploadError::InvalidState(format!(
                "expected a chunk at offset {}, got {}",
                self.next_offset, range.offset
            )));
        }
        if chunk_len != range.len() {
            return Err(UploadError::InvalidState(format!(
                "chunk holds {chunk_len} bytes but range {} spans {}",
                range.content_range(),
                range.len()
            )));
        }
        Ok(())
    }

    fn expect_state(&self, allowed: &[TransferState], action: &str) -> Result<(), UploadError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(UploadError::InvalidState(format!(
                "cannot {action} while {}",
                self.state
            )))
        }
    }

    fn settle<T>(&mut self, result: Result<T, UploadError>) -> Result<T, UploadError> {
        if let Err(e) = &result {
            self.mark_failed(e);
        }
        result
    }
}
