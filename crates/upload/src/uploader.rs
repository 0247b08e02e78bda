//! One-call upload orchestration.
//!
//! Wires an [`AuthProvider`], the chunk planner and a
//! [`TransactionCoordinator`] together, emits progress events and supports
//! cancellation.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace};
use vaultup_auth::AuthProvider;
use vaultup_http::RequestClient;
use vaultup_protocol::{ContentId, ContentIdGenerator, Credentials, RandomContentIds};
use vaultup_transfer::{
    ChunkRange, Payload, PayloadDigest, ThroughputMeter, TransferError, plan,
    validate_file_name,
};

use crate::coordinator::TransactionCoordinator;
use crate::error::UploadError;
use crate::types::{TransferOptions, TransferReport, UploadEvent};

/// Capacity of the event channel. Events beyond it are dropped.
pub const EVENT_BUFFER: usize = 256;

/// Uploads payloads into the vault, one transaction per call.
///
/// `upload` takes `&self`; independent transfers may run concurrently and
/// share only the configuration and the event channel. Each transfer is
/// cancelled through its own token.
pub struct VaultUploader {
    client: RequestClient,
    auth: Arc<dyn AuthProvider>,
    ids: Arc<dyn ContentIdGenerator>,
    options: TransferOptions,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
}

impl VaultUploader {
    /// Creates an uploader. `client` is re-tuned with `options.retry`.
    pub fn new(
        client: &RequestClient,
        auth: Arc<dyn AuthProvider>,
        options: TransferOptions,
    ) -> Result<Self, UploadError> {
        if options.chunk_size == 0 {
            return Err(TransferError::InvalidChunkSize.into());
        }
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        Ok(Self {
            client: client.with_policy(options.retry.clone()),
            auth,
            ids: Arc::new(RandomContentIds),
            options,
            events_tx,
            events_rx: Some(events_rx),
        })
    }

    /// Replaces the content id source.
    pub fn with_content_ids(mut self, ids: Arc<dyn ContentIdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Takes the event receiver. Can only be called once.
    ///
    /// A receiver that falls [`EVENT_BUFFER`] events behind misses the
    /// newer ones; the transfer itself never waits on it.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Runs one complete transfer: authenticate, begin, upload every
    /// chunk in order, commit.
    ///
    /// Firing `cancel` stops this transfer only.
    pub async fn upload(
        &self,
        credentials: &Credentials,
        payload: Arc<dyn Payload>,
        cancel: &CancellationToken,
    ) -> Result<TransferReport, UploadError> {
        let content_id = self.ids.new_id();
        info!(
            content_id = %content_id,
            file = %payload.name(),
            bytes = payload.size(),
            chunk_size = self.options.chunk_size,
            "starting upload"
        );

        match self.run(credentials, payload, &content_id, cancel).await {
            Ok(report) => {
                info!(
                    content_id = %content_id,
                    file_id = %report.result.id,
                    chunks = report.chunks,
                    sha256 = %report.sha256,
                    "upload completed"
                );
                self.emit(UploadEvent::Completed {
                    content_id,
                    result: report.result.clone(),
                });
                Ok(report)
            }
            Err(e) => {
                error!(content_id = %content_id, error = %e, "upload failed");
                self.emit(UploadEvent::Failed {
                    content_id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        credentials: &Credentials,
        payload: Arc<dyn Payload>,
        content_id: &ContentId,
        cancel: &CancellationToken,
    ) -> Result<TransferReport, UploadError> {
        validate_file_name(payload.name())?;
        let total = payload.size();
        let chunks = plan(total, self.options.chunk_size)?;

        let mut coord = TransactionCoordinator::new(
            &self.client,
            self.options.max_attempts,
            content_id.clone(),
            cancel.clone(),
        );

        let auth = coord.authenticate(self.auth.as_ref(), credentials).await?;
        self.emit_state(&coord);

        let transaction_id = coord.begin(credentials.server_url(), &auth).await?;
        self.emit_state(&coord);

        let mut speed = ThroughputMeter::default();
        let mut digest = PayloadDigest::new();

        for range in chunks {
            let data = match self.next_chunk(&coord, &payload, range).await {
                Ok(data) => data,
                Err(e) => {
                    coord.mark_failed(&e);
                    return Err(e);
                }
            };
            digest.update(&data);

            let first = coord.chunks_uploaded() == 0;
            coord
                .upload_chunk(range, Bytes::from(data), payload.name(), &auth)
                .await?;
            if first {
                self.emit_state(&coord);
            }

            speed.record(range.len());
            self.emit(UploadEvent::ChunkUploaded {
                content_id: content_id.clone(),
                range,
                bytes_sent: coord.bytes_uploaded(),
                total,
                bytes_per_second: speed.bytes_per_second(),
            });
        }

        let result = coord.commit(payload.name(), total, &auth).await?;
        self.emit_state(&coord);

        Ok(TransferReport {
            content_id: content_id.clone(),
            transaction_id,
            result,
            file_size: total,
            chunks: coord.chunks_uploaded(),
            sha256: digest.finish(),
        })
    }

    /// Reads `range` off the async runtime, after a cancellation check.
    async fn next_chunk(
        &self,
        coord: &TransactionCoordinator<'_>,
        payload: &Arc<dyn Payload>,
        range: ChunkRange,
    ) -> Result<Vec<u8>, UploadError> {
        coord.ensure_not_cancelled()?;
        let payload = Arc::clone(payload);
        let data = tokio::task::spawn_blocking(move || payload.read_range(&range))
            .await
            .map_err(|e| {
                TransferError::Io(std::io::Error::other(format!("reader task failed: {e}")))
            })??;
        Ok(data)
    }

    fn emit_state(&self, coord: &TransactionCoordinator<'_>) {
        self.emit(UploadEvent::StateChanged {
            content_id: coord.content_id().clone(),
            state: coord.state().clone(),
        });
    }

    fn emit(&self, event: UploadEvent) {
        // A full or closed channel drops the event.
        if let Err(mpsc::error::TrySendError::Full(_)) = self.events_tx.try_send(event) {
            trace!("event channel full, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    use httptest::{Expectation, Server, matchers::*, responders::*};
    use serde_json::json;
    use vaultup_protocol::constants::{
        BEGIN_TRANSACTION_PATH, COMMIT_TRANSACTION_PATH, UPLOAD_FILE_PATH,
    };

    use super::*;
    use crate::types::TransferState;
    use vaultup_auth::AuthError;
    use vaultup_http::RetryPolicy;
    use vaultup_protocol::AuthHeaders;
    use vaultup_transfer::{FilePayload, MemoryPayload, checksum_bytes};

    const ID: &str = "FEDCBA9876544321A123456789ABCDEF";

    struct FixedToken;

    impl AuthProvider for FixedToken {
        fn obtain_auth_headers<'a>(
            &'a self,
            _credentials: &'a Credentials,
        ) -> Pin<Box<dyn Future<Output = Result<AuthHeaders, AuthError>> + Send + 'a>> {
            Box::pin(async { Ok(AuthHeaders::bearer("tok")) })
        }
    }

    struct FixedId;

    impl ContentIdGenerator for FixedId {
        fn new_id(&self) -> ContentId {
            ContentId::parse(ID).unwrap()
        }
    }

    fn uploader(options: TransferOptions) -> VaultUploader {
        let client = RequestClient::new(RetryPolicy::immediate()).unwrap();
        VaultUploader::new(&client, Arc::new(FixedToken), options)
            .unwrap()
            .with_content_ids(Arc::new(FixedId))
    }

    fn options() -> TransferOptions {
        TransferOptions {
            chunk_size: 10_000,
            max_attempts: 3,
            retry: RetryPolicy::immediate(),
        }
    }

    fn creds(server: &Server) -> Credentials {
        Credentials::new(server.url_str("/"), "db", "admin", "hash").unwrap()
    }

    fn payload_bytes(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn memory(name: &str, len: usize) -> Arc<dyn Payload> {
        Arc::new(MemoryPayload::new(name, payload_bytes(len)))
    }

    fn expect_begin(server: &Server, times: usize) {
        server.expect(
            Expectation::matching(request::method_path("POST", BEGIN_TRANSACTION_PATH))
                .times(times)
                .respond_with(json_encoded(json!({ "transactionId": "TX-42" }))),
        );
    }

    fn expect_uploads(server: &Server, times: usize) {
        server.expect(
            Expectation::matching(request::method_path("POST", UPLOAD_FILE_PATH))
                .times(times)
                .respond_with(status_code(200)),
        );
    }

    fn expect_commits(server: &Server, times: usize) {
        server.expect(
            Expectation::matching(request::method_path("POST", COMMIT_TRANSACTION_PATH))
                .times(times)
                .respond_with(json_encoded(json!({ "id": ID, "filename": "report.bin" }))),
        );
    }

    /// One expectation per planned chunk, matching its range and bytes.
    fn expect_chunks(server: &Server, data: &[u8], chunk_size: u64) {
        for range in plan(data.len() as u64, chunk_size).unwrap() {
            let bytes = data[range.offset as usize..range.end() as usize].to_vec();
            server.expect(
                Expectation::matching(all_of![
                    request::method_path("POST", UPLOAD_FILE_PATH),
                    request::query(url_decoded(contains(("fileId", ID)))),
                    request::headers(contains(("transactionid", "TX-42"))),
                    request::headers(contains((
                        "content-disposition",
                        "attachment; filename*=utf-8''report.bin"
                    ))),
                    request::headers(contains(("content-range", range.content_range()))),
                    request::body(eq(bytes)),
                ])
                .times(1)
                .respond_with(status_code(200)),
            );
        }
    }

    #[tokio::test]
    async fn uploads_in_three_chunks_then_commits() {
        let server = Server::run();
        let data = payload_bytes(25_000);
        expect_begin(&server, 1);
        expect_chunks(&server, &data, 10_000);
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", COMMIT_TRANSACTION_PATH),
                request::body(matches(r#""file_size":25000,"#)),
                request::body(matches(r#""filename":"report.bin""#)),
                request::body(matches(format!(r#""id":"{ID}""#))),
            ])
            .times(1)
            .respond_with(json_encoded(json!({ "id": ID, "filename": "report.bin" }))),
        );

        let payload = Arc::new(MemoryPayload::new("report.bin", data.clone()));
        let report = uploader(options())
            .upload(&creds(&server), payload, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.chunks, 3);
        assert_eq!(report.file_size, 25_000);
        assert_eq!(report.transaction_id.as_str(), "TX-42");
        assert_eq!(report.result.id, ID);
        assert_eq!(report.sha256, checksum_bytes(&data));
    }

    #[tokio::test]
    async fn file_payload_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.bin");
        let data = payload_bytes(12_345);
        std::fs::write(&path, &data).unwrap();

        let server = Server::run();
        expect_begin(&server, 1);
        expect_chunks(&server, &data, 4_096);
        expect_commits(&server, 1);

        let payload = Arc::new(FilePayload::open(&path).unwrap());
        let report = uploader(TransferOptions {
            chunk_size: 4_096,
            ..options()
        })
        .upload(&creds(&server), payload, &CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(report.chunks, 4);
        assert_eq!(report.sha256, checksum_bytes(&data));
    }

    #[tokio::test]
    async fn emits_events_in_order() {
        let server = Server::run();
        expect_begin(&server, 1);
        expect_uploads(&server, 3);
        expect_commits(&server, 1);

        let mut up = uploader(options());
        let mut events = up.take_events().unwrap();
        assert!(up.take_events().is_none());

        up.upload(
            &creds(&server),
            memory("report.bin", 25_000),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        drop(up);

        let mut states = Vec::new();
        let mut sent = Vec::new();
        let mut completed = false;
        while let Some(event) = events.recv().await {
            match event {
                UploadEvent::StateChanged { state, .. } => states.push(state),
                UploadEvent::ChunkUploaded {
                    bytes_sent, total, ..
                } => {
                    assert_eq!(total, 25_000);
                    sent.push(bytes_sent);
                }
                UploadEvent::Completed { result, .. } => {
                    assert_eq!(result.filename, "report.bin");
                    completed = true;
                }
                UploadEvent::Failed { error, .. } => panic!("unexpected failure: {error}"),
            }
        }

        assert_eq!(
            states,
            [
                TransferState::Authenticating,
                TransferState::TransactionOpen,
                TransferState::Uploading,
                TransferState::Committed
            ]
        );
        assert_eq!(sent, [10_000, 20_000, 25_000]);
        assert!(completed);
    }

    #[tokio::test]
    async fn unread_events_stay_bounded() {
        let server = Server::run();
        expect_begin(&server, 3);
        expect_uploads(&server, 900);
        expect_commits(&server, 3);

        let mut up = uploader(TransferOptions {
            chunk_size: 1,
            ..options()
        });
        let creds = creds(&server);
        for _ in 0..3 {
            up.upload(&creds, memory("report.bin", 300), &CancellationToken::new())
                .await
                .unwrap();
        }

        let mut events = up.take_events().unwrap();
        let mut buffered = 0;
        while events.try_recv().is_ok() {
            buffered += 1;
        }
        assert_eq!(buffered, EVENT_BUFFER);
    }

    #[tokio::test]
    async fn empty_file_goes_straight_to_commit() {
        let server = Server::run();
        expect_begin(&server, 1);
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", COMMIT_TRANSACTION_PATH),
                request::body(matches(r#""file_size":0,"#)),
            ])
            .times(1)
            .respond_with(json_encoded(json!({ "id": ID, "filename": "empty.txt" }))),
        );

        let report = uploader(options())
            .upload(
                &creds(&server),
                Arc::new(MemoryPayload::new("empty.txt", Vec::new())),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(report.chunks, 0);
    }

    #[tokio::test]
    async fn failed_chunk_aborts_before_commit() {
        let server = Server::run();
        expect_begin(&server, 1);
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", UPLOAD_FILE_PATH),
                request::headers(contains(("content-range", "bytes 0-9999/25000"))),
            ])
            .times(1)
            .respond_with(status_code(200)),
        );
        // Three attempts at the second chunk, then no commit.
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", UPLOAD_FILE_PATH),
                request::headers(contains(("content-range", "bytes 10000-19999/25000"))),
            ])
            .times(3)
            .respond_with(status_code(500).body("disk full")),
        );

        let err = uploader(options())
            .upload(
                &creds(&server),
                memory("report.bin", 25_000),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::Transport {
                phase: crate::Phase::Upload,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn commit_failure_surfaces_as_commit_error() {
        let server = Server::run();
        expect_begin(&server, 1);
        expect_uploads(&server, 1);
        server.expect(
            Expectation::matching(request::method_path("POST", COMMIT_TRANSACTION_PATH))
                .times(3)
                .respond_with(status_code(400)),
        );

        let err = uploader(options())
            .upload(
                &creds(&server),
                memory("report.bin", 100),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        match err {
            UploadError::Commit { transaction_id, .. } => {
                assert_eq!(transaction_id.as_str(), "TX-42")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_transaction_id_sends_no_chunks() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", BEGIN_TRANSACTION_PATH))
                .times(1)
                .respond_with(json_encoded(json!({}))),
        );

        let err = uploader(options())
            .upload(
                &creds(&server),
                memory("report.bin", 100),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Protocol { .. }));
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        // No expectations: any request fails the test.
        let server = Server::run();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = uploader(options())
            .upload(&creds(&server), memory("report.bin", 100), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Cancelled));
    }

    #[tokio::test]
    async fn cancelled_between_chunks() {
        let server = Server::run();
        expect_begin(&server, 1);
        // The first chunk succeeds; a second one, if sent, hangs.
        server.expect(
            Expectation::matching(request::method_path("POST", UPLOAD_FILE_PATH))
                .times(1..=2)
                .respond_with(cycle(vec![
                    Box::new(status_code(200)) as Box<dyn Responder>,
                    Box::new(delay_and_then(Duration::from_secs(5), status_code(200))),
                ])),
        );

        let mut up = uploader(options());
        let mut events = up.take_events().unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if matches!(event, UploadEvent::ChunkUploaded { .. }) {
                    trigger.cancel();
                }
            }
        });

        let err = up
            .upload(&creds(&server), memory("report.bin", 25_000), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Cancelled));
    }

    #[tokio::test]
    async fn new_transfer_succeeds_after_a_cancelled_one() {
        let server = Server::run();
        expect_begin(&server, 1);
        expect_uploads(&server, 1);
        expect_commits(&server, 1);

        let up = uploader(options());
        let creds = creds(&server);

        let aborted = CancellationToken::new();
        aborted.cancel();
        let err = up
            .upload(&creds, memory("report.bin", 100), &aborted)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Cancelled));

        let report = up
            .upload(&creds, memory("report.bin", 100), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.result.id, ID);
    }

    #[tokio::test]
    async fn cancelling_one_transfer_leaves_the_other_running() {
        let server = Server::run();
        expect_begin(&server, 1);
        expect_uploads(&server, 1);
        expect_commits(&server, 1);

        let up = uploader(options());
        let creds = creds(&server);
        let aborted = CancellationToken::new();
        aborted.cancel();
        let running = CancellationToken::new();

        let (a, b) = tokio::join!(
            up.upload(&creds, memory("report.bin", 100), &aborted),
            up.upload(&creds, memory("report.bin", 100), &running),
        );
        assert!(matches!(a, Err(UploadError::Cancelled)));
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn rejects_zero_chunk_size() {
        let client = RequestClient::new(RetryPolicy::immediate()).unwrap();
        let result = VaultUploader::new(
            &client,
            Arc::new(FixedToken),
            TransferOptions {
                chunk_size: 0,
                ..options()
            },
        );
        assert!(matches!(
            result,
            Err(UploadError::Payload(TransferError::InvalidChunkSize))
        ));
    }

    #[tokio::test]
    async fn invalid_file_name_rejected_before_network() {
        let server = Server::run();
        let err = uploader(options())
            .upload(
                &creds(&server),
                Arc::new(MemoryPayload::new("../x.bin", vec![1u8])),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UploadError::Payload(TransferError::InvalidFileName(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_transfers_use_fresh_ids() {
        let server = Server::run();
        expect_begin(&server, 2);
        expect_uploads(&server, 2);
        expect_commits(&server, 2);

        let client = RequestClient::new(RetryPolicy::immediate()).unwrap();
        let up = VaultUploader::new(&client, Arc::new(FixedToken), options()).unwrap();
        let creds = creds(&server);
        let cancel = CancellationToken::new();

        let (a, b) = tokio::join!(
            up.upload(&creds, memory("a.bin", 10), &cancel),
            up.upload(&creds, memory("b.bin", 10), &cancel),
        );
        assert_ne!(a.unwrap().content_id, b.unwrap().content_id);
    }
}
