//! Request client.
//!
//! Thin wrapper over `reqwest` that turns every non-2xx answer, network
//! failure or per-attempt timeout into one consumed attempt.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vaultup_protocol::HeaderSet;

use crate::error::{ClientBuildError, FailureKind, TransportError};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
        })
    }
}

/// One HTTP request. Cloning is cheap: the body is reference counted.
#[derive(Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: HeaderSet,
    pub body: Bytes,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderSet::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderSet) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

// Header values carry credentials; only names are shown.
impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.headers.iter().map(|h| h.name.as_str()).collect();
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &names)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

impl Response {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Issues requests with bounded retry.
///
/// Holds no per-transfer state; one client can serve any number of
/// concurrent transfers.
#[derive(Debug, Clone)]
pub struct RequestClient {
    http: reqwest::Client,
    policy: RetryPolicy,
}

impl RequestClient {
    pub fn new(policy: RetryPolicy) -> Result<Self, ClientBuildError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, policy })
    }

    /// Same connection pool, different retry policy.
    pub fn with_policy(&self, policy: RetryPolicy) -> Self {
        Self {
            http: self.http.clone(),
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends `request`, making at most `max_attempts` attempts.
    ///
    /// `max_attempts = 0` is treated as 1.
    pub async fn send(
        &self,
        request: &Request,
        max_attempts: u32,
    ) -> Result<Response, TransportError> {
        self.send_cancellable(request, max_attempts, &CancellationToken::new())
            .await
    }

    /// Like [`send`](Self::send), but gives up as soon as `cancel` fires,
    /// including while a request is in flight or a backoff is pending.
    pub async fn send_cancellable(
        &self,
        request: &Request,
        max_attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<Response, TransportError> {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                method = %request.method,
                url = %request.url,
                attempt,
                max_attempts,
                body_bytes = request.body.len(),
                "sending request"
            );

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(FailureKind::Cancelled),
                outcome = self.attempt(request) => outcome,
            };

            let kind = match outcome {
                Ok(response) => {
                    debug!(url = %request.url, status = response.status, attempt, "request succeeded");
                    return Ok(response);
                }
                Err(kind) => kind,
            };

            if attempt >= max_attempts || !kind.is_retryable() {
                warn!(url = %request.url, attempt, error = %kind, "request failed");
                return Err(TransportError {
                    url: request.url.clone(),
                    attempts: attempt,
                    kind,
                });
            }

            let delay = self.policy.delay_for_attempt(attempt);
            warn!(
                url = %request.url,
                attempt,
                error = %kind,
                delay_ms = delay.as_millis() as u64,
                "request failed, retrying"
            );

            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(TransportError {
                            url: request.url.clone(),
                            attempts: attempt,
                            kind: FailureKind::Cancelled,
                        });
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    /// One attempt, bounded by the policy's attempt timeout.
    async fn attempt(&self, request: &Request) -> Result<Response, FailureKind> {
        let mut builder = self
            .http
            .request(request.method.as_reqwest(), &request.url)
            .body(request.body.clone());
        for header in request.headers.iter() {
            builder = builder.header(header.name.as_str(), header.value.as_str());
        }

        let exchange = async {
            let resp = builder.send().await.map_err(classify)?;
            let status = resp.status();
            let body = resp.bytes().await.map_err(classify)?;

            if !status.is_success() {
                return Err(FailureKind::Status {
                    status: status.as_u16(),
                    status_text: status.canonical_reason().unwrap_or_default().to_string(),
                    body: String::from_utf8_lossy(&body).into_owned(),
                });
            }

            Ok(Response {
                status: status.as_u16(),
                body,
            })
        };

        let timeout = self.policy.attempt_timeout;
        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(FailureKind::Timeout(timeout)),
        }
    }
}

fn classify(err: reqwest::Error) -> FailureKind {
    if err.is_builder() {
        FailureKind::InvalidRequest(err.to_string())
    } else {
        FailureKind::Network(err.to_string())
    }
}
