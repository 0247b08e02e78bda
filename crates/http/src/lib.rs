//! Retrying HTTP request client.
//!
//! Every call of the vault protocol goes through [`RequestClient::send`]:
//! one request, resolved on a 2xx status, retried identically on any other
//! outcome until the attempt budget is spent.

pub mod client;
pub mod error;
pub mod retry;

pub use client::{Method, Request, RequestClient, Response};
pub use error::{ClientBuildError, FailureKind, TransportError};
pub use retry::RetryPolicy;
