//! Error types for the courier.
//!
//! `Network` failures are retryable at the queue level (backoff, then
//! DLQ); `Job` is a terminal state reported by the ETL service and is
//! surfaced verbatim; `InvalidPath` is permanent and fails fast.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CourierError {
    /// Transport-level failure talking to the ETL service; retryable.
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status from the ETL service.
    #[error("unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
        snippet: String,
    },

    /// Terminal failure reported by the downstream job.
    #[error("ETL job failed: {0}")]
    Job(String),

    /// File reference outside the uploads root, or malformed.
    #[error("invalid file path: {0}")]
    InvalidPath(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for CourierError {
    fn from(err: reqwest::Error) -> Self {
        CourierError::Network(err.to_string())
    }
}
