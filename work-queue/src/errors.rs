//! Error types for the queue layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A handler failed; the message is what lands in logs and, on
    /// exhaustion, next to the payload in the DLQ.
    #[error("job failed: {0}")]
    Handler(String),

    #[error("job timed out after {0}s")]
    Timeout(u64),

    #[error("no handler registered for job '{0}'")]
    UnknownJob(String),
}

impl QueueError {
    /// Helper for handlers wrapping arbitrary component errors.
    pub fn handler(err: impl std::fmt::Display) -> Self {
        QueueError::Handler(err.to_string())
    }
}
