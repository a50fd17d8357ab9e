//! Error types for the Redis-backed state layer.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("job not found: {0}")]
    JobNotFound(Uuid),

    #[error("config error: {0}")]
    Config(String),
}
