//! Error types for embedding and vector search.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorError {
    /// Item has no text to embed (empty name and characteristics).
    #[error("cannot embed empty text")]
    EmptyText,

    /// Response vector length differs from the configured dimension.
    #[error("embedding dimension mismatch: got={got}, want={want}")]
    DimensionMismatch { got: usize, want: usize },

    #[error("embedding provider error: {0}")]
    Provider(#[from] llm_service::LlmError),

    #[error(transparent)]
    Db(#[from] catalog_db::DbError),

    #[error("vector query error: {0}")]
    Sqlx(#[from] sqlx::Error),
}
