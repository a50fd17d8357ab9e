//! Error types for the matching engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error(transparent)]
    Db(#[from] catalog_db::DbError),

    #[error(transparent)]
    Vector(#[from] vector_store::VectorError),

    #[error(transparent)]
    Llm(#[from] llm_service::LlmError),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}
