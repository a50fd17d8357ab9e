//! Error types for the ETL pipeline.
//!
//! Row-attributable failures never surface here — they are recorded as
//! [`crate::extraction::ExtractionError`] values and the pipeline keeps
//! going. This enum is for failures that sink the whole sheet or job.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    /// Structural failure: unreadable file, no usable sheets, PDF input.
    #[error("parsing error: {0}")]
    Parsing(String),

    #[error(transparent)]
    Render(#[from] sheet_render::RenderError),

    #[error(transparent)]
    Llm(#[from] llm_service::LlmError),

    #[error(transparent)]
    Db(#[from] catalog_db::DbError),

    #[error(transparent)]
    State(#[from] job_state::StateError),

    #[error(transparent)]
    Vector(#[from] vector_store::VectorError),
}
