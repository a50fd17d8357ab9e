//! API error type and its response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request shape is fine but the referenced resource is wrong
    /// (missing file, unknown supplier).
    #[error("{0}")]
    BadRequest(String),

    /// Request fails validation (unknown file type, malformed uuid).
    #[error("{0}")]
    Unprocessable(String),

    #[error("job not found: {0}")]
    NotFound(uuid::Uuid),

    #[error(transparent)]
    State(#[from] job_state::StateError),

    #[error(transparent)]
    Db(#[from] catalog_db::DbError),

    #[error(transparent)]
    Queue(#[from] work_queue::QueueError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ApiError::NotFound(id) => (StatusCode::NOT_FOUND, format!("job not found: {id}")),
            other => {
                error!(error = %other, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
