//! `POST /analyze/merge` — enqueue batch matching for supplier items.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use job_state::JobKind;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::core::app_state::AppState;
use crate::error_handler::ApiError;

#[derive(Debug, Deserialize)]
pub struct BatchMatchRequest {
    /// Explicit items to match; takes precedence over `supplier_id`.
    #[serde(default)]
    pub supplier_item_ids: Option<Vec<Uuid>>,
    /// Match unmatched items of one supplier.
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
pub struct BatchMatchResponse {
    pub job_id: Uuid,
    pub status: &'static str,
    pub items_queued: usize,
}

pub async fn merge(
    State(state): State<AppState>,
    Json(request): Json<BatchMatchRequest>,
) -> Result<(StatusCode, Json<BatchMatchResponse>), ApiError> {
    if request.limit <= 0 || request.limit > 1000 {
        return Err(ApiError::Unprocessable(
            "limit must be in 1..=1000".to_string(),
        ));
    }

    let items_queued = request
        .supplier_item_ids
        .as_ref()
        .map(Vec::len)
        .unwrap_or(request.limit as usize);

    let job = state
        .registry
        .create(
            JobKind::BatchMatch,
            request.supplier_id,
            None,
            None,
            serde_json::Map::new(),
        )
        .await?;

    state
        .queue
        .enqueue(
            "match_items",
            json!({
                "job_id": job.job_id,
                "supplier_item_ids": request.supplier_item_ids,
                "supplier_id": request.supplier_id,
                "limit": request.limit,
            }),
        )
        .await?;

    info!(job_id = %job.job_id, items_queued, "batch match enqueued");

    Ok((
        StatusCode::ACCEPTED,
        Json(BatchMatchResponse {
            job_id: job.job_id,
            status: "pending",
            items_queued,
        }),
    ))
}
