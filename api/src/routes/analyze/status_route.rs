//! `GET`/`DELETE /analyze/status/{job_id}`.
//!
//! The job id arrives as a string so a malformed uuid maps to `422`
//! rather than the extractor's generic `400`.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use job_state::{Job, JobPhase, JobStatus, ParsingMetrics};
use serde::Serialize;
use uuid::Uuid;

use crate::core::app_state::AppState;
use crate::error_handler::ApiError;

/// `200` body of `GET /analyze/status/{job_id}`.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub phase: JobPhase,
    pub progress_percentage: u8,
    pub items_processed: u64,
    pub items_total: u64,
    pub successful_extractions: u64,
    pub failed_extractions: u64,
    pub duplicates_removed: u64,
    pub errors: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ParsingMetrics>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        let (successful, failed, duplicates) = job
            .metrics
            .as_ref()
            .map(|m| (m.parsed_rows, m.total_rows.saturating_sub(m.parsed_rows), m.duplicates_removed))
            .unwrap_or((0, 0, 0));

        Self {
            job_id: job.job_id,
            status: job.status,
            phase: job.phase,
            progress_percentage: job.progress_percentage,
            items_processed: job.items_processed,
            items_total: job.items_total,
            successful_extractions: successful,
            failed_extractions: failed,
            duplicates_removed: duplicates,
            errors: job.errors,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            metrics: job.metrics,
        }
    }
}

fn parse_job_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::Unprocessable(format!("malformed job id: {raw}")))
}

pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job_id = parse_job_id(&job_id)?;
    let job = state
        .registry
        .get(job_id)
        .await?
        .ok_or(ApiError::NotFound(job_id))?;
    Ok(Json(job.into()))
}

pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let job_id = parse_job_id(&job_id)?;
    if state.registry.delete(job_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(job_id))
    }
}
