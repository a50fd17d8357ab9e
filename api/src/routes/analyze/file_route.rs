//! `POST /analyze/file` — accept and start a file-analysis job.
//!
//! The handler validates the request, creates the job record, and spawns
//! the semantic ETL in the background; the client polls
//! `GET /analyze/status/{job_id}` for the terminal state.

use std::path::PathBuf;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use job_state::JobKind;
use serde_json::json;
use tracing::{info, warn};

use crate::core::app_state::AppState;
use crate::error_handler::ApiError;
use crate::routes::analyze::file_request::FileAnalysisRequest;
use crate::routes::analyze::file_response::FileAnalysisResponse;

pub async fn analyze_file(
    State(state): State<AppState>,
    Json(request): Json<FileAnalysisRequest>,
) -> Result<(StatusCode, Json<FileAnalysisResponse>), ApiError> {
    if !request.file_type_is_known() {
        return Err(ApiError::Unprocessable(format!(
            "unknown file_type '{}' (expected pdf, excel, or csv)",
            request.file_type
        )));
    }

    let file_path = PathBuf::from(
        request
            .file_url
            .strip_prefix("file://")
            .unwrap_or(&request.file_url),
    );
    if !file_path.exists() {
        return Err(ApiError::BadRequest(format!(
            "file not found: {}",
            file_path.display()
        )));
    }

    let mut metadata = serde_json::Map::new();
    metadata.insert("source".into(), json!("api"));
    metadata.insert("semantic_etl".into(), json!(request.use_semantic_etl));
    if let Some(priority_sheet) = &request.priority_sheet {
        metadata.insert("priority_sheet".into(), json!(priority_sheet));
    }

    let job = state
        .registry
        .create(
            JobKind::FileAnalysis,
            Some(request.supplier_id),
            Some(file_path.display().to_string()),
            Some(request.file_type.clone()),
            metadata,
        )
        .await?;

    info!(job_id = %job.job_id, supplier_id = %request.supplier_id, "file analysis accepted");

    let etl = state.etl.clone();
    let job_id = job.job_id;
    let supplier_id = request.supplier_id;
    let priority_sheet = request.priority_sheet.clone();
    tokio::spawn(async move {
        // parse_file records its own failure state; nothing to do here.
        if let Err(err) = etl
            .parse_file(&file_path, supplier_id, job_id, priority_sheet.as_deref())
            .await
        {
            warn!(job_id = %job_id, error = %err, "background ETL run failed");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(FileAnalysisResponse::accepted(job_id)),
    ))
}
