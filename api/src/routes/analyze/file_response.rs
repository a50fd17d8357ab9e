use serde::Serialize;
use uuid::Uuid;

/// `202` body of `POST /analyze/file`.
#[derive(Debug, Serialize)]
pub struct FileAnalysisResponse {
    pub job_id: Uuid,
    pub status: &'static str,
    pub message: &'static str,
}

impl FileAnalysisResponse {
    pub fn accepted(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: "pending",
            message: "File analysis job enqueued for semantic ETL processing",
        }
    }
}
