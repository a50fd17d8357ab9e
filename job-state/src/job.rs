//! The durable job record and its enums.
//!
//! `status` is the coarse terminal state the courier polls; `phase` is the
//! pipeline sub-step the ETL orchestrator advances through. Both are
//! serialized into one JSON value per job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Errors kept on a job are capped; older entries are dropped first.
pub const MAX_JOB_ERRORS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    FileAnalysis,
    BatchMatch,
    Vision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    CompletedWithErrors,
}

impl JobStatus {
    /// Terminal statuses are never re-entered.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::CompletedWithErrors
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Pending,
    Downloading,
    Analyzing,
    Extracting,
    Normalizing,
    Complete,
    Failed,
    CompletedWithErrors,
}

/// Parsing-quality metrics written once at completion. This object is the
/// canonical quality source; the progress counters on the job are only a
/// live approximation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsingMetrics {
    pub total_rows: u64,
    pub parsed_rows: u64,
    /// Percentage in [0, 100].
    pub success_rate: f64,
    pub duplicates_removed: u64,
    pub categories_matched: u64,
    pub categories_created: u64,
    pub review_queue_count: u64,
    pub average_similarity: f64,
}

/// Job record stored in Redis, JSON-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub job_kind: JobKind,
    pub status: JobStatus,
    pub phase: JobPhase,
    pub progress_percentage: u8,
    pub items_processed: u64,
    pub items_total: u64,
    pub errors: Vec<String>,
    pub supplier_id: Option<Uuid>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub metrics: Option<ParsingMetrics>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(
        job_kind: JobKind,
        supplier_id: Option<Uuid>,
        file_url: Option<String>,
        file_type: Option<String>,
        metadata: Map<String, Value>,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            job_kind,
            status: JobStatus::Pending,
            phase: JobPhase::Pending,
            progress_percentage: 0,
            items_processed: 0,
            items_total: 0,
            errors: Vec::new(),
            supplier_id,
            file_url,
            file_type,
            metadata,
            metrics: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Appends an error, keeping only the newest [`MAX_JOB_ERRORS`].
    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        if self.errors.len() > MAX_JOB_ERRORS {
            let drop = self.errors.len() - MAX_JOB_ERRORS;
            self.errors.drain(..drop);
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_round_trips_through_json() {
        let mut job = Job::new(
            JobKind::FileAnalysis,
            Some(Uuid::new_v4()),
            Some("/shared/uploads/list.xlsx".into()),
            Some("excel".into()),
            Map::new(),
        );
        job.push_error("chunk 3 failed");
        job.metrics = Some(ParsingMetrics {
            total_rows: 100,
            parsed_rows: 97,
            success_rate: 97.0,
            duplicates_removed: 3,
            ..Default::default()
        });

        let round = Job::from_json(&job.to_json().unwrap()).unwrap();
        assert_eq!(round.job_id, job.job_id);
        assert_eq!(round.status, JobStatus::Pending);
        assert_eq!(round.errors, vec!["chunk 3 failed".to_string()]);
        assert_eq!(round.metrics, job.metrics);
    }

    #[test]
    fn errors_are_capped_oldest_first() {
        let mut job = Job::new(JobKind::BatchMatch, None, None, None, Map::new());
        for i in 0..15 {
            job.push_error(format!("e{i}"));
        }
        assert_eq!(job.errors.len(), MAX_JOB_ERRORS);
        assert_eq!(job.errors.first().unwrap(), "e5");
        assert_eq!(job.errors.last().unwrap(), "e14");
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::CompletedWithErrors.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn enums_use_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&JobStatus::CompletedWithErrors).unwrap(),
            "\"completed_with_errors\""
        );
        assert_eq!(
            serde_json::to_string(&JobPhase::Normalizing).unwrap(),
            "\"normalizing\""
        );
        assert_eq!(
            serde_json::to_string(&JobKind::FileAnalysis).unwrap(),
            "\"file_analysis\""
        );
    }
}
