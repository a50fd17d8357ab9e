//! Key-value job registry on Redis.
//!
//! Every write re-arms the 7-day TTL. There is no in-process lock: writers
//! read, mutate, write. The one invariant defended here is that progress
//! is monotonic — a late update carrying a lower percentage is dropped.

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::StateError;
use crate::job::{Job, JobKind, JobPhase, JobStatus, ParsingMetrics};

/// Redis key prefix for job records.
const JOB_PREFIX: &str = "ml-analyze:job:";
/// 7 days, re-armed on every write.
const JOB_TTL_SECONDS: u64 = 86_400 * 7;

/// Handle over the job store. Cheap to clone.
#[derive(Clone)]
pub struct JobRegistry {
    conn: ConnectionManager,
}

impl JobRegistry {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn job_key(job_id: Uuid) -> String {
        format!("{JOB_PREFIX}{job_id}")
    }

    /// Creates a fresh pending job and stores it.
    pub async fn create(
        &self,
        job_kind: JobKind,
        supplier_id: Option<Uuid>,
        file_url: Option<String>,
        file_type: Option<String>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Job, StateError> {
        let job = Job::new(job_kind, supplier_id, file_url, file_type, metadata);
        self.store(&job).await?;
        info!(job_id = %job.job_id, kind = ?job.job_kind, "job created");
        Ok(job)
    }

    pub async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StateError> {
        let mut conn = self.conn.clone();
        let data: Option<String> = conn.get(Self::job_key(job_id)).await?;
        match data {
            Some(data) => Ok(Some(Job::from_json(&data)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, job_id: Uuid) -> Result<bool, StateError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(Self::job_key(job_id)).await?;
        Ok(removed > 0)
    }

    /// Marks a job as processing and stamps `started_at` once.
    pub async fn mark_started(&self, job_id: Uuid) -> Result<Job, StateError> {
        self.mutate(job_id, |job| {
            if job.started_at.is_none() {
                job.started_at = Some(chrono::Utc::now());
            }
            job.status = JobStatus::Processing;
        })
        .await
    }

    /// Advances the pipeline phase; optionally bumps progress with it.
    pub async fn update_phase(
        &self,
        job_id: Uuid,
        phase: JobPhase,
        progress: Option<u8>,
    ) -> Result<Job, StateError> {
        self.mutate(job_id, |job| {
            job.phase = phase;
            if let Some(p) = progress {
                if p >= job.progress_percentage {
                    job.progress_percentage = p.min(100);
                }
            }
        })
        .await
    }

    /// Updates item counters and the derived percentage.
    ///
    /// A percentage lower than the stored one is dropped; counters still
    /// move so late totals can correct themselves.
    pub async fn update_progress(
        &self,
        job_id: Uuid,
        items_processed: u64,
        items_total: Option<u64>,
    ) -> Result<Job, StateError> {
        self.mutate(job_id, |job| {
            job.items_processed = items_processed;
            if let Some(total) = items_total {
                job.items_total = total;
            }
            if job.items_total > 0 {
                let pct = ((items_processed * 100) / job.items_total).min(100) as u8;
                if pct >= job.progress_percentage {
                    job.progress_percentage = pct;
                } else {
                    debug!(
                        job_id = %job_id,
                        stored = job.progress_percentage,
                        incoming = pct,
                        "dropping non-monotonic progress update"
                    );
                }
            }
        })
        .await
    }

    /// Appends an error without touching status (capped at 10).
    pub async fn append_error(&self, job_id: Uuid, error: String) -> Result<Job, StateError> {
        self.mutate(job_id, |job| job.push_error(error)).await
    }

    /// Merges one key into the job's metadata map.
    pub async fn set_metadata(
        &self,
        job_id: Uuid,
        key: &str,
        value: serde_json::Value,
    ) -> Result<Job, StateError> {
        let key = key.to_string();
        self.mutate(job_id, move |job| {
            job.metadata.insert(key, value);
        })
        .await
    }

    /// Scans the job keyspace and returns every non-terminal job.
    ///
    /// Used by the ETL-status poller and the file-cleanup sweep; the scan
    /// is cursor-based so it stays cheap against a large keyspace.
    pub async fn scan_active(&self) -> Result<Vec<Job>, StateError> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut jobs = Vec::new();

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(format!("{JOB_PREFIX}*"))
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            for key in keys {
                let data: Option<String> = conn.get(&key).await?;
                if let Some(data) = data {
                    match Job::from_json(&data) {
                        Ok(job) if !job.status.is_terminal() => jobs.push(job),
                        Ok(_) => {}
                        Err(err) => debug!(key, error = %err, "skipping undecodable job record"),
                    }
                }
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(jobs)
    }

    /// Writes the completion-time metrics object.
    pub async fn update_metrics(
        &self,
        job_id: Uuid,
        metrics: ParsingMetrics,
    ) -> Result<Job, StateError> {
        self.mutate(job_id, move |job| job.metrics = Some(metrics)).await
    }

    /// Terminal success (plain or with errors): phase mirrors the status,
    /// progress snaps to 100, `completed_at` is stamped.
    pub async fn mark_completed(
        &self,
        job_id: Uuid,
        status: JobStatus,
        metrics: Option<ParsingMetrics>,
    ) -> Result<Job, StateError> {
        self.mutate(job_id, move |job| {
            if job.status.is_terminal() {
                warn!(job_id = %job_id, status = ?job.status, "terminal job re-completed; keeping state");
                return;
            }
            job.status = status;
            job.phase = match status {
                JobStatus::CompletedWithErrors => JobPhase::CompletedWithErrors,
                _ => JobPhase::Complete,
            };
            job.progress_percentage = 100;
            job.completed_at = Some(chrono::Utc::now());
            if let Some(m) = metrics {
                job.metrics = Some(m);
            }
        })
        .await
    }

    /// Terminal failure with the triggering error appended.
    pub async fn mark_failed(&self, job_id: Uuid, error: String) -> Result<Job, StateError> {
        self.mutate(job_id, move |job| {
            if job.status.is_terminal() {
                warn!(job_id = %job_id, status = ?job.status, "terminal job re-failed; keeping state");
                return;
            }
            job.status = JobStatus::Failed;
            job.phase = JobPhase::Failed;
            job.completed_at = Some(chrono::Utc::now());
            job.push_error(error);
        })
        .await
    }

    /* --------------------- Internals --------------------- */

    async fn mutate<F>(&self, job_id: Uuid, f: F) -> Result<Job, StateError>
    where
        F: FnOnce(&mut Job),
    {
        let mut job = self
            .get(job_id)
            .await?
            .ok_or(StateError::JobNotFound(job_id))?;
        f(&mut job);
        self.store(&job).await?;
        Ok(job)
    }

    async fn store(&self, job: &Job) -> Result<(), StateError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(Self::job_key(job.job_id), job.to_json()?, JOB_TTL_SECONDS)
            .await?;
        Ok(())
    }
}
