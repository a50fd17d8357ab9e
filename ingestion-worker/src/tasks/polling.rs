//! ETL-status polling, driven by a 10-second cron over the active jobs.
//!
//! For every non-terminal file-analysis job carrying an `etl_job_id`, one
//! tick fetches the downstream status and assesses it: progress mirrors
//! into the local record, terminal success enqueues batch matching for
//! the supplier, failures and deadline overruns fail the local job.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use courier::{EtlJobStatus, PollOutcome, assess};
use job_state::{Job, JobPhase, JobStatus, ParsingMetrics};
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;
use work_queue::QueueError;

use crate::context::WorkerContext;

/// One cron tick: poll every active ETL-backed job.
pub async fn poll_active_etl_jobs(ctx: Arc<WorkerContext>) -> Result<(), QueueError> {
    let jobs = ctx.registry.scan_active().await.map_err(QueueError::handler)?;

    for job in jobs {
        let Some(etl_job_id) = etl_job_id_of(&job) else {
            continue;
        };
        if let Err(err) = poll_one(&ctx, &job, etl_job_id).await {
            warn!(job_id = %job.job_id, error = %err, "ETL poll failed for job");
        }
    }
    Ok(())
}

fn etl_job_id_of(job: &Job) -> Option<Uuid> {
    job.metadata
        .get("etl_job_id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

async fn poll_one(
    ctx: &WorkerContext,
    job: &Job,
    etl_job_id: Uuid,
) -> Result<(), QueueError> {
    let status = ctx
        .etl_client
        .job_status(etl_job_id)
        .await
        .map_err(QueueError::handler)?;

    let started = job.started_at.unwrap_or(job.created_at);
    let elapsed = (Utc::now() - started)
        .to_std()
        .unwrap_or(Duration::ZERO);

    match assess(status, elapsed, &ctx.poll_plan) {
        PollOutcome::Continue(status) => mirror_progress(ctx, job.job_id, &status).await,
        PollOutcome::Done(status) => finish(ctx, job, status).await,
        PollOutcome::DeadlineExceeded => {
            ctx.registry
                .mark_failed(
                    job.job_id,
                    format!(
                        "ETL job {etl_job_id} did not finish within {}s",
                        ctx.poll_plan.deadline.as_secs()
                    ),
                )
                .await
                .map_err(QueueError::handler)?;
            Ok(())
        }
    }
}

/// Mirrors phase/progress/counts of a still-running ETL job.
async fn mirror_progress(
    ctx: &WorkerContext,
    job_id: Uuid,
    status: &EtlJobStatus,
) -> Result<(), QueueError> {
    if let Some(phase) = status.phase.as_deref().and_then(parse_phase) {
        ctx.registry
            .update_phase(job_id, phase, Some(status.progress_percentage))
            .await
            .map_err(QueueError::handler)?;
    }
    ctx.registry
        .update_progress(job_id, status.items_processed, Some(status.items_total))
        .await
        .map_err(QueueError::handler)?;
    Ok(())
}

/// Terminal ETL state: mirror it, then trigger matching on success.
async fn finish(ctx: &WorkerContext, job: &Job, status: EtlJobStatus) -> Result<(), QueueError> {
    for error in &status.errors {
        let _ = ctx.registry.append_error(job.job_id, error.clone()).await;
    }

    if status.is_failed() {
        let message = if status.errors.is_empty() {
            "ETL job failed".to_string()
        } else {
            status.errors.join("; ")
        };
        ctx.registry
            .mark_failed(job.job_id, message)
            .await
            .map_err(QueueError::handler)?;
        return Ok(());
    }

    let metrics: Option<ParsingMetrics> = status
        .metrics
        .clone()
        .and_then(|value| serde_json::from_value(value).ok());
    let local_status = match status.status.as_str() {
        "completed_with_errors" => JobStatus::CompletedWithErrors,
        _ => JobStatus::Completed,
    };

    ctx.registry
        .mark_completed(job.job_id, local_status, metrics)
        .await
        .map_err(QueueError::handler)?;

    // Freshly inserted items are unmatched; hand them to the matcher.
    if let Some(supplier_id) = job.supplier_id {
        ctx.queue
            .enqueue(
                "match_items",
                json!({
                    "supplier_id": supplier_id,
                    "limit": ctx.match_batch_size,
                }),
            )
            .await?;
    }

    info!(
        job_id = %job.job_id,
        etl_status = %status.status,
        "ETL job finished; matching enqueued"
    );
    Ok(())
}

fn parse_phase(raw: &str) -> Option<JobPhase> {
    serde_json::from_value(Value::String(raw.to_string())).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_phases_parse() {
        assert_eq!(parse_phase("extracting"), Some(JobPhase::Extracting));
        assert_eq!(parse_phase("completed_with_errors"), Some(JobPhase::CompletedWithErrors));
        assert_eq!(parse_phase("bogus"), None);
    }
}
