//! Cron schedule, registered once at worker startup.
//!
//! - ETL-status poller          — every 10 s (the poll plan's interval)
//! - retry-trigger poller       — every 10 s
//! - parse-trigger poller       — every 10 s
//! - manual-sync-trigger poller — every 1 min
//! - queue-depth monitor        — every 5 min
//! - shared-file cleanup        — every 6 h
//! - master-sync scheduler      — every `SYNC_INTERVAL_HOURS` h (default 8)
//! - review expiry              — daily
//! - aggregates sweep           — daily

use std::sync::Arc;
use std::time::Duration;

use job_state::JobKind;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;
use work_queue::cron::{CronHandler, CronJob};
use work_queue::triggers;

use crate::context::WorkerContext;
use crate::tasks::polling;

/// Payload pushed by external services onto `parse:triggers`.
#[derive(Debug, Deserialize)]
struct ParseTrigger {
    file_url: String,
    supplier_id: Uuid,
    #[serde(default = "default_file_type")]
    file_type: String,
}

fn default_file_type() -> String {
    "excel".into()
}

/// Payload pushed onto `retry:triggers`: a job name plus its args.
#[derive(Debug, Deserialize)]
struct RetryTrigger {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

pub fn spawn_all(ctx: Arc<WorkerContext>) {
    let jobs = vec![
        CronJob::new("etl_status_poller", ctx.poll_plan.interval, {
            let ctx = ctx.clone();
            cron(move || {
                let ctx = ctx.clone();
                async move { polling::poll_active_etl_jobs(ctx).await }
            })
        }),
        CronJob::new("retry_trigger_poller", Duration::from_secs(10), {
            let ctx = ctx.clone();
            cron(move || {
                let ctx = ctx.clone();
                async move { poll_retry_triggers(&ctx).await }
            })
        }),
        CronJob::new("parse_trigger_poller", Duration::from_secs(10), {
            let ctx = ctx.clone();
            cron(move || {
                let ctx = ctx.clone();
                async move { poll_parse_triggers(&ctx).await }
            })
        }),
        CronJob::new("manual_sync_trigger_poller", Duration::from_secs(60), {
            let ctx = ctx.clone();
            cron(move || {
                let ctx = ctx.clone();
                async move { poll_sync_trigger(&ctx).await }
            })
        }),
        CronJob::new("queue_depth_monitor", Duration::from_secs(300), {
            let ctx = ctx.clone();
            cron(move || {
                let ctx = ctx.clone();
                async move { monitor_queue_depth(&ctx).await }
            })
        }),
        CronJob::new("shared_file_cleanup", Duration::from_secs(6 * 3600), {
            let ctx = ctx.clone();
            cron(move || {
                let ctx = ctx.clone();
                async move {
                    ctx.queue.enqueue("cleanup_files", json!({})).await?;
                    Ok(())
                }
            })
        }),
        CronJob::new(
            "master_sync_scheduler",
            Duration::from_secs(ctx.sync_interval_hours * 3600),
            {
                let ctx = ctx.clone();
                cron(move || {
                    let ctx = ctx.clone();
                    async move {
                        ctx.queue.enqueue("master_sync", json!({})).await?;
                        Ok(())
                    }
                })
            },
        ),
        CronJob::new("review_expiry", Duration::from_secs(24 * 3600), {
            let ctx = ctx.clone();
            cron(move || {
                let ctx = ctx.clone();
                async move {
                    ctx.queue.enqueue("expire_reviews", json!({})).await?;
                    Ok(())
                }
            })
        }),
        CronJob::new("aggregates_sweep", Duration::from_secs(24 * 3600), {
            let ctx = ctx.clone();
            cron(move || {
                let ctx = ctx.clone();
                async move {
                    let count = ctx
                        .engine
                        .aggregation()
                        .recompute_all_linked()
                        .await
                        .map_err(work_queue::QueueError::handler)?;
                    info!(count, "nightly aggregates sweep done");
                    Ok(())
                }
            })
        }),
    ];

    work_queue::cron::spawn_all(jobs);
}

/// Adapts an async closure into a [`CronHandler`].
fn cron<F, Fut>(f: F) -> CronHandler
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), work_queue::QueueError>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// Logs queue and DLQ depth for monitoring.
async fn monitor_queue_depth(ctx: &WorkerContext) -> Result<(), work_queue::QueueError> {
    let queue_depth = ctx.queue.queue_depth().await?;
    let dlq_depth = ctx.queue.dlq_depth().await?;
    info!(queue_depth, dlq_depth, "queue depth monitor");
    Ok(())
}

/// Drains `retry:triggers` and re-enqueues the referenced jobs.
async fn poll_retry_triggers(ctx: &WorkerContext) -> Result<(), work_queue::QueueError> {
    for payload in triggers::drain(&ctx.redis, triggers::RETRY_TRIGGERS_KEY, 50).await? {
        match serde_json::from_str::<RetryTrigger>(&payload) {
            Ok(trigger) => {
                ctx.queue.enqueue(&trigger.name, trigger.args).await?;
            }
            Err(err) => warn!(error = %err, payload, "undecodable retry trigger dropped"),
        }
    }
    Ok(())
}

/// Drains `parse:triggers`: each payload becomes a fresh file-analysis
/// job plus its courier task.
async fn poll_parse_triggers(ctx: &WorkerContext) -> Result<(), work_queue::QueueError> {
    for payload in triggers::drain(&ctx.redis, triggers::PARSE_TRIGGERS_KEY, 50).await? {
        let trigger = match serde_json::from_str::<ParseTrigger>(&payload) {
            Ok(trigger) => trigger,
            Err(err) => {
                warn!(error = %err, payload, "undecodable parse trigger dropped");
                continue;
            }
        };

        let job = ctx
            .registry
            .create(
                JobKind::FileAnalysis,
                Some(trigger.supplier_id),
                Some(trigger.file_url.clone()),
                Some(trigger.file_type.clone()),
                serde_json::Map::new(),
            )
            .await
            .map_err(work_queue::QueueError::handler)?;

        ctx.queue
            .enqueue(
                "download_and_trigger",
                json!({
                    "job_id": job.job_id,
                    "file_url": trigger.file_url,
                    "supplier_id": trigger.supplier_id,
                    "file_type": trigger.file_type,
                }),
            )
            .await?;
    }
    Ok(())
}

/// Drains `sync:trigger`; any payload at all requests a master sync.
async fn poll_sync_trigger(ctx: &WorkerContext) -> Result<(), work_queue::QueueError> {
    let drained = triggers::drain(&ctx.redis, triggers::SYNC_TRIGGER_KEY, 10).await?;
    if !drained.is_empty() {
        info!(requests = drained.len(), "manual sync requested");
        ctx.queue.enqueue("master_sync", json!({})).await?;
    }
    Ok(())
}
