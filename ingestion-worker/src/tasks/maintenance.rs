//! Maintenance handlers: review expiry, shared-file cleanup, and the
//! parsing-log sweep.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use catalog_db::repo::parsing_logs;
use serde_json::{Value, json};
use tracing::info;
use work_queue::{QueueError, worker::JobHandler};

use crate::context::WorkerContext;

/// Parsing logs older than this many days are deleted by the daily sweep.
const PARSING_LOG_RETENTION_DAYS: i64 = 30;

pub fn expire_reviews_handler(ctx: Arc<WorkerContext>) -> JobHandler {
    Arc::new(move |_args: Value| {
        let ctx = ctx.clone();
        Box::pin(async move { expire_reviews(&ctx).await })
    })
}

/// Expires stale pending entries, then re-enqueues a fresh matching
/// attempt per affected supplier item.
async fn expire_reviews(ctx: &WorkerContext) -> Result<(), QueueError> {
    let expired = ctx
        .review
        .expire_stale()
        .await
        .map_err(QueueError::handler)?;

    if expired.is_empty() {
        return Ok(());
    }

    let count = expired.len();
    ctx.queue
        .enqueue(
            "match_items",
            json!({ "supplier_item_ids": expired, "limit": count }),
        )
        .await?;

    info!(count, "expired reviews re-enqueued for matching");
    Ok(())
}

pub fn cleanup_files_handler(ctx: Arc<WorkerContext>) -> JobHandler {
    Arc::new(move |_args: Value| {
        let ctx = ctx.clone();
        Box::pin(async move { cleanup(&ctx).await })
    })
}

/// Sweeps stale shared files (skipping any referenced by an in-flight
/// job) and aged parsing logs.
async fn cleanup(ctx: &WorkerContext) -> Result<(), QueueError> {
    let in_flight: HashSet<PathBuf> = ctx
        .registry
        .scan_active()
        .await
        .map_err(QueueError::handler)?
        .into_iter()
        .filter_map(|job| {
            job.metadata
                .get("shared_file")
                .and_then(Value::as_str)
                .map(PathBuf::from)
                .or_else(|| job.file_url.as_deref().map(PathBuf::from))
        })
        .collect();

    let removed_files = ctx
        .uploads
        .cleanup_stale(ctx.file_cleanup_ttl_hours, &in_flight)
        .map_err(QueueError::handler)?;

    let removed_logs = parsing_logs::cleanup_older_than(&ctx.db, PARSING_LOG_RETENTION_DAYS)
        .await
        .map_err(QueueError::handler)?;

    info!(removed_files, removed_logs, "maintenance cleanup complete");
    Ok(())
}
