//! Master sync: ingest every registered supplier under the global lock.
//!
//! The lock is held for the enqueue walk; contending runs observe the
//! holder and back off without error (the next scheduled run catches
//! up). Suppliers without a `file_url` in their metadata are skipped;
//! they are onboarded for a different source kind.

use std::sync::Arc;

use catalog_db::repo::suppliers;
use chrono::Utc;
use job_state::{JobKind, SyncState, SyncStatus};
use job_state::sync::LockAttempt;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;
use work_queue::{QueueError, worker::JobHandler};

use crate::context::WorkerContext;

pub fn master_sync_handler(ctx: Arc<WorkerContext>) -> JobHandler {
    Arc::new(move |_args: Value| {
        let ctx = ctx.clone();
        Box::pin(async move { run_master_sync(&ctx).await })
    })
}

async fn run_master_sync(ctx: &WorkerContext) -> Result<(), QueueError> {
    let task_id = format!("sync-{}", Uuid::new_v4());

    match ctx
        .sync
        .acquire_lock(&task_id, job_state::sync::SYNC_LOCK_TTL_SECONDS)
        .await
        .map_err(QueueError::handler)?
    {
        LockAttempt::Acquired => {}
        LockAttempt::Held { current_holder } => {
            warn!(current_holder, "master sync already running; skipping");
            return Ok(());
        }
    }

    // From here on the lock must be released on every path.
    let result = sync_all_suppliers(ctx, &task_id).await;

    let _ = ctx.sync.set_status(&SyncStatus::idle()).await;
    if let Err(err) = ctx.sync.release_lock(&task_id).await {
        warn!(task_id, error = %err, "failed to release sync lock");
    }

    result
}

async fn sync_all_suppliers(ctx: &WorkerContext, task_id: &str) -> Result<(), QueueError> {
    ctx.sync
        .set_status(&SyncStatus {
            state: SyncState::SyncingMaster,
            task_id: Some(task_id.to_string()),
            started_at: Some(Utc::now()),
            progress_current: 0,
            progress_total: 0,
        })
        .await
        .map_err(QueueError::handler)?;

    let all = suppliers::list_all(&ctx.db).await.map_err(QueueError::handler)?;
    let total = all.len() as u64;

    ctx.sync
        .set_status(&SyncStatus {
            state: SyncState::ProcessingSuppliers,
            task_id: Some(task_id.to_string()),
            started_at: Some(Utc::now()),
            progress_current: 0,
            progress_total: total,
        })
        .await
        .map_err(QueueError::handler)?;

    let mut current = 0u64;
    for supplier in all {
        current += 1;

        let Some(file_url) = supplier
            .supplier_metadata
            .get("file_url")
            .and_then(Value::as_str)
        else {
            ctx.sync
                .set_progress(current, total)
                .await
                .map_err(QueueError::handler)?;
            continue;
        };

        let job = ctx
            .registry
            .create(
                JobKind::FileAnalysis,
                Some(supplier.id),
                Some(file_url.to_string()),
                Some(supplier.source_type.clone()),
                serde_json::Map::new(),
            )
            .await
            .map_err(QueueError::handler)?;

        ctx.queue
            .enqueue(
                "download_and_trigger",
                json!({
                    "job_id": job.job_id,
                    "file_url": file_url,
                    "supplier_id": supplier.id,
                    "file_type": file_type_for(&supplier.source_type),
                }),
            )
            .await?;

        ctx.sync
            .set_progress(current, total)
            .await
            .map_err(QueueError::handler)?;
    }

    ctx.sync.record_last_run().await.map_err(QueueError::handler)?;
    info!(suppliers = total, "master sync walk complete");
    Ok(())
}

/// Supplier source kinds map onto the ETL request's file types.
fn file_type_for(source_type: &str) -> &'static str {
    match source_type {
        "csv" => "csv",
        _ => "excel",
    }
}
