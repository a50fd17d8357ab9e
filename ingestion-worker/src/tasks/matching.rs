//! `match_items` and `recalc_aggregates` queue handlers.

use std::sync::Arc;

use job_state::JobStatus;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;
use work_queue::{QueueError, worker::JobHandler};

use crate::context::WorkerContext;

#[derive(Debug, Deserialize)]
struct MatchItemsArgs {
    /// Batch-match job to report into, when the API created one.
    #[serde(default)]
    job_id: Option<Uuid>,
    #[serde(default)]
    supplier_item_ids: Option<Vec<Uuid>>,
    #[serde(default)]
    supplier_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
struct RecalcArgs {
    product_ids: Vec<Uuid>,
    #[serde(default = "default_trigger")]
    trigger: String,
}

fn default_trigger() -> String {
    "manual".into()
}

pub fn match_items_handler(ctx: Arc<WorkerContext>) -> JobHandler {
    Arc::new(move |args: Value| {
        let ctx = ctx.clone();
        Box::pin(async move {
            let args: MatchItemsArgs = serde_json::from_value(args)?;
            run_match(&ctx, args).await
        })
    })
}

async fn run_match(ctx: &WorkerContext, args: MatchItemsArgs) -> Result<(), QueueError> {
    if let Some(job_id) = args.job_id {
        let _ = ctx.registry.mark_started(job_id).await;
    }

    let stats = match &args.supplier_item_ids {
        Some(ids) if !ids.is_empty() => {
            let (_, stats) = ctx
                .engine
                .match_batch(ids)
                .await
                .map_err(QueueError::handler)?;
            stats
        }
        _ => ctx
            .engine
            .match_unmatched(args.supplier_id, args.limit)
            .await
            .map_err(QueueError::handler)?,
    };

    if let Some(job_id) = args.job_id {
        let _ = ctx
            .registry
            .update_progress(job_id, stats.processed, Some(stats.processed))
            .await;
        let _ = ctx
            .registry
            .mark_completed(job_id, JobStatus::Completed, None)
            .await;
    }

    info!(
        auto = stats.auto_matched,
        review = stats.sent_to_review,
        unmatched = stats.unmatched,
        "match_items task done"
    );
    Ok(())
}

pub fn recalc_aggregates_handler(ctx: Arc<WorkerContext>) -> JobHandler {
    Arc::new(move |args: Value| {
        let ctx = ctx.clone();
        Box::pin(async move {
            let args: RecalcArgs = serde_json::from_value(args)?;
            ctx.engine
                .aggregation()
                .recompute_batch(args.product_ids, &args.trigger)
                .await;
            Ok(())
        })
    })
}
