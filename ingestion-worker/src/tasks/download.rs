//! `download_and_trigger`: move the file into shared storage and hand the
//! job to the ETL service.
//!
//! The courier half of a file-analysis job. Fails fast (retryable) when
//! the ETL service is unhealthy; the queue's backoff handles transient
//! outages.

use std::sync::Arc;

use job_state::JobPhase;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;
use work_queue::{QueueError, worker::JobHandler};

use crate::context::WorkerContext;

#[derive(Debug, Deserialize)]
struct DownloadArgs {
    /// Local (ingestion-side) job id.
    job_id: Uuid,
    file_url: String,
    supplier_id: Uuid,
    file_type: String,
}

pub fn handler(ctx: Arc<WorkerContext>) -> JobHandler {
    Arc::new(move |args: Value| {
        let ctx = ctx.clone();
        Box::pin(async move {
            let args: DownloadArgs = serde_json::from_value(args)?;
            run(&ctx, args).await
        })
    })
}

async fn run(ctx: &WorkerContext, args: DownloadArgs) -> Result<(), QueueError> {
    if !ctx.etl_client.check_health().await {
        return Err(QueueError::Handler(
            "ETL service unhealthy; retrying later".into(),
        ));
    }

    ctx.registry
        .update_phase(args.job_id, JobPhase::Downloading, Some(5))
        .await
        .map_err(QueueError::handler)?;

    let local_path = ctx
        .uploads
        .resolve(&args.file_url)
        .await
        .map_err(QueueError::handler)?;

    let trigger = ctx
        .etl_client
        .trigger_analysis(
            &local_path.display().to_string(),
            args.supplier_id,
            &args.file_type,
        )
        .await
        .map_err(QueueError::handler)?;

    // The poller cron picks the job up from here via this metadata.
    ctx.registry
        .set_metadata(args.job_id, "etl_job_id", json!(trigger.job_id))
        .await
        .map_err(QueueError::handler)?;
    ctx.registry
        .set_metadata(args.job_id, "shared_file", json!(local_path.display().to_string()))
        .await
        .map_err(QueueError::handler)?;
    ctx.registry
        .mark_started(args.job_id)
        .await
        .map_err(QueueError::handler)?;

    info!(
        job_id = %args.job_id,
        etl_job_id = %trigger.job_id,
        file = %local_path.display(),
        "file handed to ETL service"
    );
    Ok(())
}
