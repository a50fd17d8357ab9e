//! The ingestion worker process.
//!
//! Hosts the queue consumers (download-and-trigger, batch matching,
//! aggregate recompute, review expiry, file cleanup, master sync) and the
//! cron schedule (ETL-status poller, queue-depth monitor, trigger-channel
//! pollers, the master-sync scheduler). The HTTP API lives in its sibling
//! crate; this process only consumes work.

pub mod context;
pub mod crons;
pub mod tasks;

use std::sync::Arc;

use tracing::info;
use work_queue::{RetryPolicy, Worker, WorkerConfig};

use crate::context::WorkerContext;

/// Builds the context from the environment, registers all handlers and
/// cron jobs, and runs the consume loop forever.
pub async fn start() -> anyhow::Result<()> {
    let ctx = Arc::new(WorkerContext::from_env().await?);

    let mut worker = Worker::new(
        ctx.queue.clone(),
        RetryPolicy::default(),
        WorkerConfig::from_env(),
    );
    tasks::register_all(&mut worker, ctx.clone());
    crons::spawn_all(ctx.clone());

    info!("ingestion worker starting");
    Arc::new(worker).run().await;
    Ok(())
}
