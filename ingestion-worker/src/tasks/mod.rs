//! Queue task handlers.
//!
//! Each submodule owns one concern; `register_all` wires them onto the
//! worker under their queue names.

pub mod download;
pub mod maintenance;
pub mod matching;
pub mod polling;
pub mod sync_tasks;

use std::sync::Arc;

use work_queue::Worker;

use crate::context::WorkerContext;

pub fn register_all(worker: &mut Worker, ctx: Arc<WorkerContext>) {
    worker.register("download_and_trigger", download::handler(ctx.clone()));
    worker.register("match_items", matching::match_items_handler(ctx.clone()));
    worker.register(
        "recalc_aggregates",
        matching::recalc_aggregates_handler(ctx.clone()),
    );
    worker.register("expire_reviews", maintenance::expire_reviews_handler(ctx.clone()));
    worker.register("cleanup_files", maintenance::cleanup_files_handler(ctx.clone()));
    worker.register("master_sync", sync_tasks::master_sync_handler(ctx));
}
