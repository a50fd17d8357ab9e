//! Interval-based periodic tasks, registered once at worker startup.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{info, warn};

use crate::errors::QueueError;

/// A periodic task handler.
pub type CronHandler = Arc<dyn Fn() -> BoxFuture<'static, Result<(), QueueError>> + Send + Sync>;

/// One periodic task. The first firing happens one full interval after
/// startup, so a crash-looping worker does not hammer its cron bodies.
pub struct CronJob {
    pub name: &'static str,
    pub every: Duration,
    pub handler: CronHandler,
}

impl CronJob {
    pub fn new(name: &'static str, every: Duration, handler: CronHandler) -> Self {
        Self {
            name,
            every,
            handler,
        }
    }
}

/// Spawns every cron job onto the runtime; handler errors are logged and
/// the schedule keeps ticking.
pub fn spawn_all(jobs: Vec<CronJob>) {
    for job in jobs {
        info!(cron = job.name, every_secs = job.every.as_secs(), "cron registered");
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(job.every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await; // consume the immediate first tick

            loop {
                interval.tick().await;
                if let Err(err) = (job.handler)().await {
                    warn!(cron = job.name, error = %err, "cron job failed");
                }
            }
        });
    }
}
