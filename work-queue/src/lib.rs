//! Cooperative work queue on Redis.
//!
//! - Named jobs with JSON args travel as [`queue::JobEnvelope`] values on
//!   the `arq:queue:{queue}` list (at-least-once delivery).
//! - Failures retry with exponential backoff via a deferred zset; jobs
//!   that exhaust [`retry::RetryPolicy::max_tries`] land in the
//!   `arq:dlq:{queue}` set (retained 7 days) with their original payload.
//! - One worker process hosts several concurrent jobs under a semaphore,
//!   each bounded by a hard per-job timeout.
//! - Periodic tasks register as interval [`cron::CronJob`]s at worker
//!   startup.

pub mod cron;
pub mod errors;
pub mod queue;
pub mod retry;
pub mod triggers;
pub mod worker;

pub use cron::CronJob;
pub use errors::QueueError;
pub use queue::{JobEnvelope, WorkQueue};
pub use retry::RetryPolicy;
pub use worker::{JobHandler, Worker, WorkerConfig};
