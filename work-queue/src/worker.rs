//! The cooperative worker loop.
//!
//! One OS process hosts `max_concurrency` jobs at a time under a
//! semaphore. Each job runs under a hard timeout; a failure consumes one
//! try and either re-defers with backoff or dead-letters. The loop also
//! drains due retries every tick, so no separate mover process exists.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::errors::QueueError;
use crate::queue::{JobEnvelope, WorkQueue};
use crate::retry::RetryPolicy;

/// A registered job handler. Handlers capture their own dependencies.
pub type JobHandler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<(), QueueError>> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Concurrent jobs per worker process (`MAX_WORKERS`, default 4).
    pub max_concurrency: usize,
    /// Hard per-job timeout in seconds (`JOB_TIMEOUT`, default 300).
    pub job_timeout_secs: u64,
    /// BRPOP timeout; bounds the retry-drain latency.
    pub poll_timeout_secs: f64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            job_timeout_secs: 300,
            poll_timeout_secs: 5.0,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrency: std::env::var("MAX_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrency),
            job_timeout_secs: std::env::var("JOB_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.job_timeout_secs),
            ..defaults
        }
    }
}

pub struct Worker {
    queue: WorkQueue,
    handlers: HashMap<String, JobHandler>,
    policy: RetryPolicy,
    config: WorkerConfig,
    semaphore: Arc<Semaphore>,
}

impl Worker {
    pub fn new(queue: WorkQueue, policy: RetryPolicy, config: WorkerConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency));
        Self {
            queue,
            handlers: HashMap::new(),
            policy,
            config,
            semaphore,
        }
    }

    /// Registers a handler under a job name. Later registrations win.
    pub fn register(&mut self, name: impl Into<String>, handler: JobHandler) {
        self.handlers.insert(name.into(), handler);
    }

    /// Runs the consume loop forever (the binary decides lifetime).
    pub async fn run(self: Arc<Self>) {
        info!(
            concurrency = self.config.max_concurrency,
            job_timeout_secs = self.config.job_timeout_secs,
            handlers = self.handlers.len(),
            "worker started"
        );

        loop {
            if let Err(err) = self.queue.requeue_due().await {
                warn!(error = %err, "failed to drain deferred jobs");
            }

            let envelope = match self.queue.pop(self.config.poll_timeout_secs).await {
                Ok(Some(envelope)) => envelope,
                Ok(None) => continue,
                Err(err) => {
                    error!(error = %err, "queue pop failed; backing off");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break, // semaphore closed: shutting down
            };

            let worker = self.clone();
            tokio::spawn(async move {
                worker.process(envelope).await;
                drop(permit);
            });
        }
    }

    /// Runs one envelope: dispatch, timeout, retry-or-dead-letter.
    async fn process(&self, mut envelope: JobEnvelope) {
        let Some(handler) = self.handlers.get(&envelope.name).cloned() else {
            let err = QueueError::UnknownJob(envelope.name.clone());
            envelope.tries = self.policy.max_tries;
            let _ = self.queue.dead_letter(&envelope, &err.to_string()).await;
            return;
        };

        envelope.tries += 1;
        let started = std::time::Instant::now();
        let timeout = Duration::from_secs(self.config.job_timeout_secs);

        let outcome = match tokio::time::timeout(timeout, handler(envelope.args.clone())).await {
            Ok(result) => result,
            Err(_) => Err(QueueError::Timeout(self.config.job_timeout_secs)),
        };

        match outcome {
            Ok(()) => {
                info!(
                    job = %envelope.name,
                    job_id = %envelope.job_id,
                    tries = envelope.tries,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "job completed"
                );
            }
            Err(err) => {
                warn!(
                    job = %envelope.name,
                    job_id = %envelope.job_id,
                    tries = envelope.tries,
                    error = %err,
                    "job failed"
                );

                if self.policy.should_retry(envelope.tries) {
                    let backoff = self.policy.backoff_for(envelope.tries);
                    let ready_at = Utc::now()
                        + chrono::Duration::from_std(backoff)
                            .unwrap_or_else(|_| chrono::Duration::seconds(60));
                    if let Err(defer_err) = self.queue.defer(&envelope, ready_at).await {
                        error!(error = %defer_err, "failed to defer job; dead-lettering");
                        let _ = self.queue.dead_letter(&envelope, &err.to_string()).await;
                    }
                } else if let Err(dlq_err) =
                    self.queue.dead_letter(&envelope, &err.to_string()).await
                {
                    error!(error = %dlq_err, "failed to dead-letter job");
                }
            }
        }
    }
}
