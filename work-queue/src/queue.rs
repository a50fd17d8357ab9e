//! Queue storage operations.
//!
//! Keys, for `{queue}` = `QUEUE_NAME`:
//! - `arq:queue:{queue}` — list; producers LPUSH, workers BRPOP.
//! - `arq:retry:{queue}` — zset of deferred envelopes scored by ready-at
//!   epoch seconds; the worker drains due members each tick.
//! - `arq:dlq:{dlq}` — set of exhausted envelopes plus their final error,
//!   expiring after 7 days.

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::QueueError;

/// DLQ retention.
const DLQ_TTL_SECONDS: i64 = 86_400 * 7;

/// One unit of queued work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub job_id: Uuid,
    /// Handler name, e.g. `"match_items"`.
    pub name: String,
    pub args: Value,
    /// Attempts already consumed.
    pub tries: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl JobEnvelope {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            name: name.into(),
            args,
            tries: 0,
            enqueued_at: Utc::now(),
        }
    }
}

/// Handle over one named queue (plus its retry zset and DLQ).
#[derive(Clone)]
pub struct WorkQueue {
    conn: ConnectionManager,
    queue_name: String,
    dlq_name: String,
}

impl WorkQueue {
    pub fn new(conn: ConnectionManager, queue_name: String, dlq_name: String) -> Self {
        Self {
            conn,
            queue_name,
            dlq_name,
        }
    }

    /// Reads `QUEUE_NAME` / `DLQ_NAME` (defaults `ingest` / `ingest-dlq`).
    pub fn from_env(conn: ConnectionManager) -> Self {
        let queue_name = std::env::var("QUEUE_NAME").unwrap_or_else(|_| "ingest".into());
        let dlq_name = std::env::var("DLQ_NAME").unwrap_or_else(|_| "ingest-dlq".into());
        Self::new(conn, queue_name, dlq_name)
    }

    pub fn queue_key(&self) -> String {
        format!("arq:queue:{}", self.queue_name)
    }

    fn retry_key(&self) -> String {
        format!("arq:retry:{}", self.queue_name)
    }

    pub fn dlq_key(&self) -> String {
        format!("arq:dlq:{}", self.dlq_name)
    }

    /// Enqueues a fresh job; returns its id.
    pub async fn enqueue(&self, name: &str, args: Value) -> Result<Uuid, QueueError> {
        let envelope = JobEnvelope::new(name, args);
        let job_id = envelope.job_id;
        self.push(&envelope).await?;
        debug!(job = name, %job_id, "job enqueued");
        Ok(job_id)
    }

    /// Pushes an existing envelope (used when retries come due).
    pub async fn push(&self, envelope: &JobEnvelope) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .lpush(self.queue_key(), serde_json::to_string(envelope)?)
            .await?;
        Ok(())
    }

    /// Blocking pop with a timeout; `None` on timeout. An undecodable
    /// payload is dropped with a warning rather than wedging the queue.
    pub async fn pop(&self, timeout_secs: f64) -> Result<Option<JobEnvelope>, QueueError> {
        let mut conn = self.conn.clone();
        let popped: Option<(String, String)> = conn.brpop(self.queue_key(), timeout_secs).await?;

        match popped {
            None => Ok(None),
            Some((_key, payload)) => match serde_json::from_str(&payload) {
                Ok(envelope) => Ok(Some(envelope)),
                Err(err) => {
                    warn!(error = %err, "dropping undecodable queue payload");
                    Ok(None)
                }
            },
        }
    }

    /// Parks an envelope until `ready_at`.
    pub async fn defer(
        &self,
        envelope: &JobEnvelope,
        ready_at: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .zadd(
                self.retry_key(),
                serde_json::to_string(envelope)?,
                ready_at.timestamp(),
            )
            .await?;
        debug!(job = %envelope.name, job_id = %envelope.job_id, %ready_at, "job deferred");
        Ok(())
    }

    /// Pops every due deferred envelope and requeues it.
    pub async fn requeue_due(&self) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        let now = Utc::now().timestamp();
        let due: Vec<String> = conn
            .zrangebyscore_limit(self.retry_key(), "-inf", now, 0, 100)
            .await?;

        let mut moved = 0usize;
        for payload in due {
            let removed: i64 = conn.zrem(self.retry_key(), &payload).await?;
            if removed == 0 {
                // Another worker took it between range and rem.
                continue;
            }
            match serde_json::from_str::<JobEnvelope>(&payload) {
                Ok(envelope) => {
                    self.push(&envelope).await?;
                    moved += 1;
                }
                Err(err) => warn!(error = %err, "dropping undecodable deferred payload"),
            }
        }

        if moved > 0 {
            debug!(moved, "deferred jobs requeued");
        }
        Ok(moved)
    }

    /// Moves an exhausted envelope to the DLQ with its final error. The
    /// original args ride along for operator replay.
    pub async fn dead_letter(
        &self,
        envelope: &JobEnvelope,
        error: &str,
    ) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let record = serde_json::json!({
            "envelope": envelope,
            "error": error,
            "failed_at": Utc::now(),
        });
        let key = self.dlq_key();
        let _: () = conn.sadd(&key, record.to_string()).await?;
        let _: () = conn.expire(&key, DLQ_TTL_SECONDS).await?;

        warn!(
            job = %envelope.name,
            job_id = %envelope.job_id,
            tries = envelope.tries,
            error,
            args = %envelope.args,
            "job moved to dead letter queue"
        );
        Ok(())
    }

    pub async fn queue_depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        Ok(conn.llen(self.queue_key()).await?)
    }

    pub async fn dlq_depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        Ok(conn.scard(self.dlq_key()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips() {
        let envelope = JobEnvelope::new("match_items", serde_json::json!({"limit": 100}));
        let json = serde_json::to_string(&envelope).unwrap();
        let round: JobEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(round.job_id, envelope.job_id);
        assert_eq!(round.name, "match_items");
        assert_eq!(round.args["limit"], 100);
        assert_eq!(round.tries, 0);
    }
}
