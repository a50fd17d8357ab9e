//! Master-sync coordination: one global lock plus a small status record.
//!
//! The lock is `SET NX EX` on `sync:lock` with the task id as the owner
//! token; release is a Lua compare-and-delete so only the owner can drop
//! it. `sync:status` holds the `idle → syncing_master →
//! processing_suppliers → idle` machine with `(current, total)` progress
//! for UI polling, and `sync:last_run` records the last completion.

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::StateError;

const SYNC_LOCK_KEY: &str = "sync:lock";
const SYNC_STATUS_KEY: &str = "sync:status";
const SYNC_LAST_RUN_KEY: &str = "sync:last_run";

/// Lock TTL; auto-expires so a crashed holder cannot deadlock the cluster.
pub const SYNC_LOCK_TTL_SECONDS: u64 = 3600;

const RELEASE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    SyncingMaster,
    ProcessingSuppliers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub task_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub progress_current: u64,
    pub progress_total: u64,
}

impl SyncStatus {
    pub fn idle() -> Self {
        Self {
            state: SyncState::Idle,
            task_id: None,
            started_at: None,
            progress_current: 0,
            progress_total: 0,
        }
    }
}

/// Outcome of a lock attempt.
#[derive(Debug, Clone)]
pub enum LockAttempt {
    Acquired,
    Held { current_holder: String },
}

#[derive(Clone)]
pub struct SyncCoordinator {
    conn: ConnectionManager,
}

impl SyncCoordinator {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Tries to take the global sync lock for `task_id`.
    ///
    /// Contending callers observe the current holder and abort.
    pub async fn acquire_lock(
        &self,
        task_id: &str,
        ttl_seconds: u64,
    ) -> Result<LockAttempt, StateError> {
        let mut conn = self.conn.clone();
        let set: Option<String> = redis::cmd("SET")
            .arg(SYNC_LOCK_KEY)
            .arg(task_id)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;

        if set.is_some() {
            info!(task_id, ttl_seconds, "sync lock acquired");
            return Ok(LockAttempt::Acquired);
        }

        let holder: Option<String> = conn.get(SYNC_LOCK_KEY).await?;
        let current_holder = holder.unwrap_or_else(|| "unknown".into());
        warn!(task_id, %current_holder, "sync lock denied");
        Ok(LockAttempt::Held { current_holder })
    }

    /// Releases the lock only when `task_id` still owns it.
    pub async fn release_lock(&self, task_id: &str) -> Result<bool, StateError> {
        let mut conn = self.conn.clone();
        let released: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(SYNC_LOCK_KEY)
            .arg(task_id)
            .invoke_async(&mut conn)
            .await?;

        if released > 0 {
            info!(task_id, "sync lock released");
            Ok(true)
        } else {
            warn!(task_id, "sync lock not owned; release skipped");
            Ok(false)
        }
    }

    /// Current status; missing or undecodable records read as idle.
    pub async fn status(&self) -> Result<SyncStatus, StateError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(SYNC_STATUS_KEY).await?;
        Ok(raw
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_else(SyncStatus::idle))
    }

    pub async fn set_status(&self, status: &SyncStatus) -> Result<(), StateError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set(SYNC_STATUS_KEY, serde_json::to_string(status)?)
            .await?;
        Ok(())
    }

    /// Updates only the `(current, total)` progress pair.
    pub async fn set_progress(&self, current: u64, total: u64) -> Result<(), StateError> {
        let mut status = self.status().await?;
        status.progress_current = current;
        status.progress_total = total;
        self.set_status(&status).await
    }

    /// Stamps `sync:last_run` with the current time.
    pub async fn record_last_run(&self) -> Result<(), StateError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set(SYNC_LAST_RUN_KEY, Utc::now().to_rfc3339())
            .await?;
        Ok(())
    }

    pub async fn last_run(&self) -> Result<Option<String>, StateError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(SYNC_LAST_RUN_KEY).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serde_round_trip() {
        let status = SyncStatus {
            state: SyncState::ProcessingSuppliers,
            task_id: Some("sync-42".into()),
            started_at: Some(Utc::now()),
            progress_current: 3,
            progress_total: 9,
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("processing_suppliers"));
        let round: SyncStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(round.state, SyncState::ProcessingSuppliers);
        assert_eq!(round.progress_total, 9);
    }

    #[test]
    fn idle_is_the_default_reading() {
        let status = SyncStatus::idle();
        assert_eq!(status.state, SyncState::Idle);
        assert!(status.task_id.is_none());
    }
}
