//! External trigger channels.
//!
//! Other services push plain string payloads onto Redis lists
//! (`parse:triggers`, `retry:triggers`, `sync:trigger`); cron pollers
//! drain them and enqueue the corresponding jobs. The channels are fire
//! and forget, so a drained payload that fails to enqueue is logged and
//! lost, never re-pushed.

use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::errors::QueueError;

pub const PARSE_TRIGGERS_KEY: &str = "parse:triggers";
pub const RETRY_TRIGGERS_KEY: &str = "retry:triggers";
pub const SYNC_TRIGGER_KEY: &str = "sync:trigger";

/// Pops up to `max` pending payloads from a trigger list.
pub async fn drain(
    conn: &ConnectionManager,
    key: &str,
    max: usize,
) -> Result<Vec<String>, QueueError> {
    let mut conn = conn.clone();
    let mut drained = Vec::new();

    for _ in 0..max {
        let payload: Option<String> = conn.rpop(key, None).await?;
        match payload {
            Some(payload) => drained.push(payload),
            None => break,
        }
    }

    Ok(drained)
}
