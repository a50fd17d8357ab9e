//! Redis connection bootstrap shared by the API and the worker.

use redis::aio::ConnectionManager;
use tracing::info;

use crate::errors::StateError;

/// Connects from `REDIS_URL`, falling back to `REDIS_HOST` /
/// `REDIS_PORT` / `REDIS_PASSWORD` (default `redis://localhost:6379`).
pub async fn connect_from_env() -> Result<ConnectionManager, StateError> {
    let url = match std::env::var("REDIS_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            let host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".into());
            let port = std::env::var("REDIS_PORT").unwrap_or_else(|_| "6379".into());
            match std::env::var("REDIS_PASSWORD") {
                Ok(password) if !password.is_empty() => {
                    format!("redis://:{password}@{host}:{port}")
                }
                _ => format!("redis://{host}:{port}"),
            }
        }
    };

    let client = redis::Client::open(url.clone())?;
    let conn = client.get_connection_manager().await?;
    info!("redis connected");
    Ok(conn)
}
