//! Connection pool and transaction helper.
//!
//! `Db` is the one ambient value the rest of the workspace receives at
//! startup; there are no global connections. The pool pings connections
//! before handing them out and recycles them after an hour.

use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::PgConnection;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::errors::DbError;

/// Pool sizing and connection settings, read from the environment.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
    pub pool_min: u32,
    pub pool_max: u32,
    pub acquire_timeout_secs: u64,
}

impl DbConfig {
    /// Builds the config from `DATABASE_URL`, `DB_POOL_MIN`, `DB_POOL_MAX`.
    pub fn from_env() -> Result<Self, DbError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| DbError::Config("DATABASE_URL is required".into()))?;
        let pool_min = env_u32("DB_POOL_MIN", 1);
        let pool_max = env_u32("DB_POOL_MAX", 10);

        Ok(Self {
            database_url,
            pool_min,
            pool_max,
            acquire_timeout_secs: 30,
        })
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Shared handle over the Postgres pool. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Connects the pool and verifies connectivity with a ping.
    pub async fn connect(cfg: &DbConfig) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .min_connections(cfg.pool_min)
            .max_connections(cfg.pool_max)
            .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
            .test_before_acquire(true)
            .max_lifetime(Duration::from_secs(3600))
            .connect(&cfg.database_url)
            .await?;

        info!(
            pool_min = cfg.pool_min,
            pool_max = cfg.pool_max,
            "database pool connected"
        );
        Ok(Self { pool })
    }

    /// Applies the embedded migrations.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("database migrations applied");
        Ok(())
    }

    /// Raw pool access for repositories.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs `f` inside a transaction, committing on `Ok` and rolling back
    /// on `Err`. Expensive work (LLM/HTTP calls) must happen *before* the
    /// closure; the transaction is meant to stay short.
    pub async fn with_tx<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: for<'t> FnOnce(&'t mut PgConnection) -> BoxFuture<'t, Result<T, DbError>>,
    {
        let mut tx = self.pool.begin().await?;
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    /// Cheap liveness probe for the `/health` endpoint.
    pub async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
