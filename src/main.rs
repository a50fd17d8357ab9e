use anyhow::Context;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if one is present.
    let _ = dotenvy::dotenv();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();

    let state = api::AppState::from_env()
        .await
        .context("failed to assemble API services")?;

    // One process hosts both halves: the ETL HTTP service and the
    // ingestion worker (queue consumers + cron schedule).
    tokio::try_join!(
        async { api::start(state).await.context("API server exited") },
        async { ingestion_worker::start().await.context("worker exited") },
    )?;

    Ok(())
}
