//! HTTP surface of the ETL service.
//!
//! Routes:
//! - `POST /analyze/file`          — accept a file-analysis job (202)
//! - `GET  /analyze/status/{id}`   — poll a job
//! - `DELETE /analyze/status/{id}` — drop a job record
//! - `POST /analyze/merge`         — enqueue batch matching (202)
//! - `GET  /health`                — component health

use axum::Router;
use axum::routing::{get, post};
use tracing::info;

pub mod core;
pub mod error_handler;
pub mod routes;

pub use core::app_state::AppState;
pub use error_handler::ApiError;

/// Builds the router with all routes and shared state attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/analyze/file", post(routes::analyze::file_route::analyze_file))
        .route(
            "/analyze/status/{job_id}",
            get(routes::analyze::status_route::job_status)
                .delete(routes::analyze::status_route::delete_job),
        )
        .route("/analyze/merge", post(routes::analyze::merge_route::merge))
        .route("/health", get(routes::health_route::health))
        .with_state(state)
}

/// Binds and serves until the process exits.
///
/// Address comes from `API_HOST` / `API_PORT` (default `0.0.0.0:8100`).
pub async fn start(state: AppState) -> Result<(), std::io::Error> {
    let host = std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port = std::env::var("API_PORT").unwrap_or_else(|_| "8100".into());
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr, "ETL API listening");
    axum::serve(listener, router(state)).await
}
