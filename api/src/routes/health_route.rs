//! `GET /health` — component checks for the courier and operators.
//!
//! Always `200`; the body's `status` field carries the verdict:
//! `healthy` (everything up), `degraded` (models down, storage up),
//! `unhealthy` (database or Redis down).

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::core::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub checks: BTreeMap<&'static str, bool>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state.db.ping().await.is_ok();
    let redis = state.queue.queue_depth().await.is_ok();
    let ollama = state
        .profiles
        .health_all()
        .await
        .iter()
        .all(|probe| probe.ok);

    let status = if database && redis && ollama {
        "healthy"
    } else if database && redis {
        "degraded"
    } else {
        "unhealthy"
    };

    let mut checks = BTreeMap::new();
    checks.insert("database", database);
    checks.insert("redis", redis);
    checks.insert("ollama", ollama);

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        service: "catalog-etl",
        checks,
    })
}
