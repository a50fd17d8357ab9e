use std::sync::Arc;

use catalog_db::{Db, DbConfig};
use job_state::JobRegistry;
use llm_service::LlmServiceProfiles;
use semantic_etl::{EtlConfig, SemanticEtl};
use vector_store::{ItemEmbedder, PgVectorIndex, VectorIndex};
use work_queue::WorkQueue;

/// Shared state for handlers; assembled once at startup and cloned into
/// the router.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub registry: JobRegistry,
    pub profiles: Arc<LlmServiceProfiles>,
    pub etl: Arc<SemanticEtl>,
    pub queue: WorkQueue,
}

impl AppState {
    /// Builds every service from the environment and runs the embedded
    /// database migrations.
    pub async fn from_env() -> anyhow::Result<Self> {
        let db = Db::connect(&DbConfig::from_env()?).await?;
        db.run_migrations().await?;

        let redis = job_state::connect_from_env().await?;
        let registry = JobRegistry::new(redis.clone());
        let queue = WorkQueue::from_env(redis);

        let profiles = Arc::new(LlmServiceProfiles::from_env()?);
        let dimensions = std::env::var("EMBEDDING_DIMENSIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(768);
        let index: Arc<dyn VectorIndex> = Arc::new(PgVectorIndex::new(db.clone()));
        let embedder = Arc::new(ItemEmbedder::new(profiles.clone(), index, dimensions));

        let etl = Arc::new(SemanticEtl::new(
            db.clone(),
            registry.clone(),
            profiles.clone(),
            embedder,
            EtlConfig::from_env(),
        ));

        Ok(Self {
            db,
            registry,
            profiles,
            etl,
            queue,
        })
    }
}
