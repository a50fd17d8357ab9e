//! Worker-wide services, assembled once at startup and injected into
//! every handler. No globals, no lazily initialized singletons.

use std::sync::Arc;

use catalog_db::{Db, DbConfig};
use courier::{EtlClient, PollPlan, UploadsDir};
use job_state::{JobRegistry, SyncCoordinator};
use llm_service::LlmServiceProfiles;
use match_engine::{MatchConfig, MatchEngine, ReviewService};
use redis::aio::ConnectionManager;
use tracing::info;
use vector_store::{ItemEmbedder, PgVectorIndex, VectorIndex};
use work_queue::WorkQueue;

pub struct WorkerContext {
    pub db: Db,
    pub redis: ConnectionManager,
    pub registry: JobRegistry,
    pub queue: WorkQueue,
    pub sync: SyncCoordinator,
    pub etl_client: EtlClient,
    pub uploads: UploadsDir,
    pub poll_plan: PollPlan,
    pub engine: Arc<MatchEngine>,
    pub review: Arc<ReviewService>,
    /// Shared files older than this are swept (`FILE_CLEANUP_TTL_HOURS`).
    pub file_cleanup_ttl_hours: u64,
    /// Master-sync cadence (`SYNC_INTERVAL_HOURS`).
    pub sync_interval_hours: u64,
    /// Items matched per queue job.
    pub match_batch_size: i64,
}

impl WorkerContext {
    pub async fn from_env() -> anyhow::Result<Self> {
        let db = Db::connect(&DbConfig::from_env()?).await?;
        let redis = job_state::connect_from_env().await?;

        let registry = JobRegistry::new(redis.clone());
        let queue = WorkQueue::from_env(redis.clone());
        let sync = SyncCoordinator::new(redis.clone());
        let etl_client = EtlClient::from_env()?;
        let uploads = UploadsDir::from_env();
        let poll_plan = PollPlan::from_env();

        let profiles = Arc::new(LlmServiceProfiles::from_env()?);
        let dimensions = std::env::var("EMBEDDING_DIMENSIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(768);
        let index: Arc<dyn VectorIndex> = Arc::new(PgVectorIndex::new(db.clone()));
        let embedder = Arc::new(ItemEmbedder::new(profiles.clone(), index.clone(), dimensions));

        let engine = Arc::new(MatchEngine::new(
            db.clone(),
            profiles,
            embedder,
            index,
            MatchConfig::from_env(),
        ));
        let review = Arc::new(ReviewService::new(db.clone()));

        let file_cleanup_ttl_hours = env_u64("FILE_CLEANUP_TTL_HOURS", 24);
        let sync_interval_hours = env_u64("SYNC_INTERVAL_HOURS", 8);

        info!(
            uploads = %uploads.root().display(),
            file_cleanup_ttl_hours,
            sync_interval_hours,
            "worker context assembled"
        );

        Ok(Self {
            db,
            redis,
            registry,
            queue,
            sync,
            etl_client,
            uploads,
            poll_plan,
            engine,
            review,
            file_cleanup_ttl_hours,
            sync_interval_hours,
            match_batch_size: 100,
        })
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
