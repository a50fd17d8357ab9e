//! Shared LLM service with three active profiles: `extract`, `rerank`, and
//! `embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (endpoint+model+key+timeout).
//! - If `rerank` is not provided, it falls back to `extract`.

use std::{collections::HashMap, sync::Arc, time::Instant};

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    config::{
        default_config::{config_ollama_embedding, config_ollama_extract, config_ollama_rerank},
        llm_model_config::LlmModelConfig,
        llm_provider::LlmProvider,
    },
    error_handler::LlmError,
    health_service::{HealthService, HealthStatus},
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// Shared service that manages the **extract**, **rerank**, and
/// **embedding** profiles.
///
/// Internally caches Ollama/OpenAI clients keyed by their configuration to
/// avoid recreating HTTP clients on each call.
pub struct LlmServiceProfiles {
    extract: LlmModelConfig,
    rerank: LlmModelConfig,
    embedding: LlmModelConfig,

    ollama: RwLock<HashMap<ClientKey, Arc<OllamaService>>>,
    openai: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,

    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates a new service with three profiles.
    ///
    /// - `extract`: required quality profile (structured extraction).
    /// - `rerank_opt`: optional speed profile. If `None`, falls back to `extract`.
    /// - `embedding`: required embedding profile.
    /// - `health_timeout_secs`: optional timeout for the health checker.
    pub fn new(
        extract: LlmModelConfig,
        rerank_opt: Option<LlmModelConfig>,
        embedding: LlmModelConfig,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, LlmError> {
        let rerank = rerank_opt.unwrap_or_else(|| extract.clone());

        info!(
            extract.model = %extract.model,
            extract.endpoint = %extract.endpoint,
            rerank.model = %rerank.model,
            embedding.model = %embedding.model,
            "LlmServiceProfiles initialized"
        );

        Ok(Self {
            extract,
            rerank,
            embedding,
            ollama: RwLock::new(HashMap::new()),
            openai: RwLock::new(HashMap::new()),
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Builds all three profiles from environment variables
    /// (`OLLAMA_BASE_URL`, `OLLAMA_LLM_MODEL`, `OLLAMA_EMBEDDING_MODEL`, …).
    pub fn from_env() -> Result<Self, LlmError> {
        Self::new(
            config_ollama_extract()?,
            Some(config_ollama_rerank()?),
            config_ollama_embedding()?,
            Some(5),
        )
    }

    /// Generates JSON-constrained text using the **extract** profile.
    ///
    /// The completion is raw text; callers validate/parse it. Smaller
    /// models may still wrap the JSON in prose, hence the fallback parser
    /// on the consuming side.
    pub async fn extract_json(&self, prompt: &str) -> Result<String, LlmError> {
        let started = Instant::now();
        let out = self.generate_with(&self.extract, prompt, true).await;
        if out.is_ok() {
            info!(
                model = %self.extract.model,
                prompt_len = prompt.len(),
                latency_ms = started.elapsed().as_millis(),
                "extract generation completed"
            );
        }
        out
    }

    /// Generates JSON-constrained text using the **rerank** profile.
    ///
    /// Falls back to the extract profile if rerank was not configured.
    pub async fn rerank_json(&self, prompt: &str) -> Result<String, LlmError> {
        let started = Instant::now();
        let out = self.generate_with(&self.rerank, prompt, true).await;
        if out.is_ok() {
            info!(
                model = %self.rerank.model,
                prompt_len = prompt.len(),
                latency_ms = started.elapsed().as_millis(),
                "rerank generation completed"
            );
        }
        out
    }

    /// Computes embeddings using the **embedding** profile.
    ///
    /// # Errors
    /// Returns [`LlmError`] if embedding fails.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, LlmError> {
        let started = Instant::now();

        let out = match self.embedding.provider {
            LlmProvider::Ollama => {
                let cli = self.get_or_init_ollama(&self.embedding).await?;
                cli.embeddings(input).await
            }
            LlmProvider::OpenAI => {
                let cli = self.get_or_init_openai(&self.embedding).await?;
                cli.embeddings(input).await
            }
        };

        if out.is_ok() {
            debug!(
                model = %self.embedding.model,
                input_len = input.len(),
                latency_ms = started.elapsed().as_millis(),
                "embeddings completed"
            );
        }
        out
    }

    /// Returns a health snapshot for all distinct profiles.
    ///
    /// If the rerank profile equals the extract profile, it is checked once.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut list = Vec::<LlmModelConfig>::with_capacity(3);
        list.push(self.extract.clone());
        if self.rerank != self.extract {
            list.push(self.rerank.clone());
        }
        if self.embedding != self.extract && self.embedding != self.rerank {
            list.push(self.embedding.clone());
        }
        debug!(profiles = list.len(), "running health checks");
        self.health.check_many(&list).await
    }

    /// Returns references to the current profiles `(extract, rerank, embedding)`.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig, &LlmModelConfig) {
        (&self.extract, &self.rerank, &self.embedding)
    }

    /* --------------------- Internals --------------------- */

    async fn generate_with(
        &self,
        cfg: &LlmModelConfig,
        prompt: &str,
        json_mode: bool,
    ) -> Result<String, LlmError> {
        match cfg.provider {
            LlmProvider::Ollama => {
                let cli = self.get_or_init_ollama(cfg).await?;
                if json_mode {
                    cli.generate_json(prompt).await
                } else {
                    cli.generate(prompt).await
                }
            }
            LlmProvider::OpenAI => {
                let cli = self.get_or_init_openai(cfg).await?;
                cli.generate(prompt, None, json_mode).await
            }
        }
    }

    async fn get_or_init_ollama(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OllamaService>, LlmError> {
        let key = ClientKey::from(cfg);

        if let Some(cli) = self.ollama.read().await.get(&key).cloned() {
            debug!(model = %cfg.model, "ollama client cache hit");
            return Ok(cli);
        }

        let cli = Arc::new(OllamaService::new(cfg.clone())?);
        let mut w = self.ollama.write().await;
        let entry = w.entry(key).or_insert(cli);

        debug!(model = %cfg.model, endpoint = %cfg.endpoint, "ollama client initialized");
        Ok(entry.clone())
    }

    async fn get_or_init_openai(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OpenAiService>, LlmError> {
        let key = ClientKey::from(cfg);

        if let Some(cli) = self.openai.read().await.get(&key).cloned() {
            debug!(model = %cfg.model, "openai client cache hit");
            return Ok(cli);
        }

        let cli = Arc::new(OpenAiService::new(cfg.clone())?);
        let mut w = self.openai.write().await;
        let entry = w.entry(key).or_insert(cli);

        debug!(model = %cfg.model, endpoint = %cfg.endpoint, "openai client initialized");
        Ok(entry.clone())
    }
}

/// Internal cache key to identify unique client configs.
///
/// `api_key` participates in the key to isolate clients with different
/// credentials; the key's fields are never logged.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
        }
    }
}
