//! Shared LLM access layer for the catalogue pipeline.
//!
//! One [`LlmServiceProfiles`] value is constructed at startup, wrapped in an
//! `Arc`, and handed to every component that talks to a model:
//!
//! - **extract**   — quality profile for structured product extraction
//! - **rerank**    — speed profile for match reranking and sheet analysis
//! - **embedding** — embedding generator for the vector index
//!
//! Providers (Ollama, OpenAI) are hidden behind the profile API; HTTP
//! clients are cached per configuration.

pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;

pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::LlmError;
pub use health_service::{HealthService, HealthStatus};
pub use service_profiles::LlmServiceProfiles;
