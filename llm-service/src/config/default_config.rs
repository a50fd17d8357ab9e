//! Default LLM configs loaded strictly from environment variables.
//!
//! Convenience constructors for [`LlmModelConfig`], one per profile:
//!
//! - **Extract**   → quality model driving structured product extraction
//! - **Rerank**    → faster model for match reranking and sheet analysis
//! - **Embedding** → embedding generator for the vector index
//!
//! # Environment variables
//!
//! - `OLLAMA_BASE_URL`        = Ollama endpoint (required)
//! - `OLLAMA_LLM_MODEL`       = generation model (required)
//! - `OLLAMA_RERANK_MODEL`    = optional faster model (falls back to `OLLAMA_LLM_MODEL`)
//! - `OLLAMA_EMBEDDING_MODEL` = embedding model (required)
//! - `LLM_MAX_TOKENS`         = optional max tokens (u32)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{ConfigError, LlmError, env_opt_u32, must_env},
};

/// Resolves the Ollama endpoint strictly from `OLLAMA_BASE_URL`.
///
/// # Errors
/// [`ConfigError::MissingVar`] if the variable is absent or empty.
fn ollama_endpoint() -> Result<String, LlmError> {
    Ok(must_env("OLLAMA_BASE_URL")?)
}

/// Constructs the **extract** profile config.
///
/// Structured extraction wants stable output, so the temperature is pinned
/// low and the timeout generous (chunked tables can be slow on CPU hosts).
///
/// # Env
/// - `OLLAMA_LLM_MODEL` (required)
/// - `LLM_MAX_TOKENS` (optional)
pub fn config_ollama_extract() -> Result<LlmModelConfig, LlmError> {
    let endpoint = ollama_endpoint()?;
    let model = must_env("OLLAMA_LLM_MODEL")?;
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint,
        api_key: None,
        max_tokens,
        temperature: Some(0.2),
        top_p: None,
        timeout_secs: Some(300),
    })
}

/// Constructs the **rerank** profile config.
///
/// Used for match reranking and ambiguous-sheet analysis, where a smaller
/// model answers faster and precision comes from the candidate pre-filter.
///
/// # Env
/// - `OLLAMA_RERANK_MODEL` (optional; falls back to `OLLAMA_LLM_MODEL`)
/// - `LLM_MAX_TOKENS` (optional)
pub fn config_ollama_rerank() -> Result<LlmModelConfig, LlmError> {
    let endpoint = ollama_endpoint()?;
    let model = std::env::var("OLLAMA_RERANK_MODEL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(Ok)
        .unwrap_or_else(|| must_env("OLLAMA_LLM_MODEL").map_err(LlmError::from))?;
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint,
        api_key: None,
        max_tokens,
        temperature: Some(0.2),
        top_p: Some(0.9),
        timeout_secs: Some(120),
    })
}

/// Constructs the **embedding** profile config.
///
/// # Env
/// - `OLLAMA_EMBEDDING_MODEL` (required)
pub fn config_ollama_embedding() -> Result<LlmModelConfig, LlmError> {
    let endpoint = ollama_endpoint()?;
    let model = must_env("OLLAMA_EMBEDDING_MODEL")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint,
        api_key: None,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(30),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_endpoint_is_a_config_error() {
        // SAFETY: tests run single-threaded over this variable.
        unsafe { std::env::remove_var("OLLAMA_BASE_URL") };
        let err = config_ollama_embedding().unwrap_err();
        assert!(matches!(
            err,
            LlmError::Config(ConfigError::MissingVar("OLLAMA_BASE_URL"))
        ));
    }
}
