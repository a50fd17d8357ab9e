//! Unified error types and env/validation helpers for `llm-service`.
//!
//! All error messages carry the `[LLM Service]` suffix so that bubbled-up
//! errors in worker logs can be attributed to this library at a glance.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias for config and runtime operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Top-level error for every operation exposed by this crate.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Environment/config-driven setup failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Provider-level failure (bad provider, endpoint, missing key, decode).
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Transport/HTTP client error.
    #[error("[LLM Service] transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),

    /// Non-successful HTTP status from upstream.
    #[error("[LLM Service] unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    /// Health probe failure.
    #[error("[LLM Service] health probe failed: {0}")]
    Health(String),
}

impl LlmError {
    /// True for failures worth one more attempt (timeouts, connects, 5xx).
    ///
    /// The extractor and embedder consult this before retrying a chunk or
    /// an item; validation and config errors never qualify.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::HttpTransport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            LlmError::HttpStatus { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

/// Error enum for environment/config-driven setup.
///
/// Keep this focused: only errors that realistically happen at config
/// load/validation time.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("[LLM Service] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (ports, limits, timeouts).
    #[error("[LLM Service] invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[LLM Service] invalid format in {var}: {reason}")]
    InvalidFormat {
        var: &'static str,
        reason: &'static str,
    },
}

/// Which backend produced a [`ProviderError`].
#[derive(Debug, Clone, Copy)]
pub enum Provider {
    Ollama,
    OpenAI,
}

/// Normalized provider-level failure.
#[derive(Debug, Error)]
#[error("[LLM Service] {provider:?} provider error: {kind}")]
pub struct ProviderError {
    pub provider: Provider,
    pub kind: ProviderErrorKind,
}

impl ProviderError {
    pub fn new(provider: Provider, kind: ProviderErrorKind) -> Self {
        Self { provider, kind }
    }
}

/// Provider failure kinds shared by Ollama and OpenAI services.
#[derive(Debug, Error)]
pub enum ProviderErrorKind {
    #[error("invalid provider for this service")]
    InvalidProvider,

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("missing API key")]
    MissingApiKey,

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("empty completion returned by the model")]
    EmptyCompletion,
}

/* ------------------------ Env helpers ------------------------ */

/// Fetches a required, non-empty environment variable.
///
/// # Errors
/// Returns [`ConfigError::MissingVar`] if the variable is absent or empty.
pub fn must_env(name: &'static str) -> std::result::Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

/// Parses an optional `u32` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`ConfigError::InvalidNumber`] if set but not a valid `u32`.
pub fn env_opt_u32(name: &'static str) -> std::result::Result<Option<u32>, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => {
            v.parse::<u32>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidNumber {
                    var: name,
                    reason: "expected u32",
                })
        }
        _ => Ok(None),
    }
}

/// Shortens an upstream response body for error messages and logs.
pub fn make_snippet(text: &str) -> String {
    text.chars().take(240).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_is_bounded() {
        let long = "x".repeat(1000);
        assert_eq!(make_snippet(&long).len(), 240);
    }
}
