use std::fmt;

/// Represents the provider (backend) used for LLM inference and embeddings.
///
/// The catalogue pipeline runs against a local Ollama by default; OpenAI is
/// supported for deployments that prefer a hosted model. Adding another
/// backend means extending this enum and the service layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Local Ollama runtime for on-device inference.
    Ollama,
    /// OpenAI-compatible hosted API.
    OpenAI,
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::Ollama => write!(f, "Ollama"),
            LlmProvider::OpenAI => write!(f, "OpenAI"),
        }
    }
}
