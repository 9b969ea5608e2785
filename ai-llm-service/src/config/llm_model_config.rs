use crate::config::llm_provider::LlmProvider;

/// Configuration for one chat-completion backend.
///
/// # Fields
///
/// - `provider`: which backend to call.
/// - `model`: model identifier (e.g., `"claude-3-haiku-20240307"`, `"llama3"`).
/// - `endpoint`: base URL; the service appends its API path.
/// - `api_key`: required by Anthropic, unused by Ollama.
/// - `max_tokens`: upper bound applied to every request, if set.
/// - `temperature`: default sampling temperature when a request has none.
/// - `timeout_secs`: request timeout in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// `max_tokens` of a request, capped by the configured limit.
    pub fn effective_max_tokens(&self, requested: u32) -> u32 {
        self.max_tokens.map_or(requested, |cap| cap.min(requested))
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.unwrap_or(Self::DEFAULT_TIMEOUT_SECS))
    }
}
