pub mod anthropic_service;
pub mod ollama_service;
mod streaming;

use std::sync::Arc;

use crate::chat::ChatCompletion;
use crate::config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
use crate::error_handler::Result;

use anthropic_service::AnthropicService;
use ollama_service::OllamaService;

/// Builds the chat client for `cfg.provider`.
pub fn chat_service(cfg: LlmModelConfig) -> Result<Arc<dyn ChatCompletion>> {
    Ok(match cfg.provider {
        LlmProvider::Anthropic => Arc::new(AnthropicService::new(cfg)?),
        LlmProvider::Ollama => Arc::new(OllamaService::new(cfg)?),
    })
}
