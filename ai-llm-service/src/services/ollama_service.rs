//! Lightweight Ollama chat client.
//!
//! - `POST {endpoint}/api/chat`: one JSON reply with `stream=false`, NDJSON
//!   chunks with `stream=true`
//!
//! A request's `system` prompt is sent as a leading `system` message, since
//! the chat endpoint has no separate field for it.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use super::streaming::{response_lines, text_stream};
use crate::chat::{ChatCompletion, ChatRequest, ChatRole, ChatStream};
use crate::config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
use crate::error_handler::{AiLlmError, ConfigError, Result, make_snippet, validate_http_endpoint};

/// Thin client for Ollama, reusing one HTTP client with the configured timeout.
pub struct OllamaService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
    timeout: Duration,
}

impl OllamaService {
    /// Creates a new [`OllamaService`] from the given config.
    ///
    /// # Errors
    /// - [`ConfigError::UnsupportedProvider`] if `cfg.provider` is not `Ollama`
    /// - [`ConfigError::InvalidFormat`] if `cfg.endpoint` is invalid
    /// - [`AiLlmError::HttpTransport`] if HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self> {
        if cfg.provider != LlmProvider::Ollama {
            return Err(ConfigError::UnsupportedProvider(cfg.provider.to_string()).into());
        }
        validate_http_endpoint("OLLAMA_URL", &cfg.endpoint)?;

        let timeout = cfg.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .brotli(true)
            .build()?;

        let url_chat = format!("{}/api/chat", cfg.endpoint.trim().trim_end_matches('/'));
        info!(model = %cfg.model, endpoint = %cfg.endpoint, "OllamaService initialized");

        Ok(Self {
            client,
            cfg,
            url_chat,
            timeout,
        })
    }

    async fn send(&self, body: &ChatBody<'_>) -> Result<reqwest::Response> {
        debug!(stream = body.stream, "POST {}", self.url_chat);
        let resp = self
            .client
            .post(&self.url_chat)
            .json(body)
            .send()
            .await
            .map_err(|e| AiLlmError::from_transport(e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!(%status, "Ollama request failed");
            return Err(AiLlmError::HttpStatus {
                status,
                url: self.url_chat.clone(),
                snippet: make_snippet(&text),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl ChatCompletion for OllamaService {
    /// Mapped options:
    /// - `num_predict`  ← capped `request.max_tokens`
    /// - `temperature`  ← request temperature, else config temperature
    #[instrument(skip_all, fields(model = %self.cfg.model, messages = request.messages.len()))]
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let body = ChatBody::build(&self.cfg, request, false);
        let started = Instant::now();
        let resp = self.send(&body).await?;

        let out: ChatResponse = resp
            .json()
            .await
            .map_err(|e| AiLlmError::Decode(format!("serde error: {e}; ensure `stream=false` is used")))?;

        let content = out.message.map(|m| m.content).unwrap_or_default();
        if content.trim().is_empty() {
            return Err(AiLlmError::EmptyContent(LlmProvider::Ollama));
        }
        debug!(latency_ms = started.elapsed().as_millis() as u64, "Ollama completion received");
        Ok(content)
    }

    #[instrument(skip_all, fields(model = %self.cfg.model, messages = request.messages.len()))]
    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream> {
        let body = ChatBody::build(&self.cfg, request, true);
        let resp = self.send(&body).await?;
        debug!("Ollama stream opened");
        Ok(text_stream(response_lines(resp, self.timeout), ndjson_text))
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Ollama
    }

    fn model(&self) -> &str {
        &self.cfg.model
    }
}

/* ==========================
HTTP payloads & options
========================== */

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

impl<'a> ChatBody<'a> {
    fn build(cfg: &'a LlmModelConfig, request: &'a ChatRequest, stream: bool) -> Self {
        let system = request.system.as_deref().map(|content| WireMessage {
            role: "system",
            content,
        });
        let turns = request.messages.iter().map(|m| WireMessage {
            role: match m.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            },
            content: &m.content,
        });

        Self {
            model: &cfg.model,
            messages: system.into_iter().chain(turns).collect(),
            stream,
            options: ChatOptions {
                temperature: request.temperature.or(cfg.temperature),
                num_predict: Some(cfg.effective_max_tokens(request.max_tokens)),
            },
        }
    }
}

/// Subset of Ollama `options`.
#[derive(Debug, Default, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

/// One NDJSON line of a streamed chat.
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    error: Option<String>,
}

/// Text carried by one NDJSON line; blank lines and empty deltas yield nothing.
fn ndjson_text(line: &str) -> Option<Result<String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let chunk: StreamChunk = match serde_json::from_str(line) {
        Ok(chunk) => chunk,
        Err(e) => return Some(Err(AiLlmError::Decode(format!("serde error: {e}; expected an NDJSON chat chunk")))),
    };
    if let Some(message) = chunk.error {
        return Some(Err(AiLlmError::Decode(format!("stream error: {message}"))));
    }
    chunk.message.map(|m| m.content).filter(|c| !c.is_empty()).map(Ok)
}
