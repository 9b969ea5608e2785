//! Anthropic Messages API client.
//!
//! - `POST {endpoint}/v1/messages`: message creation, whole or streamed as
//!   server-sent events (`stream=true`)
//!
//! Constructor validation:
//! - `cfg.provider` must be `LlmProvider::Anthropic`
//! - `cfg.api_key` must be present
//! - `cfg.endpoint` must start with http:// or https://

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use super::streaming::{response_lines, text_stream};
use crate::chat::{ChatCompletion, ChatMessage, ChatRequest, ChatStream};
use crate::config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
use crate::error_handler::{AiLlmError, ConfigError, Result, make_snippet, validate_http_endpoint};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug)]
pub struct AnthropicService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_messages: String,
    timeout: Duration,
}

impl AnthropicService {
    /// Builds the client with auth headers and the configured timeout.
    ///
    /// # Errors
    /// - [`ConfigError::UnsupportedProvider`] if `cfg.provider` is not Anthropic
    /// - [`ConfigError::MissingVar`] if `cfg.api_key` is `None`
    /// - [`ConfigError::InvalidFormat`] for a bad endpoint or API key header
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self> {
        if cfg.provider != LlmProvider::Anthropic {
            return Err(ConfigError::UnsupportedProvider(cfg.provider.to_string()).into());
        }
        let api_key = cfg
            .api_key
            .clone()
            .ok_or(ConfigError::MissingVar("ANTHROPIC_API_KEY"))?;
        validate_http_endpoint("ANTHROPIC_URL", &cfg.endpoint)?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            header::HeaderValue::from_str(&api_key).map_err(|_| ConfigError::InvalidFormat {
                var: "ANTHROPIC_API_KEY",
                reason: "not a valid header value",
            })?,
        );
        headers.insert("anthropic-version", header::HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));

        let timeout = cfg.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let url_messages = format!("{}/v1/messages", cfg.endpoint.trim().trim_end_matches('/'));

        info!(
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = timeout.as_secs(),
            "AnthropicService initialized"
        );

        Ok(Self {
            client,
            cfg,
            url_messages,
            timeout,
        })
    }

    async fn send(&self, body: &MessagesRequest<'_>) -> Result<reqwest::Response> {
        debug!(stream = body.stream, "POST {}", self.url_messages);
        let resp = self
            .client
            .post(&self.url_messages)
            .json(body)
            .send()
            .await
            .map_err(|e| AiLlmError::from_transport(e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!(%status, "Anthropic request failed");
            return Err(AiLlmError::HttpStatus {
                status,
                url: self.url_messages.clone(),
                snippet: make_snippet(&text),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl ChatCompletion for AnthropicService {
    #[instrument(skip_all, fields(model = %self.cfg.model, messages = request.messages.len()))]
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let body = MessagesRequest::build(&self.cfg, request);
        let started = Instant::now();
        let resp = self.send(&body).await?;

        let out: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| AiLlmError::Decode(format!("serde error: {e}; expected Messages API response")))?;

        let text = out.first_text().ok_or(AiLlmError::EmptyContent(LlmProvider::Anthropic))?;
        debug!(
            latency_ms = started.elapsed().as_millis() as u64,
            stop_reason = out.stop_reason.as_deref().unwrap_or("-"),
            chars = text.len(),
            "Anthropic completion received"
        );
        Ok(text)
    }

    #[instrument(skip_all, fields(model = %self.cfg.model, messages = request.messages.len()))]
    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream> {
        let body = MessagesRequest {
            stream: true,
            ..MessagesRequest::build(&self.cfg, request)
        };
        let resp = self.send(&body).await?;
        debug!("Anthropic stream opened");
        Ok(text_stream(response_lines(resp, self.timeout), sse_text))
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Anthropic
    }

    fn model(&self) -> &str {
        &self.cfg.model
    }
}

/* ==========================
HTTP payloads
========================== */

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

impl<'a> MessagesRequest<'a> {
    fn build(cfg: &'a LlmModelConfig, request: &'a ChatRequest) -> Self {
        Self {
            model: &cfg.model,
            max_tokens: cfg.effective_max_tokens(request.max_tokens),
            messages: &request.messages,
            temperature: request.temperature.or(cfg.temperature),
            system: request.system.as_deref(),
            stream: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

impl MessagesResponse {
    fn first_text(&self) -> Option<String> {
        self.content
            .iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text.clone())
    }
}

/// One server-sent event of a streamed message.
#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    error: Option<StreamFailure>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamFailure {
    #[serde(default)]
    message: String,
}

/// Text carried by an SSE line, if any.
///
/// Only `data:` lines of `content_block_delta` events with a `text_delta`
/// produce text. An `error` event ends the stream with a decode error.
fn sse_text(line: &str) -> Option<Result<String>> {
    let data = line.strip_prefix("data:")?.trim_start();
    let event: StreamEvent = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(e) => return Some(Err(AiLlmError::Decode(format!("serde error: {e}; expected a stream event")))),
    };
    match event.kind.as_str() {
        "content_block_delta" => event
            .delta
            .filter(|delta| delta.kind == "text_delta")
            .and_then(|delta| delta.text)
            .filter(|text| !text.is_empty())
            .map(Ok),
        "error" => {
            let message = event.error.map(|e| e.message).unwrap_or_default();
            Some(Err(AiLlmError::Decode(format!("stream error event: {message}"))))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Anthropic,
            model: "claude-3-haiku-20240307".into(),
            endpoint: "https://api.anthropic.com/".into(),
            api_key: Some("sk-test".into()),
            max_tokens: Some(1024),
            temperature: None,
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn request_body_matches_messages_api() {
        let cfg = cfg();
        let request = ChatRequest::new(vec![ChatMessage::user("hello")], 4096).with_temperature(0.0);
        let body = serde_json::to_value(MessagesRequest::build(&cfg, &request)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "claude-3-haiku-20240307",
                "max_tokens": 1024,
                "messages": [{"role": "user", "content": "hello"}],
                "temperature": 0.0
            })
        );
    }

    #[test]
    fn first_text_block_is_used() {
        let out: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"tool_use","id":"x"},{"type":"text","text":"def f(): pass"}],"stop_reason":"end_turn"}"#,
        )
        .unwrap();
        assert_eq!(out.first_text().as_deref(), Some("def f(): pass"));

        let empty: MessagesResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert!(empty.first_text().is_none());
    }

    #[test]
    fn streaming_request_sets_flag() {
        let cfg = cfg();
        let request = ChatRequest::new(vec![ChatMessage::user("hello")], 64);
        let body = MessagesRequest {
            stream: true,
            ..MessagesRequest::build(&cfg, &request)
        };
        let body = serde_json::to_value(body).unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 64);
    }

    #[test]
    fn sse_lines_yield_text_deltas() {
        let events = [
            "event: message_start",
            r#"data: {"type":"message_start","message":{"id":"msg_1","content":[]}}"#,
            "",
            r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
            r#"data: {"type": "ping"}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"def "}}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{"}}"#,
            r#"data:{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"f(): pass"}}"#,
            r#"data: {"type":"message_stop"}"#,
        ];
        let text: Vec<String> = events.iter().filter_map(|line| sse_text(line)).map(|t| t.unwrap()).collect();
        assert_eq!(text, ["def ", "f(): pass"]);
    }

    #[test]
    fn sse_error_event_fails_the_stream() {
        let line = r#"data: {"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        match sse_text(line) {
            Some(Err(AiLlmError::Decode(msg))) => assert!(msg.contains("Overloaded")),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(sse_text("data: {not json"), Some(Err(AiLlmError::Decode(_)))));
    }

    #[test]
    fn constructor_validates_config() {
        let service = AnthropicService::new(cfg()).unwrap();
        assert_eq!(service.url_messages, "https://api.anthropic.com/v1/messages");
        assert_eq!(service.model(), "claude-3-haiku-20240307");

        let missing_key = LlmModelConfig { api_key: None, ..cfg() };
        assert!(matches!(
            AnthropicService::new(missing_key),
            Err(AiLlmError::Config(ConfigError::MissingVar(_)))
        ));

        let wrong_provider = LlmModelConfig {
            provider: LlmProvider::Ollama,
            ..cfg()
        };
        assert!(AnthropicService::new(wrong_provider).is_err());
    }
}
