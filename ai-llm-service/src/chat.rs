//! Provider-neutral chat-completion contract.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::config::llm_provider::LlmProvider;
use crate::error_handler::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A single completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub system: Option<String>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>, max_tokens: u32) -> Self {
        Self {
            messages,
            max_tokens,
            temperature: None,
            system: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Text deltas of a streamed answer, in arrival order.
pub type ChatStream = BoxStream<'static, Result<String>>;

/// Sends a conversation to a model and returns the assistant's text.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String>;

    /// Streams the answer as it is generated.
    ///
    /// Backends without incremental output yield the whole completion as a
    /// single chunk.
    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream> {
        let text = self.complete(request).await?;
        Ok(stream::once(async move { Ok(text) }).boxed())
    }

    fn provider(&self) -> LlmProvider;

    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned;

    #[async_trait]
    impl ChatCompletion for Canned {
        async fn complete(&self, request: &ChatRequest) -> Result<String> {
            Ok(format!("{} turns", request.messages.len()))
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::Ollama
        }

        fn model(&self) -> &str {
            "canned"
        }
    }

    #[tokio::test]
    async fn default_stream_yields_whole_completion_once() {
        let request = ChatRequest::new(vec![ChatMessage::user("a"), ChatMessage::user("b")], 16);
        let chunks: Vec<String> = Canned
            .complete_stream(&request)
            .await
            .unwrap()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, ["2 turns"]);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn unknown_roles_are_rejected() {
        let parsed: std::result::Result<ChatMessage, _> = serde_json::from_str(r#"{"role":"system","content":"x"}"#);
        assert!(parsed.is_err());
    }
}
