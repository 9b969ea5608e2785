use std::sync::{Arc, Mutex};

use ai_llm_service::{AiLlmError, ChatCompletion, ChatRequest, ChatRole, ChatStream, LlmProvider};
use api::{
    ApiResponse, AppError, AppState, ChatBody, EvaluateRequest, HistoryMessage, chat, chat_code, chat_stream, evaluate,
    health,
};
use async_trait::async_trait;
use futures::{StreamExt, stream};

/// Replies with a canned answer and records every request.
struct FakeChat {
    reply: Result<String, String>,
    seen: Mutex<Vec<ChatRequest>>,
}

impl FakeChat {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn last_request(&self) -> ChatRequest {
        self.seen.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ChatCompletion for FakeChat {
    async fn complete(&self, request: &ChatRequest) -> ai_llm_service::Result<String> {
        self.seen.lock().unwrap().push(request.clone());
        self.reply.clone().map_err(AiLlmError::Decode)
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Anthropic
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

/// Streams fixed chunks, optionally ending with an upstream error.
struct ChunkedChat {
    chunks: Vec<&'static str>,
    fail_after: Option<&'static str>,
}

#[async_trait]
impl ChatCompletion for ChunkedChat {
    async fn complete(&self, _request: &ChatRequest) -> ai_llm_service::Result<String> {
        Ok(self.chunks.concat())
    }

    async fn complete_stream(&self, _request: &ChatRequest) -> ai_llm_service::Result<ChatStream> {
        let mut items: Vec<ai_llm_service::Result<String>> = self.chunks.iter().map(|c| Ok(c.to_string())).collect();
        if let Some(message) = self.fail_after {
            items.push(Err(AiLlmError::Decode(message.to_string())));
        }
        Ok(stream::iter(items).boxed())
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Ollama
    }

    fn model(&self) -> &str {
        "chunked-model"
    }
}

fn body(message: &str, history: &[(&str, &str)]) -> ChatBody {
    ChatBody {
        message: message.to_string(),
        history: history
            .iter()
            .map(|(role, content)| HistoryMessage {
                role: role.to_string(),
                content: content.to_string(),
            })
            .collect(),
    }
}

#[tokio::test]
async fn chat_forwards_history_and_message() {
    let fake = FakeChat::replying("Hello there");
    let state = AppState::new(fake.clone());

    let out = chat(&state, body("How are you?", &[("user", "hi"), ("assistant", "hey")]))
        .await
        .unwrap();
    assert_eq!(out.response, "Hello there");
    assert!(out.success);

    let request = fake.last_request();
    assert_eq!(request.max_tokens, 2048);
    assert_eq!(request.messages.len(), 3);
    assert_eq!(request.messages[2].role, ChatRole::User);
    assert_eq!(request.messages[2].content, "How are you?");
}

#[tokio::test]
async fn empty_message_is_rejected_before_calling_the_model() {
    let fake = FakeChat::replying("unused");
    let state = AppState::new(fake.clone());

    for message in ["", "   "] {
        let err = chat(&state, body(message, &[])).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Message is required"));
        let err = chat_code(&state, body(message, &[])).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }
    assert!(fake.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn chat_rejects_unknown_history_roles() {
    let state = AppState::new(FakeChat::replying("x"));
    let err = chat(&state, body("hi", &[("system", "be nice")])).await.unwrap_err();
    assert_eq!(err.to_string(), "Unsupported history role: system");
}

#[tokio::test]
async fn upstream_failure_keeps_raw_message() {
    let state = AppState::new(FakeChat::failing("bad gateway"));
    let err = chat(&state, body("hi", &[])).await.unwrap_err();
    assert_eq!(err.error_code(), "UPSTREAM_ERROR");
    assert!(err.to_string().contains("bad gateway"));

    let envelope: ApiResponse<api::ChatResponse> = Err::<api::ChatResponse, _>(err).into();
    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn chat_code_pipeline_classifies_and_parses() {
    let fake = FakeChat::replying("\n\ndef add(a, b):\n    return a + b\n\n");
    let state = AppState::new(fake.clone());

    let out = chat_code(
        &state,
        body("python add function", &[("user", "earlier"), ("system", "dropped"), ("assistant", "ok")]),
    )
    .await
    .unwrap();

    assert_eq!(out.response, "def add(a, b):\n    return a + b");
    assert_eq!(out.language, "python");
    assert_eq!(out.file_extension, ".py");
    assert!(out.ast.supported);

    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["ast"]["method"], "native");
    assert_eq!(json["ast"]["ast"]["body"][0]["type"], "FunctionDef");

    let request = fake.last_request();
    assert_eq!(request.max_tokens, 4096);
    assert_eq!(request.temperature, Some(0.0));
    assert_eq!(request.messages.len(), 3);
    assert!(request.messages[2].content.ends_with("User request: python add function"));
}

#[test]
fn evaluate_validates_and_scores() {
    let request = EvaluateRequest {
        generated_code: "   ".into(),
        reference_code: "x = 1".into(),
        language: "python".into(),
    };
    let err = evaluate(&request).unwrap_err();
    assert_eq!(err.to_string(), "Code cannot be empty after stripping whitespace");

    let parsed: EvaluateRequest =
        serde_json::from_str(r#"{"generated_code":"x = 1","reference_code":"x = 1"}"#).unwrap();
    assert_eq!(parsed.language, "python");
}

#[test]
fn health_reports_backend() {
    let state = AppState::new(FakeChat::replying("x"));
    let report = health(&state);
    assert_eq!(report.status, "healthy");
    assert_eq!(report.provider, "anthropic");
    assert_eq!(report.model, "fake-model");
}

#[tokio::test]
async fn chat_stream_yields_chunks_in_order() {
    let state = AppState::new(Arc::new(ChunkedChat {
        chunks: vec!["Hel", "lo", " there"],
        fail_after: None,
    }));
    let chunks: Vec<String> = chat_stream(&state, body("hi", &[("user", "a"), ("assistant", "b")]))
        .await
        .unwrap()
        .map(|chunk| chunk.unwrap())
        .collect()
        .await;
    assert_eq!(chunks, ["Hel", "lo", " there"]);
}

#[tokio::test]
async fn chat_stream_surfaces_mid_stream_failure() {
    let state = AppState::new(Arc::new(ChunkedChat {
        chunks: vec!["partial"],
        fail_after: Some("connection reset"),
    }));
    let items: Vec<_> = chat_stream(&state, body("hi", &[])).await.unwrap().collect().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_deref().unwrap(), "partial");
    let err = AppError::from(items.into_iter().nth(1).unwrap().unwrap_err());
    assert_eq!(err.error_code(), "UPSTREAM_ERROR");
}

#[tokio::test]
async fn chat_stream_falls_back_to_one_chunk_and_validates() {
    let fake = FakeChat::replying("whole answer");
    let state = AppState::new(fake.clone());

    let chunks: Vec<String> = chat_stream(&state, body("hi", &[]))
        .await
        .unwrap()
        .map(|chunk| chunk.unwrap())
        .collect()
        .await;
    assert_eq!(chunks, ["whole answer"]);
    assert_eq!(fake.last_request().max_tokens, 2048);

    let err = chat_stream(&state, body("  ", &[])).await.err().unwrap();
    assert!(matches!(err, AppError::Validation(ref m) if m == "Message is required"));
    let err = chat_stream(&state, body("hi", &[("tool", "x")])).await.err().unwrap();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
    assert_eq!(fake.seen.lock().unwrap().len(), 1);
}
