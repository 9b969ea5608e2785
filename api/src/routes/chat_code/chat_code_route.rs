//! Chat-code: generate code, then classify it, pick its extension and
//! attach its syntax tree.

use ai_llm_service::{ChatMessage, ChatRequest};
use code_analysis::{AstEnvelope, ast::AstRouter, classify};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::chat::{chat_request::ChatBody, chat_route::MESSAGE_REQUIRED},
    routes::chat_code::prompt::code_request,
};

pub const CHAT_CODE_MAX_TOKENS: u32 = 4096;

/// Response payload for chat-code.
#[derive(Debug, Serialize)]
pub struct ChatCodeResponse {
    pub response: String,
    pub language: String,
    pub file_extension: &'static str,
    pub ast: AstEnvelope,
    pub success: bool,
}

/// Describes already-generated code: language, extension and AST.
pub fn analyze_code(state: &AppState, code: &str) -> ChatCodeResponse {
    let tag = classify(code);
    let result = AstRouter::new(state.ast_dump_mode).route(code, tag.as_str());
    let ast = AstEnvelope::from_result(tag.as_str(), result);
    info!(
        language = tag.as_str(),
        ast_supported = ast.supported,
        "generated code analyzed"
    );

    ChatCodeResponse {
        response: code.to_string(),
        language: tag.as_str().to_string(),
        file_extension: tag.extension(),
        ast,
        success: true,
    }
}

/// History turns with roles other than `user`/`assistant` are dropped.
#[instrument(skip_all, fields(history = body.history.len()))]
pub async fn chat_code(state: &AppState, body: ChatBody) -> AppResult<ChatCodeResponse> {
    if body.message.trim().is_empty() {
        return Err(AppError::validation(MESSAGE_REQUIRED));
    }

    let mut messages: Vec<ChatMessage> = body.history.iter().filter_map(|turn| turn.to_chat_message()).collect();
    messages.push(ChatMessage::user(code_request(&body.message)));

    let request = ChatRequest::new(messages, CHAT_CODE_MAX_TOKENS).with_temperature(0.0);
    let generated = state.chat.complete(&request).await?;

    Ok(analyze_code(state, generated.trim()))
}
