//! Plain chat: forwards the conversation and returns the model's reply,
//! whole or as a stream of text chunks.

use ai_llm_service::{ChatMessage, ChatRequest, ChatStream};
use tracing::{info, instrument};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::chat::chat_request::{ChatBody, ChatResponse},
};

pub const CHAT_MAX_TOKENS: u32 = 2048;
pub const MESSAGE_REQUIRED: &str = "Message is required";

#[instrument(skip_all, fields(history = body.history.len()))]
pub async fn chat(state: &AppState, body: ChatBody) -> AppResult<ChatResponse> {
    let messages = conversation(body)?;
    let response = state
        .chat
        .complete(&ChatRequest::new(messages, CHAT_MAX_TOKENS))
        .await?;
    info!(model = state.chat.model(), chars = response.len(), "chat answered");

    Ok(ChatResponse {
        response,
        success: true,
    })
}

/// Same validation and limits as [`chat`], but yields text chunks as the model
/// produces them. Errors after the stream opens arrive as stream items.
#[instrument(skip_all, fields(history = body.history.len()))]
pub async fn chat_stream(state: &AppState, body: ChatBody) -> AppResult<ChatStream> {
    let messages = conversation(body)?;
    let stream = state
        .chat
        .complete_stream(&ChatRequest::new(messages, CHAT_MAX_TOKENS))
        .await?;
    info!(model = state.chat.model(), "chat stream opened");
    Ok(stream)
}

/// Prior turns followed by the new user message.
fn conversation(body: ChatBody) -> AppResult<Vec<ChatMessage>> {
    if body.message.trim().is_empty() {
        return Err(AppError::validation(MESSAGE_REQUIRED));
    }

    let mut messages = body
        .history
        .iter()
        .map(|turn| {
            turn.to_chat_message()
                .ok_or_else(|| AppError::validation(format!("Unsupported history role: {}", turn.role)))
        })
        .collect::<AppResult<Vec<_>>>()?;
    messages.push(ChatMessage::user(body.message));
    Ok(messages)
}
