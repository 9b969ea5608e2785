use ai_llm_service::{ChatMessage, ChatRole};
use serde::{Deserialize, Serialize};

/// One prior turn as supplied by the caller; `role` is checked by the handler.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

impl HistoryMessage {
    /// `user` / `assistant` turns; `None` for anything else.
    pub fn to_chat_message(&self) -> Option<ChatMessage> {
        let role = match self.role.as_str() {
            "user" => ChatRole::User,
            "assistant" => ChatRole::Assistant,
            _ => return None,
        };
        Some(ChatMessage {
            role,
            content: self.content.clone(),
        })
    }
}

/// Request payload for chat and chat-code.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
}

/// Response payload for chat.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub success: bool,
}
