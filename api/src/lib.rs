//! In-process request handlers: chat, chat-code, evaluate and health.
//!
//! Every handler returns an [`AppResult`]; wrap it in [`ApiResponse`] for the
//! `{success, data?, error?}` envelope.

pub mod core;
pub mod error_handler;
pub mod routes;

pub use crate::core::app_state::AppState;
pub use crate::core::http::response_envelope::{ApiError, ApiResponse};
pub use error_handler::{AppError, AppResult};
pub use routes::chat::chat_request::{ChatBody, ChatResponse, HistoryMessage};
pub use routes::chat::chat_route::{chat, chat_stream};
pub use routes::chat_code::chat_code_route::{ChatCodeResponse, analyze_code, chat_code};
pub use routes::evaluate::evaluate_request::EvaluateRequest;
pub use routes::evaluate::evaluate_route::{evaluate, evaluate_with};
pub use routes::health_route::{HealthResponse, health};
