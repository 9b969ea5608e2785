use std::sync::Arc;

use ai_llm_service::{ChatCompletion, config_from_env, services::chat_service};
use code_analysis::ast::AstDumpMode;

use crate::error_handler::AppResult;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Chat backend selected by `LLM_KIND`.
    pub chat: Arc<dyn ChatCompletion>,
    /// Grammar-tree diagnostics for generated code.
    pub ast_dump_mode: AstDumpMode,
}

impl AppState {
    pub fn new(chat: Arc<dyn ChatCompletion>) -> Self {
        Self {
            chat,
            ast_dump_mode: AstDumpMode::default(),
        }
    }

    /// Load shared state from environment variables.
    pub fn from_env() -> AppResult<Self> {
        let chat = chat_service(config_from_env()?)?;
        Ok(Self {
            chat,
            ast_dump_mode: AstDumpMode::from_env(),
        })
    }
}
