use ai_llm_service::AiLlmError;
use code_similarity::ScoreError;
use thiserror::Error;

use crate::core::http::response_envelope::ApiResponse;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("configuration error: {0}")]
    Config(String),

    // --- Request ---
    #[error("{0}")]
    Validation(String),

    // --- Upstream model ---
    /// Carries the raw upstream message.
    #[error("{0}")]
    Upstream(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /// Stable, machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
        }
    }

    /// HTTP-equivalent status, for callers that expose one.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 400,
            AppError::Upstream(_) => 502,
            AppError::Config(_) => 500,
        }
    }

    pub fn into_response<T: serde::Serialize>(self) -> ApiResponse<T> {
        ApiResponse::error(self.error_code(), self.to_string())
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<AiLlmError> for AppError {
    fn from(err: AiLlmError) -> Self {
        match err {
            AiLlmError::Config(e) => AppError::Config(e.to_string()),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<ScoreError> for AppError {
    fn from(err: ScoreError) -> Self {
        match err {
            ScoreError::Validation(message) => AppError::Validation(message.to_string()),
        }
    }
}
