use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::core::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub provider: &'static str,
    pub model: String,
    pub timestamp: String,
}

/// Liveness report; does not contact the model backend.
pub fn health(state: &AppState) -> HealthResponse {
    HealthResponse {
        status: "healthy",
        message: "Backend is running",
        provider: state.chat.provider().as_str(),
        model: state.chat.model().to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}
