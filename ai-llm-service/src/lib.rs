//! Chat-completion client shared by the request handlers.
//!
//! ```no_run
//! use ai_llm_service::{ChatMessage, ChatRequest, config_from_env, services::chat_service};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let chat = chat_service(config_from_env()?)?;
//! let answer = chat
//!     .complete(&ChatRequest::new(vec![ChatMessage::user("Say hi")], 256))
//!     .await?;
//! println!("{answer}");
//! # Ok(()) }
//! ```

pub mod chat;
pub mod config;
pub mod error_handler;
pub mod services;
pub mod telemetry;

pub use chat::{ChatCompletion, ChatMessage, ChatRequest, ChatRole, ChatStream};
pub use config::default_config::config_from_env;
pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::{AiLlmError, ConfigError, Result};
