//! Chat backend config loaded from environment variables.
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND` = `anthropic` (default) or `ollama`
//! - `LLM_MAX_TOKENS` = optional cap on generated tokens (u32)
//! - `LLM_TEMPERATURE` = optional default temperature (f32)
//! - `LLM_TIMEOUT_SECS` = optional request timeout (u32, default 60)
//!
//! Anthropic:
//! - `ANTHROPIC_API_KEY` (mandatory)
//! - `ANTHROPIC_URL` (default `https://api.anthropic.com`)
//! - `ANTHROPIC_MODEL` (default `claude-3-haiku-20240307`)
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//! - `OLLAMA_MODEL` (mandatory)

use std::str::FromStr;

use tracing::info;

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, VarLookup, must_var, process_env, validate_http_endpoint, var_opt,
        var_opt_f32, var_opt_u32,
    },
};

pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";

/// Resolves the Ollama endpoint.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint(lookup: VarLookup<'_>) -> Result<String, AiLlmError> {
    if let Some(url) = var_opt(lookup, "OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = var_opt(lookup, "OLLAMA_PORT") {
        let port = port.trim().parse::<u16>().map_err(|_| ConfigError::InvalidNumber {
            var: "OLLAMA_PORT",
            reason: "expected u16 (1..=65535)",
        })?;
        return Ok(format!("http://localhost:{port}"));
    }
    Err(AiLlmError::Config(ConfigError::MissingVar("OLLAMA_URL or OLLAMA_PORT")))
}

fn common(lookup: VarLookup<'_>) -> Result<(Option<u32>, Option<f32>, Option<u64>), AiLlmError> {
    Ok((
        var_opt_u32(lookup, "LLM_MAX_TOKENS")?,
        var_opt_f32(lookup, "LLM_TEMPERATURE")?,
        var_opt_u32(lookup, "LLM_TIMEOUT_SECS")?.map(u64::from),
    ))
}

pub fn config_anthropic(lookup: VarLookup<'_>) -> Result<LlmModelConfig, AiLlmError> {
    let api_key = must_var(lookup, "ANTHROPIC_API_KEY")?;
    let endpoint = var_opt(lookup, "ANTHROPIC_URL").unwrap_or_else(|| DEFAULT_ANTHROPIC_URL.to_string());
    validate_http_endpoint("ANTHROPIC_URL", &endpoint)?;
    let model = var_opt(lookup, "ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());
    let (max_tokens, temperature, timeout_secs) = common(lookup)?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Anthropic,
        model,
        endpoint,
        api_key: Some(api_key),
        max_tokens,
        temperature,
        timeout_secs,
    })
}

pub fn config_ollama(lookup: VarLookup<'_>) -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = ollama_endpoint(lookup)?;
    let model = must_var(lookup, "OLLAMA_MODEL")?;
    let (max_tokens, temperature, timeout_secs) = common(lookup)?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint,
        api_key: None,
        max_tokens,
        temperature,
        timeout_secs: timeout_secs.or(Some(600)),
    })
}

/// Config for the provider named by `LLM_KIND`, read through `lookup`.
pub fn config_from(lookup: VarLookup<'_>) -> Result<LlmModelConfig, AiLlmError> {
    let provider = match var_opt(lookup, "LLM_KIND") {
        Some(kind) => LlmProvider::from_str(&kind)?,
        None => LlmProvider::default(),
    };
    let cfg = match provider {
        LlmProvider::Anthropic => config_anthropic(lookup)?,
        LlmProvider::Ollama => config_ollama(lookup)?,
    };
    info!(
        provider = %cfg.provider,
        model = %cfg.model,
        endpoint = %cfg.endpoint,
        "chat backend configured"
    );
    Ok(cfg)
}

/// Config for the provider named by `LLM_KIND`, read from the process environment.
pub fn config_from_env() -> Result<LlmModelConfig, AiLlmError> {
    config_from(&process_env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<LlmModelConfig, AiLlmError> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        config_from(&|name: &str| map.get(name).cloned())
    }

    #[test]
    fn anthropic_is_the_default_provider() {
        let cfg = load(&[("ANTHROPIC_API_KEY", "sk-test")]).unwrap();
        assert_eq!(cfg.provider, LlmProvider::Anthropic);
        assert_eq!(cfg.endpoint, DEFAULT_ANTHROPIC_URL);
        assert_eq!(cfg.model, DEFAULT_ANTHROPIC_MODEL);
        assert_eq!(cfg.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn anthropic_requires_api_key() {
        let err = load(&[("LLM_KIND", "anthropic")]).unwrap_err();
        assert!(matches!(err, AiLlmError::Config(ConfigError::MissingVar("ANTHROPIC_API_KEY"))));
    }

    #[test]
    fn ollama_endpoint_from_port() {
        let cfg = load(&[("LLM_KIND", "Ollama"), ("OLLAMA_PORT", "11434"), ("OLLAMA_MODEL", "llama3")]).unwrap();
        assert_eq!(cfg.provider, LlmProvider::Ollama);
        assert_eq!(cfg.endpoint, "http://localhost:11434");
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn ollama_url_wins_over_port() {
        let cfg = load(&[
            ("LLM_KIND", "ollama"),
            ("OLLAMA_URL", "http://gpu-box:11434"),
            ("OLLAMA_PORT", "1"),
            ("OLLAMA_MODEL", "llama3"),
        ])
        .unwrap();
        assert_eq!(cfg.endpoint, "http://gpu-box:11434");
    }

    #[test]
    fn shared_limits_are_read() {
        let cfg = load(&[
            ("ANTHROPIC_API_KEY", "k"),
            ("LLM_MAX_TOKENS", "1000"),
            ("LLM_TEMPERATURE", "0.3"),
            ("LLM_TIMEOUT_SECS", "15"),
        ])
        .unwrap();
        assert_eq!(cfg.max_tokens, Some(1000));
        assert_eq!(cfg.temperature, Some(0.3));
        assert_eq!(cfg.timeout_secs, Some(15));
        assert_eq!(cfg.effective_max_tokens(4096), 1000);
        assert_eq!(cfg.effective_max_tokens(512), 512);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = load(&[("LLM_KIND", "chatgpt")]).unwrap_err();
        assert!(matches!(err, AiLlmError::Config(ConfigError::UnsupportedProvider(p)) if p == "chatgpt"));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = load(&[("LLM_KIND", "ollama"), ("OLLAMA_PORT", "99999"), ("OLLAMA_MODEL", "m")]).unwrap_err();
        assert!(matches!(err, AiLlmError::Config(ConfigError::InvalidNumber { var: "OLLAMA_PORT", .. })));
    }
}
