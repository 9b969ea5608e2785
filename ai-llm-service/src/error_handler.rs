//! Unified error handling for `ai-llm-service`.
//!
//! [`AiLlmError`] is the single error type of the crate; configuration problems
//! are grouped in [`ConfigError`]. Helpers for reading environment variables
//! return the unified [`Result<T>`] alias.
//!
//! All messages include the suffix `[AI LLM Service]` to simplify attribution in logs.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::llm_provider::LlmProvider;

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, AiLlmError>;

/// Source of variables; `std::env` in production, a map in tests.
pub type VarLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AiLlmError {
    /// Configuration/validation errors (startup).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Underlying HTTP transport error (e.g., `reqwest::Error`).
    #[error("[AI LLM Service] transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),

    /// Upstream returned a non-successful HTTP status.
    #[error("[AI LLM Service] HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        /// Short snippet of the response body (trimmed).
        snippet: String,
    },

    /// Response payload could not be decoded as expected.
    #[error("[AI LLM Service] decode error: {0}")]
    Decode(String),

    /// Upstream answered without any text content.
    #[error("[AI LLM Service] {0} returned no text content")]
    EmptyContent(LlmProvider),

    /// Operation exceeded the configured timeout.
    #[error("[AI LLM Service] operation timed out after {0:?}")]
    Timeout(Duration),
}

impl AiLlmError {
    /// Classifies a `reqwest` failure, surfacing timeouts separately.
    pub fn from_transport(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            AiLlmError::Timeout(timeout)
        } else {
            AiLlmError::HttpTransport(error)
        }
    }
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

/// Errors that realistically happen at config load/validation time.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("[AI LLM Service] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (like ports, limits, timeouts).
    #[error("[AI LLM Service] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `LLM_MAX_TOKENS`, `OLLAMA_PORT`).
        var: &'static str,
        /// Human-readable reason (e.g., `expected u32`).
        reason: &'static str,
    },

    /// Unsupported provider in `LLM_KIND`.
    #[error("[AI LLM Service] unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[AI LLM Service] invalid format in {var}: {reason}")]
    InvalidFormat {
        var: &'static str,
        reason: &'static str,
    },
}

/* ------------------------------------------------------------------------- */
/* Env helpers                                                               */
/* ------------------------------------------------------------------------- */

pub(crate) fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Non-empty value of `name` from `lookup`.
pub fn var_opt(lookup: VarLookup<'_>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.trim().is_empty())
}

/// Required, non-empty variable from `lookup`.
pub fn must_var(lookup: VarLookup<'_>, name: &'static str) -> Result<String> {
    var_opt(lookup, name).ok_or_else(|| ConfigError::MissingVar(name).into())
}

pub fn var_opt_u32(lookup: VarLookup<'_>, name: &'static str) -> Result<Option<u32>> {
    var_opt(lookup, name)
        .map(|v| {
            v.trim().parse::<u32>().map_err(|_| {
                AiLlmError::from(ConfigError::InvalidNumber {
                    var: name,
                    reason: "expected u32",
                })
            })
        })
        .transpose()
}

pub fn var_opt_f32(lookup: VarLookup<'_>, name: &'static str) -> Result<Option<f32>> {
    var_opt(lookup, name)
        .map(|v| match v.trim().parse::<f32>() {
            Ok(n) if n.is_finite() => Ok(n),
            _ => Err(AiLlmError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected a finite f32",
            })),
        })
        .transpose()
}

/// Fetches a required, non-empty environment variable.
///
/// # Errors
/// Returns [`AiLlmError::Config`] with [`ConfigError::MissingVar`] if the
/// variable is absent or empty.
pub fn must_env(name: &'static str) -> Result<String> {
    must_var(&process_env, name)
}

/// Parses an optional `u32` from env (`Ok(None)` if unset/empty).
pub fn env_opt_u32(name: &'static str) -> Result<Option<u32>> {
    var_opt_u32(&process_env, name)
}

/// Parses an optional `f32` from env (`Ok(None)` if unset/empty).
pub fn env_opt_f32(name: &'static str) -> Result<Option<f32>> {
    var_opt_f32(&process_env, name)
}

/* ------------------------------------------------------------------------- */
/* Validation helpers                                                        */
/* ------------------------------------------------------------------------- */

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    let value = value.trim();
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        }
        .into())
    }
}

/// First 240 characters of an upstream body, for error messages.
pub fn make_snippet(body: &str) -> String {
    body.trim().chars().take(240).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn blank_values_count_as_missing() {
        let map = vars(&[("A", "  ")]);
        let lookup = |name: &str| map.get(name).cloned();
        assert!(matches!(
            must_var(&lookup, "A"),
            Err(AiLlmError::Config(ConfigError::MissingVar("A")))
        ));
        assert_eq!(var_opt_u32(&lookup, "A").unwrap(), None);
    }

    #[test]
    fn numbers_are_parsed_or_rejected() {
        let map = vars(&[("N", " 512 "), ("T", "0.5"), ("BAD", "lots")]);
        let lookup = |name: &str| map.get(name).cloned();
        assert_eq!(var_opt_u32(&lookup, "N").unwrap(), Some(512));
        assert_eq!(var_opt_f32(&lookup, "T").unwrap(), Some(0.5));
        assert!(matches!(
            var_opt_u32(&lookup, "BAD"),
            Err(AiLlmError::Config(ConfigError::InvalidNumber { var: "BAD", .. }))
        ));
    }

    #[test]
    fn endpoint_scheme_is_checked() {
        assert!(validate_http_endpoint("URL", "https://api.anthropic.com").is_ok());
        assert!(validate_http_endpoint("URL", "api.anthropic.com").is_err());
    }

    #[test]
    fn snippet_is_bounded() {
        assert_eq!(make_snippet(&"x".repeat(1000)).len(), 240);
        assert_eq!(make_snippet("  short \n"), "short");
    }
}
