use std::io::{self, IsTerminal};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, filter, fmt};

/// Crate target prefix used to filter only library-originated logs.
pub const TARGET_PREFIX: &str = "ai_llm_service";

/// Targets of every workspace crate, for [`workspace_layer`].
pub const WORKSPACE_TARGETS: &[&str] = &[
    "code_lab",
    "api",
    TARGET_PREFIX,
    "code_analysis",
    "code_similarity",
];

/// RFC3339 UTC timer, e.g. `2025-09-12T10:20:30Z`.
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        w.write_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

/// Compact formatting layer that renders only events whose target starts
/// with one of `prefixes`.
///
/// - RFC3339 UTC timestamps
/// - `file:line` and target (module path)
/// - span close events, so instrumented calls report their duration
/// - ANSI colors only when stderr is a terminal
pub fn layer_for<S>(prefixes: &'static [&'static str]) -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = io::stderr().is_terminal();
    let only_prefixes = filter::filter_fn(move |meta| prefixes.iter().any(|p| meta.target().starts_with(p)));

    fmt::layer()
        .with_writer(io::stderr)
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(use_ansi)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .event_format(fmt::format().compact().with_source_location(true))
        .with_filter(only_prefixes)
}

/// Layer for this crate's events only.
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    layer_for(&[TARGET_PREFIX])
}

/// Layer for events of all workspace crates.
pub fn workspace_layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    layer_for(WORKSPACE_TARGETS)
}

/// Level directive for one target, e.g. `code_analysis=debug`.
pub fn level_directive(target: &str, level: Level) -> Option<Directive> {
    Directive::from_str(&format!("{target}={}", level.as_str().to_lowercase())).ok()
}

/// EnvFilter from `RUST_LOG`, or `default` when unset, with `level`
/// applied to this library.
pub fn env_filter_with_level(default: &str, level: Level) -> EnvFilter {
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    match level_directive(TARGET_PREFIX, level) {
        Some(directive) => base.add_directive(directive),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_targets_one_crate() {
        let directive = level_directive("code_analysis", Level::DEBUG).unwrap();
        assert_eq!(directive.to_string(), "code_analysis=debug");
    }
}
