mod cli;

use std::process::ExitCode;

use ai_llm_service::telemetry::{WORKSPACE_TARGETS, level_directive, workspace_layer};
use anyhow::Context;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables from .env file when present.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("failed to load .env");
        }
    }

    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let success = cli::run(cli.command).await?;
    Ok(if success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,code_analysis=info"));

    let level = match verbose {
        0 => None,
        1 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    };
    if let Some(level) = level {
        for target in WORKSPACE_TARGETS {
            if let Some(directive) = level_directive(target, level) {
                filter = filter.add_directive(directive);
            }
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(workspace_layer())
        .try_init()
        .context("failed to install tracing subscriber")
}
