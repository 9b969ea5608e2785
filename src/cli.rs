use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use api::{
    ApiResponse, AppError, AppResult, AppState, ChatBody, EvaluateRequest, HistoryMessage, chat, chat_code, chat_stream,
    evaluate, health,
};
use clap::{Args, Parser, Subcommand};
use code_analysis::ast::{AstDumpMode, AstRouter};
use code_analysis::{AstEnvelope, classify, extension_for};
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, info};

/// Classify, parse, score and generate code from the command line.
///
/// Every command prints one `{success, data?, error?}` JSON envelope on stdout,
/// except `chat --stream`, which prints the answer as it arrives. Logs go to
/// stderr.
#[derive(Debug, Parser)]
#[command(name = "code-lab", version)]
pub struct Cli {
    /// Raise workspace log level (`-v` debug, `-vv` trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Guess the language of a snippet and its file extension.
    Detect {
        /// Source file; stdin when omitted or `-`.
        input: Option<PathBuf>,
    },
    /// Produce the AST envelope for a snippet.
    Ast {
        /// Source file; stdin when omitted or `-`.
        input: Option<PathBuf>,
        /// Language tag; guessed from the code when omitted.
        #[arg(short, long)]
        language: Option<String>,
    },
    /// CodeBLEU of generated code against a reference.
    Score {
        generated: PathBuf,
        reference: PathBuf,
        #[arg(short, long, default_value = "python")]
        language: String,
    },
    /// Free-form chat with the configured model.
    Chat {
        #[command(flatten)]
        args: ChatArgs,
        /// Print the answer as it is generated instead of one envelope.
        #[arg(long)]
        stream: bool,
    },
    /// Generate code, then describe its language, extension and AST.
    ChatCode(ChatArgs),
    /// Report the configured chat backend.
    Health,
}

#[derive(Debug, Args)]
pub struct ChatArgs {
    pub message: String,

    /// JSON file with prior turns, e.g. `[{"role": "user", "content": "hi"}]`.
    #[arg(long)]
    pub history: Option<PathBuf>,
}

/// Payload of `detect`.
#[derive(Debug, Serialize)]
pub struct Detection {
    pub language: &'static str,
    pub file_extension: &'static str,
}

/// Runs one command and prints its envelope. Returns the envelope's `success`.
pub async fn run(command: Command) -> anyhow::Result<bool> {
    match command {
        Command::Detect { input } => {
            let code = read_input(input.as_deref())?;
            emit(Ok(detect(&code)))
        }
        Command::Ast { input, language } => {
            let code = read_input(input.as_deref())?;
            emit(Ok(ast(&code, language.as_deref())))
        }
        Command::Score {
            generated,
            reference,
            language,
        } => {
            let body = EvaluateRequest {
                generated_code: read_input(Some(&generated))?,
                reference_code: read_input(Some(&reference))?,
                language,
            };
            emit(evaluate(&body))
        }
        Command::Chat { args, stream } => {
            let body = chat_body(args)?;
            match AppState::from_env() {
                Ok(state) if stream => stream_chat(&state, body, &mut std::io::stdout()).await,
                Ok(state) => emit(chat(&state, body).await),
                Err(e) => emit::<()>(Err(e)),
            }
        }
        Command::ChatCode(args) => {
            let body = chat_body(args)?;
            match AppState::from_env() {
                Ok(state) => emit(chat_code(&state, body).await),
                Err(e) => emit::<()>(Err(e)),
            }
        }
        Command::Health => match AppState::from_env() {
            Ok(state) => emit(Ok(health(&state))),
            Err(e) => emit::<()>(Err(e)),
        },
    }
}

pub fn detect(code: &str) -> Detection {
    let tag = classify(code);
    Detection {
        language: tag.as_str(),
        file_extension: extension_for(tag.as_str()),
    }
}

pub fn ast(code: &str, language: Option<&str>) -> AstEnvelope {
    let language = match language {
        Some(tag) => tag.trim().to_ascii_lowercase(),
        None => classify(code).as_str().to_string(),
    };
    debug!(%language, "producing AST");
    let result = AstRouter::new(AstDumpMode::from_env()).route(code, &language);
    AstEnvelope::from_result(&language, result)
}

/// Writes chunks to `out` as they arrive. A failure before the first chunk
/// prints the usual error envelope; a later one ends the line and is reported
/// on stderr.
async fn stream_chat(state: &AppState, body: ChatBody, out: &mut impl Write) -> anyhow::Result<bool> {
    let mut chunks = match chat_stream(state, body).await {
        Ok(chunks) => chunks,
        Err(e) => return emit::<()>(Err(e)),
    };
    let mut written = 0usize;
    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(text) => {
                out.write_all(text.as_bytes())?;
                out.flush()?;
                written += text.len();
            }
            Err(e) => {
                let err = AppError::from(e);
                if written == 0 {
                    return emit::<()>(Err(err));
                }
                writeln!(out)?;
                eprintln!("stream interrupted: {err}");
                return Ok(false);
            }
        }
    }
    writeln!(out)?;
    info!(bytes = written, "chat stream finished");
    Ok(true)
}

fn chat_body(args: ChatArgs) -> anyhow::Result<ChatBody> {
    let history = match args.history.as_deref() {
        Some(path) => {
            let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            parse_history(&raw).with_context(|| format!("invalid history in {}", path.display()))?
        }
        None => Vec::new(),
    };
    info!(history = history.len(), "chat request prepared");
    Ok(ChatBody {
        message: args.message,
        history,
    })
}

pub fn parse_history(raw: &str) -> anyhow::Result<Vec<HistoryMessage>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

/// Reads a file, or stdin for `None` and `-`.
fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(p) if p != Path::new("-") => {
            std::fs::read_to_string(p).with_context(|| format!("failed to read {}", p.display()))
        }
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn emit<T: Serialize>(result: AppResult<T>) -> anyhow::Result<bool> {
    let envelope: ApiResponse<T> = result.into();
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(envelope.success)
}
