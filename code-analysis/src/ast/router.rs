//! AstRouter selects a backend by language tag and never panics.
//!
//! `python` goes to the native parser; languages in [`GRAMMAR_TABLE`] go to
//! their tree-sitter grammar; everything else, and every grammar that cannot
//! be loaded or run, ends up unsupported.

use std::str::FromStr;

use tracing::{debug, warn};

use super::ast_dump::{AstDumpMode, maybe_dump_on_parse_error, maybe_dump_tree};
use super::envelope::{AstEnvelope, AstResult};
use super::grammar::{GrammarNode, parse_to_node};
use super::registry::{self, GrammarEntry};
use crate::errors::Result;
use crate::native::{self, NativeNode};
use crate::types::LanguageTag;

/// Languages with a grammar backend for AST production, in message order.
pub const GRAMMAR_TABLE: &[&str] = &["java", "javascript", "c", "cpp", "c_sharp"];

/// A parser producing one tree shape.
pub trait AstProvider {
    type Tree;

    fn parse(&self, code: &str) -> Result<Self::Tree>;
}

/// Native parser for the privileged language.
pub struct NativeAst;

impl AstProvider for NativeAst {
    type Tree = NativeNode;

    fn parse(&self, code: &str) -> Result<NativeNode> {
        Ok(native::parse_module(code)?)
    }
}

/// Tree-sitter backend for one registered grammar.
pub struct GrammarAst {
    entry: &'static GrammarEntry,
    dump_mode: AstDumpMode,
}

impl AstProvider for GrammarAst {
    type Tree = GrammarNode;

    fn parse(&self, code: &str) -> Result<GrammarNode> {
        let (tree, root) = parse_to_node(self.entry, code)?;
        maybe_dump_tree(self.dump_mode, &tree, code, self.entry.language);
        Ok(root)
    }
}

/// `"AST generation for <tag> is not available. Supported: ..."`
pub fn unsupported_message(language: &str) -> String {
    let supported: Vec<&str> = std::iter::once(LanguageTag::Python.display_name())
        .chain(GRAMMAR_TABLE.iter().filter_map(|id| {
            LanguageTag::from_str(id).ok().map(LanguageTag::display_name)
        }))
        .collect();
    format!(
        "AST generation for {language} is not available. Supported: {}.",
        supported.join(", ")
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AstRouter {
    pub dump_mode: AstDumpMode,
}

impl AstRouter {
    pub fn new(dump_mode: AstDumpMode) -> Self {
        Self { dump_mode }
    }

    pub fn route(&self, code: &str, language: &str) -> AstResult {
        let key = language.trim().to_ascii_lowercase();

        if key == LanguageTag::Python.as_str() {
            return match NativeAst.parse(code) {
                Ok(tree) => {
                    debug!(nodes = tree.count(), "native AST produced");
                    AstResult::Native(tree)
                }
                Err(e) => {
                    let error = match e {
                        crate::errors::Error::Syntax(parse) => parse.to_string(),
                        other => other.to_string(),
                    };
                    debug!(%error, "native parse failed");
                    AstResult::Failed { error }
                }
            };
        }

        let Some(entry) = GRAMMAR_TABLE
            .contains(&key.as_str())
            .then(|| registry::lookup(&key))
            .flatten()
        else {
            debug!(language, "no grammar backend for language");
            return AstResult::Unsupported {
                message: unsupported_message(language),
            };
        };

        let provider = GrammarAst {
            entry,
            dump_mode: self.dump_mode,
        };
        match provider.parse(code) {
            Ok(root) => AstResult::Grammar(root),
            Err(e) => {
                warn!(
                    language,
                    backend = entry.backend,
                    error = %e,
                    "grammar backend failed; reporting language as unsupported"
                );
                maybe_dump_on_parse_error(self.dump_mode, language, &e, code);
                AstResult::Unsupported {
                    message: unsupported_message(language),
                }
            }
        }
    }
}

/// Produces the AST envelope for `code` written in `language`.
pub fn produce_ast(code: &str, language: &str) -> AstEnvelope {
    let result = AstRouter::new(AstDumpMode::from_env()).route(code, language);
    AstEnvelope::from_result(language, result)
}
