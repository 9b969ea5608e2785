//! AST production: one entry point, two backends, one envelope.

pub mod ast_dump;
pub mod envelope;
pub mod grammar;
pub mod registry;
pub mod router;

pub use ast_dump::AstDumpMode;
pub use envelope::{AstEnvelope, AstMethod, AstResult, AstTree};
pub use grammar::{GrammarNode, NodeContent, Position};
pub use router::{AstProvider, AstRouter, GRAMMAR_TABLE, produce_ast, unsupported_message};
