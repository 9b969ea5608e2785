use thiserror::Error;

use crate::native::ParseError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(#[from] ParseError),

    #[error("grammar backend `{backend}` is not available")]
    GrammarUnavailable { backend: &'static str },

    #[error("tree-sitter language error for `{backend}`")]
    TreeSitterLanguage { backend: &'static str },

    #[error("tree-sitter parse error")]
    TreeSitterParse,

    #[error("syntax tree nests {depth} levels deep, limit is {limit}")]
    TreeTooDeep { depth: usize, limit: usize },

    #[error("language guess failed: {0}")]
    Guess(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
