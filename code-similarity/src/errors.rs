use thiserror::Error;

/// Rejection of a scoring request before any metric runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("{0}")]
    Validation(&'static str),
}

/// Failure inside a similarity metric.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricError {
    /// The grammar needed for syntax/dataflow matching is not compiled in.
    #[error("tree-sitter grammar for {language} is unavailable (feature `{feature}`)")]
    GrammarUnavailable {
        language: &'static str,
        feature: &'static str,
    },

    #[error("tree-sitter error: {0}")]
    TreeSitter(String),

    #[error("{predictions} predictions but {references} reference sets")]
    LengthMismatch { predictions: usize, references: usize },

    #[error("prediction {0} has no reference")]
    MissingReference(usize),
}

impl From<code_analysis::Error> for MetricError {
    fn from(e: code_analysis::Error) -> Self {
        MetricError::TreeSitter(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MetricError>;
