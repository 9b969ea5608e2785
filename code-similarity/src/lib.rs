//! Code similarity scoring.
//!
//! [`score`] compares generated code against a reference with a
//! four-component CodeBLEU metric: token n-gram match, keyword-weighted
//! n-gram match, syntax-tree match and data-flow match. The metric itself
//! sits behind [`CodeSimilarity`] so callers can plug in their own.

pub mod errors;
pub mod metric;
pub mod normalize;
pub mod scorer;

pub use errors::{MetricError, ScoreError};
pub use metric::{CodeBleu, CodeSimilarity, MetricScores, SimilarityRequest};
pub use normalize::{CanonicalLanguage, normalize_language};
pub use scorer::{DEFAULT_WEIGHTS, ScoreResult, Scorer, score};
