//! CodeBLEU evaluation of generated code against a reference.

use code_similarity::{ScoreResult, Scorer};
use tracing::{debug, instrument};

use crate::{error_handler::AppResult, routes::evaluate::evaluate_request::EvaluateRequest};

/// Metric failures come back as `success: false` results, not errors.
#[instrument(skip_all, fields(language = %body.language))]
pub fn evaluate(body: &EvaluateRequest) -> AppResult<ScoreResult> {
    evaluate_with(&Scorer::default(), body)
}

pub fn evaluate_with<M: code_similarity::CodeSimilarity>(
    scorer: &Scorer<M>,
    body: &EvaluateRequest,
) -> AppResult<ScoreResult> {
    debug!(
        generated_len = body.generated_code.len(),
        reference_len = body.reference_code.len(),
        "evaluating"
    );
    Ok(scorer.score(&body.generated_code, &body.reference_code, &body.language)?)
}
