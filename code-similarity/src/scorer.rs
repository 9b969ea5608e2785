//! Scores generated code against a reference solution.

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::{MetricError, ScoreError};
use crate::metric::{CodeBleu, CodeSimilarity, MetricScores, SimilarityRequest};
use crate::normalize::{CanonicalLanguage, normalize_language};

/// Equal weight for n-gram, weighted n-gram, syntax and dataflow match.
pub const DEFAULT_WEIGHTS: [f64; 4] = [0.25, 0.25, 0.25, 0.25];

pub const MISSING_INPUT: &str = "Both generated and reference code are required";
pub const BLANK_INPUT: &str = "Code cannot be empty after stripping whitespace";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub codebleu_score: f64,
    pub ngram_match_score: f64,
    pub weighted_ngram_match_score: f64,
    pub syntax_match_score: f64,
    pub dataflow_match_score: f64,
    pub language_used: CanonicalLanguage,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ScoreResult {
    fn scored(scores: MetricScores, language_used: CanonicalLanguage) -> Self {
        Self {
            codebleu_score: scores.codebleu,
            ngram_match_score: scores.ngram_match_score,
            weighted_ngram_match_score: scores.weighted_ngram_match_score,
            syntax_match_score: scores.syntax_match_score,
            dataflow_match_score: scores.dataflow_match_score,
            language_used,
            success: true,
            message: None,
        }
    }

    /// All scores zeroed, with the reason.
    fn degraded(language_used: CanonicalLanguage, message: String) -> Self {
        Self {
            language_used,
            success: false,
            message: Some(message),
            ..Self::scored(MetricScores::default(), language_used)
        }
    }
}

fn degraded_message(error: &MetricError) -> String {
    match error {
        MetricError::GrammarUnavailable { language, feature } => {
            format!("Tree-sitter parser for {language} not properly installed. Enable the `{feature}` feature.")
        }
        other => format!("Error calculating CodeBLEU: {other}. Using simpler metrics instead."),
    }
}

/// Similarity scorer over a pluggable [`CodeSimilarity`] function.
#[derive(Debug, Clone)]
pub struct Scorer<M = CodeBleu> {
    metric: M,
    weights: [f64; 4],
}

impl Default for Scorer<CodeBleu> {
    fn default() -> Self {
        Self::new(CodeBleu)
    }
}

impl<M: CodeSimilarity> Scorer<M> {
    pub fn new(metric: M) -> Self {
        Self {
            metric,
            weights: DEFAULT_WEIGHTS,
        }
    }

    pub fn with_weights(mut self, weights: [f64; 4]) -> Self {
        self.weights = weights;
        self
    }

    /// Validates and trims both inputs, then runs the metric. Metric
    /// failures are reported inside the result, never as an `Err`.
    pub fn score(&self, generated: &str, reference: &str, language: &str) -> Result<ScoreResult, ScoreError> {
        if generated.is_empty() || reference.is_empty() {
            return Err(ScoreError::Validation(MISSING_INPUT));
        }
        let (generated, reference) = (generated.trim(), reference.trim());
        if generated.is_empty() || reference.is_empty() {
            return Err(ScoreError::Validation(BLANK_INPUT));
        }

        let lang = normalize_language(language);
        info!(requested = language, language = %lang, "scoring generated code");

        let references = [vec![reference.to_string()]];
        let predictions = [generated.to_string()];
        let request = SimilarityRequest {
            references: &references,
            predictions: &predictions,
            lang,
            weights: self.weights,
            tokenizer: None,
        };

        match self.metric.calc(&request) {
            Ok(scores) => {
                info!(language = %lang, codebleu = scores.codebleu, "similarity computed");
                Ok(ScoreResult::scored(scores, lang))
            }
            Err(e) => {
                warn!(language = %lang, error = %e, "similarity metric failed; returning zero scores");
                Ok(ScoreResult::degraded(lang, degraded_message(&e)))
            }
        }
    }
}

/// Scores with the built-in CodeBLEU engine and default weights.
pub fn score(generated: &str, reference: &str, language: &str) -> Result<ScoreResult, ScoreError> {
    Scorer::default().score(generated, reference, language)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct Fixed(MetricScores);

    impl CodeSimilarity for Fixed {
        fn calc(&self, _request: &SimilarityRequest<'_>) -> crate::errors::Result<MetricScores> {
            Ok(self.0)
        }
    }

    struct Recording(std::sync::Mutex<Vec<(String, String, CanonicalLanguage)>>);

    impl CodeSimilarity for Recording {
        fn calc(&self, request: &SimilarityRequest<'_>) -> crate::errors::Result<MetricScores> {
            self.0.lock().unwrap().push((
                request.predictions[0].clone(),
                request.references[0][0].clone(),
                request.lang,
            ));
            Ok(MetricScores::default())
        }
    }

    #[rstest]
    #[case("", "x = 1", MISSING_INPUT)]
    #[case("x = 1", "", MISSING_INPUT)]
    #[case("  \n", "x = 1", BLANK_INPUT)]
    #[case("x = 1", "\t", BLANK_INPUT)]
    fn rejects_empty_inputs(#[case] generated: &str, #[case] reference: &str, #[case] message: &'static str) {
        let err = Scorer::new(Fixed(MetricScores::default()))
            .score(generated, reference, "python")
            .unwrap_err();
        assert_eq!(err, ScoreError::Validation(message));
    }

    #[test]
    fn inputs_are_trimmed_and_language_normalized() {
        let scorer = Scorer::new(Recording(Default::default()));
        scorer.score("  x = 1\n", "\ny = 2  ", "C++").unwrap();
        let calls = scorer.metric.0.lock().unwrap();
        assert_eq!(calls[0], ("x = 1".to_string(), "y = 2".to_string(), CanonicalLanguage::Cpp));
    }

    #[test]
    fn metric_scores_pass_through() {
        let scores = MetricScores {
            codebleu: 0.5,
            ngram_match_score: 0.4,
            weighted_ngram_match_score: 0.3,
            syntax_match_score: 0.6,
            dataflow_match_score: 0.7,
        };
        let result = Scorer::new(Fixed(scores)).score("a", "b", "java").unwrap();
        assert!(result.success);
        assert_eq!(result.codebleu_score, 0.5);
        assert_eq!(result.dataflow_match_score, 0.7);
        assert_eq!(result.language_used, CanonicalLanguage::Java);
        assert!(result.message.is_none());
    }

    #[test]
    fn missing_grammar_message_names_feature() {
        let message = degraded_message(&MetricError::GrammarUnavailable {
            language: "c_sharp",
            feature: "lang-csharp",
        });
        assert_eq!(
            message,
            "Tree-sitter parser for c_sharp not properly installed. Enable the `lang-csharp` feature."
        );
    }
}
