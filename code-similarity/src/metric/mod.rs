//! Similarity metric contract and the built-in CodeBLEU engine.

pub mod bleu;
pub mod dataflow;
pub mod keywords;
pub mod syntax;
pub mod tokenize;
pub mod weighted;

use code_analysis::ast::registry::{self, GrammarEntry};
use serde::Serialize;
use tracing::debug;

use crate::errors::{MetricError, Result};
use crate::normalize::CanonicalLanguage;
use tokenize::{Tokenizer, whitespace_tokens};

/// Inputs of one metric evaluation. `references[i]` holds the accepted
/// answers for `predictions[i]`.
pub struct SimilarityRequest<'a> {
    pub references: &'a [Vec<String>],
    pub predictions: &'a [String],
    pub lang: CanonicalLanguage,
    /// Component weights: n-gram, weighted n-gram, syntax, dataflow.
    pub weights: [f64; 4],
    pub tokenizer: Option<Tokenizer<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricScores {
    pub codebleu: f64,
    pub ngram_match_score: f64,
    pub weighted_ngram_match_score: f64,
    pub syntax_match_score: f64,
    pub dataflow_match_score: f64,
}

/// A composite code-similarity function.
pub trait CodeSimilarity: Send + Sync {
    fn calc(&self, request: &SimilarityRequest<'_>) -> Result<MetricScores>;
}

/// Built-in CodeBLEU: BLEU, keyword-weighted BLEU, syntax match and
/// dataflow match, combined by the request weights.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeBleu;

/// Uniform weights for the four n-gram orders.
const NGRAM_WEIGHTS: [f64; 4] = [0.25; 4];

/// Grammar backing the structural components for `language`.
pub fn grammar_for(language: CanonicalLanguage) -> Result<&'static GrammarEntry> {
    let entry = registry::lookup(language.as_str())
        .ok_or_else(|| MetricError::TreeSitter(format!("no grammar registered for {language}")))?;
    if !entry.is_available() {
        return Err(MetricError::GrammarUnavailable {
            language: entry.language,
            feature: entry.feature,
        });
    }
    Ok(entry)
}

impl CodeSimilarity for CodeBleu {
    fn calc(&self, request: &SimilarityRequest<'_>) -> Result<MetricScores> {
        let SimilarityRequest {
            references,
            predictions,
            lang,
            weights,
            tokenizer,
        } = request;

        if references.len() != predictions.len() {
            return Err(MetricError::LengthMismatch {
                predictions: predictions.len(),
                references: references.len(),
            });
        }
        if let Some(index) = references.iter().position(Vec::is_empty) {
            return Err(MetricError::MissingReference(index));
        }

        let entry = grammar_for(*lang)?;

        let tokenize = |code: &str| match tokenizer {
            Some(custom) => custom(code),
            None => whitespace_tokens(code),
        };
        let tokenized_refs: Vec<Vec<Vec<String>>> = references
            .iter()
            .map(|refs| refs.iter().map(|r| tokenize(r)).collect())
            .collect();
        let tokenized_hyps: Vec<Vec<String>> = predictions.iter().map(|p| tokenize(p)).collect();

        let ngram = bleu::corpus_bleu(&tokenized_refs, &tokenized_hyps, &NGRAM_WEIGHTS);
        let weighted_ngram = weighted::corpus_weighted_bleu(&tokenized_refs, &tokenized_hyps, &NGRAM_WEIGHTS, |t| {
            keywords::is_keyword(*lang, t)
        });
        let syntax = syntax::corpus_syntax_match(references, predictions, entry, *lang)?;
        let dataflow = dataflow::corpus_dataflow_match(references, predictions, entry, *lang)?;

        let [alpha, beta, gamma, theta] = *weights;
        let codebleu = alpha * ngram + beta * weighted_ngram + gamma * syntax + theta * dataflow;
        debug!(
            language = %lang,
            ngram,
            weighted_ngram,
            syntax,
            dataflow,
            codebleu,
            "codebleu components"
        );

        Ok(MetricScores {
            codebleu,
            ngram_match_score: ngram,
            weighted_ngram_match_score: weighted_ngram,
            syntax_match_score: syntax,
            dataflow_match_score: dataflow,
        })
    }
}
