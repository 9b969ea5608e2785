//! Keyword-weighted n-gram match.
//!
//! Same pooling as [`super::bleu`], but counts are recall-style (taken over
//! the first reference) and unigrams are weighted so that language keywords
//! weigh more than identifiers and literals.

use std::collections::HashMap;

use super::bleu::combine;
use super::tokenize::{brevity_penalty, closest_ref_length, ngram_counts};

pub const KEYWORD_WEIGHT: f64 = 1.0;
pub const OTHER_WEIGHT: f64 = 0.2;

/// Per-token unigram weights of one reference.
pub fn make_weights<'a>(reference: &'a [String], is_keyword: impl Fn(&str) -> bool) -> HashMap<&'a str, f64> {
    reference
        .iter()
        .map(|token| {
            let weight = if is_keyword(token.as_str()) { KEYWORD_WEIGHT } else { OTHER_WEIGHT };
            (token.as_str(), weight)
        })
        .collect()
}

/// Clipped reference n-gram matches over the weighted reference total.
pub fn modified_recall(
    reference: &[String],
    weights: &HashMap<&str, f64>,
    hypothesis: &[String],
    n: usize,
) -> (f64, f64) {
    let counts = ngram_counts(hypothesis, n);
    let reference_counts = ngram_counts(reference, n);

    let weight_of = |ngram: &[String]| -> f64 {
        if n == 1 {
            weights.get(ngram[0].as_str()).copied().unwrap_or(1.0)
        } else {
            1.0
        }
    };

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (ngram, count) in &reference_counts {
        let clipped = (*count).min(counts.get(ngram).copied().unwrap_or(0));
        let weight = weight_of(*ngram);
        numerator += clipped as f64 * weight;
        denominator += *count as f64 * weight;
    }
    (numerator, denominator.max(1.0))
}

/// Weighted BLEU pooled over the corpus; only the first reference of each
/// item contributes counts.
pub fn corpus_weighted_bleu(
    list_of_references: &[Vec<Vec<String>>],
    hypotheses: &[Vec<String>],
    weights: &[f64],
    is_keyword: impl Fn(&str) -> bool,
) -> f64 {
    let orders = weights.len();
    let mut numerators = vec![0.0; orders];
    let mut denominators = vec![0.0; orders];
    let (mut hyp_len, mut ref_len) = (0usize, 0usize);

    for (references, hypothesis) in list_of_references.iter().zip(hypotheses) {
        let Some(first) = references.first() else {
            continue;
        };
        let token_weights = make_weights(first, &is_keyword);
        for n in 1..=orders {
            let (num, den) = modified_recall(first, &token_weights, hypothesis, n);
            numerators[n - 1] += num;
            denominators[n - 1] += den;
        }
        hyp_len += hypothesis.len();
        ref_len += closest_ref_length(references, hypothesis.len());
    }

    combine(&numerators, &denominators, weights, brevity_penalty(ref_len, hyp_len))
}
