//! Corpus-level BLEU over token sequences.
//!
//! Precision is clipped against the best-matching reference, the brevity
//! penalty uses the closest reference length, and zero n-gram matches are
//! smoothed with a fixed epsilon so one missing order does not zero the score.

use std::collections::HashMap;

use super::tokenize::{brevity_penalty, closest_ref_length, ngram_counts};

/// Added to zero numerators before taking the logarithm.
pub const SMOOTHING_EPSILON: f64 = 0.1;

/// Clipped n-gram matches and the hypothesis n-gram total (at least 1).
pub fn modified_precision(references: &[Vec<String>], hypothesis: &[String], n: usize) -> (usize, usize) {
    let counts = ngram_counts(hypothesis, n);
    if counts.is_empty() {
        return (0, 1);
    }

    let mut max_counts: HashMap<&[String], usize> = HashMap::new();
    for reference in references {
        let reference_counts = ngram_counts(reference, n);
        for ngram in counts.keys() {
            let seen = reference_counts.get(ngram).copied().unwrap_or(0);
            let slot = max_counts.entry(*ngram).or_insert(0);
            *slot = (*slot).max(seen);
        }
    }

    let numerator = counts
        .iter()
        .map(|(ngram, count)| (*count).min(max_counts.get(ngram).copied().unwrap_or(0)))
        .sum();
    let denominator = counts.values().sum::<usize>().max(1);
    (numerator, denominator)
}

/// Combines per-order fractions into a smoothed geometric mean.
pub(crate) fn combine(numerators: &[f64], denominators: &[f64], weights: &[f64], bp: f64) -> f64 {
    if numerators.first().copied().unwrap_or(0.0) == 0.0 {
        return 0.0;
    }
    let log_sum: f64 = weights
        .iter()
        .zip(numerators.iter().zip(denominators))
        .map(|(w, (num, den))| {
            let num = if *num == 0.0 { SMOOTHING_EPSILON } else { *num };
            w * (num / den).ln()
        })
        .sum();
    bp * log_sum.exp()
}

/// BLEU of `hypotheses[i]` against `list_of_references[i]`, pooled over the corpus.
pub fn corpus_bleu(list_of_references: &[Vec<Vec<String>>], hypotheses: &[Vec<String>], weights: &[f64]) -> f64 {
    let orders = weights.len();
    let mut numerators = vec![0.0; orders];
    let mut denominators = vec![0.0; orders];
    let (mut hyp_len, mut ref_len) = (0usize, 0usize);

    for (references, hypothesis) in list_of_references.iter().zip(hypotheses) {
        for n in 1..=orders {
            let (num, den) = modified_precision(references, hypothesis, n);
            numerators[n - 1] += num as f64;
            denominators[n - 1] += den as f64;
        }
        hyp_len += hypothesis.len();
        ref_len += closest_ref_length(references, hypothesis.len());
    }

    combine(&numerators, &denominators, weights, brevity_penalty(ref_len, hyp_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::tokenize::whitespace_tokens;

    const UNIFORM: [f64; 4] = [0.25; 4];

    #[test]
    fn clipping_limits_repeated_tokens() {
        let refs = vec![whitespace_tokens("the cat is on the mat")];
        let hyp = whitespace_tokens("the the the the the the the");
        assert_eq!(modified_precision(&refs, &hyp, 1), (2, 7));
    }

    #[test]
    fn identical_sequences_score_one() {
        let tokens = whitespace_tokens("def add ( a , b ) : return a + b");
        let score = corpus_bleu(&[vec![tokens.clone()]], &[tokens], &UNIFORM);
        assert!((score - 1.0).abs() < 1e-12, "{score}");
    }

    #[test]
    fn disjoint_sequences_score_zero() {
        let refs = vec![vec![whitespace_tokens("a b c d e")]];
        let hyp = vec![whitespace_tokens("v w x y z")];
        assert_eq!(corpus_bleu(&refs, &hyp, &UNIFORM), 0.0);
    }

    #[test]
    fn missing_higher_orders_are_smoothed() {
        let refs = vec![vec![whitespace_tokens("a b c d")]];
        let hyp = vec![whitespace_tokens("d c b a")];
        let score = corpus_bleu(&refs, &hyp, &UNIFORM);
        assert!(score > 0.0 && score < 1.0, "{score}");
    }
}
