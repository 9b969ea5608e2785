use std::collections::HashMap;

/// Custom tokenizer hook.
pub type Tokenizer<'a> = &'a (dyn Fn(&str) -> Vec<String> + Send + Sync);

pub fn whitespace_tokens(code: &str) -> Vec<String> {
    code.split_whitespace().map(str::to_string).collect()
}

/// Multiset of `n`-grams; empty when the sequence is shorter than `n`.
pub fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if n == 0 || tokens.len() < n {
        return counts;
    }
    for window in tokens.windows(n) {
        *counts.entry(window).or_insert(0) += 1;
    }
    counts
}

/// Reference length closest to `hyp_len`; ties go to the shorter one.
pub fn closest_ref_length(references: &[Vec<String>], hyp_len: usize) -> usize {
    references
        .iter()
        .map(Vec::len)
        .min_by_key(|len| (len.abs_diff(hyp_len), *len))
        .unwrap_or(0)
}

pub fn brevity_penalty(closest_ref_len: usize, hyp_len: usize) -> f64 {
    if hyp_len > closest_ref_len {
        1.0
    } else if hyp_len == 0 {
        0.0
    } else {
        (1.0 - closest_ref_len as f64 / hyp_len as f64).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        whitespace_tokens(s)
    }

    #[test]
    fn counts_overlapping_windows() {
        let t = toks("a b a b");
        let bigrams = ngram_counts(&t, 2);
        assert_eq!(bigrams.len(), 2);
        assert_eq!(bigrams.values().sum::<usize>(), 3);
        assert!(ngram_counts(&t, 5).is_empty());
    }

    #[test]
    fn closest_length_prefers_shorter_on_tie() {
        let refs = vec![toks("a b c d"), toks("a b")];
        assert_eq!(closest_ref_length(&refs, 3), 2);
    }

    #[test]
    fn brevity_penalty_shape() {
        assert_eq!(brevity_penalty(4, 5), 1.0);
        assert_eq!(brevity_penalty(4, 0), 0.0);
        assert!((brevity_penalty(4, 2) - (-1.0f64).exp()).abs() < 1e-12);
    }
}
