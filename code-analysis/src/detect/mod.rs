//! Heuristic language classifier.
//!
//! Flow for one call:
//! 1. empty input → [`LanguageTag::DEFAULT`];
//! 2. run every positive rule, then every negative-evidence rule, on a fresh
//!    [`ScoreBoard`];
//! 3. a winner above the confidence threshold is returned as-is;
//! 4. otherwise ask a [`LexicalGuesser`] and map its answer;
//! 5. otherwise fall back to the default tag.

pub mod guesser;
pub mod signals;

use tracing::{debug, warn};

use crate::types::LanguageTag;
pub use guesser::{LexicalGuesser, TokenGuesser, map_guess};
use signals::{CONFIDENCE_THRESHOLD, NEGATIVE_RULES, NegativeRule, POSITIVE_RULES, Sample, SignalRule};

/// Rule tables and threshold used by [`classify_with`].
#[derive(Debug, Clone, Copy)]
pub struct ClassifierConfig {
    /// A winning score must be strictly greater than this.
    pub threshold: u32,
    pub positive: &'static [SignalRule],
    pub negative: &'static [NegativeRule],
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: CONFIDENCE_THRESHOLD,
            positive: POSITIVE_RULES,
            negative: NEGATIVE_RULES,
        }
    }
}

/// Per-call accumulator, one slot per candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreBoard {
    scores: [u32; LanguageTag::ALL.len()],
}

impl ScoreBoard {
    pub fn get(&self, tag: LanguageTag) -> u32 {
        self.scores[tag.index()]
    }

    fn add(&mut self, tag: LanguageTag, weight: u32) {
        self.scores[tag.index()] = self.scores[tag.index()].saturating_add(weight);
    }

    fn reset(&mut self, tag: LanguageTag) {
        self.scores[tag.index()] = 0;
    }

    /// Highest-scoring candidate; ties go to the earliest tag in
    /// [`LanguageTag::ALL`].
    pub fn winner(&self) -> (LanguageTag, u32) {
        let mut best = (LanguageTag::ALL[0], self.scores[0]);
        for tag in LanguageTag::ALL.iter().copied().skip(1) {
            let score = self.get(tag);
            if score > best.1 {
                best = (tag, score);
            }
        }
        best
    }

    /// Board as `(tag, score)` pairs in candidate order.
    pub fn entries(&self) -> impl Iterator<Item = (LanguageTag, u32)> + '_ {
        LanguageTag::ALL.iter().map(|t| (*t, self.get(*t)))
    }
}

/// Runs both rule tables over `code` (expected already trimmed).
pub fn score(code: &str, config: &ClassifierConfig) -> ScoreBoard {
    let sample = Sample::new(code);
    let mut board = ScoreBoard::default();

    for rule in config.positive {
        if (rule.matches)(&sample) {
            for (tag, weight) in rule.boosts {
                board.add(*tag, *weight);
            }
        }
    }
    for rule in config.negative {
        if (rule.matches)(&sample) {
            board.reset(rule.reset);
        }
    }
    board
}

/// Classifies `code` with the default rules and the built-in guesser.
pub fn classify(code: &str) -> LanguageTag {
    classify_with(code, &ClassifierConfig::default(), &TokenGuesser)
}

/// Classifies `code` with explicit rules and fallback guesser. Never fails.
pub fn classify_with(
    code: &str,
    config: &ClassifierConfig,
    guesser: &dyn LexicalGuesser,
) -> LanguageTag {
    let code = code.trim();
    if code.is_empty() {
        return LanguageTag::DEFAULT;
    }

    let board = score(code, config);
    let (winner, top) = board.winner();
    if top > config.threshold {
        debug!(
            language = %winner,
            score = top,
            board = ?board.entries().collect::<Vec<_>>(),
            "language detected by signals"
        );
        return winner;
    }

    match guesser.guess(code) {
        Ok(name) => {
            if let Some(tag) = map_guess(&name) {
                debug!(guess = %name, language = %tag, "language detected by fallback guesser");
                return tag;
            }
            debug!(guess = %name, "fallback guess does not map to a candidate");
        }
        Err(e) => warn!(error = %e, "fallback guesser failed"),
    }

    debug!(
        board = ?board.entries().collect::<Vec<_>>(),
        "defaulting to {}", LanguageTag::DEFAULT
    );
    LanguageTag::DEFAULT
}
