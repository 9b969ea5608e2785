//! Fallback lexical guesser.
//!
//! The classifier only consults a guesser when its own signals are weak. A
//! guesser answers with a free-text language name (e.g. `"Python 3"`,
//! `"JavaScript"`), which [`map_guess`] turns into a [`LanguageTag`].

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use syntect::parsing::SyntaxSet;
use tracing::debug;

use crate::errors::{Error, Result};
use crate::types::LanguageTag;

/// Anything able to name the language of a code string.
pub trait LexicalGuesser {
    /// Returns a free-text language name, or an error if no guess is possible.
    fn guess(&self, code: &str) -> Result<String>;
}

/// Name returned when no vocabulary scores at all.
pub const TEXT_ONLY: &str = "Text only";

/// Maps a free-text guess onto a candidate tag.
///
/// The order of checks is part of the contract: specific names are tested
/// before looser ones, so `"JavaScript"` can never be taken for Java and
/// `"C++"` never for C. The final check accepts any name containing the
/// letter `c` that is not C++, which is deliberately broad.
pub fn map_guess(name: &str) -> Option<LanguageTag> {
    let name = name.to_lowercase();
    if name.contains("python") {
        Some(LanguageTag::Python)
    } else if name.contains("java") && !name.contains("javascript") {
        Some(LanguageTag::Java)
    } else if name.contains("javascript") || name.contains("ecmascript") {
        Some(LanguageTag::JavaScript)
    } else if name.contains("c++") || name.contains("cpp") {
        Some(LanguageTag::Cpp)
    } else if name.contains('c') && !name.contains("c++") {
        Some(LanguageTag::C)
    } else {
        None
    }
}

/* ------------------------------------------------------------------------- */
/* Built-in guesser                                                          */
/* ------------------------------------------------------------------------- */

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<\?php|#\s*include|::|=>|->|:=|\$[A-Za-z_]\w*|[A-Za-z_]\w*")
        .expect("token regex is valid")
});

/// Minimum vocabulary score for a guess to be reported.
const MIN_VOTES: u32 = 2;

/// Each token contributes at most this many times.
const MAX_HITS_PER_TOKEN: u32 = 3;

struct Vocabulary {
    name: &'static str,
    tokens: &'static [(&'static str, u32)],
}

static VOCABULARIES: &[Vocabulary] = &[
    Vocabulary {
        name: "Python",
        tokens: &[
            ("def", 2),
            ("elif", 3),
            ("self", 2),
            ("None", 1),
            ("True", 1),
            ("False", 1),
            ("lambda", 2),
            ("print", 1),
            ("__init__", 3),
            ("pass", 1),
            ("yield", 1),
            ("import", 1),
        ],
    },
    Vocabulary {
        name: "Ruby",
        tokens: &[
            ("end", 2),
            ("puts", 3),
            ("require", 1),
            ("attr_accessor", 3),
            ("elsif", 3),
            ("unless", 2),
            ("nil", 2),
            ("do", 1),
            ("module", 1),
        ],
    },
    Vocabulary {
        name: "Go",
        tokens: &[
            ("func", 3),
            ("package", 2),
            ("fmt", 3),
            ("chan", 3),
            ("defer", 3),
            (":=", 2),
            ("go", 1),
        ],
    },
    Vocabulary {
        name: "Rust",
        tokens: &[
            ("fn", 3),
            ("let", 1),
            ("mut", 3),
            ("impl", 3),
            ("pub", 1),
            ("match", 1),
            ("println", 2),
            ("->", 1),
            ("::", 1),
            ("crate", 3),
        ],
    },
    Vocabulary {
        name: "PHP",
        tokens: &[("<?php", 10), ("echo", 2), ("$var", 2), ("array", 1), ("function", 1)],
    },
    Vocabulary {
        name: "JavaScript",
        tokens: &[
            ("function", 2),
            ("const", 2),
            ("let", 1),
            ("var", 1),
            ("console", 3),
            ("=>", 2),
            ("document", 3),
            ("window", 3),
            ("undefined", 3),
            ("require", 1),
        ],
    },
    Vocabulary {
        name: "Java",
        tokens: &[
            ("public", 1),
            ("class", 1),
            ("static", 1),
            ("void", 1),
            ("System", 3),
            ("String", 2),
            ("extends", 2),
            ("implements", 3),
            ("final", 1),
            ("private", 1),
        ],
    },
    Vocabulary {
        name: "C#",
        tokens: &[
            ("using", 2),
            ("namespace", 2),
            ("Console", 3),
            ("string", 1),
            ("var", 1),
        ],
    },
    Vocabulary {
        name: "C++",
        tokens: &[
            ("std", 3),
            ("::", 1),
            ("cout", 3),
            ("cin", 3),
            ("endl", 3),
            ("template", 3),
            ("typename", 3),
            ("vector", 2),
            ("#include", 1),
        ],
    },
    Vocabulary {
        name: "C",
        tokens: &[
            ("#include", 2),
            ("printf", 3),
            ("scanf", 3),
            ("malloc", 3),
            ("free", 1),
            ("struct", 1),
            ("sizeof", 2),
            ("NULL", 2),
            ("char", 1),
        ],
    },
];

/// Default guesser: editor/shebang first-line detection, then keyword voting.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenGuesser;

impl TokenGuesser {
    /// First-line detection (`#!/usr/bin/env ruby`, `-*- mode: python -*-`).
    fn guess_first_line(code: &str) -> Option<String> {
        let first = code.lines().next()?;
        SYNTAX_SET
            .find_syntax_by_first_line(first)
            .map(|syntax| syntax.name.clone())
    }

    fn normalize_token(raw: &str) -> &str {
        if raw.starts_with('$') {
            "$var"
        } else if raw.starts_with('#') {
            "#include"
        } else {
            raw
        }
    }

    fn vote(code: &str) -> Option<&'static str> {
        let mut per_token: HashMap<&str, u32> = HashMap::new();
        for m in TOKEN_RE.find_iter(code) {
            *per_token.entry(Self::normalize_token(m.as_str())).or_default() += 1;
        }

        let hits: Vec<u32> = VOCABULARIES
            .iter()
            .map(|vocab| {
                vocab
                    .tokens
                    .iter()
                    .map(|(tok, weight)| per_token.get(tok).copied().unwrap_or(0).min(MAX_HITS_PER_TOKEN) * weight)
                    .sum()
            })
            .collect();

        let mut best: Option<(usize, u32)> = None;
        for (i, score) in hits.iter().copied().enumerate() {
            if score >= MIN_VOTES && best.is_none_or(|(_, b)| score > b) {
                best = Some((i, score));
            }
        }
        debug!(?hits, "token guesser votes");
        best.map(|(i, _)| VOCABULARIES[i].name)
    }
}

impl LexicalGuesser for TokenGuesser {
    fn guess(&self, code: &str) -> Result<String> {
        if code.trim().is_empty() {
            return Err(Error::Guess("empty input"));
        }
        if let Some(name) = Self::guess_first_line(code) {
            return Ok(name);
        }
        Ok(Self::vote(code).unwrap_or(TEXT_ONLY).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::python("Python 3", Some(LanguageTag::Python))]
    #[case::java("Java", Some(LanguageTag::Java))]
    #[case::javascript_before_java("JavaScript", Some(LanguageTag::JavaScript))]
    #[case::javascript_plus("JavaScript+Django/Jinja", Some(LanguageTag::JavaScript))]
    #[case::ecmascript("ECMAScript", Some(LanguageTag::JavaScript))]
    #[case::cpp_before_c("C++", Some(LanguageTag::Cpp))]
    #[case::cpp_short("cpp", Some(LanguageTag::Cpp))]
    #[case::c("C", Some(LanguageTag::C))]
    #[case::broad_c_match("Objective-C", Some(LanguageTag::C))]
    #[case::text("Text only", None)]
    #[case::ruby("Ruby", None)]
    fn mapping_respects_priority(#[case] name: &str, #[case] expected: Option<LanguageTag>) {
        assert_eq!(map_guess(name), expected);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(TokenGuesser.guess("   ").is_err());
    }

    #[test]
    fn shebang_wins() {
        let name = TokenGuesser.guess("#!/usr/bin/env python\nx = 1\n").unwrap();
        assert!(name.to_lowercase().contains("python"), "got {name}");
    }

    #[rstest]
    #[case("puts 'hi'\nnil\nend", "Ruby")]
    #[case("x := 1\ndefer close(ch)\nchan int", "Go")]
    #[case("x = malloc(sizeof(int));\nfree(x);", "C")]
    fn keyword_voting(#[case] code: &str, #[case] expected: &str) {
        assert_eq!(TokenGuesser.guess(code).unwrap(), expected);
    }

    #[test]
    fn unknown_text_has_neutral_name() {
        assert_eq!(TokenGuesser.guess("hello world").unwrap(), TEXT_ONLY);
    }
}
