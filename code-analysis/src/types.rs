//! Language taxonomy shared by the classifier, the AST producer and callers.
//!
//! The set is closed: the classifier can only ever answer with one of these
//! tags. Declaration order matters, it is the iteration order of
//! [`LanguageTag::ALL`] and therefore the tie-break order of the score board.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::extension::extension_for;

/// Candidate languages the classifier can output.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageTag {
    Python,
    Java,
    #[serde(rename = "javascript")]
    JavaScript,
    Cpp,
    C,
    Rust,
    Go,
    Php,
    Ruby,
    #[serde(rename = "c_sharp")]
    CSharp,
}

impl LanguageTag {
    /// All candidates in tie-break order.
    pub const ALL: [LanguageTag; 10] = [
        LanguageTag::Python,
        LanguageTag::Java,
        LanguageTag::JavaScript,
        LanguageTag::Cpp,
        LanguageTag::C,
        LanguageTag::Rust,
        LanguageTag::Go,
        LanguageTag::Php,
        LanguageTag::Ruby,
        LanguageTag::CSharp,
    ];

    /// Tag returned whenever classification is inconclusive.
    pub const DEFAULT: LanguageTag = LanguageTag::Python;

    /// Canonical lowercase identifier (`"c_sharp"`, `"cpp"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            LanguageTag::Python => "python",
            LanguageTag::Java => "java",
            LanguageTag::JavaScript => "javascript",
            LanguageTag::Cpp => "cpp",
            LanguageTag::C => "c",
            LanguageTag::Rust => "rust",
            LanguageTag::Go => "go",
            LanguageTag::Php => "php",
            LanguageTag::Ruby => "ruby",
            LanguageTag::CSharp => "c_sharp",
        }
    }

    /// Human-facing name used in messages.
    pub fn display_name(self) -> &'static str {
        match self {
            LanguageTag::Python => "Python",
            LanguageTag::Java => "Java",
            LanguageTag::JavaScript => "JavaScript",
            LanguageTag::Cpp => "C++",
            LanguageTag::C => "C",
            LanguageTag::Rust => "Rust",
            LanguageTag::Go => "Go",
            LanguageTag::Php => "PHP",
            LanguageTag::Ruby => "Ruby",
            LanguageTag::CSharp => "C#",
        }
    }

    /// Position inside [`LanguageTag::ALL`]; used to index score boards.
    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Conventional file extension, including the leading dot.
    pub fn extension(self) -> &'static str {
        extension_for(self.as_str())
    }
}

impl Display for LanguageTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a candidate language.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown language tag: {0}")]
pub struct UnknownLanguage(pub String);

impl FromStr for LanguageTag {
    type Err = UnknownLanguage;

    /// Case-insensitive; accepts the canonical ids plus a few common aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let tag = match lower.as_str() {
            "python" | "py" => LanguageTag::Python,
            "java" => LanguageTag::Java,
            "javascript" | "js" => LanguageTag::JavaScript,
            "cpp" | "c++" => LanguageTag::Cpp,
            "c" => LanguageTag::C,
            "rust" | "rs" => LanguageTag::Rust,
            "go" | "golang" => LanguageTag::Go,
            "php" => LanguageTag::Php,
            "ruby" | "rb" => LanguageTag::Ruby,
            "c_sharp" | "csharp" | "c#" | "cs" => LanguageTag::CSharp,
            _ => return Err(UnknownLanguage(s.to_string())),
        };
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_declaration_order() {
        for (i, tag) in LanguageTag::ALL.iter().enumerate() {
            assert_eq!(tag.index(), i);
        }
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("C++".parse::<LanguageTag>(), Ok(LanguageTag::Cpp));
        assert_eq!("JavaScript".parse::<LanguageTag>(), Ok(LanguageTag::JavaScript));
        assert_eq!("C#".parse::<LanguageTag>(), Ok(LanguageTag::CSharp));
        assert!("klingon".parse::<LanguageTag>().is_err());
    }

    #[test]
    fn serializes_to_canonical_id() {
        let json = serde_json::to_string(&LanguageTag::CSharp).unwrap();
        assert_eq!(json, "\"c_sharp\"");
        let json = serde_json::to_string(&LanguageTag::JavaScript).unwrap();
        assert_eq!(json, "\"javascript\"");
    }
}
