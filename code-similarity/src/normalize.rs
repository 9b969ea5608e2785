//! Caller language names → canonical identifiers accepted by the metric.

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Languages the similarity metric understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalLanguage {
    Python,
    Java,
    #[serde(rename = "javascript")]
    JavaScript,
    Cpp,
    C,
    #[serde(rename = "c_sharp")]
    CSharp,
    Php,
    Go,
    Ruby,
    Rust,
}

impl CanonicalLanguage {
    pub const FALLBACK: CanonicalLanguage = CanonicalLanguage::Python;

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalLanguage::Python => "python",
            CanonicalLanguage::Java => "java",
            CanonicalLanguage::JavaScript => "javascript",
            CanonicalLanguage::Cpp => "cpp",
            CanonicalLanguage::C => "c",
            CanonicalLanguage::CSharp => "c_sharp",
            CanonicalLanguage::Php => "php",
            CanonicalLanguage::Go => "go",
            CanonicalLanguage::Ruby => "ruby",
            CanonicalLanguage::Rust => "rust",
        }
    }
}

impl Display for CanonicalLanguage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Total mapping; anything unrecognized becomes [`CanonicalLanguage::FALLBACK`].
pub fn normalize_language(tag: &str) -> CanonicalLanguage {
    match tag.trim().to_lowercase().as_str() {
        "python" => CanonicalLanguage::Python,
        "java" => CanonicalLanguage::Java,
        "javascript" | "js" => CanonicalLanguage::JavaScript,
        "cpp" | "c++" => CanonicalLanguage::Cpp,
        "c" => CanonicalLanguage::C,
        "csharp" | "c_sharp" | "c#" => CanonicalLanguage::CSharp,
        "php" => CanonicalLanguage::Php,
        "go" => CanonicalLanguage::Go,
        "ruby" => CanonicalLanguage::Ruby,
        "rust" => CanonicalLanguage::Rust,
        _ => CanonicalLanguage::FALLBACK,
    }
}
