//! Declarative signal tables for the heuristic classifier.
//!
//! Positive rules only ever add weight. Negative-evidence rules run after every
//! positive rule and zero a competing candidate ("this pattern can never be
//! plain C"). Both tables are evaluated in declaration order.
//!
//! The weights and the confidence threshold are empirically chosen calibration
//! points carried over unchanged; they have no derivation beyond "works on
//! typical LLM output".

use crate::types::LanguageTag::{self, C, CSharp, Cpp, Go, Java, JavaScript, Php, Python, Rust};

/// Precomputed views of one code sample, shared by every rule.
#[derive(Debug)]
pub struct Sample<'a> {
    /// Trimmed source text.
    pub code: &'a str,
    /// Lowercased copy of `code`.
    pub lower: String,
}

impl<'a> Sample<'a> {
    pub fn new(code: &'a str) -> Self {
        Self {
            code,
            lower: code.to_lowercase(),
        }
    }

    #[inline]
    fn has(&self, needle: &str) -> bool {
        self.code.contains(needle)
    }

    #[inline]
    fn has_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.code.contains(n))
    }

    /// Non-overlapping occurrence count, like `str.count`.
    #[inline]
    fn count(&self, needle: &str) -> usize {
        self.code.matches(needle).count()
    }
}

/// A positive rule: when `matches` holds, every `(tag, weight)` is added.
#[derive(Debug)]
pub struct SignalRule {
    pub name: &'static str,
    pub matches: fn(&Sample<'_>) -> bool,
    pub boosts: &'static [(LanguageTag, u32)],
}

/// A negative-evidence rule: when `matches` holds, `reset` goes back to zero.
#[derive(Debug)]
pub struct NegativeRule {
    pub name: &'static str,
    pub matches: fn(&Sample<'_>) -> bool,
    pub reset: LanguageTag,
}

/// Scores above this value are trusted without consulting the fallback guesser.
pub const CONFIDENCE_THRESHOLD: u32 = 5;

fn cpp_stream_io(s: &Sample<'_>) -> bool {
    s.has_any(&["std::", "cout", "endl"])
}

fn cpp_namespace(s: &Sample<'_>) -> bool {
    s.has("namespace")
}

pub static POSITIVE_RULES: &[SignalRule] = &[
    // Java
    SignalRule {
        name: "java_public_class",
        matches: |s| s.has("public class"),
        boosts: &[(Java, 10)],
    },
    SignalRule {
        name: "java_public_static",
        matches: |s| s.has("public static"),
        boosts: &[(Java, 10)],
    },
    SignalRule {
        name: "java_access_modifier",
        matches: |s| s.has_any(&["private ", "protected "]),
        boosts: &[(Java, 5)],
    },
    SignalRule {
        name: "java_typed_declaration",
        matches: |s| s.has_any(&["void ", "int ", "String "]),
        boosts: &[(Java, 3)],
    },
    SignalRule {
        name: "java_system_call",
        matches: |s| s.has("System."),
        boosts: &[(Java, 8)],
    },
    SignalRule {
        name: "java_arrays",
        matches: |s| s.has_any(&["Arrays.", ".length"]),
        boosts: &[(Java, 3)],
    },
    SignalRule {
        name: "statement_terminators",
        matches: |s| s.count(";") > 2,
        boosts: &[(Java, 2), (Cpp, 2), (C, 2), (JavaScript, 1)],
    },
    // Python
    SignalRule {
        name: "python_def",
        matches: |s| s.has("def ") && s.has(":"),
        boosts: &[(Python, 10)],
    },
    SignalRule {
        name: "python_from_import",
        matches: |s| s.has("import ") && s.has("from "),
        boosts: &[(Python, 8)],
    },
    SignalRule {
        name: "python_colons_without_braces",
        matches: |s| s.count(":") > 2 && s.count("{") == 0,
        boosts: &[(Python, 5)],
    },
    SignalRule {
        name: "python_self",
        matches: |s| s.has_any(&["self", "__init__"]),
        boosts: &[(Python, 8)],
    },
    SignalRule {
        name: "python_indentation",
        matches: |s| s.count("    ") > 3,
        boosts: &[(Python, 3)],
    },
    // JavaScript
    SignalRule {
        name: "js_function_keyword",
        matches: |s| s.lower.contains("function"),
        boosts: &[(JavaScript, 8), (Php, 3)],
    },
    SignalRule {
        name: "js_declaration",
        matches: |s| s.has_any(&["const ", "let ", "var "]),
        boosts: &[(JavaScript, 10)],
    },
    SignalRule {
        name: "js_arrow",
        matches: |s| s.has("=>"),
        boosts: &[(JavaScript, 8)],
    },
    SignalRule {
        name: "js_console_log",
        matches: |s| s.has("console.log"),
        boosts: &[(JavaScript, 10)],
    },
    // C / C++
    SignalRule {
        name: "c_include",
        matches: |s| s.has("#include"),
        boosts: &[(Cpp, 8), (C, 8)],
    },
    SignalRule {
        name: "cpp_stream_io",
        matches: cpp_stream_io,
        boosts: &[(Cpp, 10)],
    },
    SignalRule {
        name: "cpp_namespace",
        matches: cpp_namespace,
        boosts: &[(Cpp, 10)],
    },
    SignalRule {
        name: "c_stdio",
        matches: |s| s.has_any(&["printf", "scanf"]),
        boosts: &[(C, 8)],
    },
    SignalRule {
        name: "c_int_main",
        matches: |s| s.has("int main("),
        boosts: &[(Cpp, 5), (C, 5)],
    },
    // PHP
    SignalRule {
        name: "php_open_tag",
        matches: |s| s.has("<?php"),
        boosts: &[(Php, 15)],
    },
    SignalRule {
        name: "php_variables_in_function",
        matches: |s| s.has("$") && s.lower.contains("function"),
        boosts: &[(Php, 8)],
    },
    // Rust
    SignalRule {
        name: "rust_fn",
        matches: |s| s.has("fn "),
        boosts: &[(Rust, 10)],
    },
    SignalRule {
        name: "rust_let_mut",
        matches: |s| s.has("let mut"),
        boosts: &[(Rust, 10)],
    },
    // Go
    SignalRule {
        name: "go_main",
        matches: |s| s.has_any(&["func main", "package main"]),
        boosts: &[(Go, 10)],
    },
    SignalRule {
        name: "go_fmt",
        matches: |s| s.has("fmt."),
        boosts: &[(Go, 8)],
    },
    // C#
    SignalRule {
        name: "csharp_using_system",
        matches: |s| s.has("using System") || (s.has("namespace ") && s.has("class")),
        boosts: &[(CSharp, 10)],
    },
];

pub static NEGATIVE_RULES: &[NegativeRule] = &[
    NegativeRule {
        name: "cpp_stream_io_excludes_c",
        matches: cpp_stream_io,
        reset: C,
    },
    NegativeRule {
        name: "cpp_namespace_excludes_c",
        matches: cpp_namespace,
        reset: C,
    },
];
