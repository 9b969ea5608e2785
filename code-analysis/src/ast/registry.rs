//! Capability registry of tree-sitter grammars.
//!
//! Every grammar is an optional cargo feature (`lang-*`). A registry entry
//! always exists, but its factory is `None` when the feature is compiled out,
//! so callers can tell "unknown language" apart from "grammar not installed".

use tracing::warn;
use tree_sitter::{Language, Node, Parser, Tree};

use crate::errors::{Error, Result};

pub type LanguageFactory = fn() -> Language;

/// Deepest syntax tree accepted from a grammar. Trees are walked
/// recursively downstream, so deeper input is refused at parse time.
pub const MAX_TREE_DEPTH: usize = 1_000;

macro_rules! grammar_factory {
    ($name:ident, $feature:literal, $language:expr) => {
        #[cfg(feature = $feature)]
        const $name: Option<LanguageFactory> = {
            fn factory() -> Language {
                $language.into()
            }
            Some(factory as LanguageFactory)
        };
        #[cfg(not(feature = $feature))]
        const $name: Option<LanguageFactory> = None;
    };
}

grammar_factory!(JAVA, "lang-java", tree_sitter_java::LANGUAGE);
grammar_factory!(JAVASCRIPT, "lang-javascript", tree_sitter_javascript::LANGUAGE);
grammar_factory!(C, "lang-c", tree_sitter_c::LANGUAGE);
grammar_factory!(CPP, "lang-cpp", tree_sitter_cpp::LANGUAGE);
grammar_factory!(CSHARP, "lang-csharp", tree_sitter_c_sharp::LANGUAGE);
grammar_factory!(PYTHON, "lang-python", tree_sitter_python::LANGUAGE);
grammar_factory!(GO, "lang-go", tree_sitter_go::LANGUAGE);
grammar_factory!(RUBY, "lang-ruby", tree_sitter_ruby::LANGUAGE);
grammar_factory!(PHP, "lang-php", tree_sitter_php::LANGUAGE_PHP);
grammar_factory!(RUST, "lang-rust", tree_sitter_rust::LANGUAGE);

/// One grammar backend.
#[derive(Debug, Clone, Copy)]
pub struct GrammarEntry {
    /// Canonical language id (`"java"`, `"c_sharp"`, ...).
    pub language: &'static str,
    /// Backend identifier, the grammar crate name.
    pub backend: &'static str,
    /// Cargo feature that compiles the backend in.
    pub feature: &'static str,
    factory: Option<LanguageFactory>,
}

impl GrammarEntry {
    pub fn is_available(&self) -> bool {
        self.factory.is_some()
    }

    /// Builds the tree-sitter language, or reports the backend as missing.
    pub fn load(&self) -> Result<Language> {
        self.factory
            .map(|factory| factory())
            .ok_or(Error::GrammarUnavailable {
                backend: self.backend,
            })
    }

    /// Parses `code` with this grammar.
    ///
    /// # Errors
    /// [`Error::TreeTooDeep`] when the tree nests more than [`MAX_TREE_DEPTH`] levels.
    pub fn parse(&self, code: &str) -> Result<Tree> {
        let language = self.load()?;
        let mut parser = Parser::new();
        parser.set_language(&language).map_err(|e| {
            warn!(backend = self.backend, error = %e, "grammar rejected by tree-sitter runtime");
            Error::TreeSitterLanguage {
                backend: self.backend,
            }
        })?;
        let tree = parser.parse(code.as_bytes(), None).ok_or(Error::TreeSitterParse)?;

        let depth = tree_depth(tree.root_node());
        if depth > MAX_TREE_DEPTH {
            return Err(Error::TreeTooDeep {
                depth,
                limit: MAX_TREE_DEPTH,
            });
        }
        Ok(tree)
    }
}

/// Number of levels below and including `root`, measured with a cursor.
pub fn tree_depth(root: Node<'_>) -> usize {
    let mut cursor = root.walk();
    let (mut depth, mut deepest) = (1usize, 1usize);
    loop {
        if cursor.goto_first_child() {
            depth += 1;
            deepest = deepest.max(depth);
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return deepest;
            }
            depth -= 1;
        }
    }
}

pub static GRAMMARS: &[GrammarEntry] = &[
    GrammarEntry {
        language: "java",
        backend: "tree-sitter-java",
        feature: "lang-java",
        factory: JAVA,
    },
    GrammarEntry {
        language: "javascript",
        backend: "tree-sitter-javascript",
        feature: "lang-javascript",
        factory: JAVASCRIPT,
    },
    GrammarEntry {
        language: "c",
        backend: "tree-sitter-c",
        feature: "lang-c",
        factory: C,
    },
    GrammarEntry {
        language: "cpp",
        backend: "tree-sitter-cpp",
        feature: "lang-cpp",
        factory: CPP,
    },
    GrammarEntry {
        language: "c_sharp",
        backend: "tree-sitter-c-sharp",
        feature: "lang-csharp",
        factory: CSHARP,
    },
    GrammarEntry {
        language: "python",
        backend: "tree-sitter-python",
        feature: "lang-python",
        factory: PYTHON,
    },
    GrammarEntry {
        language: "go",
        backend: "tree-sitter-go",
        feature: "lang-go",
        factory: GO,
    },
    GrammarEntry {
        language: "ruby",
        backend: "tree-sitter-ruby",
        feature: "lang-ruby",
        factory: RUBY,
    },
    GrammarEntry {
        language: "php",
        backend: "tree-sitter-php",
        feature: "lang-php",
        factory: PHP,
    },
    GrammarEntry {
        language: "rust",
        backend: "tree-sitter-rust",
        feature: "lang-rust",
        factory: RUST,
    },
];

/// Registry entry for a canonical language id.
pub fn lookup(language: &str) -> Option<&'static GrammarEntry> {
    GRAMMARS.iter().find(|g| g.language == language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entry_is_unique() {
        let mut ids: Vec<_> = GRAMMARS.iter().map(|g| g.language).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), GRAMMARS.len());
    }

    #[test]
    fn unknown_language_is_not_registered() {
        assert!(lookup("brainfuck").is_none());
    }

    #[cfg(feature = "lang-java")]
    #[test]
    fn java_grammar_parses() {
        let entry = lookup("java").unwrap();
        assert!(entry.is_available());
        let tree = entry.parse("class A { void f() {} }").unwrap();
        assert_eq!(tree.root_node().kind(), "program");
        assert!(!tree.root_node().has_error());
        assert!(tree_depth(tree.root_node()) >= 5);
    }

    #[cfg(feature = "lang-javascript")]
    #[test]
    fn deeply_nested_source_is_refused() {
        let entry = lookup("javascript").unwrap();
        let code = format!("x = {}1;", "-".repeat(5_000));
        match entry.parse(&code) {
            Err(Error::TreeTooDeep { depth, limit }) => {
                assert!(depth > MAX_TREE_DEPTH);
                assert_eq!(limit, MAX_TREE_DEPTH);
            }
            other => panic!("expected TreeTooDeep, got {:?}", other.map(|t| t.root_node().kind())),
        }

        let shallow = format!("x = {}1;", "-".repeat(100));
        assert!(entry.parse(&shallow).is_ok());
    }

    #[cfg(not(feature = "lang-java"))]
    #[test]
    fn missing_feature_reports_unavailable() {
        let entry = lookup("java").unwrap();
        assert!(!entry.is_available());
        assert!(matches!(entry.load(), Err(Error::GrammarUnavailable { .. })));
    }
}
