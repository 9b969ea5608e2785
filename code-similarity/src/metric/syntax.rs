//! Syntax match: how many of the reference's subtrees reappear in the candidate.

use std::collections::HashSet;

use code_analysis::ast::registry::GrammarEntry;
use tree_sitter::{Node, Tree};

use crate::errors::Result;
use crate::normalize::CanonicalLanguage;

/// Source with comments blanked out, and its parse tree.
pub(crate) struct ParsedCode {
    pub source: String,
    pub tree: Tree,
}

fn is_comment(node: &Node<'_>) -> bool {
    let kind = node.kind();
    kind == "comment" || kind.ends_with("_comment")
}

fn is_docstring(node: &Node<'_>) -> bool {
    node.kind() == "expression_statement"
        && node.named_child_count() == 1
        && node.named_child(0).is_some_and(|child| child.kind() == "string")
}

/// Parses `code`, blanks comment (and, for Python, docstring) byte ranges
/// keeping newlines so positions stay stable, then parses again.
pub(crate) fn parse_stripped(entry: &GrammarEntry, code: &str, language: CanonicalLanguage) -> Result<ParsedCode> {
    let tree = entry.parse(code)?;

    let mut ranges = Vec::new();
    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        if is_comment(&node) || (language == CanonicalLanguage::Python && is_docstring(&node)) {
            ranges.push(node.byte_range());
            continue;
        }
        let mut cursor = node.walk();
        stack.extend(node.children(&mut cursor));
    }

    if ranges.is_empty() {
        return Ok(ParsedCode {
            source: code.to_string(),
            tree,
        });
    }

    let mut bytes = code.as_bytes().to_vec();
    for range in ranges {
        for byte in &mut bytes[range] {
            if *byte != b'\n' {
                *byte = b' ';
            }
        }
    }
    let source = String::from_utf8_lossy(&bytes).into_owned();
    let tree = entry.parse(&source)?;
    Ok(ParsedCode { source, tree })
}

/// S-expressions of every node that has children.
pub fn subtree_sexps(tree: &Tree) -> Vec<String> {
    let mut sexps = Vec::new();
    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        if node.child_count() == 0 {
            continue;
        }
        sexps.push(node.to_sexp());
        let mut cursor = node.walk();
        stack.extend(node.children(&mut cursor));
    }
    sexps
}

/// Fraction of reference subtrees found among the candidate's subtrees.
/// Returns 0.0 when the references have no subtrees at all.
pub fn corpus_syntax_match(
    list_of_references: &[Vec<String>],
    candidates: &[String],
    entry: &GrammarEntry,
    language: CanonicalLanguage,
) -> Result<f64> {
    let (mut matched, mut total) = (0usize, 0usize);

    for (references, candidate) in list_of_references.iter().zip(candidates) {
        let candidate = parse_stripped(entry, candidate, language)?;
        let candidate_sexps = subtree_sexps(&candidate.tree);
        let candidate_set: HashSet<&str> = candidate_sexps.iter().map(String::as_str).collect();

        for reference in references {
            let reference = parse_stripped(entry, reference, language)?;
            let reference_sexps = subtree_sexps(&reference.tree);
            total += reference_sexps.len();
            matched += reference_sexps
                .iter()
                .filter(|sexp| candidate_set.contains(sexp.as_str()))
                .count();
        }
    }

    if total == 0 {
        return Ok(0.0);
    }
    Ok(matched as f64 / total as f64)
}

#[cfg(all(test, feature = "lang-all"))]
mod tests {
    use super::*;
    use code_analysis::ast::registry;

    fn python() -> &'static GrammarEntry {
        registry::lookup("python").unwrap()
    }

    #[test]
    fn comments_do_not_affect_structure() {
        let plain = parse_stripped(python(), "x = 1\ny = x + 2\n", CanonicalLanguage::Python).unwrap();
        let commented = parse_stripped(
            python(),
            "# setup\nx = 1  # one\ny = x + 2\n",
            CanonicalLanguage::Python,
        )
        .unwrap();
        assert!(!commented.source.contains('#'));
        assert_eq!(subtree_sexps(&plain.tree), subtree_sexps(&commented.tree));
    }

    #[test]
    fn docstrings_are_stripped_for_python() {
        let parsed = parse_stripped(
            python(),
            "def f():\n    \"\"\"Doc.\"\"\"\n    return 1\n",
            CanonicalLanguage::Python,
        )
        .unwrap();
        assert!(!parsed.source.contains("Doc"));
        assert_eq!(parsed.source.lines().count(), 3);
    }

    #[test]
    fn identical_code_matches_fully() {
        let code = "def add(a, b):\n    return a + b\n".to_string();
        let score =
            corpus_syntax_match(&[vec![code.clone()]], &[code], python(), CanonicalLanguage::Python).unwrap();
        assert_eq!(score, 1.0);
    }

    #[test]
    fn different_structure_matches_partially() {
        let reference = "def add(a, b):\n    return a + b\n".to_string();
        let candidate = "def add(a, b):\n    total = a + b\n    return total\n".to_string();
        let score =
            corpus_syntax_match(&[vec![reference]], &[candidate], python(), CanonicalLanguage::Python).unwrap();
        assert!(score > 0.0 && score < 1.0, "{score}");
    }
}
