//! Dataflow match over a language-agnostic data-flow graph.
//!
//! The graph is derived from the tree-sitter tree alone: assignment-like
//! nodes (recognised by their field names) make every variable on the left
//! `computedFrom` the variables on the right, and every later sighting of a
//! known variable `comesFrom` its earlier definition. Variable names are
//! replaced by `var_<i>` in order of first appearance, so renaming does not
//! change the graph.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use code_analysis::ast::registry::GrammarEntry;
use tree_sitter::Node;

use super::syntax::parse_stripped;
use crate::errors::Result;
use crate::normalize::CanonicalLanguage;

/// Field pairs that mark an assignment-like node, `(target, value)`.
const ASSIGNMENT_FIELDS: &[(&str, &str)] = &[
    ("left", "right"),
    ("name", "value"),
    ("declarator", "value"),
    ("pattern", "value"),
];

/// Node kinds naming a variable.
const VARIABLE_KINDS: &[&str] = &["identifier", "variable_name"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    ComputedFrom,
    ComesFrom,
}

impl Display for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Relation::ComputedFrom => f.write_str("computedFrom"),
            Relation::ComesFrom => f.write_str("comesFrom"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataflowEdge {
    pub variable: String,
    pub relation: Relation,
    pub sources: Vec<String>,
}

enum Step<'t> {
    Visit(Node<'t>),
    Define { target: Node<'t>, value: Node<'t> },
}

struct GraphBuilder<'s> {
    source: &'s [u8],
    known: HashSet<String>,
    edges: Vec<(usize, DataflowEdge)>,
}

impl GraphBuilder<'_> {
    fn text(&self, node: Node<'_>) -> String {
        node.utf8_text(self.source).unwrap_or_default().to_string()
    }

    fn assignment_parts<'t>(node: Node<'t>) -> Option<(Node<'t>, Node<'t>)> {
        ASSIGNMENT_FIELDS.iter().find_map(|(target, value)| {
            Some((node.child_by_field_name(target)?, node.child_by_field_name(value)?))
        })
    }

    /// Walks the tree with an explicit stack. An assignment's value is
    /// fully visited before its targets are defined.
    fn walk<'t>(&mut self, root: Node<'t>) {
        let mut stack = vec![Step::Visit(root)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Visit(node) if is_variable(node) => self.use_variable(node),
                Step::Visit(node) => match Self::assignment_parts(node) {
                    Some((target, value)) => {
                        stack.push(Step::Define { target, value });
                        stack.push(Step::Visit(value));
                    }
                    None => {
                        let mut cursor = node.walk();
                        let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
                        stack.extend(children.into_iter().rev().map(Step::Visit));
                    }
                },
                Step::Define { target, value } => self.define(target, value),
            }
        }
    }

    fn define(&mut self, target: Node<'_>, value: Node<'_>) {
        let sources: Vec<String> = collect_variables(value).into_iter().map(|n| self.text(n)).collect();
        for variable in collect_variables(target) {
            let name = self.text(variable);
            self.known.insert(name.clone());
            self.edges.push((
                variable.start_byte(),
                DataflowEdge {
                    variable: name,
                    relation: Relation::ComputedFrom,
                    sources: sources.clone(),
                },
            ));
        }
    }

    fn use_variable(&mut self, node: Node<'_>) {
        let name = self.text(node);
        if self.known.contains(&name) {
            self.edges.push((
                node.start_byte(),
                DataflowEdge {
                    variable: name.clone(),
                    relation: Relation::ComesFrom,
                    sources: vec![name],
                },
            ));
        } else {
            self.known.insert(name);
        }
    }
}

fn is_variable(node: Node<'_>) -> bool {
    let kind = node.kind();
    VARIABLE_KINDS.contains(&kind) && (kind != "identifier" || node.child_count() == 0)
}

/// Variable nodes under `node`, in source order.
fn collect_variables(node: Node<'_>) -> Vec<Node<'_>> {
    let mut found = Vec::new();
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        if is_variable(node) {
            found.push(node);
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    found
}

/// Data-flow edges of `source`, ordered by the position of their variable.
pub fn build_graph(root: Node<'_>, source: &str) -> Vec<DataflowEdge> {
    let mut builder = GraphBuilder {
        source: source.as_bytes(),
        known: HashSet::new(),
        edges: Vec::new(),
    };
    builder.walk(root);
    builder.edges.sort_by_key(|(position, _)| *position);
    builder.edges.into_iter().map(|(_, edge)| edge).collect()
}

/// Renames variables to `var_<i>`, sources before the variable they feed.
pub fn normalize_graph(edges: &[DataflowEdge]) -> Vec<DataflowEdge> {
    let mut names: Vec<String> = Vec::new();
    let mut rename = |name: &str| -> String {
        let index = match names.iter().position(|n| n == name) {
            Some(index) => index,
            None => {
                names.push(name.to_string());
                names.len() - 1
            }
        };
        format!("var_{index}")
    };

    edges
        .iter()
        .map(|edge| {
            let sources: Vec<String> = edge.sources.iter().map(|s| rename(s)).collect();
            DataflowEdge {
                variable: rename(&edge.variable),
                relation: edge.relation,
                sources,
            }
        })
        .collect()
}

/// Fraction of normalized reference edges found in the candidate graph,
/// each candidate edge matching at most once. 0.0 for empty reference graphs.
pub fn corpus_dataflow_match(
    list_of_references: &[Vec<String>],
    candidates: &[String],
    entry: &GrammarEntry,
    language: CanonicalLanguage,
) -> Result<f64> {
    let (mut matched, mut total) = (0usize, 0usize);

    for (references, candidate) in list_of_references.iter().zip(candidates) {
        let candidate = parse_stripped(entry, candidate, language)?;
        let candidate_graph = normalize_graph(&build_graph(candidate.tree.root_node(), &candidate.source));

        for reference in references {
            let reference = parse_stripped(entry, reference, language)?;
            let reference_graph = normalize_graph(&build_graph(reference.tree.root_node(), &reference.source));

            let mut remaining = candidate_graph.clone();
            for edge in &reference_graph {
                if let Some(index) = remaining.iter().position(|c| c == edge) {
                    remaining.swap_remove(index);
                    matched += 1;
                }
            }
            total += reference_graph.len();
        }
    }

    if total == 0 {
        return Ok(0.0);
    }
    Ok(matched as f64 / total as f64)
}
