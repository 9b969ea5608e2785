//! Projection of tree-sitter trees into serializable grammar nodes.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use tree_sitter::Node;

use super::registry::GrammarEntry;
use crate::errors::Result;

/// Zero-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl From<tree_sitter::Point> for Position {
    fn from(p: tree_sitter::Point) -> Self {
        Self {
            row: p.row,
            column: p.column,
        }
    }
}

/// A leaf carries source text, an interior node carries children. Never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeContent {
    /// `None` when the slice is blank after trimming.
    Leaf(Option<String>),
    Interior(Vec<GrammarNode>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarNode {
    pub kind: String,
    pub start: Position,
    pub end: Position,
    pub content: NodeContent,
}

impl GrammarNode {
    pub fn children(&self) -> &[GrammarNode] {
        match &self.content {
            NodeContent::Interior(children) => children,
            NodeContent::Leaf(_) => &[],
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            NodeContent::Leaf(text) => text.as_deref(),
            NodeContent::Interior(_) => None,
        }
    }

    /// Pre-order walk over the subtree.
    pub fn walk(&self) -> Vec<&GrammarNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children().iter().rev());
        }
        out
    }
}

/// Projects `node` and its descendants; `source` is the parsed byte buffer.
pub fn project(node: Node<'_>, source: &[u8]) -> GrammarNode {
    let content = if node.child_count() == 0 {
        let start = node.start_byte().min(source.len());
        let end = node.end_byte().min(source.len());
        let text = String::from_utf8_lossy(&source[start..end]);
        NodeContent::Leaf((!text.trim().is_empty()).then(|| text.into_owned()))
    } else {
        let mut cursor = node.walk();
        NodeContent::Interior(
            node.children(&mut cursor)
                .map(|child| project(child, source))
                .collect(),
        )
    };

    GrammarNode {
        kind: node.kind().to_string(),
        start: node.start_position().into(),
        end: node.end_position().into(),
        content,
    }
}

/// Parses `code` with `entry` and projects the whole tree.
pub fn parse_to_node(entry: &GrammarEntry, code: &str) -> Result<(tree_sitter::Tree, GrammarNode)> {
    let tree = entry.parse(code)?;
    let root = project(tree.root_node(), code.as_bytes());
    Ok((tree, root))
}

impl Serialize for GrammarNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", &self.kind)?;
        map.serialize_entry("start", &self.start)?;
        map.serialize_entry("end", &self.end)?;
        match &self.content {
            NodeContent::Leaf(Some(text)) => map.serialize_entry("text", text)?,
            NodeContent::Leaf(None) => {}
            NodeContent::Interior(children) => map.serialize_entry("children", children)?,
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(kind: &str, text: Option<&str>) -> GrammarNode {
        GrammarNode {
            kind: kind.into(),
            start: Position { row: 0, column: 0 },
            end: Position { row: 0, column: 1 },
            content: NodeContent::Leaf(text.map(str::to_string)),
        }
    }

    #[test]
    fn leaf_serializes_text_only_when_present() {
        let v = serde_json::to_value(leaf("identifier", Some("x"))).unwrap();
        assert_eq!(v["text"], "x");
        assert!(v.get("children").is_none());

        let v = serde_json::to_value(leaf(";", None)).unwrap();
        assert!(v.get("text").is_none());
        assert!(v.get("children").is_none());
    }

    #[test]
    fn interior_serializes_children() {
        let node = GrammarNode {
            kind: "program".into(),
            start: Position { row: 0, column: 0 },
            end: Position { row: 0, column: 1 },
            content: NodeContent::Interior(vec![leaf("identifier", Some("x"))]),
        };
        let v = serde_json::to_value(&node).unwrap();
        assert_eq!(
            v,
            json!({
                "type": "program",
                "start": {"row": 0, "column": 0},
                "end": {"row": 0, "column": 1},
                "children": [{
                    "type": "identifier",
                    "start": {"row": 0, "column": 0},
                    "end": {"row": 0, "column": 1},
                    "text": "x",
                }],
            })
        );
        assert_eq!(node.walk().len(), 2);
    }
}
