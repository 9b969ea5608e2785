//! Native tree shape: `{type, <field>: scalar | node | [..]}`.
//!
//! Field order is the declaration order of the node kind and is preserved on
//! serialization.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// One node of the native syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeNode {
    kind: &'static str,
    fields: Vec<(&'static str, NativeValue)>,
}

/// Value stored in a node field.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Node(Box<NativeNode>),
    List(Vec<NativeValue>),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl NativeNode {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    /// Builder-style field append.
    pub fn with(mut self, name: &'static str, value: impl Into<NativeValue>) -> Self {
        self.fields.push((name, value.into()));
        self
    }

    /// Node type name (`"Module"`, `"FunctionDef"`, ...).
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn fields(&self) -> &[(&'static str, NativeValue)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&NativeValue> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut NativeValue> {
        self.fields
            .iter_mut()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// Child nodes stored directly in a list field (e.g. `body`).
    pub fn list(&self, name: &str) -> Vec<&NativeNode> {
        match self.get(name) {
            Some(NativeValue::List(items)) => items
                .iter()
                .filter_map(|v| match v {
                    NativeValue::Node(n) => Some(n.as_ref()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.fields.iter().map(|(_, v)| v.count()).sum::<usize>()
    }
}

impl NativeValue {
    fn count(&self) -> usize {
        match self {
            NativeValue::Node(n) => n.count(),
            NativeValue::List(items) => items.iter().map(NativeValue::count).sum(),
            _ => 0,
        }
    }

    pub fn as_node(&self) -> Option<&NativeNode> {
        match self {
            NativeValue::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<NativeNode> for NativeValue {
    fn from(n: NativeNode) -> Self {
        NativeValue::Node(Box::new(n))
    }
}

impl From<Option<NativeNode>> for NativeValue {
    fn from(n: Option<NativeNode>) -> Self {
        n.map_or(NativeValue::Null, NativeValue::from)
    }
}

impl From<Vec<NativeNode>> for NativeValue {
    fn from(items: Vec<NativeNode>) -> Self {
        NativeValue::List(items.into_iter().map(NativeValue::from).collect())
    }
}

impl From<Vec<NativeValue>> for NativeValue {
    fn from(items: Vec<NativeValue>) -> Self {
        NativeValue::List(items)
    }
}

impl From<String> for NativeValue {
    fn from(s: String) -> Self {
        NativeValue::Str(s)
    }
}

impl From<&str> for NativeValue {
    fn from(s: &str) -> Self {
        NativeValue::Str(s.to_string())
    }
}

impl From<Option<String>> for NativeValue {
    fn from(s: Option<String>) -> Self {
        s.map_or(NativeValue::Null, NativeValue::Str)
    }
}

impl From<i64> for NativeValue {
    fn from(v: i64) -> Self {
        NativeValue::Int(v)
    }
}

impl From<bool> for NativeValue {
    fn from(v: bool) -> Self {
        NativeValue::Bool(v)
    }
}

impl Serialize for NativeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("type", self.kind)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for NativeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NativeValue::Node(n) => n.serialize(serializer),
            NativeValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            NativeValue::Str(s) => serializer.serialize_str(s),
            NativeValue::Int(v) => serializer.serialize_i64(*v),
            NativeValue::Float(v) => serializer.serialize_f64(*v),
            NativeValue::Bool(v) => serializer.serialize_bool(*v),
            NativeValue::Null => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_type_first_then_fields() {
        let node = NativeNode::new("Name")
            .with("id", "x")
            .with("ctx", NativeNode::new("Load"));
        let v = serde_json::to_value(&node).unwrap();
        assert_eq!(v, json!({"type": "Name", "id": "x", "ctx": {"type": "Load"}}));
        let text = serde_json::to_string(&node).unwrap();
        assert!(text.starts_with("{\"type\":\"Name\""));
    }

    #[test]
    fn count_walks_lists_and_nodes() {
        let module = NativeNode::new("Module")
            .with("body", vec![NativeNode::new("Pass"), NativeNode::new("Pass")])
            .with("type_ignores", Vec::<NativeNode>::new());
        assert_eq!(module.count(), 3);
        assert_eq!(module.list("body").len(), 2);
    }

    #[test]
    fn missing_optional_is_null() {
        let node = NativeNode::new("Return").with("value", None::<NativeNode>);
        assert_eq!(serde_json::to_value(&node).unwrap(), json!({"type": "Return", "value": null}));
    }
}
