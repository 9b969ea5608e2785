use serde::Serialize;

use super::grammar::GrammarNode;
use crate::native::NativeNode;

/// Which backend produced a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AstMethod {
    Native,
    Grammar,
}

/// Tree payload, in the shape of the backend that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AstTree {
    Native(NativeNode),
    Grammar(GrammarNode),
}

/// Outcome of one AST request, before it is flattened into an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum AstResult {
    Native(NativeNode),
    Grammar(GrammarNode),
    Unsupported { message: String },
    Failed { error: String },
}

/// Uniform outer shape returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AstEnvelope {
    pub supported: bool,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<AstMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ast: Option<AstTree>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AstEnvelope {
    pub fn from_result(language: &str, result: AstResult) -> Self {
        let mut envelope = Self {
            supported: false,
            language: language.to_string(),
            method: None,
            ast: None,
            message: None,
            error: None,
        };
        match result {
            AstResult::Native(tree) => {
                envelope.supported = true;
                envelope.method = Some(AstMethod::Native);
                envelope.ast = Some(AstTree::Native(tree));
            }
            AstResult::Grammar(tree) => {
                envelope.supported = true;
                envelope.method = Some(AstMethod::Grammar);
                envelope.ast = Some(AstTree::Grammar(tree));
            }
            AstResult::Unsupported { message } => envelope.message = Some(message),
            AstResult::Failed { error } => {
                envelope.message = Some(format!("Failed to generate AST: {error}"));
                envelope.error = Some(error);
            }
        }
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failed_result_carries_both_error_and_message() {
        let env = AstEnvelope::from_result(
            "python",
            AstResult::Failed {
                error: "invalid syntax (line 1)".into(),
            },
        );
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({
                "supported": false,
                "language": "python",
                "message": "Failed to generate AST: invalid syntax (line 1)",
                "error": "invalid syntax (line 1)",
            })
        );
    }

    #[test]
    fn native_result_reports_method() {
        let env = AstEnvelope::from_result("python", AstResult::Native(NativeNode::new("Module")));
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["method"], "native");
        assert_eq!(v["ast"]["type"], "Module");
        assert!(v.get("message").is_none());
    }
}
