use serde::Deserialize;

fn default_language() -> String {
    "python".to_string()
}

/// Request payload for CodeBLEU evaluation.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateRequest {
    #[serde(default)]
    pub generated_code: String,
    #[serde(default)]
    pub reference_code: String,
    #[serde(default = "default_language")]
    pub language: String,
}
