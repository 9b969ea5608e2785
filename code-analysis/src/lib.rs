//! Polyglot code analysis: guess the language of a snippet, pick its file
//! extension and produce a syntax tree for it.
//!
//! ```no_run
//! use code_analysis::{classify, produce_ast};
//!
//! let code = "def add(a, b):\n    return a + b";
//! let tag = classify(code);
//! let envelope = produce_ast(code, tag.as_str());
//! assert!(envelope.supported);
//! ```

pub mod ast;
pub mod detect;
pub mod errors;
pub mod extension;
pub mod native;
pub mod types;

pub use ast::{AstEnvelope, AstResult, produce_ast};
pub use detect::{ClassifierConfig, classify, classify_with};
pub use errors::{Error, Result};
pub use extension::extension_for;
pub use types::LanguageTag;
