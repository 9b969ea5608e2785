//! Grammar tree dumps for troubleshooting.
//!
//! `AST_DUMP_MODE` selects the behavior (`none` | `full` | `error`, default
//! `error`). Dumps go through `tracing` at `debug` level, never stdout.

use tracing::debug;

/// Controls when grammar trees are dumped.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AstDumpMode {
    /// Never dump.
    None,
    /// Dump every successfully parsed tree.
    Full,
    /// Dump only trees that contain `ERROR`/`MISSING` nodes, plus a short
    /// diagnostic when the grammar could not run at all.
    #[default]
    Error,
}

impl AstDumpMode {
    pub fn from_env() -> Self {
        match std::env::var("AST_DUMP_MODE")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "none" | "off" => AstDumpMode::None,
            "full" => AstDumpMode::Full,
            _ => AstDumpMode::Error,
        }
    }
}

/// Maximum number of characters of node source shown per line.
pub const AST_DUMP_MAX_TEXT: usize = 160;

/// Dumps `tree` after a successful parse, depending on `mode`.
pub fn maybe_dump_tree(mode: AstDumpMode, tree: &tree_sitter::Tree, code: &str, language: &str) {
    let has_error = tree.root_node().has_error();
    match mode {
        AstDumpMode::Full => {
            debug!(language, has_error, "grammar tree dump\n{}", dump_ast_full(tree, code));
        }
        AstDumpMode::Error if has_error => {
            debug!(language, "grammar tree contains errors\n{}", dump_ast_full(tree, code));
        }
        _ => {}
    }
}

/// Short diagnostic when no tree is available.
pub fn maybe_dump_on_parse_error(
    mode: AstDumpMode,
    language: &str,
    error: &dyn std::fmt::Display,
    code: &str,
) {
    if matches!(mode, AstDumpMode::Error | AstDumpMode::Full) {
        let preview: String = code.chars().take(200).collect();
        debug!(
            language,
            %error,
            preview = %preview.replace('\n', "\\n"),
            "grammar parse failed"
        );
    }
}

/// Full (named + unnamed) dump, one node per line, indented by depth.
pub fn dump_ast_full(tree: &tree_sitter::Tree, code: &str) -> String {
    use std::fmt::Write as _;
    let mut out = String::new();

    let mut stack = vec![(tree.root_node(), 0usize)];
    while let Some((node, depth)) = stack.pop() {
        let s = node.start_byte().min(code.len());
        let e = node.end_byte().min(code.len());
        let text: String = code
            .get(s..e)
            .unwrap_or_default()
            .lines()
            .next()
            .unwrap_or_default()
            .chars()
            .take(AST_DUMP_MAX_TEXT)
            .collect();

        let _ = writeln!(
            &mut out,
            "{indent}{kind} [{s}..{e}] named={named} text={text}",
            indent = " ".repeat(depth * 2),
            kind = node.kind(),
            named = node.is_named(),
        );

        let mut w = node.walk();
        let children: Vec<_> = node.children(&mut w).collect();
        for ch in children.into_iter().rev() {
            stack.push((ch, depth + 1));
        }
    }
    out
}
