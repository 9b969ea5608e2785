//! Language name → conventional file extension.

/// Extension used when the language is not in the table.
pub const DEFAULT_EXTENSION: &str = ".py";

const EXTENSIONS: &[(&str, &str)] = &[
    ("python", ".py"),
    ("java", ".java"),
    ("javascript", ".js"),
    ("typescript", ".ts"),
    ("c++", ".cpp"),
    ("cpp", ".cpp"),
    ("c", ".c"),
    ("go", ".go"),
    ("rust", ".rs"),
    ("php", ".php"),
    ("ruby", ".rb"),
    ("swift", ".swift"),
    ("kotlin", ".kt"),
    ("csharp", ".cs"),
    ("c_sharp", ".cs"),
];

/// Returns the extension (with leading dot) for a language name.
///
/// Lookup is case-insensitive and total: unknown names get [`DEFAULT_EXTENSION`].
pub fn extension_for(language: &str) -> &'static str {
    let lower = language.to_lowercase();
    EXTENSIONS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, ext)| *ext)
        .unwrap_or(DEFAULT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("python", ".py")]
    #[case("java", ".java")]
    #[case("javascript", ".js")]
    #[case("typescript", ".ts")]
    #[case("c++", ".cpp")]
    #[case("cpp", ".cpp")]
    #[case("c", ".c")]
    #[case("go", ".go")]
    #[case("rust", ".rs")]
    #[case("php", ".php")]
    #[case("ruby", ".rb")]
    #[case("swift", ".swift")]
    #[case("kotlin", ".kt")]
    #[case("csharp", ".cs")]
    #[case("c_sharp", ".cs")]
    fn table_entries(#[case] language: &str, #[case] expected: &str) {
        assert_eq!(extension_for(language), expected);
    }

    #[rstest]
    #[case("PYTHON", ".py")]
    #[case("Java", ".java")]
    #[case("C++", ".cpp")]
    fn lookup_ignores_case(#[case] language: &str, #[case] expected: &str) {
        assert_eq!(extension_for(language), expected);
    }

    #[test]
    fn unknown_language_gets_default() {
        assert_eq!(extension_for("klingon"), DEFAULT_EXTENSION);
        assert_eq!(extension_for(""), DEFAULT_EXTENSION);
    }
}
