use crate::normalize::CanonicalLanguage;

const PYTHON: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in",
    "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with",
    "yield",
];

const JAVA: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long", "native",
    "new", "package", "private", "protected", "public", "return", "short", "static", "strictfp",
    "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try", "void",
    "volatile", "while", "true", "false", "null",
];

const JAVASCRIPT: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "let", "new", "null", "of", "return", "static", "super", "switch",
    "this", "throw", "true", "try", "typeof", "undefined", "var", "void", "while", "with", "yield",
];

const C: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else", "enum",
    "extern", "float", "for", "goto", "if", "inline", "int", "long", "register", "restrict",
    "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef", "union",
    "unsigned", "void", "volatile", "while", "NULL",
];

const CPP_EXTRA: &[&str] = &[
    "bool", "catch", "class", "constexpr", "delete", "explicit", "false", "friend", "namespace",
    "new", "noexcept", "nullptr", "operator", "private", "protected", "public", "template", "this",
    "throw", "true", "try", "typename", "using", "virtual",
];

const C_SHARP: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked", "class",
    "const", "continue", "decimal", "default", "delegate", "do", "double", "else", "enum", "event",
    "explicit", "extern", "false", "finally", "fixed", "float", "for", "foreach", "goto", "if",
    "implicit", "in", "int", "interface", "internal", "is", "lock", "long", "namespace", "new",
    "null", "object", "operator", "out", "override", "params", "private", "protected", "public",
    "readonly", "ref", "return", "sbyte", "sealed", "short", "sizeof", "static", "string", "struct",
    "switch", "this", "throw", "true", "try", "typeof", "uint", "ulong", "using", "var", "virtual",
    "void", "while",
];

const PHP: &[&str] = &[
    "abstract", "and", "array", "as", "break", "case", "catch", "class", "clone", "const",
    "continue", "declare", "default", "do", "echo", "else", "elseif", "empty", "extends", "final",
    "finally", "fn", "for", "foreach", "function", "global", "if", "implements", "include",
    "instanceof", "interface", "isset", "list", "namespace", "new", "or", "print", "private",
    "protected", "public", "require", "return", "static", "switch", "throw", "trait", "try",
    "unset", "use", "var", "while", "yield",
];

const GO: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough", "for",
    "func", "go", "goto", "if", "import", "interface", "map", "package", "range", "return", "select",
    "struct", "switch", "type", "var", "nil", "true", "false",
];

const RUBY: &[&str] = &[
    "BEGIN", "END", "alias", "and", "begin", "break", "case", "class", "def", "defined?", "do",
    "else", "elsif", "end", "ensure", "false", "for", "if", "in", "module", "next", "nil", "not",
    "or", "redo", "rescue", "retry", "return", "self", "super", "then", "true", "undef", "unless",
    "until", "when", "while", "yield",
];

const RUST: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe",
    "use", "where", "while",
];

/// Reserved words of `language`, used to weight unigrams.
pub fn is_keyword(language: CanonicalLanguage, token: &str) -> bool {
    match language {
        CanonicalLanguage::Python => PYTHON.contains(&token),
        CanonicalLanguage::Java => JAVA.contains(&token),
        CanonicalLanguage::JavaScript => JAVASCRIPT.contains(&token),
        CanonicalLanguage::C => C.contains(&token),
        CanonicalLanguage::Cpp => C.contains(&token) || CPP_EXTRA.contains(&token),
        CanonicalLanguage::CSharp => C_SHARP.contains(&token),
        CanonicalLanguage::Php => PHP.contains(&token),
        CanonicalLanguage::Go => GO.contains(&token),
        CanonicalLanguage::Ruby => RUBY.contains(&token),
        CanonicalLanguage::Rust => RUST.contains(&token),
    }
}
