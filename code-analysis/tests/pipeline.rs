use code_analysis::{LanguageTag, classify, extension_for, produce_ast};
use rstest::rstest;
use serde_json::Value;

#[rstest]
#[case::python("def add(a, b):\n    return a + b", LanguageTag::Python)]
#[case::java(
    "public class Main {\n    public static void main(String[] args) {\n        System.out.println(\"hi\");\n    }\n}",
    LanguageTag::Java
)]
#[case::javascript("const add = (a, b) => a + b;\nconsole.log(add(1, 2));", LanguageTag::JavaScript)]
#[case::cpp(
    "#include <iostream>\nint main() {\n    std::cout << \"hi\" << std::endl;\n    return 0;\n}",
    LanguageTag::Cpp
)]
#[case::c(
    "#include <stdio.h>\nint main() {\n    printf(\"hi\\n\");\n    return 0;\n}",
    LanguageTag::C
)]
#[case::rust("fn main() {\n    let mut x = 5;\n    println!(\"{}\", x);\n}", LanguageTag::Rust)]
#[case::go(
    "package main\n\nimport \"fmt\"\n\nfunc main() {\n    fmt.Println(\"hi\")\n}",
    LanguageTag::Go
)]
#[case::php(
    "<?php\nfunction greet($name) {\n    echo \"Hello \" . $name;\n}",
    LanguageTag::Php
)]
#[case::csharp(
    "using System;\n\nclass Program {\n    static void Main() {\n        Console.WriteLine(\"hi\");\n    }\n}",
    LanguageTag::CSharp
)]
fn signature_snippets_classify(#[case] code: &str, #[case] expected: LanguageTag) {
    assert_eq!(classify(code), expected);
}

#[rstest]
#[case("")]
#[case("   \n\t  ")]
fn blank_input_defaults_to_python(#[case] code: &str) {
    assert_eq!(classify(code), LanguageTag::Python);
}

#[test]
fn classification_is_idempotent() {
    for code in ["x = 1", "int main() { return 0; }", "hello world", "SELECT * FROM t;"] {
        assert_eq!(classify(code), classify(code));
    }
}

#[test]
fn unknown_language_gets_default_extension() {
    assert_eq!(extension_for("klingon"), ".py");
    assert_eq!(extension_for("JAVA"), ".java");
}

#[test]
fn add_function_scenario() {
    let code = "def add(a, b):\n    return a + b";
    let tag = classify(code);
    assert_eq!(tag, LanguageTag::Python);
    assert_eq!(tag.extension(), ".py");

    let envelope = serde_json::to_value(produce_ast(code, tag.as_str())).unwrap();
    assert_eq!(envelope["supported"], true);
    assert_eq!(envelope["method"], "native");
    assert_eq!(envelope["language"], "python");

    let body = envelope["ast"]["body"].as_array().unwrap();
    assert_eq!(envelope["ast"]["type"], "Module");
    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["type"], "FunctionDef");
}

#[test]
fn invalid_python_is_captured_in_envelope() {
    let envelope = produce_ast("def add(a, b)\n    return a + b", "python");
    assert!(!envelope.supported);
    assert!(envelope.ast.is_none());
    let error = envelope.error.unwrap();
    assert_eq!(envelope.message.unwrap(), format!("Failed to generate AST: {error}"));
}

#[test]
fn unknown_language_is_unsupported() {
    let envelope = produce_ast("++++[>+<-]", "brainfuck");
    assert!(!envelope.supported);
    assert_eq!(envelope.language, "brainfuck");
    let message = envelope.message.unwrap();
    for name in ["Python", "Java", "JavaScript", "C", "C++", "C#"] {
        assert!(message.contains(name), "{message}");
    }
}

fn assert_leaf_interior_exclusive(node: &Value) -> usize {
    let has_text = node.get("text").is_some();
    let children = node.get("children").and_then(Value::as_array);
    assert!(!(has_text && children.is_some()), "node has both text and children: {node}");
    assert!(node.get("start").is_some() && node.get("end").is_some());
    1 + children
        .map(|c| c.iter().map(assert_leaf_interior_exclusive).sum::<usize>())
        .unwrap_or(0)
}

#[cfg(feature = "lang-java")]
#[test]
fn grammar_tree_nodes_are_leaf_or_interior() {
    let code = "public class A {\n    int f(int x) { return x + 1; }\n}";
    let envelope = serde_json::to_value(produce_ast(code, "java")).unwrap();
    assert_eq!(envelope["supported"], true);
    assert_eq!(envelope["method"], "grammar");
    assert_eq!(envelope["ast"]["type"], "program");
    assert!(assert_leaf_interior_exclusive(&envelope["ast"]) > 10);
}

#[cfg(feature = "lang-cpp")]
#[test]
fn whitespace_only_leaves_have_no_text() {
    // `;` leaves keep their text, but no leaf may carry blank text.
    let envelope = serde_json::to_value(produce_ast("int main() { return 0; }", "cpp")).unwrap();
    fn walk(node: &Value) {
        if let Some(text) = node.get("text").and_then(Value::as_str) {
            assert!(!text.trim().is_empty());
        }
        if let Some(children) = node.get("children").and_then(Value::as_array) {
            children.iter().for_each(walk);
        }
    }
    walk(&envelope["ast"]);
}

#[cfg(feature = "lang-javascript")]
#[rstest]
#[case(5_000)]
#[case(100_000)]
fn deeply_nested_grammar_input_is_unsupported(#[case] depth: usize) {
    let code = format!("x = {}1;", "-".repeat(depth));
    let envelope = produce_ast(&code, "javascript");
    assert!(!envelope.supported);
    assert!(envelope.ast.is_none());
    assert!(envelope.message.unwrap().starts_with("AST generation for javascript is not available."));
}

#[test]
fn deeply_nested_python_fails_without_crashing() {
    let code = format!("x = {}1\n", "-".repeat(5_000));
    let envelope = produce_ast(&code, "python");
    assert!(!envelope.supported);
    assert!(envelope.error.unwrap().contains("nested"));
}

#[test]
fn big_hex_literal_is_valid_python() {
    let envelope = serde_json::to_value(produce_ast("x = 0xFFFFFFFFFFFFFFFFFF\n", "python")).unwrap();
    assert_eq!(envelope["supported"], true);
    assert_eq!(envelope["ast"]["body"][0]["value"]["type"], "Constant");
}
