//! Native parser for the privileged language (Python).
//!
//! Produces a tree whose node kinds and field names follow the reference
//! Python grammar's abstract syntax (`Module`, `FunctionDef`, `Name`, ...).
//! Positional attributes are not emitted.
//!
//! Not supported: `match` statements, type-parameter syntax, and
//! `type` alias statements. Inputs using them fail with a syntax error.

mod expr;
mod lexer;
mod node;
mod parser;

pub use node::{NativeNode, NativeValue};

/// Syntax error raised by the native parser.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (line {line})")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Stack size of the thread that runs the recursive-descent parser.
const PARSER_STACK_SIZE: usize = 16 * 1024 * 1024;

/// Parses a whole module.
///
/// Parsing runs on a scoped thread with its own [`PARSER_STACK_SIZE`] stack,
/// so the nesting limit does not depend on the caller's stack.
pub fn parse_module(source: &str) -> Result<NativeNode, ParseError> {
    std::thread::scope(|scope| {
        let worker = std::thread::Builder::new()
            .name("native-parser".into())
            .stack_size(PARSER_STACK_SIZE)
            .spawn_scoped(scope, || {
                let tokens = lexer::Lexer::new(source).tokenize()?;
                parser::Parser::new(tokens).parse_module()
            })
            .map_err(|e| ParseError::new(format!("cannot start parser thread: {e}"), 1, 0))?;
        worker
            .join()
            .unwrap_or_else(|_| Err(ParseError::new("parser thread panicked", 1, 0)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn parse_json(src: &str) -> Value {
        serde_json::to_value(parse_module(src).unwrap()).unwrap()
    }

    fn first_stmt(src: &str) -> Value {
        parse_json(src)["body"][0].clone()
    }

    #[test]
    fn function_definition() {
        let module = parse_json("def add(a, b):\n    return a + b\n");
        assert_eq!(module["type"], "Module");
        assert_eq!(module["body"].as_array().unwrap().len(), 1);

        let def = &module["body"][0];
        assert_eq!(def["type"], "FunctionDef");
        assert_eq!(def["name"], "add");
        assert_eq!(def["args"]["args"][0], json!({"type": "arg", "arg": "a", "annotation": null, "type_comment": null}));
        assert_eq!(def["body"][0]["type"], "Return");
        assert_eq!(
            def["body"][0]["value"],
            json!({
                "type": "BinOp",
                "left": {"type": "Name", "id": "a", "ctx": {"type": "Load"}},
                "op": {"type": "Add"},
                "right": {"type": "Name", "id": "b", "ctx": {"type": "Load"}},
            })
        );
    }

    #[test]
    fn assignment_targets_are_stored() {
        let stmt = first_stmt("a, *b = c = f(x, y=1)\n");
        assert_eq!(stmt["type"], "Assign");
        assert_eq!(stmt["targets"][0]["type"], "Tuple");
        assert_eq!(stmt["targets"][0]["ctx"]["type"], "Store");
        assert_eq!(stmt["targets"][0]["elts"][1]["type"], "Starred");
        assert_eq!(stmt["targets"][0]["elts"][1]["value"]["ctx"]["type"], "Store");
        assert_eq!(stmt["targets"][1]["id"], "c");
        assert_eq!(stmt["value"]["keywords"][0]["arg"], "y");
    }

    #[test]
    fn operator_precedence() {
        let stmt = first_stmt("x = 1 + 2 * -3 ** 2\n");
        let value = &stmt["value"];
        assert_eq!(value["op"]["type"], "Add");
        assert_eq!(value["right"]["op"]["type"], "Mult");
        assert_eq!(value["right"]["right"]["type"], "UnaryOp");
        assert_eq!(value["right"]["right"]["operand"]["op"]["type"], "Pow");
    }

    #[test]
    fn comparison_chain() {
        let stmt = first_stmt("a < b not in c is not d\n");
        let ops: Vec<_> = stmt["value"]["ops"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ops, ["Lt", "NotIn", "IsNot"]);
    }

    #[test]
    fn class_with_methods_and_decorators() {
        let src = "@dataclass\nclass Point(Base, metaclass=Meta):\n    x: int = 0\n\n    @property\n    def norm(self):\n        return (self.x ** 2) ** 0.5\n";
        let class = first_stmt(src);
        assert_eq!(class["type"], "ClassDef");
        assert_eq!(class["bases"][0]["id"], "Base");
        assert_eq!(class["keywords"][0]["arg"], "metaclass");
        assert_eq!(class["decorator_list"][0]["id"], "dataclass");
        assert_eq!(class["body"][0]["type"], "AnnAssign");
        assert_eq!(class["body"][0]["simple"], 1);
        assert_eq!(class["body"][1]["decorator_list"][0]["id"], "property");
    }

    #[test]
    fn control_flow() {
        let src = "\
for i, v in enumerate(xs):
    if v > 0:
        continue
    elif v < 0:
        break
    else:
        pass
else:
    done()
while True:
    try:
        step()
    except (ValueError, KeyError) as e:
        raise RuntimeError() from e
    finally:
        cleanup()
";
        let module = parse_json(src);
        let for_stmt = &module["body"][0];
        assert_eq!(for_stmt["type"], "For");
        assert_eq!(for_stmt["target"]["type"], "Tuple");
        assert_eq!(for_stmt["body"][0]["orelse"][0]["type"], "If");
        assert_eq!(for_stmt["orelse"][0]["type"], "Expr");

        let try_stmt = &module["body"][1]["body"][0];
        assert_eq!(try_stmt["type"], "Try");
        assert_eq!(try_stmt["handlers"][0]["name"], "e");
        assert_eq!(try_stmt["handlers"][0]["body"][0]["cause"]["id"], "e");
        assert_eq!(try_stmt["finalbody"][0]["type"], "Expr");
    }

    #[test]
    fn imports() {
        let module = parse_json("import os.path as p, sys\nfrom ..pkg import (a, b as c,)\nfrom . import *\n");
        assert_eq!(module["body"][0]["names"][0]["name"], "os.path");
        assert_eq!(module["body"][0]["names"][0]["asname"], "p");
        assert_eq!(module["body"][1]["module"], "pkg");
        assert_eq!(module["body"][1]["level"], 2);
        assert_eq!(module["body"][1]["names"][1]["asname"], "c");
        assert_eq!(module["body"][2]["module"], Value::Null);
        assert_eq!(module["body"][2]["names"][0]["name"], "*");
    }

    #[test]
    fn comprehensions_and_displays() {
        let stmt = first_stmt("r = [x * 2 for x in xs if x], {k: v for k, v in d.items()}, {1, 2}, {}\n");
        let elts = &stmt["value"]["elts"];
        assert_eq!(elts[0]["type"], "ListComp");
        assert_eq!(elts[0]["generators"][0]["ifs"][0]["id"], "x");
        assert_eq!(elts[0]["generators"][0]["is_async"], 0);
        assert_eq!(elts[1]["type"], "DictComp");
        assert_eq!(elts[2]["type"], "Set");
        assert_eq!(elts[3], json!({"type": "Dict", "keys": [], "values": []}));
    }

    #[test]
    fn lambda_and_defaults() {
        let stmt = first_stmt("def f(a, /, b=1, *args, c, d=2, **kw): return lambda x, y=0: x\n");
        let args = &stmt["args"];
        assert_eq!(args["posonlyargs"][0]["arg"], "a");
        assert_eq!(args["args"][0]["arg"], "b");
        assert_eq!(args["vararg"]["arg"], "args");
        assert_eq!(args["kw_defaults"], json!([null, {"type": "Constant", "value": 2, "kind": null}]));
        assert_eq!(args["kwarg"]["arg"], "kw");
        assert_eq!(stmt["body"][0]["value"]["type"], "Lambda");
    }

    #[test]
    fn strings_and_fstrings() {
        let stmt = first_stmt("s = 'a' \"b\"\n");
        assert_eq!(stmt["value"]["value"], "ab");

        let stmt = first_stmt("s = f'x={x!r:>{width}} {{lit}}'\n");
        let values = &stmt["value"]["values"];
        assert_eq!(stmt["value"]["type"], "JoinedStr");
        assert_eq!(values[0]["value"], "x=");
        assert_eq!(values[1]["type"], "FormattedValue");
        assert_eq!(values[1]["conversion"], 114);
        assert_eq!(values[1]["format_spec"]["values"][1]["value"]["id"], "width");
        assert_eq!(values[2]["value"], " {lit}");
    }

    #[test]
    fn with_and_async() {
        let src = "async def main():\n    async with (a as b, c as d):\n        await g()\n";
        let def = first_stmt(src);
        assert_eq!(def["type"], "AsyncFunctionDef");
        let with = &def["body"][0];
        assert_eq!(with["type"], "AsyncWith");
        assert_eq!(with["items"].as_array().unwrap().len(), 2);
        assert_eq!(with["items"][1]["optional_vars"]["ctx"]["type"], "Store");
        assert_eq!(with["body"][0]["value"]["type"], "Await");
    }

    #[test]
    fn walrus_slices_and_yield() {
        let module = parse_json("if (n := len(a)) > 1:\n    x = a[1:n:2, ::]\ndef g():\n    yield from h()\n");
        assert_eq!(module["body"][0]["test"]["left"]["type"], "NamedExpr");
        let slice = &module["body"][0]["body"][0]["value"]["slice"];
        assert_eq!(slice["type"], "Tuple");
        assert_eq!(slice["elts"][0]["type"], "Slice");
        assert_eq!(module["body"][1]["body"][0]["value"]["type"], "YieldFrom");
    }

    #[test]
    fn empty_source_is_empty_module() {
        assert_eq!(parse_json(""), json!({"type": "Module", "body": [], "type_ignores": []}));
        assert_eq!(parse_json("# just a comment\n"), json!({"type": "Module", "body": [], "type_ignores": []}));
    }

    #[test]
    fn syntax_errors_carry_position() {
        let err = parse_module("def broken(:\n    pass\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.to_string().ends_with("(line 1)"));

        let err = parse_module("x = 1\n1 = x\n").unwrap_err();
        assert_eq!(err.message, "cannot assign to literal");
        assert_eq!(err.line, 2);

        assert!(parse_module("print 'hello'\n").is_err());
        assert!(parse_module("def f():\nreturn 1\n").is_err());
        assert!(parse_module("if x:\n    pass\n  else:\n    pass\n").is_err());
    }

    fn brackets(open: &str, close: &str, depth: usize) -> String {
        format!("x = {}1{}\n", open.repeat(depth), close.repeat(depth))
    }

    #[rstest]
    #[case("(", ")")]
    #[case("[", "]")]
    #[case("f(", ")")]
    fn nesting_limit_counts_one_level_per_bracket(#[case] open: &str, #[case] close: &str) {
        assert!(parse_module(&brackets(open, close, parser::MAX_NESTING)).is_ok());

        let err = parse_module(&brackets(open, close, parser::MAX_NESTING + 1)).unwrap_err();
        assert!(err.message.contains("nested"), "{}", err.message);
    }

    #[test]
    fn deep_nesting_is_refused() {
        let err = parse_module(&brackets("(", ")", 500)).unwrap_err();
        assert!(err.message.contains("nested"));

        let chain: String = (0..500).map(|i| format!("elif x == {i}:\n    pass\n")).collect();
        let err = parse_module(&format!("if x:\n    pass\n{chain}")).unwrap_err();
        assert!(err.message.contains("nested"));
    }

    #[test]
    fn nested_blocks_within_limit_parse() {
        let mut src = String::new();
        for level in 0..parser::MAX_NESTING {
            src.push_str(&format!("{}if x:\n", "    ".repeat(level)));
        }
        src.push_str(&format!("{}pass\n", "    ".repeat(parser::MAX_NESTING)));
        assert!(parse_module(&src).is_ok());
    }
}
