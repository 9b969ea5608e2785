//! Expression parsing, including f-string interpolation.

use super::lexer::{Lexer, Number, StrLit, Tok, decode_escapes};
use super::parser::{PResult, Parser, is_keyword};
use super::{NativeNode, NativeValue, ParseError};

/// Expression context attached to names, attributes, subscripts and
/// sequence displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Ctx {
    Load,
    Store,
    Del,
}

impl Ctx {
    fn node(self) -> NativeNode {
        NativeNode::new(match self {
            Ctx::Load => "Load",
            Ctx::Store => "Store",
            Ctx::Del => "Del",
        })
    }
}

fn name_node(id: String, ctx: Ctx) -> NativeNode {
    NativeNode::new("Name").with("id", id).with("ctx", ctx.node())
}

fn tuple(elts: Vec<NativeNode>, ctx: Ctx) -> NativeNode {
    NativeNode::new("Tuple").with("elts", elts).with("ctx", ctx.node())
}

fn starred(value: NativeNode, ctx: Ctx) -> NativeNode {
    NativeNode::new("Starred").with("value", value).with("ctx", ctx.node())
}

fn constant(value: NativeValue, kind: Option<&str>) -> NativeNode {
    NativeNode::new("Constant")
        .with("value", value)
        .with("kind", kind.map(str::to_string))
}

fn binop(left: NativeNode, op: &'static str, right: NativeNode) -> NativeNode {
    NativeNode::new("BinOp")
        .with("left", left)
        .with("op", NativeNode::new(op))
        .with("right", right)
}

fn describe(kind: &str) -> &'static str {
    match kind {
        "Constant" => "literal",
        "Call" => "function call",
        "Compare" => "comparison",
        "Lambda" => "lambda",
        "NamedExpr" => "named expression",
        "IfExp" => "conditional expression",
        "Dict" => "dict literal",
        "Set" => "set display",
        "ListComp" | "SetComp" | "DictComp" => "comprehension",
        "GeneratorExp" => "generator expression",
        "Await" => "await expression",
        "Yield" | "YieldFrom" => "yield expression",
        "JoinedStr" => "f-string expression",
        _ => "expression",
    }
}

/// Rewrites the context of an assignment or deletion target, recursing into
/// tuples, lists and starred items. Anything else is not a valid target.
pub(super) fn set_context(mut node: NativeNode, ctx: Ctx, line: usize) -> PResult<NativeNode> {
    match node.kind() {
        "Name" | "Attribute" | "Subscript" => {}
        "Starred" => {
            if let Some(slot) = node.get_mut("value") {
                if let NativeValue::Node(inner) = std::mem::replace(slot, NativeValue::Null) {
                    *slot = set_context(*inner, ctx, line)?.into();
                }
            }
        }
        "Tuple" | "List" => {
            if let Some(NativeValue::List(items)) = node.get_mut("elts") {
                let taken = std::mem::take(items);
                let mut converted = Vec::with_capacity(taken.len());
                for item in taken {
                    converted.push(match item {
                        NativeValue::Node(inner) => set_context(*inner, ctx, line)?.into(),
                        other => other,
                    });
                }
                *items = converted;
            }
        }
        other => {
            let verb = if ctx == Ctx::Del { "delete" } else { "assign to" };
            return Err(ParseError::new(
                format!("cannot {verb} {}", describe(other)),
                line,
                0,
            ));
        }
    }
    if let Some(slot) = node.get_mut("ctx") {
        *slot = ctx.node().into();
    }
    Ok(node)
}

impl Parser {
    /// Whether the current token can begin an expression.
    pub(super) fn starts_expression(&self) -> bool {
        match self.peek() {
            Tok::Name(n) => {
                !is_keyword(n)
                    || matches!(n.as_str(), "True" | "False" | "None" | "not" | "lambda" | "await")
            }
            Tok::Number(_) | Tok::Str(_) => true,
            Tok::Op(op) => matches!(*op, "(" | "[" | "{" | "-" | "+" | "~" | "*" | "..."),
            _ => false,
        }
    }

    /// Comma-separated expressions; more than one (or a trailing comma)
    /// yields a `Tuple`.
    pub(super) fn parse_star_expressions(&mut self) -> PResult<NativeNode> {
        let first = self.parse_star_expr()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if !self.starts_expression() {
                break;
            }
            elts.push(self.parse_star_expr()?);
        }
        Ok(tuple(elts, Ctx::Load))
    }

    fn parse_star_expr(&mut self) -> PResult<NativeNode> {
        if self.eat_op("*") {
            let value = self.parse_bitwise_or()?;
            return Ok(starred(value, Ctx::Load));
        }
        self.parse_test()
    }

    fn parse_star_named_expr(&mut self) -> PResult<NativeNode> {
        if self.eat_op("*") {
            let value = self.parse_bitwise_or()?;
            return Ok(starred(value, Ctx::Load));
        }
        self.parse_named_expr()
    }

    /// `NAME := test` or a plain test.
    pub(super) fn parse_named_expr(&mut self) -> PResult<NativeNode> {
        if matches!(self.peek_nth(1), Tok::Op(":=")) {
            if let Tok::Name(name) = self.peek() {
                if !is_keyword(name) {
                    let target = name_node(name.clone(), Ctx::Store);
                    self.advance();
                    self.advance();
                    let value = self.parse_test()?;
                    return Ok(NativeNode::new("NamedExpr")
                        .with("target", target)
                        .with("value", value));
                }
            }
        }
        self.parse_test()
    }

    pub(super) fn parse_test(&mut self) -> PResult<NativeNode> {
        if self.at_keyword("lambda") {
            return self.parse_lambda();
        }
        let body = self.parse_or_test()?;
        if !self.eat_keyword("if") {
            return Ok(body);
        }
        let test = self.parse_or_test()?;
        self.expect_keyword("else")?;
        let orelse = self.nested(Self::parse_test)?;
        Ok(NativeNode::new("IfExp")
            .with("test", test)
            .with("body", body)
            .with("orelse", orelse))
    }

    fn parse_lambda(&mut self) -> PResult<NativeNode> {
        self.expect_keyword("lambda")?;
        let args = self.parse_parameters(":", false)?;
        self.expect_op(":")?;
        let body = self.nested(Self::parse_test)?;
        Ok(NativeNode::new("Lambda").with("args", args).with("body", body))
    }

    fn parse_or_test(&mut self) -> PResult<NativeNode> {
        self.parse_bool_op("or", "Or", Self::parse_and_test)
    }

    fn parse_and_test(&mut self) -> PResult<NativeNode> {
        self.parse_bool_op("and", "And", Self::parse_not_test)
    }

    fn parse_bool_op(
        &mut self,
        keyword: &str,
        op: &'static str,
        operand: fn(&mut Self) -> PResult<NativeNode>,
    ) -> PResult<NativeNode> {
        let first = operand(self)?;
        if !self.at_keyword(keyword) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat_keyword(keyword) {
            values.push(operand(self)?);
        }
        Ok(NativeNode::new("BoolOp")
            .with("op", NativeNode::new(op))
            .with("values", values))
    }

    fn parse_not_test(&mut self) -> PResult<NativeNode> {
        if self.eat_keyword("not") {
            let operand = self.nested(Self::parse_not_test)?;
            return Ok(NativeNode::new("UnaryOp")
                .with("op", NativeNode::new("Not"))
                .with("operand", operand));
        }
        self.parse_comparison()
    }

    fn eat_comparison_op(&mut self) -> Option<&'static str> {
        let next_is = |word: &str| matches!(self.peek_nth(1), Tok::Name(m) if m == word);
        let (op, width) = match self.peek() {
            Tok::Op("<") => ("Lt", 1),
            Tok::Op(">") => ("Gt", 1),
            Tok::Op("==") => ("Eq", 1),
            Tok::Op(">=") => ("GtE", 1),
            Tok::Op("<=") => ("LtE", 1),
            Tok::Op("!=") => ("NotEq", 1),
            Tok::Name(n) if n == "in" => ("In", 1),
            Tok::Name(n) if n == "not" && next_is("in") => ("NotIn", 2),
            Tok::Name(n) if n == "is" && next_is("not") => ("IsNot", 2),
            Tok::Name(n) if n == "is" => ("Is", 1),
            _ => return None,
        };
        for _ in 0..width {
            self.advance();
        }
        Some(op)
    }

    fn parse_comparison(&mut self) -> PResult<NativeNode> {
        let left = self.parse_bitwise_or()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        while let Some(op) = self.eat_comparison_op() {
            ops.push(NativeNode::new(op));
            comparators.push(self.parse_bitwise_or()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        Ok(NativeNode::new("Compare")
            .with("left", left)
            .with("ops", ops)
            .with("comparators", comparators))
    }

    pub(super) fn parse_bitwise_or(&mut self) -> PResult<NativeNode> {
        self.parse_binary(1)
    }

    /// Binary operator precedence and node name at the cursor.
    fn peek_binary_op(&self) -> Option<(u8, &'static str)> {
        let Tok::Op(op) = self.peek() else {
            return None;
        };
        Some(match *op {
            "|" => (1, "BitOr"),
            "^" => (2, "BitXor"),
            "&" => (3, "BitAnd"),
            "<<" => (4, "LShift"),
            ">>" => (4, "RShift"),
            "+" => (5, "Add"),
            "-" => (5, "Sub"),
            "*" => (6, "Mult"),
            "/" => (6, "Div"),
            "//" => (6, "FloorDiv"),
            "%" => (6, "Mod"),
            "@" => (6, "MatMult"),
            _ => return None,
        })
    }

    /// Precedence climbing over the left-associative binary operators.
    fn parse_binary(&mut self, min_prec: u8) -> PResult<NativeNode> {
        let mut left = self.parse_factor()?;
        while let Some((prec, op)) = self.peek_binary_op() {
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            left = binop(left, op, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> PResult<NativeNode> {
        let op = match self.peek() {
            Tok::Op("+") => "UAdd",
            Tok::Op("-") => "USub",
            Tok::Op("~") => "Invert",
            _ => return self.parse_power(),
        };
        self.advance();
        let operand = self.nested(Self::parse_factor)?;
        Ok(NativeNode::new("UnaryOp")
            .with("op", NativeNode::new(op))
            .with("operand", operand))
    }

    fn parse_power(&mut self) -> PResult<NativeNode> {
        let base = if self.eat_keyword("await") {
            let value = self.parse_primary()?;
            NativeNode::new("Await").with("value", value)
        } else {
            self.parse_primary()?
        };
        if self.eat_op("**") {
            let exponent = self.nested(Self::parse_factor)?;
            return Ok(binop(base, "Pow", exponent));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> PResult<NativeNode> {
        let mut node = self.parse_atom()?;
        loop {
            if self.eat_op(".") {
                let attr = self.expect_name()?;
                node = NativeNode::new("Attribute")
                    .with("value", node)
                    .with("attr", attr)
                    .with("ctx", Ctx::Load.node());
            } else if self.eat_op("(") {
                let (args, keywords) = self.nested(Self::parse_call_arguments)?;
                node = NativeNode::new("Call")
                    .with("func", node)
                    .with("args", args)
                    .with("keywords", keywords);
            } else if self.eat_op("[") {
                let slice = self.nested(Self::parse_slices)?;
                self.expect_op("]")?;
                node = NativeNode::new("Subscript")
                    .with("value", node)
                    .with("slice", slice)
                    .with("ctx", Ctx::Load.node());
            } else {
                return Ok(node);
            }
        }
    }

    fn is_keyword_argument(&self) -> bool {
        matches!(self.peek(), Tok::Name(n) if !is_keyword(n))
            && matches!(self.peek_nth(1), Tok::Op("="))
    }

    /// Arguments after an opening `(`; consumes the closing `)`.
    pub(super) fn parse_call_arguments(&mut self) -> PResult<(Vec<NativeNode>, Vec<NativeNode>)> {
        let mut args = Vec::new();
        let mut keywords: Vec<NativeNode> = Vec::new();

        while !self.at_op(")") {
            if self.eat_op("**") {
                let value = self.parse_test()?;
                keywords.push(
                    NativeNode::new("keyword")
                        .with("arg", None::<String>)
                        .with("value", value),
                );
            } else if self.eat_op("*") {
                let value = self.parse_test()?;
                args.push(starred(value, Ctx::Load));
            } else if self.is_keyword_argument() {
                let name = self.expect_name()?;
                self.expect_op("=")?;
                let value = self.parse_test()?;
                keywords.push(NativeNode::new("keyword").with("arg", name).with("value", value));
            } else {
                let value = self.parse_named_expr()?;
                if self.at_comprehension() {
                    let generators = self.parse_comprehension_clauses()?;
                    args.push(
                        NativeNode::new("GeneratorExp")
                            .with("elt", value)
                            .with("generators", generators),
                    );
                } else {
                    if !keywords.is_empty() {
                        let unpacking = keywords
                            .iter()
                            .any(|k| matches!(k.get("arg"), Some(NativeValue::Null)));
                        return Err(self.error(if unpacking {
                            "positional argument follows keyword argument unpacking"
                        } else {
                            "positional argument follows keyword argument"
                        }));
                    }
                    args.push(value);
                }
            }
            if !self.eat_op(",") {
                break;
            }
        }

        self.expect_op(")")?;
        Ok((args, keywords))
    }

    fn parse_slices(&mut self) -> PResult<NativeNode> {
        let first = self.parse_slice_item()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if self.at_op("]") {
                break;
            }
            elts.push(self.parse_slice_item()?);
        }
        Ok(tuple(elts, Ctx::Load))
    }

    fn at_slice_end(&self) -> bool {
        self.at_op(":") || self.at_op(",") || self.at_op("]")
    }

    fn parse_slice_item(&mut self) -> PResult<NativeNode> {
        let lower = if self.at_op(":") {
            None
        } else {
            let item = self.parse_star_named_expr()?;
            if !self.at_op(":") {
                return Ok(item);
            }
            Some(item)
        };
        self.expect_op(":")?;
        let upper = if self.at_slice_end() {
            None
        } else {
            Some(self.parse_test()?)
        };
        let step = if self.eat_op(":") && !self.at_slice_end() {
            Some(self.parse_test()?)
        } else {
            None
        };
        Ok(NativeNode::new("Slice")
            .with("lower", lower)
            .with("upper", upper)
            .with("step", step))
    }

    fn parse_atom(&mut self) -> PResult<NativeNode> {
        let token = self.current().clone();
        match token.tok {
            Tok::Name(name) => {
                let singleton = match name.as_str() {
                    "True" => Some(NativeValue::Bool(true)),
                    "False" => Some(NativeValue::Bool(false)),
                    "None" => Some(NativeValue::Null),
                    _ => None,
                };
                if singleton.is_none() && is_keyword(&name) {
                    return Err(self.invalid());
                }
                self.advance();
                Ok(match singleton {
                    Some(value) => constant(value, None),
                    None => name_node(name, Ctx::Load),
                })
            }
            Tok::Number(number) => {
                self.advance();
                let value = match number {
                    Number::Int(v) => NativeValue::Int(v),
                    Number::Float(v) => NativeValue::Float(v),
                    Number::Imaginary(text) => NativeValue::Str(text),
                };
                Ok(constant(value, None))
            }
            Tok::Str(_) => self.parse_strings(),
            Tok::Op("(") => {
                self.advance();
                self.nested(Self::parse_paren_body)
            }
            Tok::Op("[") => {
                self.advance();
                self.nested(Self::parse_list_body)
            }
            Tok::Op("{") => {
                self.advance();
                self.nested(Self::parse_brace_body)
            }
            Tok::Op("...") => {
                self.advance();
                Ok(constant(NativeValue::Str("Ellipsis".into()), None))
            }
            Tok::Indent => Err(self.error("unexpected indent")),
            _ => Err(self.invalid()),
        }
    }

    pub(super) fn parse_yield(&mut self) -> PResult<NativeNode> {
        self.expect_keyword("yield")?;
        if self.eat_keyword("from") {
            let value = self.parse_test()?;
            return Ok(NativeNode::new("YieldFrom").with("value", value));
        }
        let value = if self.starts_expression() {
            Some(self.parse_star_expressions()?)
        } else {
            None
        };
        Ok(NativeNode::new("Yield").with("value", value))
    }

    fn parse_paren_body(&mut self) -> PResult<NativeNode> {
        if self.eat_op(")") {
            return Ok(tuple(Vec::new(), Ctx::Load));
        }
        if self.at_keyword("yield") {
            let value = self.parse_yield()?;
            self.expect_op(")")?;
            return Ok(value);
        }
        let first = self.parse_star_named_expr()?;
        if self.at_comprehension() {
            let generators = self.parse_comprehension_clauses()?;
            self.expect_op(")")?;
            return Ok(NativeNode::new("GeneratorExp")
                .with("elt", first)
                .with("generators", generators));
        }
        if self.eat_op(")") {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if self.at_op(")") {
                break;
            }
            elts.push(self.parse_star_named_expr()?);
        }
        self.expect_op(")")?;
        Ok(tuple(elts, Ctx::Load))
    }

    fn parse_list_body(&mut self) -> PResult<NativeNode> {
        let mut elts = Vec::new();
        if !self.at_op("]") {
            let first = self.parse_star_named_expr()?;
            if self.at_comprehension() {
                let generators = self.parse_comprehension_clauses()?;
                self.expect_op("]")?;
                return Ok(NativeNode::new("ListComp")
                    .with("elt", first)
                    .with("generators", generators));
            }
            elts.push(first);
            while self.eat_op(",") {
                if self.at_op("]") {
                    break;
                }
                elts.push(self.parse_star_named_expr()?);
            }
        }
        self.expect_op("]")?;
        Ok(NativeNode::new("List")
            .with("elts", elts)
            .with("ctx", Ctx::Load.node()))
    }

    fn parse_brace_body(&mut self) -> PResult<NativeNode> {
        if self.eat_op("}") {
            return self.finish_dict(Vec::new(), Vec::new());
        }
        if self.eat_op("**") {
            let value = self.parse_bitwise_or()?;
            return self.parse_dict_rest(vec![NativeValue::Null], vec![value]);
        }

        let first = self.parse_star_named_expr()?;
        if self.eat_op(":") {
            let value = self.parse_test()?;
            if self.at_comprehension() {
                let generators = self.parse_comprehension_clauses()?;
                self.expect_op("}")?;
                return Ok(NativeNode::new("DictComp")
                    .with("key", first)
                    .with("value", value)
                    .with("generators", generators));
            }
            return self.parse_dict_rest(vec![first.into()], vec![value]);
        }

        if self.at_comprehension() {
            let generators = self.parse_comprehension_clauses()?;
            self.expect_op("}")?;
            return Ok(NativeNode::new("SetComp")
                .with("elt", first)
                .with("generators", generators));
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if self.at_op("}") {
                break;
            }
            elts.push(self.parse_star_named_expr()?);
        }
        self.expect_op("}")?;
        Ok(NativeNode::new("Set").with("elts", elts))
    }

    /// Remaining `key: value` / `**mapping` entries after the first one.
    fn parse_dict_rest(
        &mut self,
        mut keys: Vec<NativeValue>,
        mut values: Vec<NativeNode>,
    ) -> PResult<NativeNode> {
        while self.eat_op(",") {
            if self.at_op("}") {
                break;
            }
            if self.eat_op("**") {
                keys.push(NativeValue::Null);
                values.push(self.parse_bitwise_or()?);
            } else {
                keys.push(self.parse_test()?.into());
                self.expect_op(":")?;
                values.push(self.parse_test()?);
            }
        }
        self.expect_op("}")?;
        self.finish_dict(keys, values)
    }

    fn finish_dict(&self, keys: Vec<NativeValue>, values: Vec<NativeNode>) -> PResult<NativeNode> {
        Ok(NativeNode::new("Dict").with("keys", keys).with("values", values))
    }

    fn at_comprehension(&self) -> bool {
        self.at_keyword("for")
            || (self.at_keyword("async") && matches!(self.peek_nth(1), Tok::Name(n) if n == "for"))
    }

    fn parse_comprehension_clauses(&mut self) -> PResult<Vec<NativeNode>> {
        let mut generators = Vec::new();
        while self.at_comprehension() {
            let is_async = self.eat_keyword("async");
            self.expect_keyword("for")?;
            let target = self.parse_target_list()?;
            self.expect_keyword("in")?;
            let iter = self.parse_or_test()?;
            let mut ifs = Vec::new();
            while self.eat_keyword("if") {
                ifs.push(self.parse_or_test()?);
            }
            generators.push(
                NativeNode::new("comprehension")
                    .with("target", target)
                    .with("iter", iter)
                    .with("ifs", ifs)
                    .with("is_async", i64::from(is_async)),
            );
        }
        if generators.is_empty() {
            return Err(self.invalid());
        }
        Ok(generators)
    }

    /// Targets of `for` loops and comprehensions, already in `Store` context.
    /// Items are parsed below comparison level so `in` terminates the list.
    pub(super) fn parse_target_list(&mut self) -> PResult<NativeNode> {
        let line = self.current().line;
        let first = self.parse_target_item()?;
        let node = if self.at_op(",") {
            let mut elts = vec![first];
            while self.eat_op(",") {
                if self.at_keyword("in") || self.at_op("=") {
                    break;
                }
                elts.push(self.parse_target_item()?);
            }
            tuple(elts, Ctx::Load)
        } else {
            first
        };
        set_context(node, Ctx::Store, line)
    }

    fn parse_target_item(&mut self) -> PResult<NativeNode> {
        if self.eat_op("*") {
            let value = self.parse_bitwise_or()?;
            return Ok(starred(value, Ctx::Load));
        }
        self.parse_bitwise_or()
    }

    /* ---------------------------------------------------------------- */
    /* String literals                                                  */
    /* ---------------------------------------------------------------- */

    /// Adjacent literals concatenate; any f-string part turns the whole
    /// run into a `JoinedStr`.
    fn parse_strings(&mut self) -> PResult<NativeNode> {
        let line = self.current().line;
        let mut parts: Vec<StrLit> = Vec::new();
        while let Tok::Str(lit) = self.peek() {
            parts.push(lit.clone());
            self.advance();
        }
        let Some(head) = parts.first() else {
            return Err(self.invalid());
        };

        let bytes = head.bytes;
        if parts.iter().any(|p| p.bytes != bytes) {
            return Err(ParseError::new(
                "cannot mix bytes and nonbytes literals",
                line,
                0,
            ));
        }
        let kind = head.unicode_prefix.then_some("u");

        if !parts.iter().any(|p| p.fstring) {
            let value: String = parts.iter().map(|p| p.value.as_str()).collect();
            return Ok(constant(NativeValue::Str(value), kind));
        }

        let mut values = Vec::new();
        let mut literal = String::new();
        for part in &parts {
            if part.fstring {
                self.parse_fstring_body(&part.value, part.raw, line, &mut literal, &mut values)?;
            } else {
                literal.push_str(&part.value);
            }
        }
        flush_literal(&mut literal, &mut values);
        Ok(NativeNode::new("JoinedStr").with("values", values))
    }

    fn parse_fstring_body(
        &self,
        body: &str,
        raw: bool,
        line: usize,
        literal: &mut String,
        values: &mut Vec<NativeNode>,
    ) -> PResult<()> {
        let decode = |text: &str| {
            if raw {
                text.to_string()
            } else {
                decode_escapes(text)
            }
        };

        let chars: Vec<char> = body.chars().collect();
        let mut pending = String::new();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '{' if chars.get(i + 1) == Some(&'{') => {
                    pending.push('{');
                    i += 2;
                }
                '}' if chars.get(i + 1) == Some(&'}') => {
                    pending.push('}');
                    i += 2;
                }
                '{' => {
                    literal.push_str(&decode(&pending));
                    pending.clear();
                    let field = self.parse_replacement_field(&chars, i + 1, line)?;
                    if let Some(text) = field.self_documenting {
                        literal.push_str(&text);
                    }
                    flush_literal(literal, values);
                    values.push(field.node);
                    i = field.next;
                }
                '}' => {
                    return Err(ParseError::new("f-string: single '}' is not allowed", line, 0));
                }
                c => {
                    pending.push(c);
                    i += 1;
                }
            }
        }
        literal.push_str(&decode(&pending));
        Ok(())
    }

    fn parse_replacement_field(
        &self,
        chars: &[char],
        start: usize,
        line: usize,
    ) -> PResult<ReplacementField> {
        let fail = |message: &str| ParseError::new(format!("f-string: {message}"), line, 0);

        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut j = start;
        loop {
            let Some(&c) = chars.get(j) else {
                return Err(fail("expecting '}'"));
            };
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
                j += 1;
                continue;
            }
            match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' if depth > 0 => depth -= 1,
                '}' => break,
                '!' if depth == 0 && chars.get(j + 1) != Some(&'=') => break,
                ':' if depth == 0 => break,
                _ => {}
            }
            j += 1;
        }

        let mut expression: String = chars[start..j].iter().collect();
        let mut self_documenting = None;
        let trimmed = expression.trim_end();
        if trimmed.ends_with('=')
            && !["==", "!=", "<=", ">="].iter().any(|op| trimmed.ends_with(op))
        {
            self_documenting = Some(expression.clone());
            let cut = trimmed.len() - 1;
            expression.truncate(cut);
        }
        if expression.trim().is_empty() {
            return Err(fail("empty expression not allowed"));
        }

        let tokens = Lexer::new(&format!("({expression})"))
            .tokenize()
            .map_err(|e| fail(e.message.as_str()))?;
        let mut sub = Parser::with_depth(tokens, self.depth + 1);
        let value = sub
            .parse_star_expressions()
            .map_err(|e| fail(e.message.as_str()))?;
        if !matches!(sub.peek(), Tok::Newline | Tok::EndMarker) {
            return Err(fail("invalid syntax"));
        }

        let mut conversion = -1i64;
        if chars.get(j) == Some(&'!') {
            conversion = match chars.get(j + 1) {
                Some('s') => 115,
                Some('r') => 114,
                Some('a') => 97,
                _ => return Err(fail("invalid conversion character")),
            };
            j += 2;
        }

        let mut format_spec = None;
        if chars.get(j) == Some(&':') {
            let spec_start = j + 1;
            let mut nesting = 0usize;
            let mut k = spec_start;
            loop {
                match chars.get(k) {
                    None => return Err(fail("expecting '}'")),
                    Some('{') => nesting += 1,
                    Some('}') if nesting == 0 => break,
                    Some('}') => nesting -= 1,
                    Some(_) => {}
                }
                k += 1;
            }
            let spec: String = chars[spec_start..k].iter().collect();
            let mut spec_literal = String::new();
            let mut spec_values = Vec::new();
            self.parse_fstring_body(&spec, true, line, &mut spec_literal, &mut spec_values)?;
            flush_literal(&mut spec_literal, &mut spec_values);
            format_spec = Some(NativeNode::new("JoinedStr").with("values", spec_values));
            j = k;
        }

        if chars.get(j) != Some(&'}') {
            return Err(fail("expecting '}'"));
        }
        if self_documenting.is_some() && conversion == -1 && format_spec.is_none() {
            conversion = 114;
        }

        Ok(ReplacementField {
            node: NativeNode::new("FormattedValue")
                .with("value", value)
                .with("conversion", conversion)
                .with("format_spec", format_spec),
            next: j + 1,
            self_documenting,
        })
    }
}

struct ReplacementField {
    node: NativeNode,
    /// Index just past the closing `}`.
    next: usize,
    /// Source text echoed by `{expr=}`.
    self_documenting: Option<String>,
}

fn flush_literal(literal: &mut String, values: &mut Vec<NativeNode>) {
    if !literal.is_empty() {
        values.push(constant(NativeValue::Str(std::mem::take(literal)), None));
    }
}
