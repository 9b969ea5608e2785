//! Statement-level recursive-descent parser.
//!
//! Expressions live in `expr.rs`; both halves share the same [`Parser`]
//! cursor.

use super::expr::{Ctx, set_context};
use super::lexer::{Tok, Token};
use super::{NativeNode, NativeValue, ParseError};

pub(super) type PResult<T> = Result<T, ParseError>;

/// Maximum nesting before parsing is refused. One level is one bracket,
/// indented block, `elif` clause, unary or power operator, lambda body or
/// `else` branch of a conditional expression.
pub(crate) const MAX_NESTING: usize = 100;

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

pub(super) fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

pub(crate) struct Parser {
    pub(super) tokens: Vec<Token>,
    pub(super) pos: usize,
    pub(super) depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_depth(tokens, 0)
    }

    pub(super) fn with_depth(mut tokens: Vec<Token>, depth: usize) -> Self {
        if tokens.is_empty() {
            tokens.push(Token {
                tok: Tok::EndMarker,
                line: 1,
                col: 0,
            });
        }
        Self {
            tokens,
            pos: 0,
            depth,
        }
    }

    pub fn parse_module(mut self) -> PResult<NativeNode> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Tok::EndMarker => break,
                Tok::Newline => {
                    self.advance();
                }
                _ => body.extend(self.parse_statement()?),
            }
        }
        Ok(NativeNode::new("Module")
            .with("body", body)
            .with("type_ignores", Vec::<NativeNode>::new()))
    }

    /* ---------------------------------------------------------------- */
    /* Cursor                                                           */
    /* ---------------------------------------------------------------- */

    pub(super) fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(super) fn peek(&self) -> &Tok {
        &self.current().tok
    }

    pub(super) fn peek_nth(&self, n: usize) -> &Tok {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].tok
    }

    pub(super) fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(super) fn at_op(&self, op: &str) -> bool {
        matches!(self.peek(), Tok::Op(o) if *o == op)
    }

    pub(super) fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn expect_op(&mut self, op: &str) -> PResult<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{op}'")))
        }
    }

    pub(super) fn at_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Tok::Name(n) if n == kw)
    }

    pub(super) fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.at_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn expect_keyword(&mut self, kw: &str) -> PResult<()> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{kw}'")))
        }
    }

    /// Reserved word at the cursor, if any.
    fn keyword(&self) -> Option<String> {
        match self.peek() {
            Tok::Name(n) if is_keyword(n) => Some(n.clone()),
            _ => None,
        }
    }

    pub(super) fn expect_name(&mut self) -> PResult<String> {
        match self.peek() {
            Tok::Name(n) if !is_keyword(n) => {
                let name = n.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.invalid()),
        }
    }

    pub(super) fn expect_newline(&mut self) -> PResult<()> {
        match self.peek() {
            Tok::Newline => {
                self.advance();
                Ok(())
            }
            Tok::EndMarker => Ok(()),
            _ => Err(self.invalid()),
        }
    }

    pub(super) fn error(&self, message: impl Into<String>) -> ParseError {
        let token = self.current();
        ParseError::new(message, token.line, token.col)
    }

    pub(super) fn invalid(&self) -> ParseError {
        self.error("invalid syntax")
    }

    /// Runs `f` one nesting level deeper, failing past [`MAX_NESTING`].
    pub(super) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("too many nested parentheses or blocks"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /* ---------------------------------------------------------------- */
    /* Statements                                                       */
    /* ---------------------------------------------------------------- */

    fn parse_statement(&mut self) -> PResult<Vec<NativeNode>> {
        let keyword = self.keyword().unwrap_or_default();
        match keyword.as_str() {
            "if" => Ok(vec![self.parse_if()?]),
            "while" => Ok(vec![self.parse_while()?]),
            "for" => Ok(vec![self.parse_for(false)?]),
            "try" => Ok(vec![self.parse_try()?]),
            "with" => Ok(vec![self.parse_with(false)?]),
            "def" => Ok(vec![self.parse_funcdef(Vec::new(), false)?]),
            "class" => Ok(vec![self.parse_classdef(Vec::new())?]),
            "async" => Ok(vec![self.parse_async(Vec::new())?]),
            _ if self.at_op("@") => Ok(vec![self.parse_decorated()?]),
            _ if matches!(self.peek(), Tok::Indent) => Err(self.error("unexpected indent")),
            _ => self.parse_simple_line(),
        }
    }

    /// One physical line of `;`-separated simple statements.
    fn parse_simple_line(&mut self) -> PResult<Vec<NativeNode>> {
        let mut out = vec![self.parse_small_statement()?];
        while self.eat_op(";") {
            if matches!(self.peek(), Tok::Newline | Tok::EndMarker) {
                break;
            }
            out.push(self.parse_small_statement()?);
        }
        self.expect_newline()?;
        Ok(out)
    }

    fn parse_small_statement(&mut self) -> PResult<NativeNode> {
        let keyword = self.keyword();
        match keyword.as_deref() {
            Some("pass") => {
                self.advance();
                Ok(NativeNode::new("Pass"))
            }
            Some("break") => {
                self.advance();
                Ok(NativeNode::new("Break"))
            }
            Some("continue") => {
                self.advance();
                Ok(NativeNode::new("Continue"))
            }
            Some("return") => {
                self.advance();
                let value = if self.starts_expression() {
                    Some(self.parse_star_expressions()?)
                } else {
                    None
                };
                Ok(NativeNode::new("Return").with("value", value))
            }
            Some("raise") => {
                self.advance();
                let (exc, cause) = if self.starts_expression() {
                    let exc = self.parse_test()?;
                    let cause = if self.eat_keyword("from") {
                        Some(self.parse_test()?)
                    } else {
                        None
                    };
                    (Some(exc), cause)
                } else {
                    (None, None)
                };
                Ok(NativeNode::new("Raise").with("exc", exc).with("cause", cause))
            }
            Some(kw @ ("global" | "nonlocal")) => {
                let kind = if kw == "global" { "Global" } else { "Nonlocal" };
                self.advance();
                let mut names = vec![NativeValue::from(self.expect_name()?)];
                while self.eat_op(",") {
                    names.push(self.expect_name()?.into());
                }
                Ok(NativeNode::new(kind).with("names", names))
            }
            Some("del") => {
                self.advance();
                let mut targets = Vec::new();
                loop {
                    let line = self.current().line;
                    let target = self.parse_bitwise_or()?;
                    targets.push(set_context(target, Ctx::Del, line)?);
                    if !self.eat_op(",") || !self.starts_expression() {
                        break;
                    }
                }
                Ok(NativeNode::new("Delete").with("targets", targets))
            }
            Some("assert") => {
                self.advance();
                let test = self.parse_test()?;
                let msg = if self.eat_op(",") {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                Ok(NativeNode::new("Assert").with("test", test).with("msg", msg))
            }
            Some("import") => self.parse_import(),
            Some("from") => self.parse_from_import(),
            _ => self.parse_expr_statement(),
        }
    }

    fn parse_dotted_name(&mut self) -> PResult<String> {
        let mut name = self.expect_name()?;
        while self.eat_op(".") {
            name.push('.');
            name.push_str(&self.expect_name()?);
        }
        Ok(name)
    }

    fn parse_alias(&mut self, dotted: bool) -> PResult<NativeNode> {
        let name = if dotted {
            self.parse_dotted_name()?
        } else {
            self.expect_name()?
        };
        let asname = if self.eat_keyword("as") {
            Some(self.expect_name()?)
        } else {
            None
        };
        Ok(NativeNode::new("alias")
            .with("name", name)
            .with("asname", asname))
    }

    fn parse_import(&mut self) -> PResult<NativeNode> {
        self.expect_keyword("import")?;
        let mut names = vec![self.parse_alias(true)?];
        while self.eat_op(",") {
            names.push(self.parse_alias(true)?);
        }
        Ok(NativeNode::new("Import").with("names", names))
    }

    fn parse_from_import(&mut self) -> PResult<NativeNode> {
        self.expect_keyword("from")?;
        let mut level = 0i64;
        loop {
            if self.eat_op(".") {
                level += 1;
            } else if self.eat_op("...") {
                level += 3;
            } else {
                break;
            }
        }
        let module = if self.at_keyword("import") {
            if level == 0 {
                return Err(self.invalid());
            }
            None
        } else {
            Some(self.parse_dotted_name()?)
        };
        self.expect_keyword("import")?;

        let mut names = Vec::new();
        if self.eat_op("*") {
            names.push(NativeNode::new("alias").with("name", "*").with("asname", None::<String>));
        } else if self.eat_op("(") {
            loop {
                names.push(self.parse_alias(false)?);
                if !self.eat_op(",") || self.at_op(")") {
                    break;
                }
            }
            self.expect_op(")")?;
        } else {
            names.push(self.parse_alias(false)?);
            while self.eat_op(",") {
                names.push(self.parse_alias(false)?);
            }
        }

        Ok(NativeNode::new("ImportFrom")
            .with("module", module)
            .with("names", names)
            .with("level", level))
    }

    pub(super) fn parse_assign_value(&mut self) -> PResult<NativeNode> {
        if self.at_keyword("yield") {
            self.parse_yield()
        } else {
            self.parse_star_expressions()
        }
    }

    fn parse_expr_statement(&mut self) -> PResult<NativeNode> {
        let line = self.current().line;
        let first = self.parse_assign_value()?;

        if self.eat_op(":") {
            if !matches!(first.kind(), "Name" | "Attribute" | "Subscript") {
                return Err(ParseError::new(
                    "only single target (not tuple) can be annotated",
                    line,
                    0,
                ));
            }
            let simple = i64::from(first.kind() == "Name");
            let target = set_context(first, Ctx::Store, line)?;
            let annotation = self.parse_test()?;
            let value = if self.eat_op("=") {
                Some(self.parse_assign_value()?)
            } else {
                None
            };
            return Ok(NativeNode::new("AnnAssign")
                .with("target", target)
                .with("annotation", annotation)
                .with("value", value)
                .with("simple", simple));
        }

        if let Some(op) = augmented_op(self.peek()) {
            if !matches!(first.kind(), "Name" | "Attribute" | "Subscript") {
                return Err(ParseError::new(
                    "illegal expression for augmented assignment",
                    line,
                    0,
                ));
            }
            self.advance();
            let target = set_context(first, Ctx::Store, line)?;
            let value = self.parse_assign_value()?;
            return Ok(NativeNode::new("AugAssign")
                .with("target", target)
                .with("op", NativeNode::new(op))
                .with("value", value));
        }

        if self.at_op("=") {
            let mut chain = vec![first];
            while self.eat_op("=") {
                chain.push(self.parse_assign_value()?);
            }
            let Some(value) = chain.pop() else {
                return Err(self.invalid());
            };
            let targets = chain
                .into_iter()
                .map(|t| set_context(t, Ctx::Store, line))
                .collect::<PResult<Vec<_>>>()?;
            return Ok(NativeNode::new("Assign")
                .with("targets", targets)
                .with("value", value)
                .with("type_comment", None::<String>));
        }

        Ok(NativeNode::new("Expr").with("value", first))
    }

    /* ---------------------------------------------------------------- */
    /* Compound statements                                              */
    /* ---------------------------------------------------------------- */

    /// `':' NEWLINE INDENT stmt+ DEDENT` or `':' simple_stmts`.
    fn parse_block(&mut self) -> PResult<Vec<NativeNode>> {
        self.expect_op(":")?;
        if !matches!(self.peek(), Tok::Newline) {
            return self.parse_simple_line();
        }
        self.advance();
        if !matches!(self.peek(), Tok::Indent) {
            return Err(self.error("expected an indented block"));
        }
        self.advance();

        let mut body = Vec::new();
        while !matches!(self.peek(), Tok::Dedent | Tok::EndMarker) {
            if matches!(self.peek(), Tok::Newline) {
                self.advance();
                continue;
            }
            body.extend(self.nested(Self::parse_statement)?);
        }
        if matches!(self.peek(), Tok::Dedent) {
            self.advance();
        }
        Ok(body)
    }

    fn parse_else_block(&mut self) -> PResult<Vec<NativeNode>> {
        if self.eat_keyword("else") {
            self.parse_block()
        } else {
            Ok(Vec::new())
        }
    }

    /// Handles both `if` and `elif`; an `elif` chain nests in `orelse`.
    fn parse_if(&mut self) -> PResult<NativeNode> {
        self.advance();
        let test = self.parse_named_expr()?;
        let body = self.parse_block()?;
        let orelse = if self.at_keyword("elif") {
            vec![self.nested(Self::parse_if)?]
        } else {
            self.parse_else_block()?
        };
        Ok(NativeNode::new("If")
            .with("test", test)
            .with("body", body)
            .with("orelse", orelse))
    }

    fn parse_while(&mut self) -> PResult<NativeNode> {
        self.expect_keyword("while")?;
        let test = self.parse_named_expr()?;
        let body = self.parse_block()?;
        let orelse = self.parse_else_block()?;
        Ok(NativeNode::new("While")
            .with("test", test)
            .with("body", body)
            .with("orelse", orelse))
    }

    fn parse_for(&mut self, is_async: bool) -> PResult<NativeNode> {
        self.expect_keyword("for")?;
        let target = self.parse_target_list()?;
        self.expect_keyword("in")?;
        let iter = self.parse_star_expressions()?;
        let body = self.parse_block()?;
        let orelse = self.parse_else_block()?;
        Ok(NativeNode::new(if is_async { "AsyncFor" } else { "For" })
            .with("target", target)
            .with("iter", iter)
            .with("body", body)
            .with("orelse", orelse)
            .with("type_comment", None::<String>))
    }

    fn parse_try(&mut self) -> PResult<NativeNode> {
        self.expect_keyword("try")?;
        let body = self.parse_block()?;

        let mut handlers = Vec::new();
        let mut star = false;
        while self.eat_keyword("except") {
            if self.eat_op("*") {
                star = true;
            }
            let (kind, name) = if self.at_op(":") {
                (None, None)
            } else {
                let kind = self.parse_test()?;
                let name = if self.eat_keyword("as") {
                    Some(self.expect_name()?)
                } else {
                    None
                };
                (Some(kind), name)
            };
            let handler_body = self.parse_block()?;
            handlers.push(
                NativeNode::new("ExceptHandler")
                    .with("type", kind)
                    .with("name", name)
                    .with("body", handler_body),
            );
        }

        let orelse = if handlers.is_empty() {
            Vec::new()
        } else {
            self.parse_else_block()?
        };
        let finalbody = if self.eat_keyword("finally") {
            self.parse_block()?
        } else {
            Vec::new()
        };
        if handlers.is_empty() && finalbody.is_empty() {
            return Err(self.error("expected 'except' or 'finally' block"));
        }

        Ok(NativeNode::new(if star { "TryStar" } else { "Try" })
            .with("body", body)
            .with("handlers", handlers)
            .with("orelse", orelse)
            .with("finalbody", finalbody))
    }

    /// True when the cursor sits on `(` whose matching `)` is followed by `:`,
    /// i.e. the parenthesized form of `with` items.
    fn at_parenthesized_with_items(&self) -> bool {
        if !self.at_op("(") {
            return false;
        }
        let mut depth = 0usize;
        for (offset, token) in self.tokens[self.pos..].iter().enumerate() {
            match token.tok {
                Tok::Op("(" | "[" | "{") => depth += 1,
                Tok::Op(")" | "]" | "}") => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return matches!(self.peek_nth(offset + 1), Tok::Op(":"));
                    }
                }
                Tok::Newline | Tok::EndMarker => return false,
                _ => {}
            }
        }
        false
    }

    fn parse_with_item(&mut self) -> PResult<NativeNode> {
        let context_expr = self.parse_test()?;
        let optional_vars = if self.eat_keyword("as") {
            let line = self.current().line;
            let target = self.parse_bitwise_or()?;
            Some(set_context(target, Ctx::Store, line)?)
        } else {
            None
        };
        Ok(NativeNode::new("withitem")
            .with("context_expr", context_expr)
            .with("optional_vars", optional_vars))
    }

    fn parse_with(&mut self, is_async: bool) -> PResult<NativeNode> {
        self.expect_keyword("with")?;
        let mut items = Vec::new();
        if self.at_parenthesized_with_items() {
            self.advance();
            loop {
                items.push(self.parse_with_item()?);
                if !self.eat_op(",") || self.at_op(")") {
                    break;
                }
            }
            self.expect_op(")")?;
        } else {
            items.push(self.parse_with_item()?);
            while self.eat_op(",") {
                items.push(self.parse_with_item()?);
            }
        }
        let body = self.parse_block()?;
        Ok(NativeNode::new(if is_async { "AsyncWith" } else { "With" })
            .with("items", items)
            .with("body", body)
            .with("type_comment", None::<String>))
    }

    fn parse_decorated(&mut self) -> PResult<NativeNode> {
        let mut decorators = Vec::new();
        while self.eat_op("@") {
            decorators.push(self.parse_named_expr()?);
            self.expect_newline()?;
        }
        match self.keyword().as_deref() {
            Some("def") => self.parse_funcdef(decorators, false),
            Some("class") => self.parse_classdef(decorators),
            Some("async") => self.parse_async(decorators),
            _ => Err(self.invalid()),
        }
    }

    fn parse_async(&mut self, decorators: Vec<NativeNode>) -> PResult<NativeNode> {
        self.expect_keyword("async")?;
        match self.keyword().as_deref() {
            Some("def") => self.parse_funcdef(decorators, true),
            Some("for") if decorators.is_empty() => self.parse_for(true),
            Some("with") if decorators.is_empty() => self.parse_with(true),
            _ => Err(self.invalid()),
        }
    }

    fn parse_funcdef(&mut self, decorators: Vec<NativeNode>, is_async: bool) -> PResult<NativeNode> {
        self.expect_keyword("def")?;
        let name = self.expect_name()?;
        self.expect_op("(")?;
        let args = self.parse_parameters(")", true)?;
        self.expect_op(")")?;
        let returns = if self.eat_op("->") {
            Some(self.parse_test()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(
            NativeNode::new(if is_async { "AsyncFunctionDef" } else { "FunctionDef" })
                .with("name", name)
                .with("args", args)
                .with("body", body)
                .with("decorator_list", decorators)
                .with("returns", returns)
                .with("type_comment", None::<String>),
        )
    }

    fn parse_classdef(&mut self, decorators: Vec<NativeNode>) -> PResult<NativeNode> {
        self.expect_keyword("class")?;
        let name = self.expect_name()?;
        let (bases, keywords) = if self.eat_op("(") {
            self.parse_call_arguments()?
        } else {
            (Vec::new(), Vec::new())
        };
        let body = self.parse_block()?;
        Ok(NativeNode::new("ClassDef")
            .with("name", name)
            .with("bases", bases)
            .with("keywords", keywords)
            .with("body", body)
            .with("decorator_list", decorators))
    }

    fn parse_param(&mut self, annotated: bool) -> PResult<NativeNode> {
        let name = self.expect_name()?;
        let annotation = if annotated && self.eat_op(":") {
            Some(self.parse_test()?)
        } else {
            None
        };
        Ok(NativeNode::new("arg")
            .with("arg", name)
            .with("annotation", annotation)
            .with("type_comment", None::<String>))
    }

    /// Parameter list up to (not including) `close`. Used by `def` with
    /// `close = ")"` and by `lambda` with `close = ":"`.
    pub(super) fn parse_parameters(&mut self, close: &str, annotated: bool) -> PResult<NativeNode> {
        let mut posonly = Vec::new();
        let mut args = Vec::new();
        let mut defaults = Vec::new();
        let mut vararg = None;
        let mut kwonly = Vec::new();
        let mut kw_defaults: Vec<NativeValue> = Vec::new();
        let mut kwarg = None;
        let mut star_seen = false;

        while !self.at_op(close) {
            if kwarg.is_some() {
                return Err(self.error("arguments cannot follow var-keyword argument"));
            }
            if self.eat_op("/") {
                if star_seen || args.is_empty() || !posonly.is_empty() {
                    return Err(self.error("/ must be ahead of *"));
                }
                posonly.append(&mut args);
            } else if self.eat_op("**") {
                kwarg = Some(self.parse_param(annotated)?);
            } else if self.eat_op("*") {
                if star_seen {
                    return Err(self.error("* argument may appear only once"));
                }
                star_seen = true;
                if !self.at_op(",") && !self.at_op(close) {
                    vararg = Some(self.parse_param(annotated)?);
                }
            } else {
                let param = self.parse_param(annotated)?;
                let default = if self.eat_op("=") {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                if star_seen {
                    kwonly.push(param);
                    kw_defaults.push(default.into());
                } else {
                    match default {
                        Some(d) => defaults.push(d),
                        None if !defaults.is_empty() => {
                            return Err(
                                self.error("non-default argument follows default argument")
                            );
                        }
                        None => {}
                    }
                    args.push(param);
                }
            }
            if !self.eat_op(",") {
                break;
            }
        }

        if star_seen && vararg.is_none() && kwonly.is_empty() {
            return Err(self.error("named arguments must follow bare *"));
        }

        Ok(NativeNode::new("arguments")
            .with("posonlyargs", posonly)
            .with("args", args)
            .with("vararg", vararg)
            .with("kwonlyargs", kwonly)
            .with("kw_defaults", kw_defaults)
            .with("kwarg", kwarg)
            .with("defaults", defaults))
    }
}

fn augmented_op(tok: &Tok) -> Option<&'static str> {
    let Tok::Op(op) = tok else {
        return None;
    };
    Some(match *op {
        "+=" => "Add",
        "-=" => "Sub",
        "*=" => "Mult",
        "@=" => "MatMult",
        "/=" => "Div",
        "%=" => "Mod",
        "&=" => "BitAnd",
        "|=" => "BitOr",
        "^=" => "BitXor",
        "<<=" => "LShift",
        ">>=" => "RShift",
        "**=" => "Pow",
        "//=" => "FloorDiv",
        _ => return None,
    })
}
