//! Tokenizer for the native Python parser.
//!
//! Produces logical-line tokens: `Newline` ends a statement, `Indent`/`Dedent`
//! bracket blocks, newlines inside brackets and after a backslash are
//! swallowed. Blank and comment-only lines never produce tokens.

use std::num::IntErrorKind;

use super::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
    /// Imaginary literal, kept as written (`"2j"`).
    Imaginary(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrLit {
    /// Decoded value; for f-strings the raw body between the quotes.
    pub value: String,
    pub bytes: bool,
    pub fstring: bool,
    pub raw: bool,
    /// `u` prefix, surfaced as `Constant.kind`.
    pub unicode_prefix: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Name(String),
    Number(Number),
    Str(StrLit),
    Op(&'static str),
    Newline,
    Indent,
    Dedent,
    EndMarker,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: usize,
    pub col: usize,
}

/// Multi-character operators first so the longest match wins.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "->", ":=", "**", "//", "<<", ">>", "<=", ">=", "==",
    "!=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "+", "-", "*", "/", "%", "@",
    "&", "|", "^", "~", "<", ">", "(", ")", "[", "]", "{", "}", ",", ":", ".", ";", "=",
];

const TAB_SIZE: usize = 8;

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    indents: Vec<usize>,
    brackets: Vec<(char, usize)>,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
            col: 0,
            indents: vec![0],
            brackets: Vec::new(),
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    /// Tokenizes the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        loop {
            if self.at_line_start && self.brackets.is_empty() {
                if self.handle_indentation()? {
                    continue;
                }
            }
            self.skip_inline_whitespace();

            let Some(c) = self.peek() else {
                self.finish()?;
                return Ok(self.tokens);
            };

            match c {
                '#' => self.skip_comment(),
                '\\' => {
                    if self.peek_at(1) == Some('\n')
                        || (self.peek_at(1) == Some('\r') && self.peek_at(2) == Some('\n'))
                    {
                        self.bump();
                        if self.peek() == Some('\r') {
                            self.bump();
                        }
                        self.bump();
                    } else {
                        return Err(self.error("unexpected character after line continuation character"));
                    }
                }
                '\r' | '\n' => {
                    if c == '\r' {
                        self.bump();
                        if self.peek() == Some('\n') {
                            self.bump();
                        }
                    } else {
                        self.bump();
                    }
                    if self.brackets.is_empty() {
                        let (line, col) = (self.line - 1, 0);
                        self.push_at(Tok::Newline, line, col);
                        self.at_line_start = true;
                    }
                }
                c if c.is_ascii_digit() => self.lex_number()?,
                '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.lex_number()?,
                '"' | '\'' => self.lex_string(String::new())?,
                c if is_ident_start(c) => self.lex_name_or_prefixed_string()?,
                _ => self.lex_operator()?,
            }
        }
    }

    /* ---------------------------------------------------------------- */
    /* Cursor helpers                                                   */
    /* ---------------------------------------------------------------- */

    #[inline]
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn push_at(&mut self, tok: Tok, line: usize, col: usize) {
        self.tokens.push(Token { tok, line, col });
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.line, self.col)
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\x0c')) {
            self.bump();
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' || c == '\r' {
                break;
            }
            self.bump();
        }
    }

    /* ---------------------------------------------------------------- */
    /* Indentation                                                      */
    /* ---------------------------------------------------------------- */

    /// Measures the indentation of a new physical line. Returns `true` when
    /// the line was blank or comment-only and has been consumed entirely.
    fn handle_indentation(&mut self) -> Result<bool, ParseError> {
        let mut width = 0usize;
        loop {
            match self.peek() {
                Some(' ') => width += 1,
                Some('\t') => width = (width / TAB_SIZE + 1) * TAB_SIZE,
                Some('\x0c') => width = 0,
                _ => break,
            }
            self.bump();
        }

        match self.peek() {
            None => return Ok(false),
            Some('#') => {
                self.skip_comment();
                self.skip_newline();
                return Ok(true);
            }
            Some('\n' | '\r') => {
                self.skip_newline();
                return Ok(true);
            }
            _ => {}
        }

        self.at_line_start = false;
        let current = *self.indents.last().unwrap_or(&0);
        let (line, col) = (self.line, self.col);
        if width > current {
            if self.tokens.is_empty() {
                return Err(ParseError::new("unexpected indent", line, col));
            }
            self.indents.push(width);
            self.push_at(Tok::Indent, line, col);
        } else if width < current {
            while self.indents.last().is_some_and(|top| *top > width) {
                self.indents.pop();
                self.push_at(Tok::Dedent, line, col);
            }
            if self.indents.last() != Some(&width) {
                return Err(ParseError::new(
                    "unindent does not match any outer indentation level",
                    line,
                    col,
                ));
            }
        }
        Ok(false)
    }

    fn skip_newline(&mut self) {
        if self.peek() == Some('\r') {
            self.bump();
        }
        if self.peek() == Some('\n') {
            self.bump();
        }
    }

    fn finish(&mut self) -> Result<(), ParseError> {
        if let Some((open, line)) = self.brackets.last().copied() {
            return Err(ParseError::new(format!("'{open}' was never closed"), line, 0));
        }
        let needs_newline = self
            .tokens
            .last()
            .is_some_and(|t| !matches!(t.tok, Tok::Newline | Tok::Dedent | Tok::Indent));
        let (line, col) = (self.line, self.col);
        if needs_newline {
            self.push_at(Tok::Newline, line, col);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push_at(Tok::Dedent, line, col);
        }
        self.push_at(Tok::EndMarker, line, col);
        Ok(())
    }

    /* ---------------------------------------------------------------- */
    /* Names, numbers, operators                                        */
    /* ---------------------------------------------------------------- */

    fn lex_name_or_prefixed_string(&mut self) -> Result<(), ParseError> {
        let (line, col) = (self.line, self.col);
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        let name: String = self.chars[start..self.pos].iter().collect();

        if matches!(self.peek(), Some('"' | '\'')) && is_string_prefix(&name) {
            return self.lex_string_at(name.to_ascii_lowercase(), line, col);
        }
        self.push_at(Tok::Name(name), line, col);
        Ok(())
    }

    fn lex_number(&mut self) -> Result<(), ParseError> {
        let (line, col) = (self.line, self.col);
        let start = self.pos;

        let radix = match (self.peek(), self.peek_at(1)) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('o' | 'O')) => Some(8),
            (Some('0'), Some('b' | 'B')) => Some(2),
            _ => None,
        };

        if let Some(radix) = radix {
            self.bump();
            self.bump();
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_digit(radix) || c == '_') {
                self.bump();
            }
            let digits: String = self.chars[digits_start..self.pos]
                .iter()
                .filter(|c| **c != '_')
                .collect();
            let number = match i64::from_str_radix(&digits, radix) {
                Ok(value) => Number::Int(value),
                // Arbitrary-precision ints degrade to floats, as decimals do.
                Err(e) if *e.kind() == IntErrorKind::PosOverflow => Number::Float(
                    digits
                        .chars()
                        .filter_map(|c| c.to_digit(radix))
                        .fold(0.0, |acc, digit| acc * f64::from(radix) + f64::from(digit)),
                ),
                Err(_) => return Err(ParseError::new("invalid number literal", line, col)),
            };
            self.push_at(Tok::Number(number), line, col);
            return Ok(());
        }

        let mut is_float = false;
        self.eat_digits();
        if self.peek() == Some('.') {
            is_float = true;
            self.bump();
            self.eat_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.bump();
                if sign {
                    self.bump();
                }
                self.eat_digits();
            }
        }

        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();

        if matches!(self.peek(), Some('j' | 'J')) {
            self.bump();
            self.push_at(Tok::Number(Number::Imaginary(format!("{text}j"))), line, col);
            return Ok(());
        }
        if self.peek().is_some_and(is_ident_start) {
            return Err(ParseError::new("invalid decimal literal", line, col));
        }

        let number = if is_float {
            Number::Float(
                text.parse()
                    .map_err(|_| ParseError::new("invalid number literal", line, col))?,
            )
        } else {
            match text.parse::<i64>() {
                Ok(v) => Number::Int(v),
                // Arbitrary-precision ints degrade to floats.
                Err(_) => Number::Float(
                    text.parse()
                        .map_err(|_| ParseError::new("invalid number literal", line, col))?,
                ),
            }
        };
        self.push_at(Tok::Number(number), line, col);
        Ok(())
    }

    fn eat_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
            self.bump();
        }
    }

    fn lex_operator(&mut self) -> Result<(), ParseError> {
        let (line, col) = (self.line, self.col);
        let op = OPERATORS
            .iter()
            .find(|op| {
                op.chars()
                    .enumerate()
                    .all(|(i, c)| self.peek_at(i) == Some(c))
            })
            .copied();

        let Some(op) = op else {
            let c = self.peek().unwrap_or('?');
            return Err(ParseError::new(format!("invalid character '{c}'"), line, col));
        };

        for _ in 0..op.chars().count() {
            self.bump();
        }

        match op {
            "(" | "[" | "{" => {
                let open = op.chars().next().unwrap_or('(');
                self.brackets.push((open, line));
            }
            ")" | "]" | "}" => {
                let close = op.chars().next().unwrap_or(')');
                match self.brackets.pop() {
                    Some((open, _)) if matching(open) == close => {}
                    Some((open, _)) => {
                        return Err(ParseError::new(
                            format!(
                                "closing parenthesis '{close}' does not match opening parenthesis '{open}'"
                            ),
                            line,
                            col,
                        ));
                    }
                    None => {
                        return Err(ParseError::new(format!("unmatched '{close}'"), line, col));
                    }
                }
            }
            _ => {}
        }

        self.push_at(Tok::Op(op), line, col);
        Ok(())
    }

    /* ---------------------------------------------------------------- */
    /* Strings                                                          */
    /* ---------------------------------------------------------------- */

    fn lex_string(&mut self, prefix: String) -> Result<(), ParseError> {
        let (line, col) = (self.line, self.col);
        self.lex_string_at(prefix, line, col)
    }

    fn lex_string_at(&mut self, prefix: String, line: usize, col: usize) -> Result<(), ParseError> {
        let raw = prefix.contains('r');
        let bytes = prefix.contains('b');
        let fstring = prefix.contains('f');
        let unicode_prefix = prefix == "u";

        let quote = self.bump().unwrap_or('"');
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }

        let mut body = String::new();
        loop {
            let Some(c) = self.peek() else {
                let message = if triple {
                    "unterminated triple-quoted string literal"
                } else {
                    "unterminated string literal"
                };
                return Err(ParseError::new(message, line, col));
            };

            if c == quote {
                if !triple {
                    self.bump();
                    break;
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                    self.bump();
                    self.bump();
                    self.bump();
                    break;
                }
                body.push(c);
                self.bump();
                continue;
            }

            if (c == '\n' || c == '\r') && !triple {
                return Err(ParseError::new("unterminated string literal", line, col));
            }

            if c == '\\' {
                // Keep escapes verbatim here; decoding happens below.
                body.push(c);
                self.bump();
                if let Some(next) = self.bump() {
                    body.push(next);
                }
                continue;
            }

            body.push(c);
            self.bump();
        }

        let value = if raw || fstring {
            body
        } else {
            decode_escapes(&body)
        };

        self.push_at(
            Tok::Str(StrLit {
                value,
                bytes,
                fstring,
                raw,
                unicode_prefix,
            }),
            line,
            col,
        );
        Ok(())
    }
}

fn matching(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn is_string_prefix(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
    )
}

/// Decodes backslash escapes of a non-raw literal.
pub(crate) fn decode_escapes(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(esc) = chars.next() else {
            out.push('\\');
            break;
        };
        match esc {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut value = esc.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            }
            'x' | 'u' | 'U' => {
                let len = match esc {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let hex: String = (0..len).filter_map(|_| chars.next()).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push('\\');
                        out.push(esc);
                        out.push_str(&hex);
                    }
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Tok> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.tok)
            .collect()
    }

    #[test]
    fn indent_and_dedent_bracket_blocks() {
        let toks = kinds("if x:\n    y\nz\n");
        assert_eq!(
            toks,
            vec![
                Tok::Name("if".into()),
                Tok::Name("x".into()),
                Tok::Op(":"),
                Tok::Newline,
                Tok::Indent,
                Tok::Name("y".into()),
                Tok::Newline,
                Tok::Dedent,
                Tok::Name("z".into()),
                Tok::Newline,
                Tok::EndMarker,
            ]
        );
    }

    #[test]
    fn newlines_inside_brackets_are_ignored() {
        let toks = kinds("f(a,\n  b)\n");
        assert!(!toks[..toks.len() - 2].contains(&Tok::Newline));
    }

    #[test]
    fn blank_and_comment_lines_produce_nothing() {
        let toks = kinds("\n# comment\n\nx\n");
        assert_eq!(toks, vec![Tok::Name("x".into()), Tok::Newline, Tok::EndMarker]);
    }

    #[test]
    fn longest_operator_wins() {
        let toks = kinds("a **= 2\n");
        assert!(toks.contains(&Tok::Op("**=")));
    }

    #[test]
    fn numbers() {
        let toks = kinds("0x1F 1_000 2.5 1e3 3j\n");
        assert_eq!(toks[0], Tok::Number(Number::Int(31)));
        assert_eq!(toks[1], Tok::Number(Number::Int(1000)));
        assert_eq!(toks[2], Tok::Number(Number::Float(2.5)));
        assert_eq!(toks[3], Tok::Number(Number::Float(1000.0)));
        assert_eq!(toks[4], Tok::Number(Number::Imaginary("3j".into())));
    }

    #[test]
    fn oversized_radix_literals_become_floats() {
        let toks = kinds("0xFFFFFFFFFFFFFFFFFF 0o7_7 0x7FFFFFFFFFFFFFFF\n");
        let Tok::Number(Number::Float(big)) = toks[0] else {
            panic!("expected float, got {:?}", toks[0]);
        };
        assert_eq!(big, 2f64.powi(72));
        assert_eq!(toks[1], Tok::Number(Number::Int(63)));
        assert_eq!(toks[2], Tok::Number(Number::Int(i64::MAX)));

        assert!(Lexer::new("0x\n").tokenize().is_err());
    }

    #[test]
    fn string_escapes_and_prefixes() {
        let toks = kinds("'a\\nb' r'a\\nb' b'x'\n");
        let Tok::Str(s) = &toks[0] else { panic!() };
        assert_eq!(s.value, "a\nb");
        let Tok::Str(s) = &toks[1] else { panic!() };
        assert_eq!(s.value, "a\\nb");
        let Tok::Str(s) = &toks[2] else { panic!() };
        assert!(s.bytes);
    }

    #[test]
    fn triple_quoted_spans_lines() {
        let toks = kinds("\"\"\"a\nb\"\"\"\n");
        let Tok::Str(s) = &toks[0] else { panic!() };
        assert_eq!(s.value, "a\nb");
    }

    #[test]
    fn errors() {
        assert!(Lexer::new("(1, 2\n").tokenize().is_err());
        assert!(Lexer::new("x)\n").tokenize().is_err());
        assert!(Lexer::new("'abc\n").tokenize().is_err());
        assert!(Lexer::new("if x:\n    a\n  b\n").tokenize().is_err());
        assert!(Lexer::new("  x\n").tokenize().is_err());
    }
}
