//! S-expression reader and printer
//!
//! KiCad board files are one large S-expression. Quoted strings are kept
//! apart from bare symbols so that a document can be written back without
//! changing how its strings were spelled.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unexpected token at line {line}, column {column}: {message}")]
    UnexpectedToken {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("Trailing content after root expression at line {0}")]
    TrailingContent(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SExp {
    /// Bare symbol or number.
    Atom(String),
    /// Double-quoted string.
    Str(String),
    List(Vec<SExp>),
}

impl SExp {
    pub fn atom(s: impl Into<String>) -> Self {
        SExp::Atom(s.into())
    }

    /// `(key value...)` with bare-symbol values.
    pub fn node(key: &str, values: &[&str]) -> Self {
        let mut items = vec![SExp::atom(key)];
        items.extend(values.iter().map(|v| SExp::atom(*v)));
        SExp::List(items)
    }

    /// Text of an atom or string.
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) | SExp::Str(s) => Some(s),
            SExp::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<SExp>> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    /// First symbol of a list: `segment` for `(segment ...)`.
    pub fn tag(&self) -> Option<&str> {
        self.as_list()?.first()?.as_atom()
    }

    /// Find the child list tagged `key`.
    ///
    /// For `(key value)` the value itself is returned; for longer lists the
    /// whole child list is returned so callers can index into it.
    pub fn get(&self, key: &str) -> Option<&SExp> {
        let child = self.child(key)?;
        let items = child.as_list()?;
        if items.len() == 2 {
            Some(&items[1])
        } else {
            Some(child)
        }
    }

    /// The child list tagged `key`, always as the full list.
    pub fn child(&self, key: &str) -> Option<&SExp> {
        self.as_list()?
            .iter()
            .find(|item| item.tag() == Some(key))
    }

    pub fn child_mut(&mut self, key: &str) -> Option<&mut SExp> {
        self.as_list_mut()?
            .iter_mut()
            .find(|item| item.tag() == Some(key))
    }

    /// Every child list tagged `key`.
    pub fn get_all(&self, key: &str) -> Vec<&SExp> {
        match self.as_list() {
            Some(items) => items.iter().filter(|item| item.tag() == Some(key)).collect(),
            None => Vec::new(),
        }
    }

    /// The `n`-th value of the child tagged `key` (0 is the first after the tag).
    pub fn value(&self, key: &str, n: usize) -> Option<&str> {
        self.child(key)?.as_list()?.get(n + 1)?.as_atom()
    }

    /// Bare symbol flag such as `locked` in `(segment locked ...)`, or a
    /// `(locked yes)` child as written by newer KiCad versions.
    pub fn has_flag(&self, flag: &str) -> bool {
        let Some(items) = self.as_list() else {
            return false;
        };
        items.iter().skip(1).any(|item| match item {
            SExp::Atom(s) => s == flag,
            SExp::List(_) => {
                item.tag() == Some(flag)
                    && item.as_list().and_then(|l| l.get(1)).and_then(|v| v.as_atom()) != Some("no")
            }
            SExp::Str(_) => false,
        })
    }

    /// Serialize with KiCad-like indentation: nested lists go on their own
    /// line, lists holding only atoms stay on one line.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out.push('\n');
        out
    }

    fn write_pretty(&self, out: &mut String, depth: usize) {
        let SExp::List(items) = self else {
            out.push_str(&self.to_string());
            return;
        };

        out.push('(');
        let mut broke = false;
        for (i, item) in items.iter().enumerate() {
            let own_line = matches!(item, SExp::List(_)) && (depth == 0 || item.is_compound());
            if own_line {
                out.push('\n');
                out.push_str(&"  ".repeat(depth + 1));
                broke = true;
            } else if i > 0 {
                out.push(' ');
            }
            item.write_pretty(out, depth + 1);
        }
        if broke {
            out.push('\n');
            out.push_str(&"  ".repeat(depth));
        }
        out.push(')');
    }

    /// A list that itself holds lists.
    fn is_compound(&self) -> bool {
        self.as_list()
            .map_or(false, |items| items.iter().any(|x| matches!(x, SExp::List(_))))
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.chars()
            .any(|c| c.is_whitespace() || c == '(' || c == ')' || c == '"' || c == '\\')
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in s.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExp::Atom(s) if needs_quotes(s) => write_quoted(f, s),
            SExp::Atom(s) => f.write_str(s),
            SExp::Str(s) => write_quoted(f, s),
            SExp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

pub struct SExpParser {
    input: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl SExpParser {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Parse exactly one root expression.
    pub fn parse(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }
        let root = self.parse_sexp()?;
        self.skip_whitespace();
        if !self.is_eof() {
            return Err(ParseError::TrailingContent(self.line));
        }
        Ok(root)
    }

    fn parse_sexp(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();

        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }

        match self.peek() {
            '(' => self.parse_list(),
            ')' => Err(self.unexpected("unbalanced ')'")),
            '"' => self.parse_string(),
            _ => self.parse_symbol(),
        }
    }

    fn parse_list(&mut self) -> Result<SExp, ParseError> {
        self.expect_char('(')?;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_eof() {
                return Err(ParseError::UnexpectedEof);
            }

            if self.peek() == ')' {
                self.advance();
                break;
            }

            items.push(self.parse_sexp()?);
        }

        Ok(SExp::List(items))
    }

    fn parse_string(&mut self) -> Result<SExp, ParseError> {
        self.expect_char('"')?;
        let mut s = String::new();

        loop {
            if self.is_eof() {
                return Err(ParseError::UnexpectedEof);
            }
            let ch = self.peek();
            self.advance();
            match ch {
                '"' => break,
                '\\' => {
                    if self.is_eof() {
                        return Err(ParseError::UnexpectedEof);
                    }
                    let escaped = self.peek();
                    self.advance();
                    s.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                }
                other => s.push(other),
            }
        }

        Ok(SExp::Str(s))
    }

    fn parse_symbol(&mut self) -> Result<SExp, ParseError> {
        let mut s = String::new();

        while !self.is_eof() {
            let ch = self.peek();
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            s.push(ch);
            self.advance();
        }

        if s.is_empty() {
            Err(self.unexpected("empty symbol"))
        } else {
            Ok(SExp::Atom(s))
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn peek(&self) -> char {
        self.input.get(self.pos).copied().unwrap_or('\0')
    }

    fn advance(&mut self) {
        if let Some(&ch) = self.input.get(self.pos) {
            self.pos += 1;
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn unexpected(&self, message: &str) -> ParseError {
        ParseError::UnexpectedToken {
            line: self.line,
            column: self.column,
            message: message.to_string(),
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }

        let ch = self.peek();
        if ch == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected '{}', found '{}'", expected, ch)))
        }
    }
}
