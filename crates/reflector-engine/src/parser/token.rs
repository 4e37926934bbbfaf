//! Token definitions for annotated C++ headers.
//!
//! The header language is only partially understood, so tokens are kept
//! coarse: a kind, the raw source text and its span. Keyword recognition is
//! done by the declaration parser with `matches` / `matches_ignore_case`.

use std::fmt;

/// Coarse token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Symbol,
    IntConst,
    FloatConst,
    StringConst,
    CharConst,
}

/// A single token with its raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    pub fn line(&self) -> u32 {
        self.span.line
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == symbol
    }

    /// Case-sensitive identifier match.
    pub fn matches(&self, ident: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == ident
    }

    pub fn matches_ignore_case(&self, ident: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text.eq_ignore_ascii_case(ident)
    }

    /// The contents of a string constant with the quotes removed and escapes
    /// resolved.
    pub fn string_value(&self) -> Option<String> {
        if self.kind != TokenKind::StringConst || self.text.len() < 2 {
            return None;
        }
        Some(unescape(&self.text[1..self.text.len() - 1]))
    }

    /// The value of an integer constant, ignoring `u`/`l` suffixes.
    pub fn int_value(&self) -> Option<i64> {
        if self.kind != TokenKind::IntConst {
            return None;
        }
        let digits = self.text.trim_end_matches(['u', 'U', 'l', 'L']);
        if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16).ok()
        } else {
            digits.parse().ok()
        }
    }

    /// Text used when the token is a specifier value: strings lose their
    /// quotes, everything else is taken verbatim.
    pub fn value_text(&self) -> String {
        self.string_value().unwrap_or_else(|| self.text.clone())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Byte range of a token plus the line and column it starts at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

fn unescape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('0') => result.push('\0'),
            Some(other) => result.push(other),
            None => break,
        }
    }

    result
}
