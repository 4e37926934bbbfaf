//! Explicit cursor over a pre-lexed token vector.
//!
//! The declaration parser threads a `&mut TokenCursor` through every routine
//! instead of keeping an implicit read position. Backtracking is done with
//! `save` / `rewind`.

use crate::error::{Error, Result};
use crate::parser::token::{Token, TokenKind};

#[derive(Debug, Clone)]
pub struct TokenCursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenCursor {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Next token without consuming it.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Token `n` positions ahead of the next one.
    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    /// Consume and return the next token.
    pub fn get_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Step back over the most recently consumed token.
    pub fn unget(&mut self) {
        debug_assert!(self.pos > 0, "unget at start of input");
        self.pos = self.pos.saturating_sub(1);
    }

    pub fn save(&self) -> usize {
        self.pos
    }

    pub fn rewind(&mut self, mark: usize) {
        self.pos = mark.min(self.tokens.len());
    }

    /// Line of the token that was consumed last, or of the first token.
    pub fn line(&self) -> u32 {
        let index = self.pos.saturating_sub(1);
        self.tokens
            .get(index)
            .or_else(|| self.tokens.last())
            .map_or(1, Token::line)
    }

    pub fn peek_symbol(&self, symbol: &str) -> bool {
        self.peek().is_some_and(|t| t.is_symbol(symbol))
    }

    pub fn peek_identifier(&self, ident: &str) -> bool {
        self.peek().is_some_and(|t| t.matches(ident))
    }

    pub fn match_symbol(&mut self, symbol: &str) -> bool {
        if self.peek_symbol(symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn match_identifier(&mut self, ident: &str) -> bool {
        if self.peek_identifier(ident) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume a token that must be present.
    pub fn require_token(&mut self, context: &str) -> Result<Token> {
        self.get_token().ok_or_else(|| {
            Error::syntax(
                self.line(),
                format!("Unexpected end of file while parsing {}", context),
            )
        })
    }

    pub fn require_symbol(&mut self, symbol: &str, context: &str) -> Result<Token> {
        let token = self.require_token(context)?;
        if token.is_symbol(symbol) {
            Ok(token)
        } else {
            Err(Error::syntax(
                token.line(),
                format!("Missing '{}' in {}, found '{}'", symbol, context, token.text),
            ))
        }
    }

    pub fn require_identifier(&mut self, context: &str) -> Result<Token> {
        let token = self.require_token(context)?;
        if token.kind == TokenKind::Identifier {
            Ok(token)
        } else {
            Err(Error::syntax(
                token.line(),
                format!("Missing identifier in {}, found '{}'", context, token.text),
            ))
        }
    }

    pub fn require_keyword(&mut self, keyword: &str, context: &str) -> Result<Token> {
        let token = self.require_token(context)?;
        if token.matches(keyword) {
            Ok(token)
        } else {
            Err(Error::syntax(
                token.line(),
                format!("Expected '{}' in {}, found '{}'", keyword, context, token.text),
            ))
        }
    }

    pub fn require_int(&mut self, context: &str) -> Result<i64> {
        let token = self.require_token(context)?;
        token.int_value().ok_or_else(|| {
            Error::syntax(
                token.line(),
                format!("Expected an integer constant in {}, found '{}'", context, token.text),
            )
        })
    }

    /// Consume tokens until the matching close of `open` (already consumed).
    /// Returns the consumed tokens, excluding the final closing symbol.
    pub fn skip_balanced(&mut self, open: &str, close: &str, context: &str) -> Result<Vec<Token>> {
        let mut depth = 1usize;
        let mut consumed = Vec::new();
        loop {
            let token = self.require_token(context)?;
            if token.is_symbol(open) {
                depth += 1;
            } else if token.is_symbol(close) {
                depth -= 1;
                if depth == 0 {
                    return Ok(consumed);
                }
            }
            consumed.push(token);
        }
    }
}
