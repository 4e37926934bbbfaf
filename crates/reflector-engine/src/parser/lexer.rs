//! Tokenizer for annotated C++ headers.
//!
//! Whitespace, comments and quoted constants are scanned by hand so that line
//! and column information survives multi-line block comments and so that
//! unterminated constants can be reported precisely. Everything else is
//! delegated to a small logos automaton, one token at a time.

use crate::parser::token::{Span, Token, TokenKind};
use logos::Logos;
use thiserror::Error;

/// Logos-based raw token classes.
///
/// Quoted constants and comments never reach this automaton.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum RawToken {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    #[regex(r"0[xX][0-9a-fA-F]+[uUlL]*")]
    #[regex(r"[0-9]+[uUlL]*")]
    Int,

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?[fF]?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?[fF]?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+[fF]?")]
    Float,

    // Multi-character operators. `<` and `>` are deliberately absent so that
    // nested template arguments always close one bracket at a time.
    #[token("::")]
    #[token("->")]
    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[token("&&")]
    #[token("||")]
    #[token("++")]
    #[token("--")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("...")]
    Operator,

    #[regex(r"[{}()\[\];,:<>=+\-*/%&|!~^?.#\\]")]
    Punct,
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("Unexpected character '{ch}' at {}:{}", .span.line, .span.column)]
    UnexpectedCharacter { ch: char, span: Span },

    #[error("Unterminated string constant at {}:{}", .span.line, .span.column)]
    UnterminatedString { span: Span },

    #[error("Unterminated character constant at {}:{}", .span.line, .span.column)]
    UnterminatedChar { span: Span },

    #[error("Unterminated block comment at {}:{}", .span.line, .span.column)]
    UnterminatedComment { span: Span },
}

impl LexError {
    /// Get the span of this error
    pub fn span(&self) -> &Span {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::UnterminatedChar { span }
            | LexError::UnterminatedComment { span } => span,
        }
    }

    /// Get a hint for fixing this error
    pub fn hint(&self) -> Option<String> {
        match self {
            LexError::UnterminatedString { .. } => {
                Some("Add a closing quote on the same line".to_string())
            }
            LexError::UnterminatedChar { .. } => {
                Some("Character constants must close with ' on the same line".to_string())
            }
            LexError::UnterminatedComment { .. } => Some("Add a closing */".to_string()),
            LexError::UnexpectedCharacter { ch, .. } if !ch.is_ascii() => {
                Some("Non-ASCII text is only allowed inside comments and strings".to_string())
            }
            LexError::UnexpectedCharacter { .. } => None,
        }
    }
}

/// Streaming tokenizer with a single-token push-back buffer.
pub struct Tokenizer<'a> {
    source: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    pushed: Option<Token>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 1,
            pushed: None,
        }
    }

    /// Return a token to the stream. Only one token may be pending.
    pub fn push_back(&mut self, token: Token) {
        debug_assert!(self.pushed.is_none(), "push-back buffer already full");
        self.pushed = Some(token);
    }

    /// Line of the next token that `next_token` will return.
    pub fn current_line(&self) -> u32 {
        match &self.pushed {
            Some(token) => token.span.line,
            None => self.line,
        }
    }

    /// Lex the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Produce the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        if let Some(token) = self.pushed.take() {
            return Ok(Some(token));
        }

        self.skip_trivia()?;
        if self.pos >= self.source.len() {
            return Ok(None);
        }

        let bytes = self.source.as_bytes();
        match bytes[self.pos] {
            b'"' => return self.lex_quoted(b'"').map(Some),
            b'\'' => return self.lex_quoted(b'\'').map(Some),
            _ => {}
        }

        let mut raw = RawToken::lexer(&self.source[self.pos..]);
        let Some(result) = raw.next() else {
            return Ok(None);
        };
        let range = raw.span();
        let start = self.pos + range.start;
        let end = self.pos + range.end;
        let span = Span::new(start, end, self.line, self.column);

        let kind = match result {
            Ok(RawToken::Identifier) => TokenKind::Identifier,
            Ok(RawToken::Int) => TokenKind::IntConst,
            Ok(RawToken::Float) => TokenKind::FloatConst,
            Ok(RawToken::Operator) | Ok(RawToken::Punct) => TokenKind::Symbol,
            Err(_) => {
                let ch = self.source[start..].chars().next().unwrap_or('\0');
                return Err(LexError::UnexpectedCharacter { ch, span });
            }
        };

        let token = Token::new(kind, &self.source[start..end], span);
        self.advance_to(end);
        Ok(Some(token))
    }

    /// Skip whitespace, line comments and block comments.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        let bytes = self.source.as_bytes();
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b' ' | b'\t' | b'\r' | 0x0c => {
                    self.pos += 1;
                    self.column += 1;
                }
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    self.column = 1;
                }
                b'/' if self.pos + 1 < bytes.len() => match bytes[self.pos + 1] {
                    b'/' => {
                        let end = self.source[self.pos..]
                            .find('\n')
                            .map_or(bytes.len(), |offset| self.pos + offset);
                        self.advance_to(end);
                    }
                    b'*' => {
                        let span = Span::new(self.pos, self.pos + 2, self.line, self.column);
                        match self.source[self.pos + 2..].find("*/") {
                            Some(offset) => self.advance_to(self.pos + 2 + offset + 2),
                            None => return Err(LexError::UnterminatedComment { span }),
                        }
                    }
                    _ => break,
                },
                _ => break,
            }
        }
        Ok(())
    }

    /// Lex a string or character constant starting at the current position.
    fn lex_quoted(&mut self, quote: u8) -> Result<Token, LexError> {
        let bytes = self.source.as_bytes();
        let start = self.pos;
        let span = Span::new(start, start + 1, self.line, self.column);
        let unterminated = || {
            if quote == b'"' {
                LexError::UnterminatedString { span }
            } else {
                LexError::UnterminatedChar { span }
            }
        };

        let mut i = start + 1;
        loop {
            match bytes.get(i) {
                None | Some(b'\n') => return Err(unterminated()),
                Some(b'\\') => {
                    if matches!(bytes.get(i + 1), None | Some(b'\n')) {
                        return Err(unterminated());
                    }
                    i += 2;
                }
                Some(&b) if b == quote => {
                    i += 1;
                    break;
                }
                Some(_) => i += 1,
            }
        }

        let kind = if quote == b'"' {
            TokenKind::StringConst
        } else {
            TokenKind::CharConst
        };
        let token = Token::new(
            kind,
            &self.source[start..i],
            Span::new(start, i, span.line, span.column),
        );
        self.advance_to(i);
        Ok(token)
    }

    /// Move to `end`, updating line and column.
    fn advance_to(&mut self, end: usize) {
        for c in self.source[self.pos..end].chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos = end;
    }
}

/// Convenience wrapper for lexing a whole source text.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Tokenizer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<String> {
        tokenize(source)
            .expect("should lex")
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_comments_are_not_tokens() {
        assert_eq!(texts("a // b\n/* c */ d"), vec!["a", "d"]);
    }

    #[test]
    fn test_line_tracking_through_block_comment() {
        let tokens = tokenize("/* one\n two\n three */ x\ny").unwrap();
        assert_eq!(tokens[0].line(), 3);
        assert_eq!(tokens[1].line(), 4);
    }

    #[test]
    fn test_nested_template_closes_one_bracket_at_a_time() {
        assert_eq!(
            texts("TArray<TSubclassOf<AActor>>"),
            vec!["TArray", "<", "TSubclassOf", "<", "AActor", ">", ">"]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = tokenize("12 0x1F 1.5f .25 3u 1e3").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::IntConst,
                TokenKind::IntConst,
                TokenKind::FloatConst,
                TokenKind::FloatConst,
                TokenKind::IntConst,
                TokenKind::FloatConst,
            ]
        );
    }

    #[test]
    fn test_string_with_escaped_quote() {
        let tokens = tokenize(r#"TEXT("a \" b") 'c'"#).unwrap();
        assert_eq!(tokens[2].kind, TokenKind::StringConst);
        assert_eq!(tokens[2].text, r#""a \" b""#);
        assert_eq!(tokens[4].kind, TokenKind::CharConst);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("x = \"abc\ny").unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { span } if span.line == 1));
    }

    #[test]
    fn test_unterminated_comment() {
        let err = tokenize("x /* never closed").unwrap_err();
        assert!(matches!(err, LexError::UnterminatedComment { .. }));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("int32 $x;").unwrap_err();
        assert!(matches!(err, LexError::UnexpectedCharacter { ch: '$', .. }));
    }

    #[test]
    fn test_push_back_returns_same_token() {
        let mut lexer = Tokenizer::new("a b");
        let a = lexer.next_token().unwrap().unwrap();
        lexer.push_back(a.clone());
        assert_eq!(lexer.next_token().unwrap(), Some(a));
        assert_eq!(lexer.next_token().unwrap().unwrap().text, "b");
        assert_eq!(lexer.next_token().unwrap(), None);
    }

    #[test]
    fn test_current_line_follows_push_back() {
        let mut lexer = Tokenizer::new("a\nb");
        let a = lexer.next_token().unwrap().unwrap();
        assert_eq!(lexer.current_line(), 1);
        lexer.push_back(a);
        assert_eq!(lexer.current_line(), 1);
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        assert_eq!(lexer.current_line(), 2);
    }

    #[test]
    fn test_line_continuation_symbol() {
        assert_eq!(texts("#define X \\\n  1"), vec!["#", "define", "X", "\\", "1"]);
    }
}
