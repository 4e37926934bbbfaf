//! Tokenizer and token cursor for annotated C++ headers.
//!
//! # Example
//!
//! ```ignore
//! use reflector_engine::parser::Tokenizer;
//!
//! let mut lexer = Tokenizer::new("UPROPERTY(EditAnywhere) float Radius;");
//! while let Some(token) = lexer.next_token()? {
//!     println!("{:?} '{}' at line {}", token.kind, token.text, token.line());
//! }
//! ```

pub mod token;
pub mod lexer;
pub mod cursor;

// Re-exports for convenience
pub use token::{Span, Token, TokenKind};
pub use lexer::{tokenize, LexError, Tokenizer};
pub use cursor::TokenCursor;
