//! Run-level error type.
//!
//! Every failure is fatal to the run and carries the file and line it
//! originated from. Errors are usually created deep inside a pass without
//! knowledge of the file being processed; the driver fills the file in with
//! [`Error::in_file`] as the error unwinds through a unit boundary.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::module::graph::CycleError;
use crate::parser::LexError;

/// Error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Unterminated string/comment, invalid character.
    Lex,
    /// Unexpected token or unbalanced nesting.
    Syntax,
    /// Unresolved name, duplicate declaration, invalid specifier, flag conflict.
    Semantic,
    /// Include or inheritance cycle.
    Dependency,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Lex => "lex",
            ErrorKind::Syntax => "syntax",
            ErrorKind::Semantic => "semantic",
            ErrorKind::Dependency => "dependency",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal error with its origin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}({}): {} error: {}", .file.display(), .line, .kind, .message)]
pub struct Error {
    pub kind: ErrorKind,
    pub file: PathBuf,
    pub line: u32,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, line: u32, message: impl Into<String>) -> Self {
        Self {
            kind,
            file: PathBuf::new(),
            line,
            message: message.into(),
        }
    }

    pub fn syntax(line: u32, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, line, message)
    }

    pub fn semantic(line: u32, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Semantic, line, message)
    }

    pub fn dependency(line: u32, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Dependency, line, message)
    }

    /// Attach a file unless one is already recorded.
    pub fn in_file(mut self, file: &Path) -> Self {
        if self.file.as_os_str().is_empty() {
            self.file = file.to_path_buf();
        }
        self
    }

    /// Attach a file, replacing any recorded one.
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = file.into();
        self
    }
}

impl From<LexError> for Error {
    fn from(err: LexError) -> Self {
        Self::new(ErrorKind::Lex, err.span().line, err.to_string())
    }
}

impl From<CycleError> for Error {
    fn from(err: CycleError) -> Self {
        let line = err.line();
        let file = err.file().to_path_buf();
        Self::new(ErrorKind::Dependency, line, err.to_string()).with_file(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Span;

    #[test]
    fn test_in_file_keeps_innermost_file() {
        let err = Error::semantic(3, "bad")
            .in_file(Path::new("Inner.h"))
            .in_file(Path::new("Outer.h"));
        assert_eq!(err.file, PathBuf::from("Inner.h"));
    }

    #[test]
    fn test_display_format() {
        let err = Error::syntax(7, "Missing '}'").with_file("A.h");
        assert_eq!(err.to_string(), "A.h(7): syntax error: Missing '}'");
    }

    #[test]
    fn test_from_lex_error() {
        let err: Error = LexError::UnterminatedString {
            span: Span::new(0, 1, 4, 2),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Lex);
        assert_eq!(err.line, 4);
    }
}
