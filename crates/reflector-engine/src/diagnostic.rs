//! Diagnostic rendering for run errors and warnings
//!
//! Errors carry a file and a line; rendering highlights that line in the
//! header source with `codespan-reporting`, or serializes the diagnostic to
//! JSON for IDE consumers.

use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, LabelStyle, Severity};
use codespan_reporting::files::{Files, SimpleFiles};
use codespan_reporting::term;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::PathBuf;
use termcolor::{ColorChoice, StandardStream, WriteColor};

use crate::context::Warning;
use crate::error::{Error, ErrorKind};

/// Header sources keyed by display path.
pub type HeaderFiles = SimpleFiles<String, String>;

/// Stable `R<kind><n>` code shown in brackets after the severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode(pub &'static str);

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        self.0
    }
}

/// A run error or warning ready to render against its header.
pub struct Diagnostic {
    inner: CsDiagnostic<usize>,
    code: Option<ErrorCode>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            inner: CsDiagnostic::new(severity).with_message(message),
            code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Warning, message)
    }

    pub fn with_code(self, code: ErrorCode) -> Self {
        Diagnostic {
            inner: self.inner.with_code(code.as_str()),
            code: Some(code),
        }
    }

    /// Add a primary label covering `range`
    pub fn with_primary_label(mut self, file_id: usize, range: Range<usize>, message: impl Into<String>) -> Self {
        self.inner
            .labels
            .push(Label::primary(file_id, range).with_message(message));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        self.inner.notes.push(note);
        self
    }

    /// Notes prefixed with `help:`.
    pub fn with_help(self, help: impl Into<String>) -> Self {
        let help = help.into();
        self.with_note(format!("help: {help}"))
    }

    /// Create a diagnostic from a run error. The error's line is labelled
    /// when `file_id` names the failing file.
    pub fn from_error(error: &Error, file_id: usize, files: &HeaderFiles) -> Self {
        let diag = Diagnostic::error(error.message.clone())
            .with_code(error_code(error))
            .with_note(format!("{} error", error.kind));
        let diag = match line_range(files, file_id, error.line) {
            Some(range) => diag.with_primary_label(file_id, range, error.kind.as_str()),
            None => diag,
        };
        match error.kind {
            ErrorKind::Dependency => {
                diag.with_help("break the cycle by moving shared declarations into a separate header")
            }
            _ => diag,
        }
    }

    pub fn from_warning(warning: &Warning, file_id: usize, files: &HeaderFiles) -> Self {
        let diag = Diagnostic::warning(warning.message.clone()).with_code(ErrorCode("R0001"));
        match line_range(files, file_id, warning.line) {
            Some(range) => diag.with_primary_label(file_id, range, "deprecated"),
            None => diag,
        }
    }

    /// Render to stderr, colored when the terminal supports it.
    pub fn emit(&self, files: &HeaderFiles) -> Result<(), codespan_reporting::files::Error> {
        let stderr = StandardStream::stderr(ColorChoice::Auto);
        let mut lock = stderr.lock();
        self.emit_to(&mut lock, files)
    }

    /// Emit the diagnostic to any color-aware writer
    pub fn emit_to(
        &self,
        writer: &mut dyn WriteColor,
        files: &HeaderFiles,
    ) -> Result<(), codespan_reporting::files::Error> {
        let config = term::Config::default();
        term::emit(writer, &config, files, &self.inner)
    }

    pub fn inner(&self) -> &CsDiagnostic<usize> {
        &self.inner
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    /// Pretty-printed JSON for editor integrations.
    pub fn to_json(&self, files: &HeaderFiles) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&JsonDiagnostic::from_diagnostic(self, files))
    }
}

/// Byte range of a 1-based line, without its line break.
fn line_range(files: &HeaderFiles, file_id: usize, line: u32) -> Option<Range<usize>> {
    let index = (line as usize).checked_sub(1)?;
    let range = files.line_range(file_id, index).ok()?;
    let source = files.source(file_id).ok()?;
    let text = source.get(range.clone())?;
    Some(range.start..range.start + text.trim_end_matches(['\r', '\n']).len())
}

/// Serialized form of a [`Diagnostic`].
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonDiagnostic {
    pub code: Option<String>,
    pub severity: String,
    pub message: String,
    pub labels: Vec<JsonLabel>,
    pub notes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLabel {
    pub file: String,
    /// 1-indexed
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub message: Option<String>,
    /// `primary` or `secondary`
    pub style: String,
}

impl JsonDiagnostic {
    pub fn from_diagnostic(diag: &Diagnostic, files: &HeaderFiles) -> Self {
        let labels = diag
            .inner
            .labels
            .iter()
            .filter_map(|label| {
                let file = files.get(label.file_id).ok()?;
                let start = file.location((), label.range.start).ok()?;
                let end = file.location((), label.range.end).ok()?;
                Some(JsonLabel {
                    file: file.name().to_string(),
                    start_line: start.line_number,
                    start_column: start.column_number,
                    end_line: end.line_number,
                    end_column: end.column_number,
                    message: Some(label.message.clone()),
                    style: match label.style {
                        LabelStyle::Primary => "primary",
                        LabelStyle::Secondary => "secondary",
                    }
                    .to_string(),
                })
            })
            .collect();

        JsonDiagnostic {
            code: diag.code.map(|c| c.as_str().to_string()),
            severity: severity_name(diag.inner.severity).to_string(),
            message: diag.inner.message.clone(),
            labels,
            notes: diag.inner.notes.clone(),
        }
    }
}

/// Get the error code for a run error
pub fn error_code(error: &Error) -> ErrorCode {
    match error.kind {
        ErrorKind::Lex => ErrorCode("R1001"),
        ErrorKind::Syntax => ErrorCode("R2001"),
        ErrorKind::Semantic => ErrorCode("R3001"),
        ErrorKind::Dependency => ErrorCode("R4001"),
    }
}

fn severity_name(severity: Severity) -> &'static str {
    match severity {
        Severity::Bug => "bug",
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Note => "note",
        Severity::Help => "help",
    }
}

/// File database holding a single header; its file id is 0.
pub fn create_files(path: impl Into<PathBuf>, source: impl Into<String>) -> HeaderFiles {
    let name = path.into().display().to_string();
    let mut files = HeaderFiles::new();
    files.add(name, source.into());
    files
}
