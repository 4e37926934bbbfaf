//! Conditional-compilation flattening.
//!
//! Works line by line. Regions the policy discards become empty lines so the
//! output keeps the input's line count and every later diagnostic points at
//! the original line.

use crate::config::{ConditionalAction, PreprocessorPolicy};
use crate::error::{Error, Result};

/// Annotation macros that must never vanish with a discarded region.
const ANNOTATIONS: &[&str] = &[
    "UCLASS",
    "UINTERFACE",
    "USTRUCT",
    "UENUM",
    "UFUNCTION",
    "UPROPERTY",
    "UDELEGATE",
    "GENERATED_BODY",
    "GENERATED_UCLASS_BODY",
    "GENERATED_USTRUCT_BODY",
    "GENERATED_UINTERFACE_BODY",
    "GENERATED_IINTERFACE_BODY",
];

#[derive(Debug)]
struct Frame {
    action: ConditionalAction,
    line: u32,
    parent_keeping: bool,
    branch_kept: bool,
    else_seen: bool,
}

impl Frame {
    fn keeping(&self) -> bool {
        self.parent_keeping && self.branch_kept
    }
}

/// Flatten conditional blocks according to `policy`.
pub fn flatten(text: &str, policy: &PreprocessorPolicy) -> Result<String> {
    let mut out: Vec<&str> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut in_block_comment = false;
    // Set while inside a `\`-continued directive: whether its lines are kept.
    let mut continued: Option<bool> = None;

    for (index, line) in text.split('\n').enumerate() {
        let line_no = index as u32 + 1;
        let keeping = stack.last().map_or(true, Frame::keeping);
        let code = strip_comments(line, &mut in_block_comment);

        if let Some(keep) = continued {
            continued = ends_with_continuation(line).then_some(keep);
            out.push(if keep { line } else { "" });
            continue;
        }

        let Some(directive) = code.trim_start().strip_prefix('#') else {
            if keeping {
                out.push(line);
            } else {
                if let Some(annotation) = find_annotation(&code) {
                    return Err(Error::semantic(
                        line_no,
                        format!(
                            "{} must not be inside preprocessor blocks, except for WITH_EDITORONLY_DATA",
                            annotation
                        ),
                    ));
                }
                out.push("");
            }
            continue;
        };

        let directive = directive.trim_start();
        let word_end = directive
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(directive.len());
        let (word, condition) = directive.split_at(word_end);
        let condition = condition.trim();

        let kept = match word {
            "if" | "ifdef" | "ifndef" => {
                let action = if word == "if" {
                    policy.action_for(condition)
                } else {
                    ConditionalAction::Discard
                };
                let branch_kept = matches!(action, ConditionalAction::KeepIf | ConditionalAction::Verbatim);
                stack.push(Frame {
                    action,
                    line: line_no,
                    parent_keeping: keeping,
                    branch_kept,
                    else_seen: false,
                });
                keeping && action == ConditionalAction::Verbatim
            }
            "elif" => {
                let frame = stack.last_mut().ok_or_else(|| {
                    Error::syntax(line_no, "#elif without matching #if")
                })?;
                if frame.else_seen {
                    return Err(Error::syntax(line_no, "#elif after #else"));
                }
                // Editor-only regions keep every branch as written.
                if frame.action == ConditionalAction::Verbatim {
                    frame.parent_keeping
                } else {
                    frame.branch_kept = false;
                    false
                }
            }
            "else" => {
                let frame = stack.last_mut().ok_or_else(|| {
                    Error::syntax(line_no, "#else without matching #if")
                })?;
                if frame.else_seen {
                    return Err(Error::syntax(line_no, "Duplicate #else"));
                }
                frame.else_seen = true;
                match frame.action {
                    ConditionalAction::KeepElse => {
                        frame.branch_kept = true;
                        false
                    }
                    ConditionalAction::KeepIf | ConditionalAction::Discard => {
                        frame.branch_kept = false;
                        false
                    }
                    ConditionalAction::Verbatim => frame.parent_keeping,
                }
            }
            "endif" => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| Error::syntax(line_no, "#endif without matching #if"))?;
                frame.parent_keeping && frame.action == ConditionalAction::Verbatim
            }
            _ => {
                if keeping && ends_with_continuation(line) {
                    continued = Some(true);
                } else if ends_with_continuation(line) {
                    continued = Some(false);
                }
                keeping
            }
        };

        out.push(if kept { line } else { "" });
    }

    if let Some(frame) = stack.last() {
        return Err(Error::syntax(
            frame.line,
            format!("Missing #endif for conditional block opened at line {}", frame.line),
        ));
    }

    Ok(out.join("\n"))
}

fn ends_with_continuation(line: &str) -> bool {
    line.trim_end().ends_with('\\')
}

/// Remove comments and the contents of string/char literals from one line.
/// `in_block` carries block-comment state across lines.
pub(crate) fn strip_comments(line: &str, in_block: &mut bool) -> String {
    let mut code = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if *in_block {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                *in_block = false;
                code.push(' ');
            }
            continue;
        }
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                code.push(c);
                quote = None;
            }
            continue;
        }
        match c {
            '/' if chars.peek() == Some(&'/') => break,
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                *in_block = true;
            }
            '"' | '\'' => {
                code.push(c);
                quote = Some(c);
            }
            _ => code.push(c),
        }
    }
    code
}

/// First annotation macro invoked in `code`, if any.
fn find_annotation(code: &str) -> Option<&'static str> {
    let bytes = code.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_alphabetic() || bytes[i] == b'_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let word = &code[start..i];
            let rest = code[i..].trim_start();
            if rest.starts_with('(') {
                if let Some(annotation) = ANNOTATIONS.iter().find(|a| **a == word) {
                    return Some(annotation);
                }
            }
        } else {
            i += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn run(text: &str) -> Result<String> {
        flatten(text, &PreprocessorPolicy::default())
    }

    #[test]
    fn test_cpp_block_discarded_else_kept() {
        let out = run("a\n#if CPP\nb\n#else\nc\n#endif\nd").unwrap();
        assert_eq!(out, "a\n\n\n\nc\n\nd");
    }

    #[test]
    fn test_not_cpp_kept() {
        let out = run("#if !CPP\nx\n#else\ny\n#endif").unwrap();
        assert_eq!(out, "\nx\n\n\n");
    }

    #[test]
    fn test_editor_only_kept_verbatim() {
        let text = "#if WITH_EDITORONLY_DATA\nUPROPERTY()\nint32 X;\n#endif";
        assert_eq!(run(text).unwrap(), text);
    }

    #[test]
    fn test_editor_only_else_kept_verbatim() {
        let text = "#if WITH_EDITOR\nint32 A;\n#else\nint32 B;\n#endif";
        assert_eq!(run(text).unwrap(), text);
        let text = "#if WITH_EDITORONLY_DATA\na\n#elif OTHER\nb\n#endif";
        assert_eq!(run(text).unwrap(), text);
    }

    #[test]
    fn test_editor_only_else_inside_discarded_region() {
        let out = run("#if CPP\n#if WITH_EDITOR\na\n#else\nb\n#endif\n#endif").unwrap();
        assert_eq!(out, "\n\n\n\n\n\n");
    }

    #[test]
    fn test_unknown_conditions_discard_both_branches() {
        let out = run("#ifndef GUARD\n#define GUARD\nx\n#else\ny\n#endif").unwrap();
        assert_eq!(out, "\n\n\n\n\n");
    }

    #[test]
    fn test_line_count_preserved() {
        let text = "a\n#if SOMETHING\nb\nc\n#endif\nd\n";
        assert_eq!(run(text).unwrap().split('\n').count(), text.split('\n').count());
    }

    #[test]
    fn test_annotation_in_discarded_region() {
        let err = run("#if PLATFORM_X\n\nUPROPERTY()\nint32 X;\n#endif").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_annotation_in_comment_is_ignored() {
        let out = run("#if CPP\n// UPROPERTY()\n/* UCLASS() */\nconst char* s = \"UENUM()\";\n#endif").unwrap();
        assert_eq!(out, "\n\n\n\n");
    }

    #[test]
    fn test_directive_in_block_comment_ignored() {
        let out = run("/*\n#if CPP\n*/\nx").unwrap();
        assert_eq!(out, "/*\n#if CPP\n*/\nx");
    }

    #[test]
    fn test_unbalanced_directives() {
        assert_eq!(run("#endif").unwrap_err().kind, ErrorKind::Syntax);
        assert_eq!(run("#else").unwrap_err().kind, ErrorKind::Syntax);
        let err = run("x\n#if CPP\ny").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_elif_branch_discarded() {
        let out = run("#if !CPP\na\n#elif OTHER\nb\n#endif").unwrap();
        assert_eq!(out, "\na\n\n\n");
    }

    #[test]
    fn test_nested_keep_inside_discard() {
        let out = run("#if CPP\n#if !CPP\nx\n#endif\n#endif").unwrap();
        assert_eq!(out, "\n\n\n\n");
    }

    #[test]
    fn test_define_continuation_follows_region() {
        let out = run("#if CPP\n#define A \\\n  1\n#endif\n#define B \\\n 2").unwrap();
        assert_eq!(out, "\n\n\n\n#define B \\\n 2");
    }
}
