//! Skipping of declarations the parser does not understand.
//!
//! Anything that is not a reflection annotation is consumed by delimiter
//! balancing alone: a statement ends at `;` at nest level zero, a braced
//! body at nest level zero ends the declaration, and a macro-style call
//! ends at its closing parenthesis.

use crate::error::{Error, Result};
use crate::parser::{Token, TokenCursor, TokenKind};

const CONTEXT: &str = "declaration";

/// Macros that look like calls but are followed by a real declaration.
const DECLARATION_MACROS: &[&str] = &["DECLARE_FUNCTION"];

/// `FOO_BAR(...)`-style identifier.
pub fn is_macro_name(token: &Token) -> bool {
    token.kind == TokenKind::Identifier
        && token.text.chars().any(|c| c.is_ascii_uppercase())
        && token
            .text
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && !DECLARATION_MACROS.contains(&token.text.as_str())
}

/// Skip one declaration starting at the cursor.
///
/// `member_scope` is set inside a class or struct body, where a stray `;`
/// is rejected.
pub fn skip_declaration(cursor: &mut TokenCursor, member_scope: bool) -> Result<()> {
    let first = cursor.require_token(CONTEXT)?;

    if first.is_symbol(";") {
        if !member_scope {
            return Ok(());
        }
        let message = match cursor.peek() {
            Some(next) => format!("Extra ';' before '{}'", next.text),
            None => "Extra ';' before end of file".to_string(),
        };
        return Err(Error::syntax(first.line(), message));
    }
    if first.is_symbol("}") || first.is_symbol(")") {
        return Err(Error::syntax(
            first.line(),
            format!("Unexpected '{}'", first.text),
        ));
    }

    if is_macro_name(&first) && cursor.match_symbol("(") {
        cursor.skip_balanced("(", ")", CONTEXT)?;
        while cursor.match_symbol(";") {}
        return Ok(());
    }

    cursor.unget();
    let mut depth = 0usize;
    loop {
        let token = cursor.require_token(CONTEXT)?;
        if token.is_symbol("(") {
            depth += 1;
        } else if token.is_symbol(")") {
            depth = depth.checked_sub(1).ok_or_else(|| {
                Error::syntax(token.line(), "Unexpected ')'")
            })?;
        } else if token.is_symbol("}") {
            return Err(Error::syntax(token.line(), "Unexpected '}'"));
        } else if depth == 0 && token.is_symbol(";") {
            return Ok(());
        } else if token.is_symbol("{") {
            cursor.skip_balanced("{", "}", CONTEXT)?;
            if depth == 0 {
                skip_declarator(cursor);
                return Ok(());
            }
        }
    }
}

/// After a braced body: `[Name] ;*`
fn skip_declarator(cursor: &mut TokenCursor) {
    let named = cursor.peek().is_some_and(Token::is_identifier)
        && cursor.peek_nth(1).is_some_and(|t| t.is_symbol(";"));
    if named {
        cursor.get_token();
    }
    while cursor.match_symbol(";") {}
}
