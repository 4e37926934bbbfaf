//! Unresolved type syntax as written in a declaration.

use std::fmt;

use crate::error::{Error, Result};
use crate::parser::TokenCursor;

const ELABORATED: &[&str] = &["class", "struct", "enum", "typename"];

/// A type expression before name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSyntax {
    pub is_const: bool,
    /// Last segment of the written name; `EFoo::Type` is recorded as `EFoo`.
    pub name: String,
    pub args: Vec<TypeSyntax>,
    pub pointer: bool,
    pub reference: bool,
    pub line: u32,
}

impl TypeSyntax {
    pub fn named(name: impl Into<String>, line: u32) -> Self {
        Self {
            is_const: false,
            name: name.into(),
            args: Vec::new(),
            pointer: false,
            reference: false,
            line,
        }
    }

    pub fn is_template(&self) -> bool {
        !self.args.is_empty()
    }

    /// Non-const reference, i.e. an out parameter.
    pub fn is_out_reference(&self) -> bool {
        self.reference && !self.is_const
    }
}

impl fmt::Display for TypeSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            f.write_str("const ")?;
        }
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", arg)?;
            }
            f.write_str(">")?;
        }
        if self.pointer {
            f.write_str("*")?;
        }
        if self.reference {
            f.write_str("&")?;
        }
        Ok(())
    }
}

/// Parse `[const] [class|struct|enum] Name[::Seg]* [<args>] [const] [*] [&]`.
pub fn parse_type(cursor: &mut TokenCursor, context: &str) -> Result<TypeSyntax> {
    let mut is_const = false;
    let mut name_token = cursor.require_identifier(context)?;
    loop {
        if name_token.matches("const") {
            is_const = true;
        } else if ELABORATED.iter().any(|k| name_token.matches(k)) {
            // elaborated type specifier
        } else {
            break;
        }
        name_token = cursor.require_identifier(context)?;
    }

    let line = name_token.line();
    let mut name = name_token.text;
    while cursor.match_symbol("::") {
        let segment = cursor.require_identifier(context)?;
        if segment.text != "Type" {
            name = segment.text;
        }
    }

    let mut ty = TypeSyntax::named(name, line);
    ty.is_const = is_const;

    if cursor.match_symbol("<") {
        loop {
            ty.args.push(parse_type(cursor, context)?);
            if cursor.match_symbol(",") {
                continue;
            }
            cursor.require_symbol(">", context)?;
            break;
        }
    }

    loop {
        if cursor.match_identifier("const") {
            ty.is_const = true;
        } else if cursor.peek_symbol("*") {
            let star = cursor.require_token(context)?;
            if ty.pointer || ty.reference {
                return Err(Error::semantic(
                    star.line(),
                    format!("Multiple levels of indirection are not supported on '{}'", ty.name),
                ));
            }
            ty.pointer = true;
        } else if cursor.peek_symbol("&") {
            let amp = cursor.require_token(context)?;
            if ty.reference {
                return Err(Error::semantic(
                    amp.line(),
                    format!("Reference to reference is not supported on '{}'", ty.name),
                ));
            }
            ty.reference = true;
        } else if cursor.peek_symbol("&&") {
            let token = cursor.require_token(context)?;
            return Err(Error::semantic(
                token.line(),
                format!("Rvalue references are not supported on '{}'", ty.name),
            ));
        } else {
            return Ok(ty);
        }
    }
}
