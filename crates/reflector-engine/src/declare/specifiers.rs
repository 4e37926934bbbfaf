//! Annotation specifier blocks.
//!
//! ```text
//! ( spec [, spec]* )
//! spec := key | key = value | key = ( v1, v2, ... ) | key ( v1, v2, ... )
//!       | meta = ( k [= v], ... )
//! ```
//!
//! Values are read token by token up to the next `,` or `)` at nesting
//! depth zero and concatenated, so `Id=7` inside a value list arrives as a
//! single value.

use crate::error::{Error, Result};
use crate::parser::{Token, TokenCursor, TokenKind};
use crate::registry::Metadata;

/// One `key [= values]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub key: String,
    pub values: Vec<String>,
    pub line: u32,
}

impl Specifier {
    /// The single value of a `key = value` specifier.
    pub fn single_value(&self) -> Result<&str> {
        match self.values.as_slice() {
            [value] => Ok(value),
            [] => Err(Error::semantic(
                self.line,
                format!("Missing value for specifier '{}'", self.key),
            )),
            _ => Err(Error::semantic(
                self.line,
                format!("Specifier '{}' takes a single value", self.key),
            )),
        }
    }
}

/// Specifiers of one annotation, in source order, plus its `meta` entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecifierList {
    pub specifiers: Vec<Specifier>,
    pub meta: Metadata,
    pub line: u32,
}

impl SpecifierList {
    pub fn is_empty(&self) -> bool {
        self.specifiers.is_empty() && self.meta.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.specifiers.iter().any(|s| s.key.eq_ignore_ascii_case(key))
    }
}

/// Parse a parenthesized specifier block. The cursor must be positioned on
/// the opening `(`.
pub fn parse_specifiers(cursor: &mut TokenCursor, context: &str) -> Result<SpecifierList> {
    let open = cursor.require_symbol("(", context)?;
    let mut list = SpecifierList {
        line: open.line(),
        ..Default::default()
    };

    if cursor.match_symbol(")") {
        return Ok(list);
    }

    loop {
        let key = cursor.require_token(context)?;
        if key.kind != TokenKind::Identifier {
            return Err(Error::semantic(
                key.line(),
                format!("Expected a specifier in {}, found '{}'", context, key.text),
            ));
        }

        if key.matches_ignore_case("meta") || key.matches_ignore_case("metadata") {
            cursor.require_symbol("=", context)?;
            parse_meta_block(cursor, &mut list.meta, context)?;
        } else {
            let values = if cursor.match_symbol("=") {
                if cursor.peek_symbol("(") {
                    read_value_list(cursor, context)?
                } else {
                    vec![read_value(cursor, context)?]
                }
            } else if cursor.peek_symbol("(") {
                read_value_list(cursor, context)?
            } else {
                Vec::new()
            };
            list.specifiers.push(Specifier {
                key: key.text,
                values,
                line: key.span.line,
            });
        }

        if cursor.match_symbol(",") {
            continue;
        }
        cursor.require_symbol(")", context)?;
        return Ok(list);
    }
}

/// Parse `( k [= v], ... )` into `meta`. Used for `meta=(...)` and `UMETA(...)`.
pub fn parse_meta_block(cursor: &mut TokenCursor, meta: &mut Metadata, context: &str) -> Result<()> {
    cursor.require_symbol("(", context)?;
    if cursor.match_symbol(")") {
        return Ok(());
    }
    loop {
        let key = cursor.require_identifier(context)?;
        let value = if cursor.match_symbol("=") {
            read_value(cursor, context)?
        } else {
            String::new()
        };
        insert_meta(meta, &key, value)?;

        if cursor.match_symbol(",") {
            continue;
        }
        cursor.require_symbol(")", context)?;
        return Ok(());
    }
}

/// Add a metadata entry, rejecting the same key with a different value.
pub fn insert_meta(meta: &mut Metadata, key: &Token, value: String) -> Result<()> {
    if let Some(previous) = meta.get(&key.text) {
        if previous != value {
            return Err(Error::semantic(
                key.line(),
                format!(
                    "Metadata key '{}' first seen with value '{}' then '{}'",
                    key.text, previous, value
                ),
            ));
        }
    }
    meta.insert(key.text.as_str(), value);
    Ok(())
}

/// `( v1, v2, ... )`
fn read_value_list(cursor: &mut TokenCursor, context: &str) -> Result<Vec<String>> {
    cursor.require_symbol("(", context)?;
    let mut values = Vec::new();
    if cursor.match_symbol(")") {
        return Ok(values);
    }
    loop {
        values.push(read_value(cursor, context)?);
        if cursor.match_symbol(",") {
            continue;
        }
        cursor.require_symbol(")", context)?;
        return Ok(values);
    }
}

/// One value: tokens up to `,` or `)` at depth zero.
fn read_value(cursor: &mut TokenCursor, context: &str) -> Result<String> {
    let mut value = String::new();
    let mut depth = 0usize;
    let mut count = 0usize;

    while let Some(token) = cursor.peek() {
        if depth == 0 && (token.is_symbol(",") || token.is_symbol(")")) {
            break;
        }
        if token.is_symbol("(") {
            depth += 1;
        } else if token.is_symbol(")") {
            depth -= 1;
        }
        value.push_str(&token.value_text());
        count += 1;
        cursor.get_token();
    }

    if cursor.is_at_end() {
        return Err(Error::syntax(
            cursor.line(),
            format!("Unexpected end of file while parsing {}", context),
        ));
    }
    if count == 0 {
        return Err(Error::semantic(
            cursor.line(),
            format!("Missing value in {}", context),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::parser::tokenize;

    fn parse(source: &str) -> Result<SpecifierList> {
        let mut cursor = TokenCursor::new(tokenize(source).unwrap());
        parse_specifiers(&mut cursor, "UPROPERTY")
    }

    #[test]
    fn test_all_specifier_forms() {
        let list = parse(
            "(EditAnywhere, Category=\"Stats|Health\", HideCategories=(Movement, Input), \
             ServiceRequest(MCP, Id=7), meta=(ClampMin=\"0.0\", Hidden))",
        )
        .unwrap();

        let keys: Vec<&str> = list.specifiers.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, ["EditAnywhere", "Category", "HideCategories", "ServiceRequest"]);
        assert_eq!(list.specifiers[1].values, ["Stats|Health"]);
        assert_eq!(list.specifiers[2].values, ["Movement", "Input"]);
        assert_eq!(list.specifiers[3].values, ["MCP", "Id=7"]);
        assert_eq!(list.meta.get("ClampMin"), Some("0.0"));
        assert_eq!(list.meta.get("Hidden"), Some(""));
    }

    #[test]
    fn test_empty_block() {
        assert!(parse("()").unwrap().is_empty());
    }

    #[test]
    fn test_negative_meta_value() {
        let list = parse("(meta=(UIMin=-1))").unwrap();
        assert_eq!(list.meta.get("UIMin"), Some("-1"));
    }

    #[test]
    fn test_conflicting_meta_values() {
        let err = parse("(meta=(A=1, A=2))").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
    }

    #[test]
    fn test_missing_value() {
        assert_eq!(parse("(Category=)").unwrap_err().kind, ErrorKind::Semantic);
    }

    #[test]
    fn test_unterminated_block() {
        assert_eq!(parse("(EditAnywhere").unwrap_err().kind, ErrorKind::Syntax);
    }
}
