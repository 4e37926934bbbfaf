//! Shallow declaration scan over flattened header text.
//!
//! Only two things are recognized: `#include` directives and the class
//! header that follows a `UCLASS(...)` or `UINTERFACE(...)` annotation.
//! Member bodies are never looked at.

use std::path::Path;

use rustc_hash::FxHashSet;

use crate::config::NamingConvention;
use crate::error::{Error, Result};
use crate::module::unit::{clean_file_name, Dependency, DependencyKind};
use crate::parser::{tokenize, TokenCursor, TokenKind};
use crate::preparser::SkeletonClass;

const ACCESS_KEYWORDS: &[&str] = &["public", "protected", "private", "virtual"];

/// Result of scanning one file.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub skeletons: Vec<SkeletonClass>,
    pub dependencies: Vec<Dependency>,
}

pub fn scan(text: &str, naming: &NamingConvention) -> Result<ScanResult> {
    let mut cursor = TokenCursor::new(tokenize(text)?);
    let mut result = ScanResult::default();
    let mut seen: FxHashSet<DependencyKind> = FxHashSet::default();
    let mut generated_include_line: Option<u32> = None;

    let mut add_dependency = |result: &mut ScanResult, kind: DependencyKind, line: u32| {
        if seen.insert(kind.clone()) {
            result.dependencies.push(Dependency::new(kind, line));
        }
    };

    while let Some(token) = cursor.get_token() {
        if token.is_symbol("#") {
            if !cursor.match_identifier("include") {
                continue;
            }
            let line = token.line();
            if generated_include_line.is_some() {
                return Err(Error::semantic(
                    line,
                    "#include found after .generated.h file - the .generated.h file should always be the last #include in a header",
                ));
            }
            if let Some(path) = cursor.peek().and_then(|t| t.string_value()) {
                cursor.get_token();
                let name = clean_file_name(Path::new(&path)).to_string();
                if name.ends_with(".generated.h") {
                    generated_include_line = Some(line);
                } else {
                    add_dependency(&mut result, DependencyKind::Include(name), line);
                }
            }
            continue;
        }

        let is_interface = token.matches("UINTERFACE");
        if !(is_interface || token.matches("UCLASS")) || !cursor.peek_symbol("(") {
            continue;
        }

        if !result.skeletons.is_empty() {
            return Err(Error::semantic(
                token.line(),
                "Can only declare one class per file (two for an interface)",
            ));
        }

        cursor.match_symbol("(");
        cursor.skip_balanced("(", ")", &token.text)?;
        let skeleton = class_header(&mut cursor, is_interface)?;

        for (index, base) in skeleton.bases.iter().enumerate() {
            let name = if index == 0 {
                base.clone()
            } else {
                interface_twin(naming, base).unwrap_or_else(|| base.clone())
            };
            add_dependency(&mut result, DependencyKind::Base(name), skeleton.line);
        }
        result.skeletons.push(skeleton);
    }

    Ok(result)
}

/// `class [API] Name [: public Base[, public IOther]*]`
pub(crate) fn class_header(cursor: &mut TokenCursor, is_interface: bool) -> Result<SkeletonClass> {
    cursor.require_keyword("class", "class declaration")?;
    let mut name = cursor.require_identifier("class declaration")?;
    let mut api = None;
    if name.text.ends_with("_API") && cursor.peek().is_some_and(|t| t.kind == TokenKind::Identifier) {
        api = Some(name.text);
        name = cursor.require_identifier("class declaration")?;
    }

    let mut bases = Vec::new();
    if cursor.match_symbol(":") {
        loop {
            while cursor
                .peek()
                .is_some_and(|t| ACCESS_KEYWORDS.iter().any(|k| t.matches(k)))
            {
                cursor.get_token();
            }
            let mut base = cursor.require_identifier("base class list")?.text;
            while cursor.match_symbol("::") {
                base = cursor.require_identifier("base class list")?.text;
            }
            if cursor.match_symbol("<") {
                cursor.skip_balanced("<", ">", "base class template arguments")?;
            }
            bases.push(base);
            if !cursor.match_symbol(",") {
                break;
            }
        }
    }

    Ok(SkeletonClass {
        name: name.text,
        api,
        raw_super: bases.first().cloned(),
        bases,
        line: name.span.line,
        is_interface,
    })
}

/// `IFoo` -> `UFoo`, only for names that look like native interfaces.
fn interface_twin(naming: &NamingConvention, base: &str) -> Option<String> {
    let rest = base.strip_prefix(naming.interface_prefix.as_str())?;
    if rest.chars().next()?.is_ascii_uppercase() {
        naming.interface_class_name(base)
    } else {
        None
    }
}
