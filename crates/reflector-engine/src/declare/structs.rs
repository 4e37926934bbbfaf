//! `USTRUCT` declarations.

use crate::declare::dispatch::{StructSpecifiers, STRUCT_SPECIFIERS};
use crate::declare::specifiers::parse_specifiers;
use crate::declare::{Access, Annotation, HeaderParser, NestKind};
use crate::error::{Error, Result};
use crate::parser::Token;
use crate::registry::{EntityData, StructData, StructFlags};
use crate::resolve::TypeResolver;

/// Core file allowed to declare `Immutable` structs.
const IMMUTABLE_HOST: &str = "Object.h";

const ACCESS_KEYWORDS: &[&str] = &["public", "protected", "private"];

impl HeaderParser<'_> {
    /// `USTRUCT(specs) struct [API] FName [: public FBase] {`
    pub(crate) fn compile_struct(&mut self, token: &Token) -> Result<()> {
        self.check_placement(Annotation::Struct, token.line())?;

        let specifiers = parse_specifiers(&mut self.cursor, &token.text)?;
        let mut builder = StructSpecifiers::default();
        STRUCT_SPECIFIERS.apply(&mut builder, &specifiers)?;

        self.cursor.require_keyword("struct", "struct declaration")?;
        let mut name = self.cursor.require_identifier("struct declaration")?;
        let mut exported = false;
        if name.text.ends_with("_API") && self.cursor.peek().is_some_and(Token::is_identifier) {
            exported = true;
            name = self.cursor.require_identifier("struct declaration")?;
        }
        let line = name.line();

        self.naming()
            .check_struct_name(&name.text)
            .map_err(|message| Error::semantic(line, message))?;

        let mut base = None;
        if self.cursor.match_symbol(":") {
            while ACCESS_KEYWORDS.iter().any(|k| self.cursor.peek_identifier(k)) {
                self.cursor.get_token();
            }
            base = Some(self.cursor.require_identifier("struct base")?.text);
        }
        self.cursor.require_symbol("{", "struct declaration")?;

        if builder.immutable && self.ctx.unit(self.unit).file_name() != IMMUTABLE_HOST {
            return Err(Error::semantic(
                line,
                "Immutable is being phased out in favor of SerializeNative, and is only legal on the mirror structs declared in UObject",
            ));
        }

        let id = self.register(
            name.text.clone(),
            EntityData::Struct(StructData::default()),
            base,
            line,
        )?;
        TypeResolver::resolve_super(&mut self.ctx.registry, id, line)?;

        let registry = &mut self.ctx.registry;
        let inherited = registry
            .get(id)
            .super_entity
            .map_or(StructFlags::EMPTY, |s| registry.get(s).struct_flags())
            .intersection(StructFlags::INHERIT);
        let mut flags = inherited | builder.flags | StructFlags::NATIVE;
        flags = flags.difference(builder.cleared);
        if exported {
            flags |= StructFlags::REQUIRED_API;
        }

        let entity = registry.get_mut(id);
        if let Some(data) = entity.struct_data_mut() {
            data.flags = flags;
        }
        entity.metadata.extend(&builder.metadata);
        entity.metadata.extend(&specifiers.meta);

        self.push_nest(NestKind::Struct, id, Access::Public, line);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::declare::tests::parse;
    use crate::registry::{Category, StructFlags};

    #[test]
    fn test_inherits_struct_flags() {
        let ctx = parse(
            "USTRUCT(Atomic)\nstruct FBase\n{\n GENERATED_USTRUCT_BODY()\n};\n\
             USTRUCT(BlueprintType)\nstruct FDerived : public FBase\n{\n GENERATED_BODY()\n};\n",
        )
        .unwrap();
        let derived = ctx.registry.find(Category::Struct, "FDerived").unwrap();
        let entity = ctx.registry.get(derived);
        assert!(entity.struct_flags().contains(StructFlags::ATOMIC | StructFlags::NATIVE));
        assert_eq!(entity.metadata.get("BlueprintType"), Some("true"));
    }

    #[test]
    fn test_no_export_clears_native_and_needs_no_body() {
        let ctx = parse("USTRUCT(noexport)\nstruct FMirror\n{\n UPROPERTY()\n int32 X;\n};\n").unwrap();
        let id = ctx.registry.find(Category::Struct, "FMirror").unwrap();
        let flags = ctx.registry.get(id).struct_flags();
        assert!(flags.contains(StructFlags::NO_EXPORT));
        assert!(!flags.contains(StructFlags::NATIVE));
    }

    #[test]
    fn test_exported_struct_requires_body() {
        let err = parse("USTRUCT()\nstruct FPoint\n{\n UPROPERTY()\n int32 X;\n};\n").unwrap_err();
        assert_eq!(err.message, "Expected a GENERATED_USTRUCT_BODY() at the start of struct");
    }

    #[test]
    fn test_generated_body_must_be_public() {
        let err = parse("USTRUCT()\nstruct FPoint\n{\nprivate:\n GENERATED_BODY()\n};\n").unwrap_err();
        assert!(err.message.contains("must be in public scope"));
    }

    #[test]
    fn test_struct_prefix() {
        let err = parse("USTRUCT()\nstruct Point\n{\n GENERATED_BODY()\n};\n").unwrap_err();
        assert_eq!(err.message, "Struct 'Point' is missing a valid prefix, expecting 'FPoint'");
    }

    #[test]
    fn test_immutable_outside_core_file() {
        let err = parse("USTRUCT(immutable)\nstruct FVector\n{\n GENERATED_BODY()\n};\n").unwrap_err();
        assert!(err.message.starts_with("Immutable is being phased out"));
    }

    #[test]
    fn test_functions_rejected_in_structs() {
        let err = parse(
            "USTRUCT()\nstruct FPoint\n{\n GENERATED_BODY()\n UFUNCTION()\n void Reset();\n};\n",
        )
        .unwrap_err();
        assert_eq!(err.message, "USTRUCTs cannot contain UFUNCTIONs");
    }
}
