//! `UPROPERTY` declarations.

use crate::declare::dispatch::{PropertySpecifiers, PROPERTY_SPECIFIERS};
use crate::declare::function::member_owner;
use crate::declare::specifiers::parse_specifiers;
use crate::declare::types::parse_type;
use crate::declare::{Access, Annotation, HeaderParser, NestKind, PendingMember, PendingProperty};
use crate::error::{Error, Result};
use crate::parser::Token;
use crate::registry::{Metadata, PropertyFlags};

const CONTEXT: &str = "property declaration";
const DEPRECATED_SUFFIX: &str = "_DEPRECATED";

/// Integer types a one-bit bool may be declared with.
const BITFIELD_TYPES: &[&str] = &["uint8", "uint32", "bool"];

impl HeaderParser<'_> {
    pub(crate) fn compile_property(&mut self, token: &Token) -> Result<()> {
        let line = token.line();
        self.check_placement(Annotation::Property, line)?;
        self.require_generated_body(line)?;
        if self.in_editor_only_functions() && !self.in_editor_only_data() {
            return Err(Error::semantic(
                line,
                "UProperties should not be wrapped by WITH_EDITOR, use WITH_EDITORONLY_DATA instead.",
            ));
        }

        let specifiers = parse_specifiers(&mut self.cursor, &token.text)?;
        let mut builder = PropertySpecifiers::default();
        PROPERTY_SPECIFIERS.apply(&mut builder, &specifiers)?;
        if builder.non_pie_transient {
            self.ctx.warn(
                line,
                "NonPIETransient is deprecated - NonPIEDuplicateTransient should be used instead",
            );
        }
        let mut metadata = builder.metadata.clone();
        metadata.extend(&specifiers.meta);

        let owner = member_owner(self.scope_entity(), line, "UPROPERTY")?;
        let in_struct = self.nest().kind == NestKind::Struct;
        let access = self.nest().access;

        let ty = parse_type(&mut self.cursor, CONTEXT)?;
        let name_token = self.cursor.require_identifier(CONTEXT)?;
        let line = name_token.line();
        if ty.reference {
            return Err(Error::semantic(
                line,
                format!("Reference member '{}' cannot be a UPROPERTY", name_token.text),
            ));
        }

        let mut bitfield = false;
        if self.cursor.match_symbol(":") {
            let width = self.cursor.require_int(CONTEXT)?;
            if width != 1 || !BITFIELD_TYPES.contains(&ty.name.as_str()) {
                return Err(Error::semantic(
                    line,
                    format!("Bitfield '{}' must be a one bit uint8, uint32 or bool", name_token.text),
                ));
            }
            bitfield = true;
        }

        let mut array_dim = None;
        if self.cursor.match_symbol("[") {
            let tokens = self.cursor.skip_balanced("[", "]", CONTEXT)?;
            if tokens.is_empty() {
                return Err(Error::semantic(line, "Missing static array dimension"));
            }
            let text: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
            array_dim = Some(text.join(""));
        }
        self.cursor.require_symbol(";", CONTEXT)?;

        let mut flags = builder.flags;
        let mut name = name_token.text.clone();
        if let Some(index) = name.find(DEPRECATED_SUFFIX) {
            if index + DEPRECATED_SUFFIX.len() != name.len() {
                return Err(Error::semantic(
                    line,
                    format!("Deprecated variable '{}' must end with {}", name, DEPRECATED_SUFFIX),
                ));
            }
            name.truncate(index);
            flags |= PropertyFlags::DEPRECATED;
        }
        if self.in_editor_only_data() {
            flags |= PropertyFlags::EDITOR_ONLY;
        }

        check_property_flags(&name, line, &builder, flags, in_struct, access, &metadata)?;
        if metadata.is_true("ExposeOnSpawn") {
            flags |= PropertyFlags::EXPOSE_ON_SPAWN;
        }
        flags |= match access {
            Access::Public => PropertyFlags::NATIVE_ACCESS_PUBLIC,
            Access::Protected => PropertyFlags::NATIVE_ACCESS_PROTECTED | PropertyFlags::PROTECTED,
            Access::Private => PropertyFlags::NATIVE_ACCESS_PRIVATE,
        };

        self.claim_property_name(owner, &name, line)?;
        let mut property = PendingProperty::new(name, ty, line);
        property.flags = flags;
        property.rep_notify = builder.rep_notify;
        property.array_dim = array_dim;
        property.bitfield = bitfield;
        property.metadata = metadata;
        self.queue(PendingMember::Property { owner, property });
        Ok(())
    }
}

fn check_property_flags(
    name: &str,
    line: u32,
    builder: &PropertySpecifiers,
    flags: PropertyFlags,
    in_struct: bool,
    access: Access,
    metadata: &Metadata,
) -> Result<()> {
    if in_struct {
        if flags.intersects(PropertyFlags::CLASS_ONLY) {
            return Err(Error::semantic(
                line,
                format!(
                    "Struct member '{}' cannot be Config, GlobalConfig or transient; those flags are for class members only",
                    name
                ),
            ));
        }
        if flags.contains(PropertyFlags::NET) {
            return Err(Error::semantic(line, "Struct members cannot be replicated"));
        }
    } else if flags.contains(PropertyFlags::REP_SKIP) {
        return Err(Error::semantic(line, "Only Struct members can be marked NotReplicated"));
    }

    if access == Access::Private
        && flags.contains(PropertyFlags::BLUEPRINT_VISIBLE)
        && !metadata.is_true("AllowPrivateAccess")
    {
        let specifier = builder
            .blueprint_specifier
            .as_deref()
            .unwrap_or("BlueprintReadWrite");
        return Err(Error::semantic(
            line,
            format!(
                "{} should not be used on private members unless meta=(AllowPrivateAccess=true) is set",
                specifier
            ),
        ));
    }

    if metadata.is_true("ExposeOnSpawn")
        && !(flags.contains(PropertyFlags::EDIT) && flags.contains(PropertyFlags::BLUEPRINT_VISIBLE))
    {
        return Err(Error::semantic(
            line,
            format!(
                "ExposeOnSpawn on '{}' requires an editable, Blueprint visible property",
                name
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::declare::tests::parse;
    use crate::declare::{PendingMember, PendingProperty};
    use crate::context::RunContext;
    use crate::module::unit::UnitId;
    use crate::registry::PropertyFlags;

    fn class(body: &str) -> String {
        format!("UCLASS()\nclass UThing\n{{\n GENERATED_BODY()\npublic:\n{}\n}};\n", body)
    }

    fn properties(ctx: &RunContext) -> Vec<&PendingProperty> {
        ctx.pending[&UnitId::from_index(0)]
            .iter()
            .filter_map(|m| match m {
                PendingMember::Property { property, .. } => Some(property),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_declaration_shapes() {
        let ctx = parse(&class(
            "UPROPERTY(EditAnywhere, Category=Stats)\nint32 Health;\n\
             UPROPERTY()\nuint32 bAlive : 1;\n\
             UPROPERTY()\nfloat Samples[ESample::Count];\n\
             UPROPERTY()\nUObject* Target_DEPRECATED;",
        ))
        .unwrap();
        let props = properties(&ctx);
        assert_eq!(props.len(), 4);
        assert!(props[0].flags.contains(PropertyFlags::EDIT | PropertyFlags::NATIVE_ACCESS_PUBLIC));
        assert_eq!(props[0].metadata.get("Category"), Some("Stats"));
        assert!(props[1].bitfield);
        assert_eq!(props[2].array_dim.as_deref(), Some("ESample::Count"));
        assert_eq!(props[3].name, "Target");
        assert!(props[3].flags.contains(PropertyFlags::DEPRECATED));
    }

    #[test]
    fn test_deprecated_must_be_suffix() {
        let err = parse(&class("UPROPERTY()\nint32 Old_DEPRECATED_Value;")).unwrap_err();
        assert!(err.message.contains("must end with _DEPRECATED"));
    }

    #[test]
    fn test_private_blueprint_access() {
        let source = "UCLASS()\nclass UThing\n{\n GENERATED_BODY()\n\
                      UPROPERTY(BlueprintReadOnly)\n int32 Secret;\n};\n";
        let err = parse(source).unwrap_err();
        assert!(err.message.starts_with("BlueprintReadOnly should not be used on private members"));

        let allowed = source.replace("BlueprintReadOnly", "BlueprintReadOnly, meta=(AllowPrivateAccess=true)");
        let ctx = parse(&allowed).unwrap();
        assert!(properties(&ctx)[0].flags.contains(PropertyFlags::NATIVE_ACCESS_PRIVATE));
    }

    #[test]
    fn test_struct_member_rules() {
        let err = parse("USTRUCT()\nstruct FData\n{\n GENERATED_BODY()\n UPROPERTY(Transient)\n int32 X;\n};\n")
            .unwrap_err();
        assert!(err.message.contains("for class members only"));

        let err = parse("USTRUCT()\nstruct FData\n{\n GENERATED_BODY()\n UPROPERTY(Replicated)\n int32 X;\n};\n")
            .unwrap_err();
        assert_eq!(err.message, "Struct members cannot be replicated");

        let err = parse(&class("UPROPERTY(NotReplicated)\nint32 X;")).unwrap_err();
        assert_eq!(err.message, "Only Struct members can be marked NotReplicated");
    }

    #[test]
    fn test_expose_on_spawn() {
        let err = parse(&class("UPROPERTY(EditAnywhere, meta=(ExposeOnSpawn=true))\nint32 X;")).unwrap_err();
        assert!(err.message.contains("requires an editable, Blueprint visible property"));

        let ctx = parse(&class(
            "UPROPERTY(EditAnywhere, BlueprintReadWrite, meta=(ExposeOnSpawn=true))\nint32 X;",
        ))
        .unwrap();
        assert!(properties(&ctx)[0].flags.contains(PropertyFlags::EXPOSE_ON_SPAWN));
    }

    #[test]
    fn test_with_editor_wrapping_rejected() {
        let err = parse(&class("#if WITH_EDITOR\nUPROPERTY()\nint32 X;\n#endif")).unwrap_err();
        assert!(err.message.starts_with("UProperties should not be wrapped by WITH_EDITOR"));
    }

    #[test]
    fn test_non_pie_transient_warns() {
        let ctx = parse(&class("UPROPERTY(NonPIETransient)\nint32 X;")).unwrap();
        assert_eq!(ctx.warnings.len(), 1);
        assert!(properties(&ctx)[0]
            .flags
            .contains(PropertyFlags::NON_PIE_DUPLICATE_TRANSIENT));
    }

    #[test]
    fn test_duplicate_property() {
        let err = parse(&class("UPROPERTY()\nint32 X;\nUPROPERTY()\nfloat X;")).unwrap_err();
        assert_eq!(err.message, "Duplicate property 'X' in 'UThing'");
    }
}
