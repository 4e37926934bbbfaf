//! Type resolver.
//!
//! Drains the members the declaration parser queued for a unit, classifies
//! every written type against the registry, checks the rules that need
//! resolved types, and attaches the results to their owners. If any member
//! of a unit fails, the unit's entities go back to their declared state.
//!
//! # Example
//!
//! ```rust,ignore
//! HeaderParser::parse_unit(&mut ctx, unit)?;
//! TypeResolver::resolve_unit(&mut ctx, unit)?;
//! assert!(ctx.registry.get(class).complete);
//! ```

pub mod checks;
pub mod types;

pub use types::{TypeClassifier, Usage};

use log::debug;

use crate::config::NamingConvention;
use crate::context::RunContext;
use crate::declare::{PendingFunction, PendingMember, PendingProperty};
use crate::error::{Error, Result};
use crate::module::unit::UnitId;
use crate::registry::{
    ArrayDim, Category, ClassFlags, EntityDescriptor, EntityId, FunctionDescriptor, PrimitiveKind,
    PropertyDescriptor, PropertyFlags, Registry, StructFlags, TypeShape,
};

/// Stateless entry points of the resolver.
pub struct TypeResolver;

impl TypeResolver {
    /// Link an entity to its written super type. Entities without a written
    /// super, or already linked by the driver, are left alone.
    pub fn resolve_super(registry: &mut Registry, id: EntityId, line: u32) -> Result<()> {
        let entity = registry.get(id);
        if entity.super_entity.is_some() {
            return Ok(());
        }
        let Some(raw) = entity.raw_super.clone() else {
            return Ok(());
        };
        let category = entity.category();
        let super_id = registry
            .lookup(entity.owner(), category, &raw)
            .ok_or_else(|| {
                let message = match category {
                    Category::Struct => format!("Base struct '{}' of '{}' not found", raw, entity.name),
                    _ => format!("Superclass {} of class {} not found", raw, entity.name),
                };
                Error::semantic(line, message)
            })?;
        registry.set_super(id, super_id, line)
    }

    /// Resolve and attach every member queued for `unit`, then mark the
    /// unit's entities complete. On failure the unit's entities are restored
    /// to their declared state.
    pub fn resolve_unit(ctx: &mut RunContext, unit: UnitId) -> Result<()> {
        let members = ctx.pending.remove(&unit).unwrap_or_default();
        let count = members.len();
        let entities = ctx.unit(unit).entities.clone();
        let snapshot: Vec<EntityDescriptor> = entities
            .iter()
            .map(|&id| ctx.registry.get(id).clone())
            .collect();

        if let Err(err) = attach_members(ctx, &entities, members) {
            for (&id, saved) in entities.iter().zip(snapshot) {
                *ctx.registry.get_mut(id) = saved;
            }
            return Err(err);
        }

        for &id in &entities {
            ctx.registry.get_mut(id).complete = true;
        }
        debug!(
            "resolved {} members of {}",
            count,
            ctx.unit(unit).path.display()
        );
        Ok(())
    }
}

/// Members resolve in declaration order against the registry as it grows,
/// so a later member sees the flags an earlier one propagated.
fn attach_members(ctx: &mut RunContext, entities: &[EntityId], members: Vec<PendingMember>) -> Result<()> {
    for member in members {
        match member {
            PendingMember::Property { owner, property } => {
                let resolved = resolve_property(&ctx.registry, &ctx.config.naming, owner, property)?;
                attach_property(&mut ctx.registry, owner, resolved);
            }
            PendingMember::Function { owner, function } => {
                let mut resolved =
                    resolve_function(&ctx.registry, &ctx.config.naming, Some(owner), function)?;
                checks::link_override(&ctx.registry, owner, &mut resolved)?;
                ctx.registry.get_mut(owner).functions.push(resolved);
            }
            PendingMember::Signature { delegate, function } => {
                let scope = ctx.registry.get(delegate).owner();
                let resolved = resolve_function(&ctx.registry, &ctx.config.naming, scope, function)?;
                if let Some(signature) = ctx.registry.get_mut(delegate).signature_mut() {
                    *signature = resolved;
                }
            }
        }
    }
    for &id in entities {
        checks::check_rep_notifies(&ctx.registry, id)?;
    }
    Ok(())
}

// ============================================================================
// Properties
// ============================================================================

fn resolve_property(
    registry: &Registry,
    naming: &NamingConvention,
    owner: EntityId,
    pending: PendingProperty,
) -> Result<PropertyDescriptor> {
    let line = pending.line;
    let mut property = if pending.bitfield {
        let mut property = PropertyDescriptor::new(
            pending.name.as_str(),
            TypeShape::Primitive(PrimitiveKind::Bool { native: false }),
            line,
        );
        property.flags = pending.flags;
        property
    } else {
        TypeClassifier::new(registry, naming, Some(owner)).property(
            &pending.name,
            &pending.ty,
            pending.flags,
            Usage::Member,
        )?
    };
    property.line = line;
    property.rep_notify = pending.rep_notify;
    property.metadata = pending.metadata;

    if let Some(dim) = pending.array_dim {
        if property.shape.is_bool() {
            return Err(Error::semantic(line, "Bool arrays are not allowed"));
        }
        if property.shape.is_container() {
            return Err(Error::semantic(
                line,
                format!("Static arrays of containers are not allowed ('{}')", property.name),
            ));
        }
        if let Some(enum_name) = array_size_enum(registry, owner, &dim) {
            property.metadata.insert("ArraySizeEnum", enum_name);
        }
        property.array_dim = ArrayDim::Static(dim);
    }

    checks::check_property(registry, owner, &property)?;
    Ok(property)
}

/// Enum named by a static array dimension, `EFoo::Count` or `EFoo_MAX`.
fn array_size_enum(registry: &Registry, owner: EntityId, dim: &str) -> Option<String> {
    let candidate = match dim.split_once("::") {
        Some((head, _)) => head,
        None => dim.strip_suffix("_MAX")?,
    };
    registry
        .lookup(Some(owner), Category::Enum, candidate)
        .map(|id| registry.get(id).name.clone())
}

/// Attach a member property and pass instanced references up to the owner.
fn attach_property(registry: &mut Registry, owner: EntityId, property: PropertyDescriptor) {
    let instanced = property
        .flags
        .intersects(PropertyFlags::INSTANCED_REFERENCE | PropertyFlags::CONTAINS_INSTANCED_REFERENCE);
    let entity = registry.get_mut(owner);
    if instanced {
        if let Some(class) = entity.class_mut() {
            class.flags |= ClassFlags::HAS_INSTANCED_REFERENCE;
        } else if let Some(data) = entity.struct_data_mut() {
            data.flags |= StructFlags::HAS_INSTANCED_REFERENCE;
        }
    }
    entity.properties.push(property);
}

// ============================================================================
// Functions
// ============================================================================

fn resolve_function(
    registry: &Registry,
    naming: &NamingConvention,
    scope: Option<EntityId>,
    pending: PendingFunction,
) -> Result<FunctionDescriptor> {
    let classifier = TypeClassifier::new(registry, naming, scope);
    let mut function = pending.descriptor;
    let replicated = function.is_net();

    for param in pending.params {
        let mut resolved = classifier.property(&param.name, &param.ty, param.flags, Usage::Parameter)?;
        if replicated && matches!(resolved.shape, TypeShape::DelegateRef { .. }) {
            return Err(Error::semantic(
                param.line,
                "Replicated functions cannot contain delegate parameters (this would be insecure)",
            ));
        }
        resolved.metadata = param.metadata;
        function.params.push(resolved);
    }
    if let Some(ret) = pending.return_value {
        function.return_value = Some(classifier.property(&ret.name, &ret.ty, ret.flags, Usage::Parameter)?);
    }
    Ok(function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declare::tests::parse;
    use crate::registry::{EnumWidth, FunctionFlags};

    fn resolve(text: &str) -> Result<RunContext> {
        let mut ctx = parse(text)?;
        TypeResolver::resolve_unit(&mut ctx, UnitId::from_index(0))?;
        Ok(ctx)
    }

    fn class(name: &str, body: &str) -> String {
        format!("UCLASS()\nclass {}\n{{\n GENERATED_BODY()\npublic:\n{}\n}};\n", name, body)
    }

    fn entity<'a>(ctx: &'a RunContext, category: Category, name: &str) -> &'a crate::registry::EntityDescriptor {
        let id = ctx.registry.find(category, name).unwrap();
        ctx.registry.get(id)
    }

    #[test]
    fn test_members_attached_in_order() {
        let ctx = resolve(&class(
            "UThing",
            "UPROPERTY()\nint32 Health;\nUPROPERTY()\nTArray<FString> Tags;\n\
             UFUNCTION()\nvoid Reset();",
        ))
        .unwrap();
        let thing = entity(&ctx, Category::Class, "UThing");
        let names: Vec<_> = thing.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Health", "Tags"]);
        assert_eq!(thing.functions[0].name, "Reset");
        assert!(thing.complete);
        assert!(ctx.pending.is_empty());
    }

    #[test]
    fn test_unresolved_type_attaches_nothing() {
        let mut ctx = parse(&class("UThing", "UPROPERTY()\nFMissing Thing;")).unwrap();
        let err = TypeResolver::resolve_unit(&mut ctx, UnitId::from_index(0)).unwrap_err();
        assert_eq!(err.line, 7);
        let thing = entity(&ctx, Category::Class, "UThing");
        assert!(thing.properties.is_empty());
        assert!(!thing.complete);
    }

    #[test]
    fn test_failing_member_rolls_back_earlier_ones() {
        let mut ctx = parse(&class(
            "UThing",
            "UPROPERTY(Instanced)\nUThing* Part;\nUFUNCTION()\nvoid Reset();\nUPROPERTY()\nFMissing Thing;",
        ))
        .unwrap();
        let err = TypeResolver::resolve_unit(&mut ctx, UnitId::from_index(0)).unwrap_err();
        assert_eq!(err.line, 11);
        let thing = entity(&ctx, Category::Class, "UThing");
        assert!(thing.properties.is_empty());
        assert!(thing.functions.is_empty());
        assert!(!thing.class_flags().contains(ClassFlags::HAS_INSTANCED_REFERENCE));
        assert!(!thing.complete);
    }

    #[test]
    fn test_bitfield_and_static_arrays() {
        let ctx = resolve(&format!(
            "UENUM()\nenum class ESlot : uint8\n{{\n Head,\n Feet\n}};\n{}",
            class(
                "UThing",
                "UPROPERTY()\nuint32 bReady : 1;\nUPROPERTY()\nint32 Counts[ESlot::ESlot_MAX];\n\
                 UPROPERTY()\nESlot Current;"
            )
        ))
        .unwrap();
        let thing = entity(&ctx, Category::Class, "UThing");
        assert_eq!(
            thing.properties[0].shape,
            TypeShape::Primitive(PrimitiveKind::Bool { native: false })
        );
        assert_eq!(thing.properties[1].metadata.get("ArraySizeEnum"), Some("ESlot"));
        assert_eq!(
            thing.properties[1].array_dim,
            ArrayDim::Static("ESlot::ESlot_MAX".to_string())
        );
        assert!(matches!(
            thing.properties[2].shape,
            TypeShape::EnumRef {
                width: EnumWidth::Underlying,
                ..
            }
        ));

        let err = resolve(&class("UThing", "UPROPERTY()\nbool Flags[4];")).unwrap_err();
        assert_eq!(err.message, "Bool arrays are not allowed");
    }

    #[test]
    fn test_instanced_references_propagate() {
        let ctx = resolve(&format!(
            "{}USTRUCT()\nstruct FSlot\n{{\n GENERATED_BODY()\n UPROPERTY(Instanced)\n UPart* Part;\n}};\n{}",
            class("UPart", ""),
            class("UHolder", "UPROPERTY()\nFSlot Slot;")
        ))
        .unwrap();
        let slot = entity(&ctx, Category::Struct, "FSlot");
        assert!(slot.struct_flags().contains(StructFlags::HAS_INSTANCED_REFERENCE));
        let holder = entity(&ctx, Category::Class, "UHolder");
        assert!(holder.properties[0]
            .flags
            .contains(PropertyFlags::CONTAINS_INSTANCED_REFERENCE));
        assert!(holder.class_flags().contains(ClassFlags::HAS_INSTANCED_REFERENCE));
    }

    #[test]
    fn test_delegate_signature_and_property() {
        let ctx = resolve(&format!(
            "DECLARE_DYNAMIC_MULTICAST_DELEGATE_OneParam(FOnHealthChanged, float, NewHealth);\n{}",
            class("UThing", "UPROPERTY(BlueprintAssignable)\nFOnHealthChanged OnHealthChanged;")
        ))
        .unwrap();
        let signature = entity(&ctx, Category::Delegate, "OnHealthChanged__DelegateSignature");
        let params = &signature.signature().unwrap().params;
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "NewHealth");
        let thing = entity(&ctx, Category::Class, "UThing");
        assert!(matches!(
            thing.properties[0].shape,
            TypeShape::DelegateRef { multicast: true, .. }
        ));
    }

    #[test]
    fn test_replicated_delegate_param_rejected() {
        let err = resolve(&format!(
            "DECLARE_DYNAMIC_DELEGATE(FOnDone);\n{}",
            class("UThing", "UFUNCTION(Client, Reliable)\nvoid Notify(FOnDone Done);")
        ))
        .unwrap_err();
        assert!(err.message.starts_with("Replicated functions cannot contain delegate parameters"));
    }

    #[test]
    fn test_override_links_super_function() {
        let ctx = resolve(&format!(
            "{}UCLASS()\nclass UDerived : public UBase\n{{\n GENERATED_BODY()\npublic:\n UFUNCTION()\n void Fire(int32 Count);\n}};\n",
            class("UBase", "UFUNCTION(BlueprintCallable, Category=Combat)\nvoid Fire(int32 Count);")
        ))
        .unwrap();
        let derived = entity(&ctx, Category::Class, "UDerived");
        let fire = &derived.functions[0];
        let original = fire.super_function.unwrap();
        assert_eq!(ctx.registry.get(original.owner).name, "UBase");
        assert!(fire.flags.contains(FunctionFlags::BLUEPRINT_CALLABLE));
    }

    #[test]
    fn test_missing_super_class() {
        let err = parse("UCLASS()\nclass UDerived : public UNowhere\n{\n GENERATED_BODY()\n};\n").unwrap_err();
        assert_eq!(err.message, "Superclass UNowhere of class UDerived not found");
        let err = parse("USTRUCT()\nstruct FDerived : public FNowhere\n{\n GENERATED_BODY()\n};\n").unwrap_err();
        assert_eq!(err.message, "Base struct 'FNowhere' of 'FDerived' not found");
    }
}
