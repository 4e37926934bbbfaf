//! Rules that need resolved types: member property checks, override
//! matching and replication notifies.

use crate::error::{Error, Result};
use crate::registry::{
    EntityId, FunctionDescriptor, FunctionFlags, PropertyDescriptor, PropertyFlags, Registry,
    TypeShape,
};

/// Property specifiers that only apply to multicast delegates.
const MULTICAST_ONLY: [(PropertyFlags, &str); 3] = [
    (PropertyFlags::BLUEPRINT_ASSIGNABLE, "BlueprintAssignable"),
    (PropertyFlags::BLUEPRINT_CALLABLE, "BlueprintCallable"),
    (PropertyFlags::BLUEPRINT_AUTHORITY_ONLY, "BlueprintAuthorityOnly"),
];

pub fn check_property(registry: &Registry, owner: EntityId, property: &PropertyDescriptor) -> Result<()> {
    let line = property.line;

    if let Some((ancestor, inherited)) = registry.find_inherited_property(owner, &property.name) {
        if !inherited.is_deprecated() && !property.is_deprecated() {
            return Err(Error::semantic(
                line,
                format!(
                    "Member variable '{}' of '{}' shadows a member of the same name in '{}'",
                    property.name,
                    registry.get(owner).name,
                    registry.get(ancestor).name
                ),
            ));
        }
    }

    if property.flags.contains(PropertyFlags::CONFIG) && property.shape.is_object() {
        return Err(Error::semantic(line, "Not allowed to use 'config' with object variables"));
    }

    if property.flags.contains(PropertyFlags::PERSISTENT_INSTANCE) && !holds_objects(&property.shape) {
        return Err(Error::semantic(
            line,
            "'Instanced' is only allowed on object property (or array of objects)",
        ));
    }

    let multicast = matches!(property.shape, TypeShape::DelegateRef { multicast: true, .. });
    if !multicast {
        if let Some((_, specifier)) = MULTICAST_ONLY
            .iter()
            .find(|(flag, _)| property.flags.contains(*flag))
        {
            return Err(Error::semantic(
                line,
                format!("'{}' is only allowed on multicast delegate properties", specifier),
            ));
        }
    }
    Ok(())
}

fn holds_objects(shape: &TypeShape) -> bool {
    match shape {
        TypeShape::ObjectRef { .. } => true,
        TypeShape::Container { .. } => shape.elements().iter().any(|e| e.shape.is_object()),
        _ => false,
    }
}

// ============================================================================
// Overrides
// ============================================================================

/// Link `function` to the function it overrides in a super class, if any.
pub fn link_override(registry: &Registry, owner: EntityId, function: &mut FunctionDescriptor) -> Result<()> {
    let Some(original_ref) = registry.find_inherited_function(owner, &function.name) else {
        return Ok(());
    };
    let original = registry.function(original_ref);

    function.flags |= original.flags.intersection(FunctionFlags::INHERIT);
    if function.flags.intersection(FunctionFlags::NET_FUNC_FLAGS).is_empty() {
        function.flags |= original.flags.intersection(FunctionFlags::NET_FUNC_FLAGS);
    }

    if let Some(reason) = override_mismatch(original, function) {
        return Err(Error::semantic(
            function.line,
            format!(
                "Redefinition of 'function {}' differs from original: {}",
                function.name, reason
            ),
        ));
    }
    function.super_function = Some(original_ref);
    Ok(())
}

fn override_mismatch(original: &FunctionDescriptor, function: &FunctionDescriptor) -> Option<String> {
    if original.flags.contains(FunctionFlags::PRIVATE) {
        return Some("the original function is private".to_string());
    }
    if original.flags.contains(FunctionFlags::FINAL) {
        return Some("the original function is final".to_string());
    }

    match (&original.return_value, &function.return_value) {
        (None, None) => {}
        (Some(a), Some(b)) if a.shape.same_type(&b.shape) => {}
        _ => return Some("return value differs".to_string()),
    }
    if original.params.len() != function.params.len() {
        return Some(format!(
            "{} parameters instead of {}",
            function.params.len(),
            original.params.len()
        ));
    }
    for (a, b) in original.params.iter().zip(&function.params) {
        if !a.shape.same_type(&b.shape) {
            return Some(format!("type mismatch in parameter '{}'", b.name));
        }
        if a.passing_flags() != b.passing_flags() {
            return Some(format!("out or reference mismatch in parameter '{}'", b.name));
        }
    }

    let net = FunctionFlags::NET_FUNC_FLAGS;
    if original.flags.intersection(net) != function.flags.intersection(net) {
        return Some("replication flags differ".to_string());
    }
    let fixed = FunctionFlags::OVERRIDE_MATCH;
    if original.flags.intersection(fixed) != function.flags.intersection(fixed) {
        return Some("exec or static flags differ".to_string());
    }
    None
}

// ============================================================================
// Replication notifies
// ============================================================================

/// Every `ReplicatedUsing` function exists on the owner or an ancestor and
/// takes at most the property itself.
pub fn check_rep_notifies(registry: &Registry, owner: EntityId) -> Result<()> {
    let entity = registry.get(owner);
    for property in &entity.properties {
        let Some(notify) = &property.rep_notify else {
            continue;
        };
        let function = entity
            .find_function(notify)
            .map(|index| &entity.functions[index])
            .or_else(|| {
                registry
                    .find_inherited_function(owner, notify)
                    .map(|f| registry.function(f))
            })
            .ok_or_else(|| {
                Error::semantic(
                    property.line,
                    format!(
                        "Replication notification function '{}' for property '{}' not found",
                        notify, property.name
                    ),
                )
            })?;

        if function.return_value.is_some() || function.params.len() > 1 {
            return Err(Error::semantic(
                function.line,
                format!(
                    "Replication notification function '{}' must return void and take at most one parameter",
                    notify
                ),
            ));
        }
        if let Some(param) = function.params.first() {
            if !param.shape.same_type(&property.shape) {
                return Err(Error::semantic(
                    function.line,
                    format!(
                        "Replication notification function '{}' parameter must match the type of '{}'",
                        notify, property.name
                    ),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::context::RunContext;
    use crate::declare::tests::parse;
    use crate::error::Result;
    use crate::module::unit::UnitId;
    use crate::resolve::TypeResolver;

    fn resolve(text: &str) -> Result<RunContext> {
        let mut ctx = parse(text)?;
        TypeResolver::resolve_unit(&mut ctx, UnitId::from_index(0))?;
        Ok(ctx)
    }

    fn hierarchy(base: &str, derived: &str) -> String {
        format!(
            "UCLASS()\nclass UBase\n{{\n GENERATED_BODY()\npublic:\n{}\n}};\n\
             UCLASS()\nclass UDerived : public UBase\n{{\n GENERATED_BODY()\npublic:\n{}\n}};\n",
            base, derived
        )
    }

    #[test]
    fn test_override_signature_mismatch() {
        let err = resolve(&hierarchy(
            "UFUNCTION()\nvoid Fire(int32 Count);",
            "UFUNCTION()\nvoid Fire(float Count);",
        ))
        .unwrap_err();
        assert_eq!(
            err.message,
            "Redefinition of 'function Fire' differs from original: type mismatch in parameter 'Count'"
        );

        let err = resolve(&hierarchy(
            "UFUNCTION()\nvoid Fire();",
            "UFUNCTION()\nint32 Fire();",
        ))
        .unwrap_err();
        assert!(err.message.ends_with("return value differs"));
    }

    #[test]
    fn test_override_of_final_or_private() {
        let err = resolve(&hierarchy(
            "UFUNCTION()\nvoid Fire() final;",
            "UFUNCTION()\nvoid Fire();",
        ))
        .unwrap_err();
        assert!(err.message.ends_with("the original function is final"));

        let err = resolve(&hierarchy(
            "private:\nUFUNCTION()\nvoid Fire();",
            "UFUNCTION()\nvoid Fire();",
        ))
        .unwrap_err();
        assert!(err.message.ends_with("the original function is private"));
    }

    #[test]
    fn test_shadowed_property() {
        let err = resolve(&hierarchy("UPROPERTY()\nint32 Health;", "UPROPERTY()\nint32 Health;")).unwrap_err();
        assert_eq!(
            err.message,
            "Member variable 'Health' of 'UDerived' shadows a member of the same name in 'UBase'"
        );
        assert!(resolve(&hierarchy(
            "UPROPERTY()\nint32 Health_DEPRECATED;",
            "UPROPERTY()\nint32 Health;"
        ))
        .is_ok());
    }

    #[test]
    fn test_rep_notify_resolution() {
        let ok = hierarchy(
            "UFUNCTION()\nvoid OnRep_Health(int32 Previous);",
            "UPROPERTY(ReplicatedUsing=OnRep_Health)\nint32 Health;",
        );
        assert!(resolve(&ok).is_ok());

        let err = resolve(&hierarchy("", "UPROPERTY(ReplicatedUsing=OnRep_Missing)\nint32 Health;")).unwrap_err();
        assert!(err.message.contains("'OnRep_Missing' for property 'Health' not found"));

        let err = resolve(&hierarchy(
            "",
            "UPROPERTY(ReplicatedUsing=OnRep_Health)\nint32 Health;\nUFUNCTION()\nvoid OnRep_Health(float Old);",
        ))
        .unwrap_err();
        assert!(err.message.contains("must match the type of 'Health'"));
    }

    #[test]
    fn test_specifiers_needing_resolved_types() {
        let err = resolve(&hierarchy("UPROPERTY(Instanced)\nint32 Count;", "")).unwrap_err();
        assert!(err.message.starts_with("'Instanced' is only allowed on object property"));

        let err = resolve(&hierarchy("UPROPERTY(BlueprintAssignable)\nint32 Count;", "")).unwrap_err();
        assert_eq!(err.message, "'BlueprintAssignable' is only allowed on multicast delegate properties");

        let err = resolve(&hierarchy("UPROPERTY(Config)\nUBase* Other;", "")).unwrap_err();
        assert_eq!(err.message, "Not allowed to use 'config' with object variables");

        assert!(resolve(&hierarchy("UPROPERTY(Instanced)\nTArray<UBase*> Parts;", "")).is_ok());
    }
}
