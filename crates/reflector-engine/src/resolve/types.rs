//! Classification of written types into [`TypeShape`]s.

use crate::config::NamingConvention;
use crate::declare::TypeSyntax;
use crate::error::{Error, Result};
use crate::registry::{
    Category, ClassFlags, ContainerKind, EntityId, EnumForm, EnumWidth, ObjectWrapper,
    PrimitiveKind, PropertyDescriptor, PropertyFlags, Registry, StructFlags, TypeShape,
};

/// Where a type is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    Member,
    Parameter,
    Element,
}

/// Generic untyped interface reference.
const SCRIPT_INTERFACE: &str = "FScriptInterface";
const TEMPLATE_SCRIPT_INTERFACE: &str = "TScriptInterface";
const ENUM_AS_BYTE: &str = "TEnumAsByte";

/// Resolves type names visible from one scope.
pub struct TypeClassifier<'a> {
    pub registry: &'a Registry,
    pub naming: &'a NamingConvention,
    pub scope: Option<EntityId>,
}

impl<'a> TypeClassifier<'a> {
    pub fn new(registry: &'a Registry, naming: &'a NamingConvention, scope: Option<EntityId>) -> Self {
        Self {
            registry,
            naming,
            scope,
        }
    }

    /// Resolve a written type into a property descriptor named `name`.
    /// Element properties of containers receive the flags of `flags` that
    /// propagate to inner properties.
    pub fn property(
        &self,
        name: &str,
        ty: &TypeSyntax,
        flags: PropertyFlags,
        usage: Usage,
    ) -> Result<PropertyDescriptor> {
        let line = ty.line;
        let shape = self.shape(name, ty, flags, usage)?;
        let mut property = PropertyDescriptor::new(name, shape, line);
        property.flags = flags;

        match &property.shape {
            TypeShape::ObjectRef { class, wrapper } => {
                if *wrapper == ObjectWrapper::AutoWeak {
                    property.flags |= PropertyFlags::AUTO_WEAK;
                }
                if wrapper.is_tracked() {
                    property.flags |= PropertyFlags::UOBJECT_WRAPPER;
                }
                if self.class_flags(*class).contains(ClassFlags::DEFAULT_TO_INSTANCED)
                    && usage != Usage::Parameter
                {
                    property.flags |= PropertyFlags::INSTANCED_REFERENCE | PropertyFlags::EXPORT_OBJECT;
                }
            }
            TypeShape::Container { .. } => {
                if property.shape.elements().iter().any(|e| {
                    e.flags.intersects(
                        PropertyFlags::INSTANCED_REFERENCE | PropertyFlags::CONTAINS_INSTANCED_REFERENCE,
                    )
                }) {
                    property.flags |= PropertyFlags::CONTAINS_INSTANCED_REFERENCE;
                }
            }
            TypeShape::StructRef(id) => {
                let struct_flags = self.registry.get(*id).struct_flags();
                if struct_flags.contains(StructFlags::HAS_INSTANCED_REFERENCE) {
                    property.flags |= PropertyFlags::CONTAINS_INSTANCED_REFERENCE;
                }
            }
            _ => {}
        }
        if property.flags.contains(PropertyFlags::INSTANCED_REFERENCE) {
            property.flags |= PropertyFlags::CONTAINS_INSTANCED_REFERENCE;
        }
        Ok(property)
    }

    fn shape(&self, name: &str, ty: &TypeSyntax, flags: PropertyFlags, usage: Usage) -> Result<TypeShape> {
        let line = ty.line;

        if let Some(kind) = PrimitiveKind::from_type_name(&ty.name) {
            if ty.pointer {
                return Err(Error::semantic(line, format!("Pointers to '{}' are not supported", ty.name)));
            }
            return Ok(TypeShape::Primitive(kind));
        }
        if ty.name == "Text" {
            return Err(Error::semantic(line, "'Text' is not a valid type, use FText"));
        }
        if ty.name == SCRIPT_INTERFACE {
            return Ok(TypeShape::InterfaceRef(None));
        }

        if ty.is_template() {
            return self.template_shape(name, ty, flags, usage);
        }

        if let Some(signature) = self.lookup_delegate(&ty.name) {
            if ty.pointer {
                return Err(Error::semantic(line, format!("Delegate '{}' cannot be held by pointer", ty.name)));
            }
            return Ok(TypeShape::DelegateRef {
                signature,
                multicast: self.registry.get(signature).is_multicast_delegate(),
            });
        }

        if let Some(class) = self.registry.lookup(self.scope, Category::Class, &ty.name) {
            if self.registry.get(class).is_interface() {
                return Err(Error::semantic(
                    line,
                    format!(
                        "Interface '{}' must be referenced through {}",
                        ty.name, TEMPLATE_SCRIPT_INTERFACE
                    ),
                ));
            }
            if !ty.pointer {
                return Err(Error::semantic(
                    line,
                    format!("Object reference '{}' must be a pointer, use '{}*'", ty.name, ty.name),
                ));
            }
            return Ok(TypeShape::ObjectRef {
                class,
                wrapper: ObjectWrapper::Raw,
            });
        }

        if let Some(id) = self.registry.lookup(self.scope, Category::Struct, &ty.name) {
            if ty.pointer {
                return Err(Error::semantic(line, format!("Pointers to struct '{}' are not supported", ty.name)));
            }
            return Ok(TypeShape::StructRef(id));
        }

        if let Some(enum_id) = self.registry.lookup(self.scope, Category::Enum, &ty.name) {
            let form = self.registry.get(enum_id).enum_data().map(|e| e.form);
            let width = match form {
                Some(EnumForm::EnumClass) => EnumWidth::Underlying,
                _ if usage == Usage::Parameter => EnumWidth::AsByte,
                _ => {
                    return Err(Error::semantic(
                        line,
                        format!(
                            "You cannot use the raw enum name as a type for member variables, instead use {}<{}> or a uint8 enum class",
                            ENUM_AS_BYTE, ty.name
                        ),
                    ));
                }
            };
            return Ok(TypeShape::EnumRef { enum_id, width });
        }

        Err(Error::semantic(
            line,
            format!(
                "Unrecognized type '{}' - type must be a UCLASS, USTRUCT or UENUM",
                ty.name
            ),
        ))
    }

    fn template_shape(&self, name: &str, ty: &TypeSyntax, flags: PropertyFlags, usage: Usage) -> Result<TypeShape> {
        let line = ty.line;
        if ty.pointer {
            return Err(Error::semantic(line, format!("Pointers to '{}' are not supported", ty.name)));
        }

        if let Some(kind) = ContainerKind::from_template(&ty.name) {
            return self.container_shape(kind, name, ty, flags, usage);
        }

        let arg = self.single_arg(ty)?;
        if ty.name == ENUM_AS_BYTE {
            let enum_id = self
                .registry
                .lookup(self.scope, Category::Enum, &arg.name)
                .ok_or_else(|| {
                    Error::semantic(line, format!("{} requires an enum type, found '{}'", ENUM_AS_BYTE, arg.name))
                })?;
            return Ok(TypeShape::EnumRef {
                enum_id,
                width: EnumWidth::AsByte,
            });
        }

        if ty.name == TEMPLATE_SCRIPT_INTERFACE {
            let class_name = self
                .naming
                .interface_class_name(&arg.name)
                .filter(|n| self.registry.lookup(self.scope, Category::Class, n).is_some())
                .unwrap_or_else(|| arg.name.clone());
            let class = self.class(&class_name, line)?;
            if !self.registry.get(class).is_interface() {
                return Err(Error::semantic(
                    line,
                    format!("{} requires an interface, '{}' is not one", TEMPLATE_SCRIPT_INTERFACE, class_name),
                ));
            }
            return Ok(TypeShape::InterfaceRef(Some(class)));
        }

        if let Some(wrapper) = ObjectWrapper::from_template(&ty.name) {
            let class = self.class(&arg.name, line)?;
            if self.registry.get(class).is_interface() {
                return Err(Error::semantic(
                    line,
                    format!("{} cannot reference interface '{}'", ty.name, arg.name),
                ));
            }
            if usage == Usage::Parameter && wrapper.is_deferred() {
                return Err(Error::semantic(
                    line,
                    format!("{} cannot be used as a function parameter", ty.name),
                ));
            }
            return Ok(TypeShape::ObjectRef { class, wrapper });
        }

        Err(Error::semantic(line, format!("Unrecognized template type '{}'", ty.name)))
    }

    fn container_shape(
        &self,
        kind: ContainerKind,
        name: &str,
        ty: &TypeSyntax,
        flags: PropertyFlags,
        usage: Usage,
    ) -> Result<TypeShape> {
        let line = ty.line;
        if usage == Usage::Element {
            return Err(Error::semantic(line, "Nested containers are not supported."));
        }
        let expected = if kind == ContainerKind::Map { 2 } else { 1 };
        if ty.args.len() != expected {
            return Err(Error::semantic(
                line,
                format!("'{}' expects {} type arguments, found {}", ty.name, expected, ty.args.len()),
            ));
        }

        let inner_flags = flags.intersection(PropertyFlags::PROPAGATE_TO_INNER);
        let (inner_name, value_name) = match kind {
            ContainerKind::Map => (format!("{}_Key", name), Some(format!("{}_Value", name))),
            _ => (format!("{}_Inner", name), None),
        };
        let inner = self.property(&inner_name, &ty.args[0], inner_flags, Usage::Element)?;
        if matches!(kind, ContainerKind::Map | ContainerKind::Set) {
            if let TypeShape::StructRef(id) = inner.shape {
                let key = self.registry.get(id);
                if key.struct_flags().contains(StructFlags::NO_EXPORT) {
                    return Err(Error::semantic(
                        line,
                        format!(
                            "NoExport struct '{}' cannot be used as a {} key",
                            key.name,
                            if kind == ContainerKind::Map { "map" } else { "set" }
                        ),
                    ));
                }
            }
        }
        let value = match value_name {
            Some(value_name) => Some(Box::new(self.property(
                &value_name,
                &ty.args[1],
                inner_flags,
                Usage::Element,
            )?)),
            None => None,
        };

        Ok(TypeShape::Container {
            kind,
            inner: Box::new(inner),
            value,
        })
    }

    fn single_arg<'t>(&self, ty: &'t TypeSyntax) -> Result<&'t TypeSyntax> {
        match ty.args.as_slice() {
            [arg] => Ok(arg),
            _ => Err(Error::semantic(
                ty.line,
                format!("'{}' expects a single type argument", ty.name),
            )),
        }
    }

    fn class(&self, name: &str, line: u32) -> Result<EntityId> {
        self.registry
            .lookup(self.scope, Category::Class, name)
            .ok_or_else(|| Error::semantic(line, format!("Class '{}' not found", name)))
    }

    fn class_flags(&self, id: EntityId) -> ClassFlags {
        self.registry.get(id).class_flags()
    }

    /// `FOnHit` names the `OnHit__DelegateSignature` entity.
    fn lookup_delegate(&self, name: &str) -> Option<EntityId> {
        let signature = self.naming.delegate_signature_name(name).ok()?;
        self.registry.lookup(self.scope, Category::Delegate, &signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declare::parse_type;
    use crate::module::unit::UnitId;
    use crate::parser::{tokenize, TokenCursor};
    use crate::registry::{ClassData, EntityData, EnumData, NewEntity, Outer, StructData};

    fn add(registry: &mut Registry, name: &str, data: EntityData) -> EntityId {
        registry
            .add(NewEntity {
                name: name.to_string(),
                data,
                outer: Outer::Package("Game".to_string()),
                raw_super: None,
                unit: UnitId::from_index(0),
                module: "Game".to_string(),
                line: 1,
            })
            .unwrap()
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        add(&mut registry, "UObject", EntityData::Class(ClassData::default()));
        add(
            &mut registry,
            "UDamageable",
            EntityData::Class(ClassData {
                flags: ClassFlags::INTERFACE,
                ..Default::default()
            }),
        );
        add(&mut registry, "FVector", EntityData::Struct(StructData::default()));
        add(
            &mut registry,
            "FMirror",
            EntityData::Struct(StructData {
                flags: StructFlags::NO_EXPORT,
                ..Default::default()
            }),
        );
        add(
            &mut registry,
            "EColor",
            EntityData::Enum(EnumData {
                form: EnumForm::Regular,
                values: vec![],
                underlying: None,
            }),
        );
        registry
    }

    fn classify(source: &str, usage: Usage) -> Result<PropertyDescriptor> {
        let registry = registry();
        let naming = NamingConvention::default();
        let classifier = TypeClassifier::new(&registry, &naming, None);
        let mut cursor = TokenCursor::new(tokenize(source).unwrap());
        let ty = parse_type(&mut cursor, "test").unwrap();
        classifier.property("Value", &ty, PropertyFlags::EMPTY, usage)
    }

    #[test]
    fn test_primitives_and_objects() {
        assert!(matches!(
            classify("int32", Usage::Member).unwrap().shape,
            TypeShape::Primitive(PrimitiveKind::Int32)
        ));
        assert!(classify("UObject*", Usage::Member).unwrap().shape.is_object());
        let err = classify("UObject", Usage::Member).unwrap_err();
        assert!(err.message.contains("must be a pointer"));
    }

    #[test]
    fn test_containers() {
        let prop = classify("TMap<FName, UObject*>", Usage::Member).unwrap();
        let names: Vec<_> = prop.shape.elements().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, ["Value_Key", "Value_Value"]);

        let err = classify("TArray<TArray<int32>>", Usage::Member).unwrap_err();
        assert_eq!(err.message, "Nested containers are not supported.");

        let err = classify("TSet<FMirror>", Usage::Member).unwrap_err();
        assert!(err.message.contains("NoExport struct 'FMirror'"));
        assert!(classify("TArray<FMirror>", Usage::Member).is_ok());
    }

    #[test]
    fn test_enum_width() {
        let err = classify("EColor", Usage::Member).unwrap_err();
        assert!(err.message.contains("TEnumAsByte<EColor>"));
        assert!(classify("EColor", Usage::Parameter).is_ok());
        assert!(matches!(
            classify("TEnumAsByte<EColor::Type>", Usage::Member).unwrap().shape,
            TypeShape::EnumRef {
                width: EnumWidth::AsByte,
                ..
            }
        ));
    }

    #[test]
    fn test_interfaces() {
        assert!(matches!(
            classify("TScriptInterface<IDamageable>", Usage::Member).unwrap().shape,
            TypeShape::InterfaceRef(Some(_))
        ));
        assert!(classify("UDamageable*", Usage::Member).is_err());
        assert!(classify("TWeakObjectPtr<UDamageable>", Usage::Member).is_err());
        assert!(matches!(
            classify("FScriptInterface", Usage::Member).unwrap().shape,
            TypeShape::InterfaceRef(None)
        ));
    }

    #[test]
    fn test_wrappers() {
        let weak = classify("TWeakObjectPtr<UObject>", Usage::Member).unwrap();
        assert!(weak.flags.contains(PropertyFlags::UOBJECT_WRAPPER));
        assert!(classify("TLazyObjectPtr<UObject>", Usage::Parameter).is_err());
        assert!(classify("TSubclassOf<UObject>", Usage::Parameter).is_ok());
    }

    #[test]
    fn test_unknown_type() {
        let err = classify("FMissing", Usage::Member).unwrap_err();
        assert_eq!(
            err.message,
            "Unrecognized type 'FMissing' - type must be a UCLASS, USTRUCT or UENUM"
        );
        assert!(classify("Text", Usage::Member).is_err());
    }
}
