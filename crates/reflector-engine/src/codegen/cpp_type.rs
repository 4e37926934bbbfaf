//! Native spelling of resolved property types.

use crate::config::NamingConvention;
use crate::registry::{
    ArrayDim, ContainerKind, EnumForm, EnumWidth, ObjectWrapper, PrimitiveKind, PropertyDescriptor,
    Registry, TypeShape,
};

const DELEGATE_SUFFIX: &str = "__DelegateSignature";

pub(crate) struct CppTypes<'a> {
    registry: &'a Registry,
    naming: &'a NamingConvention,
}

impl<'a> CppTypes<'a> {
    pub fn new(registry: &'a Registry, naming: &'a NamingConvention) -> Self {
        Self { registry, naming }
    }

    pub fn of(&self, shape: &TypeShape) -> String {
        match shape {
            TypeShape::Primitive(kind) => primitive(*kind).to_string(),
            TypeShape::ObjectRef { class, wrapper } => {
                let class = &self.registry.get(*class).name;
                match wrapper {
                    ObjectWrapper::Raw => format!("{}*", class),
                    ObjectWrapper::Subobject => format!("TSubobjectPtr<{}>", class),
                    ObjectWrapper::Weak => format!("TWeakObjectPtr<{}>", class),
                    ObjectWrapper::AutoWeak => format!("TAutoWeakObjectPtr<{}>", class),
                    ObjectWrapper::Lazy => format!("TLazyObjectPtr<{}>", class),
                    ObjectWrapper::Asset => format!("TAssetPtr<{}>", class),
                    ObjectWrapper::SubclassOf => format!("TSubclassOf<{}>", class),
                    ObjectWrapper::AssetSubclassOf => format!("TAssetSubclassOf<{}>", class),
                }
            }
            TypeShape::InterfaceRef(Some(class)) => format!(
                "TScriptInterface<{}>",
                self.naming.native_interface_name(&self.registry.get(*class).name)
            ),
            TypeShape::InterfaceRef(None) => "FScriptInterface".to_string(),
            TypeShape::StructRef(id) => self.registry.get(*id).name.clone(),
            TypeShape::EnumRef { enum_id, width } => {
                let entity = self.registry.get(*enum_id);
                let namespaced = entity
                    .enum_data()
                    .is_some_and(|data| data.form == EnumForm::Namespaced);
                let name = if namespaced {
                    format!("{}::Type", entity.name)
                } else {
                    entity.name.clone()
                };
                match width {
                    EnumWidth::AsByte => format!("TEnumAsByte<{}>", name),
                    EnumWidth::Underlying => name,
                }
            }
            TypeShape::DelegateRef { signature, .. } => self.delegate_type(&self.registry.get(*signature).name),
            TypeShape::Container { kind, inner, value } => match (kind, value) {
                (ContainerKind::Map, Some(value)) => {
                    format!("TMap<{},{}>", self.of(&inner.shape), self.of(&value.shape))
                }
                (ContainerKind::Set, _) => format!("TSet<{}>", self.of(&inner.shape)),
                _ => format!("TArray<{}>", self.of(&inner.shape)),
            },
        }
    }

    /// `F{Name}` for a stored `{Name}__DelegateSignature`.
    pub fn delegate_type(&self, signature: &str) -> String {
        let base = signature.strip_suffix(DELEGATE_SUFFIX).unwrap_or(signature);
        format!("{}{}", self.naming.delegate_prefix, base)
    }

    /// Member of a generated parameter struct.
    pub fn member(&self, property: &PropertyDescriptor) -> String {
        let ty = match property.shape {
            TypeShape::Primitive(PrimitiveKind::Bool { .. }) => "bool".to_string(),
            ref shape => self.of(shape),
        };
        match &property.array_dim {
            ArrayDim::Scalar => format!("{} {};", ty, property.name),
            ArrayDim::Static(dim) => format!("{} {}[{}];", ty, property.name, dim),
        }
    }

    /// Parameter as written in a native function signature.
    pub fn parameter(&self, property: &PropertyDescriptor) -> String {
        let ty = self.of(&property.shape);
        if property.is_out_param() {
            format!("{}& {}", ty, property.name)
        } else if by_reference(&property.shape) {
            format!("const {}& {}", ty, property.name)
        } else {
            format!("{} {}", ty, property.name)
        }
    }
}

fn primitive(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Int8 => "int8",
        PrimitiveKind::Int16 => "int16",
        PrimitiveKind::Int32 => "int32",
        PrimitiveKind::Int64 => "int64",
        PrimitiveKind::UInt8 => "uint8",
        PrimitiveKind::UInt16 => "uint16",
        PrimitiveKind::UInt32 => "uint32",
        PrimitiveKind::UInt64 => "uint64",
        PrimitiveKind::Float => "float",
        PrimitiveKind::Double => "double",
        PrimitiveKind::Bool { .. } => "bool",
        PrimitiveKind::Name => "FName",
        PrimitiveKind::Str => "FString",
        PrimitiveKind::Text => "FText",
    }
}

/// Types passed to native functions by const reference.
fn by_reference(shape: &TypeShape) -> bool {
    matches!(
        shape,
        TypeShape::Primitive(PrimitiveKind::Str | PrimitiveKind::Text)
            | TypeShape::StructRef(_)
            | TypeShape::Container { .. }
            | TypeShape::DelegateRef { multicast: true, .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::unit::UnitId;
    use crate::registry::{
        ClassData, EntityData, EntityId, EnumData, NewEntity, Outer, PropertyFlags, StructData,
    };

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

    #[test]
    fn test_spellings() {
        let mut registry = Registry::new();
        let naming = NamingConvention::default();
        let class = add(&mut registry, "UThing", EntityData::Class(ClassData::default()));
        let stats = add(&mut registry, "FStats", EntityData::Struct(StructData::default()));
        let mood = add(
            &mut registry,
            "EMood",
            EntityData::Enum(EnumData {
                form: EnumForm::Namespaced,
                values: Vec::new(),
                underlying: None,
            }),
        );
        let types = CppTypes::new(&registry, &naming);

        let weak = TypeShape::ObjectRef {
            class,
            wrapper: ObjectWrapper::Weak,
        };
        assert_eq!(types.of(&weak), "TWeakObjectPtr<UThing>");
        assert_eq!(types.of(&TypeShape::InterfaceRef(Some(class))), "TScriptInterface<IThing>");
        assert_eq!(
            types.of(&TypeShape::EnumRef {
                enum_id: mood,
                width: EnumWidth::AsByte
            }),
            "TEnumAsByte<EMood::Type>"
        );
        let scores = TypeShape::Container {
            kind: ContainerKind::Map,
            inner: Box::new(PropertyDescriptor::new("Scores", TypeShape::Primitive(PrimitiveKind::Name), 1)),
            value: Some(Box::new(PropertyDescriptor::new("Scores", TypeShape::StructRef(stats), 1))),
        };
        assert_eq!(types.of(&scores), "TMap<FName,FStats>");
        assert_eq!(types.delegate_type("OnHit__DelegateSignature"), "FOnHit");
    }

    #[test]
    fn test_parameter_passing() {
        let registry = Registry::new();
        let naming = NamingConvention::default();
        let types = CppTypes::new(&registry, &naming);

        let mut count = PropertyDescriptor::new("OutCount", TypeShape::Primitive(PrimitiveKind::Int32), 1);
        count.flags = PropertyFlags::PARM | PropertyFlags::OUT_PARM;
        let label = PropertyDescriptor::new("Label", TypeShape::Primitive(PrimitiveKind::Str), 1);
        let mut flag = PropertyDescriptor::new("bOn", TypeShape::Primitive(PrimitiveKind::Bool { native: false }), 1);
        flag.array_dim = ArrayDim::Static("4".to_string());

        assert_eq!(types.parameter(&count), "int32& OutCount");
        assert_eq!(types.parameter(&label), "const FString& Label");
        assert_eq!(types.member(&count), "int32 OutCount;");
        assert_eq!(types.member(&flag), "bool bOn[4];");
    }
}
