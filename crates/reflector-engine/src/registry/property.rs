//! Resolved property descriptors and their type shapes.

use crate::registry::entity::EntityId;
use crate::registry::flags::PropertyFlags;
use crate::registry::metadata::Metadata;

/// Built-in value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    /// `native` is false for `uint32 bFoo : 1` bitfields.
    Bool { native: bool },
    Name,
    Str,
    Text,
}

impl PrimitiveKind {
    pub fn from_type_name(name: &str) -> Option<Self> {
        Some(match name {
            "int8" => PrimitiveKind::Int8,
            "int16" => PrimitiveKind::Int16,
            "int32" => PrimitiveKind::Int32,
            "int64" => PrimitiveKind::Int64,
            "uint8" => PrimitiveKind::UInt8,
            "uint16" => PrimitiveKind::UInt16,
            "uint32" => PrimitiveKind::UInt32,
            "uint64" => PrimitiveKind::UInt64,
            "float" => PrimitiveKind::Float,
            "double" => PrimitiveKind::Double,
            "bool" => PrimitiveKind::Bool { native: true },
            "FName" => PrimitiveKind::Name,
            "FString" => PrimitiveKind::Str,
            "FText" => PrimitiveKind::Text,
            _ => return None,
        })
    }

    pub fn property_class(&self) -> &'static str {
        match self {
            PrimitiveKind::Int8 => "UInt8Property",
            PrimitiveKind::Int16 => "UInt16Property",
            PrimitiveKind::Int32 => "UIntProperty",
            PrimitiveKind::Int64 => "UInt64Property",
            PrimitiveKind::UInt8 => "UByteProperty",
            PrimitiveKind::UInt16 => "UUInt16Property",
            PrimitiveKind::UInt32 => "UUInt32Property",
            PrimitiveKind::UInt64 => "UUInt64Property",
            PrimitiveKind::Float => "UFloatProperty",
            PrimitiveKind::Double => "UDoubleProperty",
            PrimitiveKind::Bool { .. } => "UBoolProperty",
            PrimitiveKind::Name => "UNameProperty",
            PrimitiveKind::Str => "UStrProperty",
            PrimitiveKind::Text => "UTextProperty",
        }
    }
}

/// How an object reference is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectWrapper {
    /// `UFoo*`
    Raw,
    /// `TSubobjectPtr<UFoo>`
    Subobject,
    /// `TWeakObjectPtr<UFoo>`
    Weak,
    /// `TAutoWeakObjectPtr<UFoo>`
    AutoWeak,
    /// `TLazyObjectPtr<UFoo>`
    Lazy,
    /// `TAssetPtr<UFoo>`
    Asset,
    /// `TSubclassOf<UFoo>`
    SubclassOf,
    /// `TAssetSubclassOf<UFoo>`
    AssetSubclassOf,
}

impl ObjectWrapper {
    pub fn from_template(name: &str) -> Option<Self> {
        Some(match name {
            "TSubobjectPtr" => ObjectWrapper::Subobject,
            "TWeakObjectPtr" => ObjectWrapper::Weak,
            "TAutoWeakObjectPtr" => ObjectWrapper::AutoWeak,
            "TLazyObjectPtr" => ObjectWrapper::Lazy,
            "TAssetPtr" => ObjectWrapper::Asset,
            "TSubclassOf" => ObjectWrapper::SubclassOf,
            "TAssetSubclassOf" => ObjectWrapper::AssetSubclassOf,
            _ => return None,
        })
    }

    /// Wrappers that hold the object through an indirection the runtime
    /// must be able to track.
    pub fn is_tracked(&self) -> bool {
        matches!(
            self,
            ObjectWrapper::Weak | ObjectWrapper::AutoWeak | ObjectWrapper::Lazy | ObjectWrapper::Asset
        )
    }

    /// Wrappers that cannot be passed as function parameters.
    pub fn is_deferred(&self) -> bool {
        matches!(
            self,
            ObjectWrapper::Lazy | ObjectWrapper::Asset | ObjectWrapper::AssetSubclassOf
        )
    }

    pub fn property_class(&self) -> &'static str {
        match self {
            ObjectWrapper::Raw | ObjectWrapper::Subobject => "UObjectProperty",
            ObjectWrapper::Weak | ObjectWrapper::AutoWeak => "UWeakObjectProperty",
            ObjectWrapper::Lazy => "ULazyObjectProperty",
            ObjectWrapper::Asset => "UAssetObjectProperty",
            ObjectWrapper::SubclassOf => "UClassProperty",
            ObjectWrapper::AssetSubclassOf => "UAssetClassProperty",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Array,
    Map,
    Set,
}

impl ContainerKind {
    pub fn from_template(name: &str) -> Option<Self> {
        match name {
            "TArray" => Some(ContainerKind::Array),
            "TMap" => Some(ContainerKind::Map),
            "TSet" => Some(ContainerKind::Set),
            _ => None,
        }
    }

    pub fn property_class(&self) -> &'static str {
        match self {
            ContainerKind::Array => "UArrayProperty",
            ContainerKind::Map => "UMapProperty",
            ContainerKind::Set => "USetProperty",
        }
    }
}

/// Storage width of an enum-typed member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumWidth {
    /// `TEnumAsByte<E>`
    AsByte,
    /// `enum class E : uint8`
    Underlying,
}

/// The resolved type of a property.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape {
    Primitive(PrimitiveKind),
    ObjectRef {
        class: EntityId,
        wrapper: ObjectWrapper,
    },
    /// `None` for the untyped `FScriptInterface`.
    InterfaceRef(Option<EntityId>),
    StructRef(EntityId),
    EnumRef {
        enum_id: EntityId,
        width: EnumWidth,
    },
    DelegateRef {
        signature: EntityId,
        multicast: bool,
    },
    Container {
        kind: ContainerKind,
        inner: Box<PropertyDescriptor>,
        value: Option<Box<PropertyDescriptor>>,
    },
}

impl TypeShape {
    pub fn property_class(&self) -> &'static str {
        match self {
            TypeShape::Primitive(kind) => kind.property_class(),
            TypeShape::ObjectRef { wrapper, .. } => wrapper.property_class(),
            TypeShape::InterfaceRef(_) => "UInterfaceProperty",
            TypeShape::StructRef(_) => "UStructProperty",
            TypeShape::EnumRef { .. } => "UByteProperty",
            TypeShape::DelegateRef { multicast: false, .. } => "UDelegateProperty",
            TypeShape::DelegateRef { multicast: true, .. } => "UMulticastDelegateProperty",
            TypeShape::Container { kind, .. } => kind.property_class(),
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, TypeShape::Container { .. })
    }

    pub fn is_object(&self) -> bool {
        matches!(self, TypeShape::ObjectRef { .. })
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, TypeShape::Primitive(PrimitiveKind::Bool { .. }))
    }

    /// Structural type equality, ignoring element names and flags.
    pub fn same_type(&self, other: &TypeShape) -> bool {
        match (self, other) {
            (
                TypeShape::Container {
                    kind: a_kind,
                    inner: a_inner,
                    value: a_value,
                },
                TypeShape::Container {
                    kind: b_kind,
                    inner: b_inner,
                    value: b_value,
                },
            ) => {
                a_kind == b_kind
                    && a_inner.shape.same_type(&b_inner.shape)
                    && match (a_value, b_value) {
                        (Some(a), Some(b)) => a.shape.same_type(&b.shape),
                        (None, None) => true,
                        _ => false,
                    }
            }
            _ => self == other,
        }
    }

    /// Element properties of a container, key first.
    pub fn elements(&self) -> Vec<&PropertyDescriptor> {
        match self {
            TypeShape::Container { inner, value, .. } => {
                std::iter::once(inner.as_ref()).chain(value.as_deref()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Static array dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayDim {
    Scalar,
    /// Size expression as written.
    Static(String),
}

/// A fully resolved property, parameter or return value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub shape: TypeShape,
    pub flags: PropertyFlags,
    pub rep_notify: Option<String>,
    pub array_dim: ArrayDim,
    pub metadata: Metadata,
    pub line: u32,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, shape: TypeShape, line: u32) -> Self {
        Self {
            name: name.into(),
            shape,
            flags: PropertyFlags::EMPTY,
            rep_notify: None,
            array_dim: ArrayDim::Scalar,
            metadata: Metadata::new(),
            line,
        }
    }

    pub fn is_editor_only(&self) -> bool {
        self.flags.contains(PropertyFlags::EDITOR_ONLY)
    }

    pub fn is_deprecated(&self) -> bool {
        self.flags.contains(PropertyFlags::DEPRECATED)
    }

    pub fn is_out_param(&self) -> bool {
        self.flags.contains(PropertyFlags::OUT_PARM)
    }

    /// Out/ref flags that must agree between an override and the original.
    pub fn passing_flags(&self) -> PropertyFlags {
        self.flags
            .intersection(PropertyFlags::OUT_PARM | PropertyFlags::REFERENCE_PARM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(name: &str, kind: PrimitiveKind) -> Box<PropertyDescriptor> {
        Box::new(PropertyDescriptor::new(name, TypeShape::Primitive(kind), 1))
    }

    #[test]
    fn test_same_type_ignores_element_names() {
        let a = TypeShape::Container {
            kind: ContainerKind::Array,
            inner: element("Scores", PrimitiveKind::Int32),
            value: None,
        };
        let b = TypeShape::Container {
            kind: ContainerKind::Array,
            inner: element("Values", PrimitiveKind::Int32),
            value: None,
        };
        assert!(a.same_type(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_property_class_names() {
        assert_eq!(TypeShape::Primitive(PrimitiveKind::Int32).property_class(), "UIntProperty");
        assert_eq!(
            TypeShape::DelegateRef {
                signature: EntityId::from_index(0),
                multicast: true
            }
            .property_class(),
            "UMulticastDelegateProperty"
        );
        assert_eq!(ObjectWrapper::SubclassOf.property_class(), "UClassProperty");
    }

    #[test]
    fn test_map_elements_key_first() {
        let map = TypeShape::Container {
            kind: ContainerKind::Map,
            inner: element("Key", PrimitiveKind::Name),
            value: Some(element("Value", PrimitiveKind::Float)),
        };
        let names: Vec<_> = map.elements().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Key", "Value"]);
    }
}
