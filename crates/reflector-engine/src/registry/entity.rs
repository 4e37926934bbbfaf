//! Entity descriptors: classes, structs, enums and delegate signatures.

use std::fmt;

use crate::module::unit::UnitId;
use crate::registry::flags::{ClassFlags, FunctionFlags, StructFlags};
use crate::registry::metadata::Metadata;
use crate::registry::property::PropertyDescriptor;

/// Arena handle into the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Name-uniqueness category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Class,
    Struct,
    Enum,
    Delegate,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Class => "class",
            Category::Struct => "struct",
            Category::Enum => "enum",
            Category::Delegate => "delegate",
        })
    }
}

/// What an entity is nested in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outer {
    /// Declared at file scope of the named module.
    Package(String),
    Entity(EntityId),
}

/// Weak handle to a function owned by an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionRef {
    pub owner: EntityId,
    pub index: usize,
}

/// A reflected function or delegate signature.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDescriptor {
    pub name: String,
    pub return_value: Option<PropertyDescriptor>,
    pub params: Vec<PropertyDescriptor>,
    pub flags: FunctionFlags,
    pub super_function: Option<FunctionRef>,
    pub rpc_id: Option<u16>,
    pub rpc_response_id: Option<u16>,
    pub metadata: Metadata,
    pub line: u32,
}

impl FunctionDescriptor {
    pub fn new(name: impl Into<String>, line: u32) -> Self {
        Self {
            name: name.into(),
            return_value: None,
            params: Vec::new(),
            flags: FunctionFlags::EMPTY,
            super_function: None,
            rpc_id: None,
            rpc_response_id: None,
            metadata: Metadata::new(),
            line,
        }
    }

    pub fn is_net(&self) -> bool {
        self.flags.contains(FunctionFlags::NET)
    }

    pub fn is_delegate(&self) -> bool {
        self.flags.contains(FunctionFlags::DELEGATE)
    }

    pub fn has_outputs(&self) -> bool {
        self.return_value.is_some() || self.params.iter().any(PropertyDescriptor::is_out_param)
    }

    /// Parameters followed by the return value, the order the runtime links
    /// them in.
    pub fn all_params(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.params.iter().chain(self.return_value.as_ref())
    }
}

/// An interface implemented by a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementedInterface {
    pub class: EntityId,
    /// Implemented natively (through C++ inheritance) rather than only in
    /// the class's own reflection data.
    pub native: bool,
}

/// Access level in effect at a point of a type body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberAccess {
    Public,
    Protected,
    Private,
}

impl MemberAccess {
    pub fn specifier(&self) -> &'static str {
        match self {
            MemberAccess::Public => "public:",
            MemberAccess::Protected => "protected:",
            MemberAccess::Private => "private:",
        }
    }
}

/// A `GENERATED_*BODY()` macro written in a type body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyMacro {
    pub line: u32,
    /// Any spelling other than plain `GENERATED_BODY()`.
    pub legacy: bool,
    /// Access in effect just before the macro.
    pub access: MemberAccess,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassData {
    pub flags: ClassFlags,
    pub config_name: Option<String>,
    pub within: Option<EntityId>,
    pub interfaces: Vec<ImplementedInterface>,
    /// `*_API` macro written on the class declaration.
    pub api: Option<String>,
    pub has_default_constructor: bool,
    pub has_object_initializer_constructor: bool,
    pub body: Option<BodyMacro>,
    /// Body macro of the native `I` class of an interface.
    pub native_body: Option<BodyMacro>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructData {
    pub flags: StructFlags,
    pub body: Option<BodyMacro>,
}

/// How an enum was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumForm {
    /// `enum EName { ... }`
    Regular,
    /// `namespace EName { enum Type { ... }; }`
    Namespaced,
    /// `enum class EName : uint8 { ... }`
    EnumClass,
}

impl EnumForm {
    pub fn qualify(&self, enum_name: &str, tag: &str) -> String {
        match self {
            EnumForm::Regular => tag.to_string(),
            EnumForm::Namespaced | EnumForm::EnumClass => format!("{}::{}", enum_name, tag),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub value: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumData {
    pub form: EnumForm,
    /// Values in declaration order, including gap spacers and the trailing
    /// `_MAX` entry.
    pub values: Vec<EnumValue>,
    pub underlying: Option<String>,
}

impl EnumData {
    /// Fully qualified C++ name of a tag.
    pub fn qualified_name(&self, enum_name: &str, tag: &str) -> String {
        self.form.qualify(enum_name, tag)
    }
}

/// Kind-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityData {
    Class(ClassData),
    Struct(StructData),
    Enum(EnumData),
    Delegate(FunctionDescriptor),
}

/// A reflected entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    pub id: EntityId,
    pub name: String,
    pub data: EntityData,
    pub super_entity: Option<EntityId>,
    pub raw_super: Option<String>,
    pub outer: Outer,
    pub properties: Vec<PropertyDescriptor>,
    pub functions: Vec<FunctionDescriptor>,
    /// Entities declared inside this one, in declaration order.
    pub children: Vec<EntityId>,
    pub metadata: Metadata,
    pub unit: UnitId,
    pub module: String,
    pub line: u32,
    /// Set once members are resolved and attached.
    pub complete: bool,
}

impl EntityDescriptor {
    pub fn category(&self) -> Category {
        match self.data {
            EntityData::Class(_) => Category::Class,
            EntityData::Struct(_) => Category::Struct,
            EntityData::Enum(_) => Category::Enum,
            EntityData::Delegate(_) => Category::Delegate,
        }
    }

    pub fn class(&self) -> Option<&ClassData> {
        match &self.data {
            EntityData::Class(data) => Some(data),
            _ => None,
        }
    }

    pub fn class_mut(&mut self) -> Option<&mut ClassData> {
        match &mut self.data {
            EntityData::Class(data) => Some(data),
            _ => None,
        }
    }

    pub fn struct_data(&self) -> Option<&StructData> {
        match &self.data {
            EntityData::Struct(data) => Some(data),
            _ => None,
        }
    }

    pub fn struct_data_mut(&mut self) -> Option<&mut StructData> {
        match &mut self.data {
            EntityData::Struct(data) => Some(data),
            _ => None,
        }
    }

    pub fn enum_data(&self) -> Option<&EnumData> {
        match &self.data {
            EntityData::Enum(data) => Some(data),
            _ => None,
        }
    }

    pub fn signature(&self) -> Option<&FunctionDescriptor> {
        match &self.data {
            EntityData::Delegate(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn signature_mut(&mut self) -> Option<&mut FunctionDescriptor> {
        match &mut self.data {
            EntityData::Delegate(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn class_flags(&self) -> ClassFlags {
        self.class().map_or(ClassFlags::EMPTY, |c| c.flags)
    }

    pub fn struct_flags(&self) -> StructFlags {
        self.struct_data().map_or(StructFlags::EMPTY, |s| s.flags)
    }

    pub fn is_interface(&self) -> bool {
        self.class_flags().contains(ClassFlags::INTERFACE)
    }

    pub fn is_deprecated(&self) -> bool {
        self.class_flags().contains(ClassFlags::DEPRECATED)
    }

    pub fn is_multicast_delegate(&self) -> bool {
        self.signature()
            .is_some_and(|sig| sig.flags.contains(FunctionFlags::MULTICAST_DELEGATE))
    }

    pub fn owner(&self) -> Option<EntityId> {
        match self.outer {
            Outer::Entity(id) => Some(id),
            Outer::Package(_) => None,
        }
    }

    pub fn find_function(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name == name)
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_qualified_names() {
        let data = EnumData {
            form: EnumForm::Namespaced,
            values: vec![],
            underlying: None,
        };
        assert_eq!(data.qualified_name("EColor", "Red"), "EColor::Red");
        let plain = EnumData {
            form: EnumForm::Regular,
            ..data
        };
        assert_eq!(plain.qualified_name("EColor", "Red"), "Red");
    }

    #[test]
    fn test_function_outputs() {
        let mut func = FunctionDescriptor::new("GetArea", 3);
        assert!(!func.has_outputs());
        func.return_value = Some(PropertyDescriptor::new(
            "ReturnValue",
            crate::registry::property::TypeShape::Primitive(
                crate::registry::property::PrimitiveKind::Float,
            ),
            3,
        ));
        assert!(func.has_outputs());
        assert_eq!(func.all_params().count(), 1);
    }
}
