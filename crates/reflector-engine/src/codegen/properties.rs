//! Property construction statements and metadata blocks.

use crate::codegen::writer::{text_literal, CodeWriter};
use crate::codegen::CodeGenerator;
use crate::registry::{
    ArrayDim, Metadata, ObjectWrapper, PrimitiveKind, PropertyDescriptor, PropertyFlags, TypeShape,
};

const EDITOR_ONLY_BEGIN: &str = "#if WITH_EDITORONLY_DATA";
const EDITOR_ONLY_END: &str = "#endif // WITH_EDITORONLY_DATA";
const OBJECT_FLAGS: &str = "RF_Public|RF_Transient|RF_Native";

/// Metadata statements collected while a unit is written, flushed once at
/// the end of the unit.
pub(crate) struct MetadataBlock<'a> {
    root: &'static str,
    entries: Vec<(String, &'a Metadata, bool)>,
}

impl<'a> MetadataBlock<'a> {
    /// `root` is the object whose package owns the metadata.
    pub fn new(root: &'static str, metadata: &'a Metadata) -> Self {
        Self {
            root,
            entries: vec![(root.to_string(), metadata, false)],
        }
    }

    pub fn add(&mut self, symbol: String, metadata: &'a Metadata, editor_only: bool) {
        self.entries.push((symbol, metadata, editor_only));
    }

    pub fn write(&self, out: &mut CodeWriter, depth: usize) {
        if self.entries.iter().all(|(_, metadata, _)| metadata.is_empty()) {
            return;
        }
        out.line(0, "#if WITH_METADATA");
        out.line(
            depth,
            format!("UMetaData* MetaData = {}->GetOutermost()->GetMetaData();", self.root),
        );
        let mut editor_only = false;
        for (symbol, metadata, entry_editor_only) in &self.entries {
            if metadata.is_empty() {
                continue;
            }
            if *entry_editor_only != editor_only {
                editor_only = *entry_editor_only;
                out.line(0, if editor_only { EDITOR_ONLY_BEGIN } else { EDITOR_ONLY_END });
            }
            for (key, value) in metadata.sorted() {
                out.line(
                    depth,
                    format!(
                        "MetaData->SetValue({}, {}, {});",
                        symbol,
                        text_literal(key),
                        text_literal(value)
                    ),
                );
            }
        }
        if editor_only {
            out.line(0, EDITOR_ONLY_END);
        }
        out.line(0, "#endif");
    }
}

fn emitted_flags(flags: PropertyFlags) -> String {
    format!("0x{:016x}", flags.difference(PropertyFlags::COMPUTED).bits())
}

fn bool_type(native: bool) -> &'static str {
    if native {
        "bool"
    } else {
        "uint32"
    }
}

impl<'a> CodeGenerator<'a> {
    /// Construct `properties` on `outer`, last declared first. `source` is
    /// the native type the property offsets are taken from.
    pub(crate) fn emit_properties(
        &mut self,
        out: &mut CodeWriter,
        depth: usize,
        outer: &str,
        source: &str,
        properties: &[&'a PropertyDescriptor],
        metadata: &mut MetadataBlock<'a>,
    ) {
        let mut editor_only = false;
        for property in properties.iter().rev() {
            if property.is_editor_only() != editor_only {
                editor_only = property.is_editor_only();
                out.line(0, if editor_only { EDITOR_ONLY_BEGIN } else { EDITOR_ONLY_END });
            }
            self.emit_property(out, depth, outer, source, property, metadata);
        }
        if editor_only {
            out.line(0, EDITOR_ONLY_END);
        }
    }

    fn emit_property(
        &mut self,
        out: &mut CodeWriter,
        depth: usize,
        outer: &str,
        source: &str,
        property: &'a PropertyDescriptor,
        metadata: &mut MetadataBlock<'a>,
    ) {
        let symbol = format!("NewProp_{}", property.name);
        let cpp_name = if property.is_deprecated() {
            format!("{}_DEPRECATED", property.name)
        } else {
            property.name.clone()
        };

        let (base, extra) = match property.shape {
            TypeShape::Primitive(PrimitiveKind::Bool { native }) => {
                let cpp_type = bool_type(native);
                out.line(
                    depth,
                    format!("CPP_BOOL_PROPERTY_BITMASK_STRUCT({}, {}, {});", cpp_name, source, cpp_type),
                );
                (
                    format!(
                        "FObjectInitializer(), EC_CppProperty, CPP_BOOL_PROPERTY_OFFSET({}, {})",
                        cpp_name, source
                    ),
                    format!(
                        ", CPP_BOOL_PROPERTY_BITMASK({}, {}), sizeof({}), {}",
                        cpp_name, source, cpp_type, native
                    ),
                )
            }
            _ => (
                format!("CPP_PROPERTY_BASE({}, {})", cpp_name, source),
                self.target_args(&property.shape),
            ),
        };
        out.line(
            depth,
            format!(
                "UProperty* {} = new({}, {}, {}) {}({}, {}{});",
                symbol,
                outer,
                text_literal(&property.name),
                OBJECT_FLAGS,
                property.shape.property_class(),
                base,
                emitted_flags(property.flags),
                extra
            ),
        );

        if let ArrayDim::Static(_) = property.array_dim {
            out.line(
                depth,
                format!("{}->ArrayDim = CPP_ARRAY_DIM({}, {});", symbol, cpp_name, source),
            );
        }
        if let Some(notify) = &property.rep_notify {
            out.line(
                depth,
                format!("{}->RepNotifyFunc = FName({});", symbol, text_literal(notify)),
            );
        }
        if let TypeShape::Container { inner, value, .. } = &property.shape {
            self.emit_element(out, depth, &symbol, &property.name, inner, 0);
            if let Some(value) = value {
                self.emit_element(out, depth, &symbol, &property.name, value, 1);
            }
        }
        metadata.add(symbol, &property.metadata, property.is_editor_only());
    }

    /// Inner property of a container, owned by the container property.
    fn emit_element(
        &mut self,
        out: &mut CodeWriter,
        depth: usize,
        parent: &str,
        name: &str,
        element: &PropertyDescriptor,
        offset: u32,
    ) {
        let extra = match element.shape {
            TypeShape::Primitive(PrimitiveKind::Bool { native }) => {
                format!(", 0, sizeof({}), {}", bool_type(native), native)
            }
            _ => self.target_args(&element.shape),
        };
        out.line(
            depth,
            format!(
                "UProperty* NewProp_{} = new({}, {}, {}) {}(FObjectInitializer(), EC_CppProperty, {}, {}{});",
                element.name,
                parent,
                text_literal(name),
                OBJECT_FLAGS,
                element.shape.property_class(),
                offset,
                emitted_flags(element.flags),
                extra
            ),
        );
    }

    /// Trailing constructor arguments naming the referenced type.
    fn target_args(&mut self, shape: &TypeShape) -> String {
        match shape {
            TypeShape::ObjectRef { class, wrapper } => {
                let target = self.reference_no_register(*class);
                match wrapper {
                    ObjectWrapper::SubclassOf | ObjectWrapper::AssetSubclassOf => {
                        format!(", {}, UClass::StaticClass()", target)
                    }
                    _ => format!(", {}", target),
                }
            }
            TypeShape::InterfaceRef(Some(class)) => format!(", {}", self.reference_no_register(*class)),
            TypeShape::InterfaceRef(None) => ", UInterface::StaticClass()".to_string(),
            TypeShape::StructRef(id)
            | TypeShape::EnumRef { enum_id: id, .. }
            | TypeShape::DelegateRef { signature: id, .. } => format!(", {}", self.reference(*id)),
            TypeShape::Primitive(_) | TypeShape::Container { .. } => String::new(),
        }
    }
}
