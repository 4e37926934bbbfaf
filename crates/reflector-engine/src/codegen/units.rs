//! Accessor units for each kind of entity.

use log::debug;

use crate::codegen::hash::UnitHash;
use crate::codegen::natives::has_event_callback;
use crate::codegen::properties::MetadataBlock;
use crate::codegen::singleton;
use crate::codegen::writer::{text_literal, CodeWriter};
use crate::codegen::{CodeGenerator, GeneratedUnit, UnitKind};
use crate::error::Result;
use crate::registry::{
    Category, ClassData, ClassFlags, EntityDescriptor, EnumData, EnumForm, FunctionDescriptor,
    FunctionFlags, Outer, PropertyDescriptor,
};

/// Replication offset of a function that is not replicated.
const NO_REP_OFFSET: u16 = u16::MAX;

/// How a function or delegate accessor is named and where its parameter
/// struct comes from.
struct Signature {
    kind: UnitKind,
    accessor: String,
    outer: String,
    parms: String,
    /// Define the parameter struct inside the accessor.
    local_parms: bool,
}

// ============================================================================
// Classes
// ============================================================================

impl<'a> CodeGenerator<'a> {
    pub(crate) fn emit_class(&mut self, entity: &'a EntityDescriptor, class: &'a ClassData) -> Result<Option<u32>> {
        if class.flags.contains(ClassFlags::INTRINSIC) {
            debug!("skipping intrinsic class '{}'", entity.name);
            return Ok(None);
        }
        let registry = self.registry;

        // Nested entities and functions come first; the class links them by
        // hash.
        let mut children = Vec::new();
        let mut functions = Vec::new();
        for &child in &entity.children {
            let Some(tag) = self.emit_entity(child)? else {
                continue;
            };
            let child_entity = registry.get(child);
            let accessor = singleton::entity(registry, child);
            match child_entity.category() {
                Category::Delegate => functions.push((child_entity.name.as_str(), accessor, tag)),
                _ => children.push((accessor, tag)),
            }
        }
        for function in &entity.functions {
            let (accessor, hash) = self.emit_function(entity, function);
            functions.push((function.name.as_str(), accessor, hash.tag));
        }
        functions.sort_by(|a, b| a.0.cmp(b.0));

        let accessor = singleton::entity(registry, entity.id);
        let no_register = singleton::no_register(&entity.name);
        self.declare_own("UClass", &no_register);
        self.declare_own("UClass", &accessor);
        let super_call = entity.super_entity.map(|s| self.reference(s));
        let package = self.package_reference();

        let mut out = CodeWriter::new();
        out.line(1, format!("UClass* {}", no_register));
        out.line(1, "{");
        out.line(2, format!("return {}::StaticClass();", entity.name));
        out.line(1, "}");
        out.line(1, format!("UClass* {}", accessor));
        out.line(1, "{");
        out.line(2, "static UClass* OuterClass = NULL;");
        out.line(2, "if (!OuterClass)");
        out.line(2, "{");
        if let Some(super_call) = super_call {
            out.line(3, format!("{};", super_call));
        }
        out.line(3, format!("{};", package));
        out.line(3, format!("OuterClass = {}::StaticClass();", entity.name));
        out.line(3, "if (!(OuterClass->ClassFlags & CLASS_Constructed))");
        out.line(3, "{");
        out.line(4, "UObjectForceRegistration(OuterClass);");
        out.line(
            4,
            format!(
                "OuterClass->ClassFlags |= 0x{:08X};",
                class.flags.intersection(ClassFlags::SAVE_IN_COMPILED_IN_CLASSES).bits()
            ),
        );
        out.line(0, "");
        for (child, tag) in &children {
            out.line(4, format!("OuterClass->LinkChild({}); // {}", child, tag));
        }
        for (_, function, _) in &functions {
            out.line(4, format!("OuterClass->LinkChild({});", function));
        }
        out.line(0, "");

        let properties: Vec<&PropertyDescriptor> = entity.properties.iter().collect();
        let mut metadata = MetadataBlock::new("OuterClass", &entity.metadata);
        self.emit_properties(&mut out, 4, "OuterClass", &entity.name, &properties, &mut metadata);
        for (_, function, tag) in &functions {
            out.line(4, format!("OuterClass->AddFunctionToFunctionMap({}); // {}", function, tag));
        }
        if let Some(config) = &class.config_name {
            out.line(4, format!("OuterClass->ClassConfigName = FName({});", text_literal(config)));
        }
        for interface in &class.interfaces {
            let target = self.reference_no_register(interface.class);
            let offset = if interface.native {
                let native = self
                    .ctx
                    .config
                    .naming
                    .native_interface_name(&registry.get(interface.class).name);
                format!("VTABLE_OFFSET({}, {})", entity.name, native)
            } else {
                "0".to_string()
            };
            out.line(
                4,
                format!("OuterClass->Interfaces.Add(FImplementedInterface({}, {}, false ));", target, offset),
            );
        }
        out.line(4, "OuterClass->StaticLink();");
        metadata.write(&mut out, 4);
        out.line(3, "}");
        out.line(2, "}");
        out.line(2, "check(OuterClass->GetClass());");
        out.line(2, "return OuterClass;");
        out.line(1, "}");

        let hash = UnitHash::of(out.as_str());
        let mut trailer = CodeWriter::new();
        trailer.line(1, format!("IMPLEMENT_CLASS({}, {});", entity.name, hash.tag));
        trailer.line(
            1,
            format!(
                "static FCompiledInDefer Z_CompiledInDefer_UClass_{}({}, {});",
                entity.name,
                singleton::symbol(&accessor),
                text_literal(&entity.name)
            ),
        );
        self.class_natives(&mut trailer, entity);
        Ok(Some(self.finish(UnitKind::Class, &entity.name, accessor, out, hash, trailer)))
    }

    /// Native registration and event callbacks of a class.
    fn class_natives(&mut self, out: &mut CodeWriter, entity: &'a EntityDescriptor) {
        let interface = entity.is_interface();
        let events: Vec<&FunctionDescriptor> = entity
            .functions
            .iter()
            .filter(|f| {
                if interface {
                    f.flags.contains(FunctionFlags::BLUEPRINT_EVENT)
                } else {
                    has_event_callback(f)
                }
            })
            .collect();
        for function in &events {
            let event = self.event_name(function);
            if self.event_names.insert(event.clone()) {
                out.line(1, format!("FName {} = FName({});", event, text_literal(&function.name)));
            }
        }
        for function in events {
            if interface {
                self.write_interface_execute(out, entity, function);
            } else {
                self.write_event_callback(out, entity, function);
            }
        }
        self.write_register_natives(out, entity);
    }

    // ========================================================================
    // Structs
    // ========================================================================

    pub(crate) fn emit_struct(&mut self, entity: &'a EntityDescriptor) -> u32 {
        let accessor = singleton::entity(self.registry, entity.id);
        self.declare_own("UScriptStruct", &accessor);
        let outer = self.outer_line(entity);
        let base = entity
            .super_entity
            .map_or_else(|| "NULL".to_string(), |s| self.reference(s));

        let prefix = self.ctx.config.naming.struct_prefix.as_str();
        let runtime_name = entity
            .name
            .strip_prefix(prefix)
            .filter(|rest| !rest.is_empty())
            .unwrap_or(&entity.name);

        let mut out = CodeWriter::new();
        out.line(1, format!("UScriptStruct* {}", accessor));
        out.line(1, "{");
        out.line(2, outer);
        out.line(2, "static UScriptStruct* ReturnStruct = NULL;");
        out.line(2, "if (!ReturnStruct)");
        out.line(2, "{");
        out.line(
            3,
            format!(
                "ReturnStruct = new(Outer, {}, RF_Public|RF_Transient|RF_Native) UScriptStruct(FObjectInitializer(), {}, new UScriptStruct::TCppStructOps<{}>, EStructFlags(0x{:08X}));",
                text_literal(runtime_name),
                base,
                entity.name,
                entity.struct_flags().bits()
            ),
        );
        let properties: Vec<&PropertyDescriptor> = entity.properties.iter().collect();
        let mut metadata = MetadataBlock::new("ReturnStruct", &entity.metadata);
        self.emit_properties(&mut out, 3, "ReturnStruct", &entity.name, &properties, &mut metadata);
        out.line(3, "ReturnStruct->StaticLink();");
        metadata.write(&mut out, 3);
        out.line(2, "}");
        out.line(2, "return ReturnStruct;");
        out.line(1, "}");

        let hash = UnitHash::of(out.as_str());
        let symbol = singleton::symbol(&accessor);
        let mut trailer = CodeWriter::new();
        trailer.line(1, format!("uint32 Get_{}_CRC() {{ return {}U; }}", symbol, hash.tag));
        if entity.struct_data().is_some_and(|data| data.body.is_some()) {
            let package = self.package_reference();
            trailer.line(1, format!("class UScriptStruct* {}::StaticStruct()", entity.name));
            trailer.line(1, "{");
            trailer.line(2, "static class UScriptStruct* Singleton = NULL;");
            trailer.line(2, "if (!Singleton)");
            trailer.line(2, "{");
            trailer.line(
                3,
                format!(
                    "Singleton = GetStaticStruct({}, {}, {}, sizeof({}), Get_{}_CRC());",
                    symbol,
                    package,
                    text_literal(runtime_name),
                    entity.name,
                    symbol
                ),
            );
            trailer.line(2, "}");
            trailer.line(2, "return Singleton;");
            trailer.line(1, "}");
            trailer.line(
                1,
                format!(
                    "static FCompiledInDeferStruct Z_CompiledInDeferStruct_UScriptStruct_{}({}::StaticStruct, {});",
                    entity.name,
                    entity.name,
                    text_literal(&format!("/Script/{}", self.module))
                ),
            );
        }
        self.finish(UnitKind::Struct, &entity.name, accessor, out, hash, trailer)
    }

    // ========================================================================
    // Enums
    // ========================================================================

    pub(crate) fn emit_enum(&mut self, entity: &'a EntityDescriptor, data: &'a EnumData) -> u32 {
        let accessor = singleton::entity(self.registry, entity.id);
        self.declare_own("UEnum", &accessor);
        let outer = self.outer_line(entity);
        let form = match data.form {
            EnumForm::Regular => "Regular",
            EnumForm::Namespaced => "Namespaced",
            EnumForm::EnumClass => "EnumClass",
        };

        let mut out = CodeWriter::new();
        out.line(1, format!("UEnum* {}", accessor));
        out.line(1, "{");
        out.line(2, outer);
        out.line(2, "static UEnum* ReturnEnum = NULL;");
        out.line(2, "if (!ReturnEnum)");
        out.line(2, "{");
        out.line(
            3,
            format!(
                "ReturnEnum = new(Outer, {}, RF_Public|RF_Transient|RF_Native) UEnum(FObjectInitializer());",
                text_literal(&entity.name)
            ),
        );
        out.line(3, "TArray<TPair<FName, uint8>> EnumNames;");
        for value in &data.values {
            out.line(
                3,
                format!(
                    "EnumNames.Add(TPairInitializer<FName, uint8>(FName({}), {}));",
                    text_literal(&data.qualified_name(&entity.name, &value.name)),
                    value.value
                ),
            );
        }
        out.line(3, format!("ReturnEnum->SetEnums(EnumNames, UEnum::ECppForm::{});", form));
        MetadataBlock::new("ReturnEnum", &entity.metadata).write(&mut out, 3);
        out.line(2, "}");
        out.line(2, "return ReturnEnum;");
        out.line(1, "}");

        let hash = UnitHash::of(out.as_str());
        self.finish(UnitKind::Enum, &entity.name, accessor, out, hash, CodeWriter::new())
    }

    // ========================================================================
    // Functions and delegate signatures
    // ========================================================================

    fn emit_function(&mut self, owner: &'a EntityDescriptor, function: &'a FunctionDescriptor) -> (String, UnitHash) {
        let registry = self.registry;
        let accessor = singleton::function(&owner.name, &function.name);
        self.declare_own("UFunction", &accessor);
        let outer = format!("UObject* Outer={};", self.reference(owner.id));

        // Event parameter structs are in the generated header; other
        // functions define theirs inside the accessor.
        let (parms, shared) = self.parms_name(owner, function);

        let super_accessor = function.super_function.map(|super_ref| {
            let super_owner = registry.get(super_ref.owner);
            let name = singleton::function(&super_owner.name, &registry.function(super_ref).name);
            self.declare(&super_owner.module, "UFunction", &name);
            name
        });

        let signature = Signature {
            kind: UnitKind::Function,
            accessor: accessor.clone(),
            outer,
            parms,
            local_parms: !shared,
        };
        let hash = self.emit_signature(signature, function, super_accessor);
        (accessor, hash)
    }

    pub(crate) fn emit_delegate(&mut self, entity: &'a EntityDescriptor, signature: &'a FunctionDescriptor) -> u32 {
        let accessor = singleton::entity(self.registry, entity.id);
        self.declare_own("UFunction", &accessor);
        let outer = self.outer_line(entity);
        let signature_unit = Signature {
            kind: UnitKind::Delegate,
            accessor,
            outer,
            parms: self.delegate_parms_name(entity),
            local_parms: false,
        };
        self.emit_signature(signature_unit, signature, None).tag
    }

    fn emit_signature(
        &mut self,
        signature: Signature,
        function: &'a FunctionDescriptor,
        super_accessor: Option<String>,
    ) -> UnitHash {
        let Signature {
            kind,
            accessor,
            outer,
            parms,
            local_parms,
        } = signature;
        let params: Vec<&PropertyDescriptor> = function.all_params().collect();
        let size = if params.is_empty() {
            String::new()
        } else {
            format!(", sizeof({})", parms)
        };

        let mut out = CodeWriter::new();
        out.line(1, format!("UFunction* {}", accessor));
        out.line(1, "{");
        if local_parms && !params.is_empty() {
            self.write_parms_struct(&mut out, 2, &parms, function);
        }
        out.line(2, outer);
        out.line(2, "static UFunction* ReturnFunction = NULL;");
        out.line(2, "if (!ReturnFunction)");
        out.line(2, "{");
        out.line(
            3,
            format!(
                "ReturnFunction = new(Outer, {}, RF_Public|RF_Transient|RF_Native) UFunction(FObjectInitializer(), {}, 0x{:08X}, {}{});",
                text_literal(&function.name),
                super_accessor.as_deref().unwrap_or("NULL"),
                function.flags.bits(),
                NO_REP_OFFSET,
                size
            ),
        );
        let mut metadata = MetadataBlock::new("ReturnFunction", &function.metadata);
        self.emit_properties(&mut out, 3, "ReturnFunction", &parms, &params, &mut metadata);
        if let Some(id) = function.rpc_id {
            out.line(3, format!("ReturnFunction->RPCId={};", id));
        }
        if let Some(id) = function.rpc_response_id {
            out.line(3, format!("ReturnFunction->RPCResponseId={};", id));
        }
        if kind == UnitKind::Function {
            out.line(3, "ReturnFunction->Bind();");
        }
        out.line(3, "ReturnFunction->StaticLink();");
        metadata.write(&mut out, 3);
        out.line(2, "}");
        out.line(2, "return ReturnFunction;");
        out.line(1, "}");

        let hash = UnitHash::of(out.as_str());
        self.finish(kind, &function.name, accessor, out, hash.clone(), CodeWriter::new());
        hash
    }

    // ========================================================================
    // Package
    // ========================================================================

    pub(crate) fn emit_package(&mut self) -> GeneratedUnit {
        let accessor = singleton::package(self.module);
        self.declare_own("UPackage", &accessor);
        let bodies: String = self.units.iter().map(|u| u.hash.digest.as_str()).collect();
        let bodies = UnitHash::of(&bodies);
        let declarations = UnitHash::of(&self.declarations.join("\n"));

        let mut out = CodeWriter::new();
        out.line(1, format!("UPackage* {}", accessor));
        out.line(1, "{");
        out.line(2, "static UPackage* ReturnPackage = NULL;");
        out.line(2, "if (!ReturnPackage)");
        out.line(2, "{");
        out.line(
            3,
            format!(
                "ReturnPackage = CastChecked<UPackage>(StaticFindObjectFast(UPackage::StaticClass(), NULL, FName({}), false, false));",
                text_literal(&format!("/Script/{}", self.module))
            ),
        );
        out.line(3, "ReturnPackage->PackageFlags |= PKG_CompiledIn | 0x00000000;");
        out.line(3, "FGuid Guid;");
        out.line(3, format!("Guid.A = 0x{:08X};", bodies.tag));
        out.line(3, format!("Guid.B = 0x{:08X};", declarations.tag));
        out.line(3, "Guid.C = 0x00000000;");
        out.line(3, "Guid.D = 0x00000000;");
        out.line(3, "ReturnPackage->SetGuid(Guid);");
        out.line(2, "}");
        out.line(2, "return ReturnPackage;");
        out.line(1, "}");

        let text = out.into_string();
        self.output.current().append(&text);
        GeneratedUnit {
            singleton_name: accessor,
            kind: UnitKind::Package,
            name: self.module.to_string(),
            hash: UnitHash::of(&text),
            text,
        }
    }

    /// First statement of an accessor: the object it is created in.
    fn outer_line(&mut self, entity: &EntityDescriptor) -> String {
        match entity.outer {
            Outer::Package(_) => format!("UPackage* Outer={};", self.package_reference()),
            Outer::Entity(owner) => {
                let ty = singleton::object_type(self.registry.get(owner).category());
                format!("{}* Outer={};", ty, self.reference(owner))
            }
        }
    }
}
