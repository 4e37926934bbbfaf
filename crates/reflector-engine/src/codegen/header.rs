//! The generated header of one source unit.
//!
//! A processed header `Thing.h` gets a `Thing.generated.h` holding the
//! macros its `GENERATED_*BODY()` lines expand to. Every macro is keyed by
//! the unit's file id and the line of the body macro, so
//! `GENERATED_BODY()` on line 12 of `Thing.h` in module `Game` expands to
//! `Game_Thing_h_12_GENERATED_BODY`.
//!
//! Parameter structs of events and delegates live here too, so the event
//! callbacks and delegate wrappers can fill them.

use rustc_hash::FxHashSet;
use std::collections::BTreeSet;

use crate::codegen::hash::UnitHash;
use crate::codegen::natives::{has_exec_thunk, implementation_name, validation_name};
use crate::codegen::singleton;
use crate::codegen::writer::CodeWriter;
use crate::codegen::{CodeGenerator, GeneratedUnit, UnitKind};
use crate::module::unit::SourceUnit;
use crate::registry::{
    BodyMacro, ClassData, ClassFlags, EntityData, EntityDescriptor, EntityId, FunctionDescriptor,
    FunctionFlags, MemberAccess, PropertyFlags, Registry, TypeShape,
};

/// Class flags spelled out in `DECLARE_CLASS`.
const DECLARED_CLASS_FLAGS: [(ClassFlags, &str); 6] = [
    (ClassFlags::ABSTRACT, "CLASS_Abstract"),
    (ClassFlags::TRANSIENT, "CLASS_Transient"),
    (ClassFlags::DEFAULT_CONFIG, "CLASS_DefaultConfig"),
    (ClassFlags::CONFIG, "CLASS_Config"),
    (ClassFlags::INTERFACE, "CLASS_Interface"),
    (ClassFlags::DEPRECATED, "CLASS_Deprecated"),
];

/// `#define NAME` with each line of `body` continued onto the next.
fn macroize(out: &mut CodeWriter, name: &str, body: &CodeWriter) {
    let lines: Vec<&str> = body.as_str().lines().collect();
    if lines.is_empty() {
        out.line(0, format!("#define {}", name));
    } else {
        out.line(0, format!("#define {} \\", name));
        out.line(0, lines.join(" \\\n"));
    }
    out.line(0, "");
}

/// `Game_Thing_h` for `Thing.h` in module `Game`.
fn file_id(unit: &SourceUnit) -> String {
    format!("{}_{}", unit.module, unit.file_name())
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

impl<'a> CodeGenerator<'a> {
    pub(crate) fn emit_header(&self, unit: &SourceUnit) -> GeneratedUnit {
        let file_id = file_id(unit);
        let name = format!("{}.generated.h", unit.base_name());
        let guard = format!("{}_generated_h", file_id);
        let entities = self.unit_entities(unit);

        let mut out = CodeWriter::new();
        out.line(0, format!("#ifdef {}", guard));
        out.line(
            0,
            format!(
                "#error \"{} already included, missing '#pragma once' in {}\"",
                name,
                unit.file_name()
            ),
        );
        out.line(0, "#endif");
        out.line(0, format!("#define {}", guard));
        out.line(0, "");

        self.write_forward_declarations(&mut out, &entities);
        self.write_event_declarations(&mut out, &entities);

        for &id in &entities {
            let entity = self.registry.get(id);
            match &entity.data {
                EntityData::Delegate(signature) => {
                    if signature.all_params().next().is_some() {
                        self.write_parms_struct(&mut out, 0, &self.delegate_parms_name(entity), signature);
                        out.line(0, "");
                    }
                    self.write_delegate_wrapper(&mut out, entity, signature);
                    out.line(0, "");
                }
                EntityData::Enum(data) => {
                    out.line(0, format!("#define FOREACH_ENUM_{}(op) \\", entity.name.to_uppercase()));
                    // Spacers and the trailing `_MAX` are not real values.
                    let real = &data.values[..data.values.len().saturating_sub(1)];
                    let ops: Vec<String> = real
                        .iter()
                        .filter(|v| !entity.metadata.contains(&format!("{}.Spacer", v.name)))
                        .map(|v| format!("    op({})", data.qualified_name(&entity.name, &v.name)))
                        .collect();
                    out.line(0, ops.join(" \\\n"));
                    out.line(0, "");
                }
                EntityData::Struct(data) => {
                    if let Some(body) = data.body {
                        self.write_struct_body(&mut out, &file_id, entity, body);
                    }
                }
                EntityData::Class(class) => self.write_class_macros(&mut out, unit, &file_id, entity, class),
            }
        }

        out.line(0, "#undef CURRENT_FILE_ID");
        out.line(0, format!("#define CURRENT_FILE_ID {}", file_id));

        let text = out.into_string();
        GeneratedUnit {
            singleton_name: String::new(),
            kind: UnitKind::Header,
            name,
            hash: UnitHash::of(&text),
            text,
        }
    }

    /// Entities of a unit with their nested entities, in declaration order.
    fn unit_entities(&self, unit: &SourceUnit) -> Vec<EntityId> {
        fn visit(registry: &Registry, id: EntityId, all: &mut Vec<EntityId>) {
            all.push(id);
            for &child in &registry.get(id).children {
                visit(registry, child, all);
            }
        }
        let mut all = Vec::new();
        for &id in &unit.entities {
            if self.registry.get(id).owner().is_none() {
                visit(self.registry, id, &mut all);
            }
        }
        all
    }

    fn signatures(&self, entities: &[EntityId]) -> Vec<(&'a EntityDescriptor, &'a FunctionDescriptor)> {
        let registry = self.registry;
        entities
            .iter()
            .map(|&id| registry.get(id))
            .flat_map(|entity| {
                entity
                    .signature()
                    .into_iter()
                    .chain(entity.functions.iter())
                    .map(move |function| (entity, function))
            })
            .collect()
    }

    /// `class UFoo;` and `struct FBar;` for every type named in a
    /// signature of this unit.
    fn write_forward_declarations(&self, out: &mut CodeWriter, entities: &[EntityId]) {
        let mut names = BTreeSet::new();
        for (_, function) in self.signatures(entities) {
            for param in function.all_params() {
                let mut shapes = vec![&param.shape];
                while let Some(shape) = shapes.pop() {
                    match shape {
                        TypeShape::ObjectRef { class, .. } => {
                            names.insert(format!("class {};", self.registry.get(*class).name));
                        }
                        TypeShape::InterfaceRef(Some(class)) => {
                            let native = self
                                .ctx
                                .config
                                .naming
                                .native_interface_name(&self.registry.get(*class).name);
                            names.insert(format!("class {};", native));
                        }
                        TypeShape::StructRef(id) => {
                            names.insert(format!("struct {};", self.registry.get(*id).name));
                        }
                        TypeShape::Container { inner, value, .. } => {
                            shapes.push(&inner.shape);
                            shapes.extend(value.as_ref().map(|v| &v.shape));
                        }
                        _ => {}
                    }
                }
            }
        }
        for name in &names {
            out.line(0, name);
        }
        if !names.is_empty() {
            out.line(0, "");
        }
    }

    /// Event names and the parameter structs of events declared here.
    fn write_event_declarations(&self, out: &mut CodeWriter, entities: &[EntityId]) {
        let api = self.ctx.config.generator.api_macro_for(self.module);
        let mut names = FxHashSet::default();
        for (entity, function) in self.signatures(entities) {
            if !function.flags.contains(FunctionFlags::EVENT) || function.flags.contains(FunctionFlags::DELEGATE) {
                continue;
            }
            let event = self.event_name(function);
            if names.insert(event.clone()) {
                out.line(0, format!("extern {} FName {};", api, event));
            }
            if function.super_function.is_none() && function.all_params().next().is_some() {
                let (parms, _) = self.parms_name(entity, function);
                self.write_parms_struct(out, 0, &parms, function);
            }
        }
        if !names.is_empty() {
            out.line(0, "");
        }
    }

    // ========================================================================
    // Structs
    // ========================================================================

    fn write_struct_body(&self, out: &mut CodeWriter, file_id: &str, entity: &EntityDescriptor, body: BodyMacro) {
        let api = self.ctx.config.generator.api_macro_for(self.module);
        let mut macro_body = CodeWriter::new();
        macro_body.line(
            1,
            format!(
                "friend {} class UScriptStruct* {};",
                api,
                singleton::entity(self.registry, entity.id)
            ),
        );
        if let Some(base) = entity.super_entity {
            macro_body.line(1, format!("typedef {} Super;", self.registry.get(base).name));
        }
        macro_body.line(1, "static class UScriptStruct* StaticStruct();");
        macroize(out, &format!("{}_{}_GENERATED_BODY", file_id, body.line), &macro_body);
    }

    // ========================================================================
    // Classes
    // ========================================================================

    fn write_class_macros(
        &self,
        out: &mut CodeWriter,
        unit: &SourceUnit,
        file_id: &str,
        entity: &EntityDescriptor,
        class: &ClassData,
    ) {
        if class.flags.contains(ClassFlags::INTRINSIC) {
            return;
        }
        let Some(body) = class.body else {
            return;
        };
        let prefix = format!("{}_{}", file_id, body.line);
        let interface = class.flags.contains(ClassFlags::INTERFACE);
        let api = if class.flags.contains(ClassFlags::MINIMAL_API) {
            self.ctx.config.generator.api_macro_for(self.module)
        } else {
            "NO_API".to_string()
        };

        if !interface {
            self.write_rpc_wrappers(out, unit, &prefix, entity);
        }

        let inclass = self.inclass_body(entity, class, &api);
        macroize(out, &format!("{}_INCLASS_NO_PURE_DECLS", prefix), &inclass);
        macroize(out, &format!("{}_INCLASS", prefix), &inclass);
        macroize(out, &format!("{}_STANDARD_CONSTRUCTORS", prefix), &standard_constructors(entity, class, &api));
        macroize(out, &format!("{}_ENHANCED_CONSTRUCTORS", prefix), &enhanced_constructors(entity, class, &api));

        let rpc = if interface { None } else { Some("RPC_WRAPPERS") };
        write_generated_body(out, &prefix, rpc, "INCLASS", "STANDARD_CONSTRUCTORS", "ENHANCED_CONSTRUCTORS", body);

        if interface {
            if let Some(native_body) = class.native_body {
                self.write_native_interface_macros(out, unit, file_id, entity, native_body);
            }
        }
    }

    fn write_rpc_wrappers(&self, out: &mut CodeWriter, unit: &SourceUnit, prefix: &str, entity: &EntityDescriptor) {
        let thunk_owner = if entity.is_interface() {
            self.ctx.config.naming.native_interface_name(&entity.name)
        } else {
            entity.name.clone()
        };
        let natives: Vec<&FunctionDescriptor> = entity.functions.iter().filter(|f| has_exec_thunk(f)).collect();

        let mut legacy = CodeWriter::new();
        let mut current = CodeWriter::new();
        for function in &natives {
            for (name, text) in self.implementation_declarations(function) {
                legacy.line(1, &text);
                if !declared_in(unit, &name) {
                    current.line(1, &text);
                }
            }
        }
        for function in &natives {
            self.write_exec_thunk(&mut legacy, 1, &thunk_owner, function);
            self.write_exec_thunk(&mut current, 1, &thunk_owner, function);
        }
        macroize(out, &format!("{}_RPC_WRAPPERS", prefix), &legacy);
        macroize(out, &format!("{}_RPC_WRAPPERS_NO_PURE_DECLS", prefix), &current);
    }

    /// `_Validate` and `_Implementation` declarations a function needs.
    fn implementation_declarations(&self, function: &FunctionDescriptor) -> Vec<(String, String)> {
        let params = self.parameter_list(function);
        let constness = if function.flags.contains(FunctionFlags::CONST) { " const" } else { "" };
        let mut declarations = Vec::new();
        if let Some(validate) = validation_name(function) {
            declarations.push((validate.clone(), format!("virtual bool {}({});", validate, params)));
        }
        if let Some(implementation) = implementation_name(function) {
            declarations.push((
                implementation.clone(),
                format!(
                    "virtual {} {}({}){};",
                    self.return_type(function),
                    implementation,
                    params,
                    constness
                ),
            ));
        }
        declarations
    }

    fn inclass_body(&self, entity: &EntityDescriptor, class: &ClassData, api: &str) -> CodeWriter {
        let module_api = self.ctx.config.generator.api_macro_for(self.module);
        let base = entity
            .super_entity
            .map_or("None", |s| self.registry.get(s).name.as_str());
        let flags: Vec<&str> = DECLARED_CLASS_FLAGS
            .iter()
            .filter(|(flag, _)| class.flags.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        let compiled_in = if flags.is_empty() {
            "0".to_string()
        } else {
            format!("0 | {}", flags.join(" | "))
        };

        let mut body = CodeWriter::new();
        body.line(0, "private:");
        body.line(1, format!("static void StaticRegisterNatives{}();", entity.name));
        body.line(
            1,
            format!(
                "friend {} class UClass* {};",
                module_api,
                singleton::entity(self.registry, entity.id)
            ),
        );
        body.line(0, "public:");
        body.line(
            1,
            format!(
                "DECLARE_CLASS({}, {}, COMPILED_IN_FLAGS({}), 0, {}, {})",
                entity.name, base, compiled_in, self.module, api
            ),
        );
        body.line(1, format!("DECLARE_SERIALIZER({})", entity.name));
        body.line(1, "enum {IsIntrinsic=COMPILED_IN_INTRINSIC};");
        if let Some(within) = class.within {
            body.line(1, format!("DECLARE_WITHIN({})", self.registry.get(within).name));
        }
        if let Some(config) = &class.config_name {
            body.line(1, format!("static const TCHAR* StaticConfigName() {{return TEXT(\"{}\");}}", config));
        }
        if entity
            .properties
            .iter()
            .any(|p| p.flags.contains(PropertyFlags::NET))
        {
            body.line(
                1,
                "void GetLifetimeReplicatedProps(TArray<FLifetimeProperty>& OutLifetimeProps) const override;",
            );
        }
        body
    }

    fn write_native_interface_macros(
        &self,
        out: &mut CodeWriter,
        unit: &SourceUnit,
        file_id: &str,
        entity: &EntityDescriptor,
        body: BodyMacro,
    ) {
        let prefix = format!("{}_{}", file_id, body.line);
        let native = self.ctx.config.naming.native_interface_name(&entity.name);
        self.write_rpc_wrappers(out, unit, &prefix, entity);

        let mut inclass = CodeWriter::new();
        inclass.line(0, "protected:");
        inclass.line(1, format!("virtual ~{}() {{}}", native));
        inclass.line(0, "public:");
        inclass.line(1, format!("typedef {} UClassType;", entity.name));
        for function in entity
            .functions
            .iter()
            .filter(|f| f.flags.contains(FunctionFlags::BLUEPRINT_EVENT))
        {
            let params = self.parameter_list(function);
            let separator = if params.is_empty() { "" } else { ", " };
            inclass.line(
                1,
                format!(
                    "static {} Execute_{}(UObject* O{}{});",
                    self.return_type(function),
                    function.name,
                    separator,
                    params
                ),
            );
        }
        inclass.line(1, "virtual UObject* _getUObject() const = 0;");
        macroize(out, &format!("{}_INCLASS_IINTERFACE_NO_PURE_DECLS", prefix), &inclass);
        macroize(out, &format!("{}_INCLASS_IINTERFACE", prefix), &inclass);

        write_generated_body(
            out,
            &prefix,
            Some("RPC_WRAPPERS"),
            "INCLASS_IINTERFACE",
            "",
            "",
            body,
        );
    }
}

/// Whether the header declares `name` itself.
fn declared_in(unit: &SourceUnit, name: &str) -> bool {
    let bytes = unit.text.as_bytes();
    unit.text.match_indices(name).any(|(at, _)| {
        let before = at.checked_sub(1).map(|i| bytes[i]);
        let after = unit.text[at + name.len()..].trim_start().chars().next();
        !before.is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') && after == Some('(')
    })
}

/// Constructors of a class using `GENERATED_UCLASS_BODY()`.
fn standard_constructors(entity: &EntityDescriptor, class: &ClassData, api: &str) -> CodeWriter {
    let mut body = CodeWriter::new();
    if !class.flags.contains(ClassFlags::CUSTOM_CONSTRUCTOR) {
        body.line(1, format!("{} {}(const FObjectInitializer& ObjectInitializer);", api, entity.name));
    }
    body.line(1, format!("DEFINE_DEFAULT_OBJECT_INITIALIZER_CONSTRUCTOR_CALL({})", entity.name));
    copy_constructor(&mut body, entity, api);
    body
}

/// Constructors of a class using `GENERATED_BODY()`. A constructor is only
/// generated when the class declares none.
fn enhanced_constructors(entity: &EntityDescriptor, class: &ClassData, api: &str) -> CodeWriter {
    let mut body = CodeWriter::new();
    let declared = class.has_default_constructor || class.has_object_initializer_constructor;
    if !declared {
        body.line(
            1,
            format!(
                "{} {}(const FObjectInitializer& ObjectInitializer = FObjectInitializer::Get()) : Super(ObjectInitializer) {{ }};",
                api, entity.name
            ),
        );
    }
    let call = if class.has_default_constructor && !class.has_object_initializer_constructor {
        "DEFINE_DEFAULT_CONSTRUCTOR_CALL"
    } else {
        "DEFINE_DEFAULT_OBJECT_INITIALIZER_CONSTRUCTOR_CALL"
    };
    body.line(1, format!("{}({})", call, entity.name));
    copy_constructor(&mut body, entity, api);
    body
}

fn copy_constructor(body: &mut CodeWriter, entity: &EntityDescriptor, api: &str) {
    body.line(0, "private:");
    body.line(1, format!("{} {}(const {}& InCopy);", api, entity.name, entity.name));
    body.line(0, "public:");
}

/// `GENERATED_BODY_LEGACY` and `GENERATED_BODY` for one body macro. The
/// current form restores the access level written before the macro.
fn write_generated_body(
    out: &mut CodeWriter,
    prefix: &str,
    rpc: Option<&str>,
    inclass: &str,
    legacy_constructors: &str,
    constructors: &str,
    body: BodyMacro,
) {
    let part = |writer: &mut CodeWriter, name: &str, pure: bool| {
        if !name.is_empty() {
            let suffix = if pure { "" } else { "_NO_PURE_DECLS" };
            writer.line(1, format!("{}_{}{}", prefix, name, suffix));
        }
    };
    let constructor = |writer: &mut CodeWriter, name: &str| {
        if !name.is_empty() {
            writer.line(1, format!("{}_{}", prefix, name));
        }
    };

    let mut legacy = CodeWriter::new();
    legacy.line(0, "PRAGMA_DISABLE_DEPRECATION_WARNINGS");
    legacy.line(0, "public:");
    if let Some(rpc) = rpc {
        part(&mut legacy, rpc, true);
    }
    part(&mut legacy, inclass, true);
    constructor(&mut legacy, legacy_constructors);
    legacy.line(0, "public:");
    legacy.line(0, "PRAGMA_ENABLE_DEPRECATION_WARNINGS");
    macroize(out, &format!("{}_GENERATED_BODY_LEGACY", prefix), &legacy);

    let restored = if body.legacy { MemberAccess::Public } else { body.access };
    let mut current = CodeWriter::new();
    current.line(0, "PRAGMA_DISABLE_DEPRECATION_WARNINGS");
    current.line(0, "public:");
    if let Some(rpc) = rpc {
        part(&mut current, rpc, false);
    }
    part(&mut current, inclass, false);
    constructor(&mut current, constructors);
    current.line(0, restored.specifier());
    current.line(0, "PRAGMA_ENABLE_DEPRECATION_WARNINGS");
    macroize(out, &format!("{}_GENERATED_BODY", prefix), &current);
}
