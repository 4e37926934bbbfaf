//! Native glue around reflected functions: parameter structs, exec thunks,
//! native registration and the event callbacks that route a native call
//! through the reflection system.

use crate::codegen::cpp_type::CppTypes;
use crate::codegen::writer::{text_literal, CodeWriter};
use crate::codegen::CodeGenerator;
use crate::registry::{
    ContainerKind, EntityDescriptor, EnumWidth, FunctionDescriptor, FunctionFlags, ObjectWrapper,
    PrimitiveKind, PropertyDescriptor, TypeShape,
};

const DELEGATE_SUFFIX: &str = "__DelegateSignature";

/// Name of the function a native caller binds to, when it differs from the
/// reflected name.
pub(crate) fn implementation_name(function: &FunctionDescriptor) -> Option<String> {
    let flags = function.flags;
    let remote = flags.contains(FunctionFlags::NET) && !flags.contains(FunctionFlags::NET_RESPONSE);
    let native_event = flags.contains(FunctionFlags::BLUEPRINT_EVENT | FunctionFlags::NATIVE);
    (remote || native_event).then(|| format!("{}_Implementation", function.name))
}

pub(crate) fn validation_name(function: &FunctionDescriptor) -> Option<String> {
    function
        .flags
        .contains(FunctionFlags::NET_VALIDATE)
        .then(|| format!("{}_Validate", function.name))
}

/// Functions that are called natively through an exec thunk.
pub(crate) fn has_exec_thunk(function: &FunctionDescriptor) -> bool {
    let native = function
        .flags
        .intersection(FunctionFlags::NATIVE | FunctionFlags::NET_REQUEST)
        == FunctionFlags::NATIVE;
    native && !function.metadata.is_true("CustomThunk")
}

/// Functions whose native body forwards to the reflection system.
pub(crate) fn has_event_callback(function: &FunctionDescriptor) -> bool {
    function.flags.contains(FunctionFlags::EVENT) && !function.flags.contains(FunctionFlags::NET_RESPONSE)
}

impl<'a> CodeGenerator<'a> {
    pub(crate) fn cpp_types(&self) -> CppTypes<'a> {
        CppTypes::new(self.registry, &self.ctx.config.naming)
    }

    /// Parameter struct of a function. Overrides share the struct of the
    /// declaration they override.
    pub(crate) fn parms_name(&self, owner: &'a EntityDescriptor, function: &'a FunctionDescriptor) -> (String, bool) {
        let registry = self.registry;
        let mut root = (owner.name.as_str(), function);
        let mut next = function.super_function;
        while let Some(super_ref) = next {
            let super_fn = registry.function(super_ref);
            root = (registry.get(super_ref.owner).name.as_str(), super_fn);
            next = super_fn.super_function;
        }
        let shared = root.1.flags.contains(FunctionFlags::EVENT);
        (format!("{}_event{}_Parms", root.0, root.1.name), shared)
    }

    /// Parameter struct of a delegate signature.
    pub(crate) fn delegate_parms_name(&self, entity: &EntityDescriptor) -> String {
        let scope = match entity.owner() {
            Some(owner) => self.registry.get(owner).name.clone(),
            None => format!("_Script_{}", entity.module),
        };
        let base = entity.name.strip_suffix(DELEGATE_SUFFIX).unwrap_or(&entity.name);
        format!("{}_event{}_Parms", scope, base)
    }

    /// `FName` a function is looked up by from its event callback.
    pub(crate) fn event_name(&self, function: &FunctionDescriptor) -> String {
        format!("{}_{}", self.module.to_uppercase(), function.name)
    }

    pub(crate) fn write_parms_struct(&self, out: &mut CodeWriter, depth: usize, name: &str, function: &FunctionDescriptor) {
        let types = self.cpp_types();
        out.line(depth, format!("struct {}", name));
        out.line(depth, "{");
        for param in function.all_params() {
            out.line(depth + 1, types.member(param));
        }
        out.line(depth, "};");
    }

    /// Native parameter list, without parentheses.
    pub(crate) fn parameter_list(&self, function: &FunctionDescriptor) -> String {
        let types = self.cpp_types();
        function
            .params
            .iter()
            .map(|p| types.parameter(p))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(crate) fn return_type(&self, function: &FunctionDescriptor) -> String {
        function
            .return_value
            .as_ref()
            .map_or_else(|| "void".to_string(), |r| self.cpp_types().of(&r.shape))
    }

    // ========================================================================
    // Exec thunks
    // ========================================================================

    /// `DECLARE_FUNCTION(execName)` body that unpacks the reflected
    /// parameters and calls the native implementation.
    pub(crate) fn write_exec_thunk(&self, out: &mut CodeWriter, depth: usize, class_name: &str, function: &FunctionDescriptor) {
        let mut args = Vec::with_capacity(function.params.len());
        out.line(depth, format!("DECLARE_FUNCTION(exec{})", function.name));
        out.line(depth, "{");
        for param in &function.params {
            let (statement, arg) = self.param_getter(param);
            out.line(depth + 1, statement);
            args.push(arg);
        }
        out.line(depth + 1, "P_FINISH;");
        let args = args.join(",");
        let target = if function.flags.contains(FunctionFlags::STATIC) {
            format!("{}::", class_name)
        } else {
            "this->".to_string()
        };
        if let Some(validate) = validation_name(function) {
            out.line(depth + 1, format!("if (!{}{}({}))", target, validate, args));
            out.line(depth + 1, "{");
            out.line(depth + 2, format!("RPC_ValidateFailed({});", text_literal(&validate)));
            out.line(depth + 2, "return;");
            out.line(depth + 1, "}");
        }
        let name = implementation_name(function).unwrap_or_else(|| function.name.clone());
        let call = format!("{}{}({});", target, name, args);
        match &function.return_value {
            Some(_) => out.line(depth + 1, format!("*({}*)Result={}", self.return_type(function), call)),
            None => out.line(depth + 1, call),
        }
        out.line(depth, "}");
    }

    /// Statement that pops one parameter off the script stack, and the
    /// expression that passes it on.
    fn param_getter(&self, param: &PropertyDescriptor) -> (String, String) {
        let types = self.cpp_types();
        let out = param.is_out_param();
        let suffix = if out { "_REF" } else { "" };
        let local = if out {
            format!("Out_{}", param.name)
        } else {
            param.name.clone()
        };
        let registry = self.registry;
        let statement = match &param.shape {
            TypeShape::Primitive(PrimitiveKind::Bool { .. }) => format!("P_GET_UBOOL{}({});", suffix, local),
            TypeShape::StructRef(id) => format!("P_GET_STRUCT{}({},{});", suffix, registry.get(*id).name, local),
            TypeShape::ObjectRef {
                class,
                wrapper: ObjectWrapper::Raw,
            } => format!("P_GET_OBJECT{}({},{});", suffix, registry.get(*class).name, local),
            TypeShape::InterfaceRef(Some(class)) => format!(
                "P_GET_TINTERFACE{}({},{});",
                suffix,
                self.ctx.config.naming.native_interface_name(&registry.get(*class).name),
                local
            ),
            TypeShape::Container {
                kind: ContainerKind::Array,
                inner,
                ..
            } => format!("P_GET_TARRAY{}({},{});", suffix, types.of(&inner.shape), local),
            shape => format!("P_GET_PROPERTY{}({},{});", suffix, shape.property_class(), local),
        };
        let arg = match &param.shape {
            TypeShape::EnumRef {
                width: EnumWidth::Underlying,
                ..
            }
            | TypeShape::DelegateRef { .. }
                if !out =>
            {
                format!("{}({})", types.of(&param.shape), local)
            }
            TypeShape::EnumRef { .. } if out => format!("({}&)({})", types.of(&param.shape), local),
            _ => local,
        };
        (statement, arg)
    }

    // ========================================================================
    // Registration and callbacks
    // ========================================================================

    /// `StaticRegisterNatives` body binding each exec thunk by name.
    pub(crate) fn write_register_natives(&self, out: &mut CodeWriter, entity: &EntityDescriptor) {
        let thunk_owner = if entity.is_interface() {
            self.ctx.config.naming.native_interface_name(&entity.name)
        } else {
            entity.name.clone()
        };
        let mut natives: Vec<&str> = entity
            .functions
            .iter()
            .filter(|f| has_exec_thunk(f))
            .map(|f| f.name.as_str())
            .collect();
        natives.sort_unstable();

        out.line(1, format!("void {0}::StaticRegisterNatives{0}()", entity.name));
        out.line(1, "{");
        for name in natives {
            out.line(
                2,
                format!(
                    "FNativeFunctionRegistrar::RegisterFunction({}::StaticClass(), \"{}\",(Native)&{}::exec{});",
                    entity.name, name, thunk_owner, name
                ),
            );
        }
        out.line(1, "}");
    }

    /// Native body of an event: copy the arguments into the parameter
    /// struct, process the event, then copy outputs back.
    pub(crate) fn write_event_callback(&self, out: &mut CodeWriter, entity: &'a EntityDescriptor, function: &'a FunctionDescriptor) {
        let (parms, _) = self.parms_name(entity, function);
        let event = self.event_name(function);
        let has_params = function.all_params().next().is_some();
        let constness = if function.flags.contains(FunctionFlags::CONST) { " const" } else { "" };

        out.line(
            1,
            format!(
                "{} {}::{}({}){}",
                self.return_type(function),
                entity.name,
                function.name,
                self.parameter_list(function),
                constness
            ),
        );
        out.line(1, "{");
        if has_params {
            out.line(2, format!("{} Parms;", parms));
            for param in &function.params {
                out.line(2, format!("Parms.{0}={0};", param.name));
            }
        }
        let this = if constness.is_empty() {
            String::new()
        } else {
            format!("const_cast<{}*>(this)->", entity.name)
        };
        let parms_arg = if has_params { "&Parms" } else { "NULL" };
        out.line(2, format!("{}ProcessEvent(FindFunctionChecked({}),{});", this, event, parms_arg));
        self.write_outputs(out, 2, function);
        out.line(1, "}");
    }

    /// `Execute_Name` of an interface event, which dispatches through the
    /// implementing object.
    pub(crate) fn write_interface_execute(&self, out: &mut CodeWriter, entity: &'a EntityDescriptor, function: &'a FunctionDescriptor) {
        let (parms, _) = self.parms_name(entity, function);
        let native = self.ctx.config.naming.native_interface_name(&entity.name);
        let params = self.parameter_list(function);
        let separator = if params.is_empty() { "" } else { ", " };
        let has_params = function.all_params().next().is_some();

        out.line(
            1,
            format!(
                "{} {}::Execute_{}(UObject* O{}{})",
                self.return_type(function),
                native,
                function.name,
                separator,
                params
            ),
        );
        out.line(1, "{");
        out.line(2, "check(O != NULL);");
        out.line(2, format!("check(O->GetClass()->ImplementsInterface({}::StaticClass()));", entity.name));
        if has_params {
            out.line(2, format!("{} Parms;", parms));
        }
        out.line(2, format!("UFunction* const Func = O->FindFunction({});", self.event_name(function)));
        out.line(2, "if (Func)");
        out.line(2, "{");
        for param in &function.params {
            out.line(3, format!("Parms.{0}={0};", param.name));
        }
        let parms_arg = if has_params { "&Parms" } else { "NULL" };
        out.line(3, format!("O->ProcessEvent(Func, {});", parms_arg));
        out.line(2, "}");
        self.write_outputs(out, 2, function);
        out.line(1, "}");
    }

    fn write_outputs(&self, out: &mut CodeWriter, depth: usize, function: &FunctionDescriptor) {
        for param in function.params.iter().filter(|p| p.is_out_param()) {
            out.line(depth, format!("{0}=Parms.{0};", param.name));
        }
        if function.return_value.is_some() {
            out.line(depth, "return Parms.ReturnValue;");
        }
    }

    /// `F{Name}_DelegateWrapper`, the native way to fire a delegate.
    pub(crate) fn write_delegate_wrapper(&self, out: &mut CodeWriter, entity: &EntityDescriptor, signature: &FunctionDescriptor) {
        let types = self.cpp_types();
        let base = entity.name.strip_suffix(DELEGATE_SUFFIX).unwrap_or(&entity.name);
        let multicast = signature.flags.contains(FunctionFlags::MULTICAST_DELEGATE);
        let (holder, process) = if multicast {
            ("FMulticastScriptDelegate", "ProcessMulticastDelegate")
        } else {
            ("FScriptDelegate", "ProcessDelegate")
        };
        let params = self.parameter_list(signature);
        let separator = if params.is_empty() { "" } else { ", " };
        let has_params = signature.all_params().next().is_some();

        out.line(
            0,
            format!(
                "static inline {} {}_DelegateWrapper(const {}& {}{}{})",
                self.return_type(signature),
                types.delegate_type(&entity.name),
                holder,
                base,
                separator,
                params
            ),
        );
        out.line(0, "{");
        if has_params {
            out.line(1, format!("{} Parms;", self.delegate_parms_name(entity)));
            for param in &signature.params {
                out.line(1, format!("Parms.{0}={0};", param.name));
            }
        }
        let parms_arg = if has_params { "&Parms" } else { "NULL" };
        out.line(1, format!("{}.{}<UObject>({});", base, process, parms_arg));
        self.write_outputs(out, 1, signature);
        out.line(0, "}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(name: &str, flags: FunctionFlags) -> FunctionDescriptor {
        let mut function = FunctionDescriptor::new(name, 1);
        function.flags = flags;
        function
    }

    #[test]
    fn test_implementation_names() {
        let server = function(
            "Fire",
            FunctionFlags::NATIVE | FunctionFlags::NET | FunctionFlags::EVENT | FunctionFlags::NET_VALIDATE,
        );
        assert_eq!(implementation_name(&server).as_deref(), Some("Fire_Implementation"));
        assert_eq!(validation_name(&server).as_deref(), Some("Fire_Validate"));

        let response = function("Reply", FunctionFlags::NATIVE | FunctionFlags::NET | FunctionFlags::NET_RESPONSE);
        assert_eq!(implementation_name(&response), None);
        assert!(!has_event_callback(&response));

        let native_event = function(
            "Hit",
            FunctionFlags::NATIVE | FunctionFlags::EVENT | FunctionFlags::BLUEPRINT_EVENT,
        );
        assert_eq!(implementation_name(&native_event).as_deref(), Some("Hit_Implementation"));

        let implementable = function("Hit", FunctionFlags::EVENT | FunctionFlags::BLUEPRINT_EVENT);
        assert_eq!(implementation_name(&implementable), None);
        assert!(!has_exec_thunk(&implementable));
        assert!(has_event_callback(&implementable));
    }

    #[test]
    fn test_custom_thunk_and_requests_skip_exec_thunks() {
        let mut custom = function("Raw", FunctionFlags::NATIVE);
        assert!(has_exec_thunk(&custom));
        custom.metadata.insert("CustomThunk", "true");
        assert!(!has_exec_thunk(&custom));

        let request = function("Ask", FunctionFlags::NATIVE | FunctionFlags::NET | FunctionFlags::NET_REQUEST);
        assert!(!has_exec_thunk(&request));
    }
}
