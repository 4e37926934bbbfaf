//! `UFUNCTION` declarations and function parameter lists.

use crate::declare::dispatch::{
    FunctionSpecifiers, ParamSpecifiers, ServiceEndpoint, FUNCTION_SPECIFIERS, PARAM_SPECIFIERS,
};
use crate::declare::specifiers::parse_specifiers;
use crate::declare::types::{parse_type, TypeSyntax};
use crate::declare::{
    Access, Annotation, HeaderParser, NestKind, PendingFunction, PendingMember, PendingProperty,
};
use crate::error::{Error, Result};
use crate::parser::{Token, TokenCursor};
use crate::registry::{ClassFlags, EntityId, FunctionDescriptor, FunctionFlags, PropertyFlags};

const CONTEXT: &str = "function declaration";

const INLINE_KEYWORDS: &[&str] = &["inline", "FORCEINLINE", "FORCENOINLINE"];

/// Written types replication requires to be passed by const reference.
const CONST_REF_REPLICATED: &[&str] = &["FString", "TArray"];

/// A parsed parameter list.
#[derive(Debug, Default)]
pub(crate) struct ParamList {
    pub params: Vec<PendingProperty>,
    pub has_out_params: bool,
}

/// Declaration keywords and trailers around the signature.
#[derive(Debug, Default)]
struct Qualifiers {
    is_static: bool,
    is_virtual: bool,
    exported: bool,
    is_const: bool,
    is_final: bool,
    pure_virtual: bool,
    has_return: bool,
}

/// `ReturnValue` out property for a non-void return type.
pub(crate) fn return_value(ty: TypeSyntax) -> Option<PendingProperty> {
    if ty.name == "void" && !ty.pointer {
        return None;
    }
    let line = ty.line;
    let mut property = PendingProperty::new("ReturnValue", ty, line);
    property.flags = PropertyFlags::PARM | PropertyFlags::OUT_PARM | PropertyFlags::RETURN_PARM;
    Some(property)
}

/// Parameter flags implied by the written type.
pub(crate) fn parameter(name: &str, ty: TypeSyntax, line: u32) -> (PendingProperty, bool) {
    let mut flags = PropertyFlags::PARM;
    let out = ty.is_out_reference();
    if out {
        flags |= PropertyFlags::OUT_PARM;
    }
    if ty.is_const {
        flags |= PropertyFlags::CONST_PARM;
    }
    let mut property = PendingProperty::new(name, ty, line);
    property.flags = flags;
    (property, out)
}

/// `( [UPARAM(...)] Type Name [= default], ... )` with the cursor after `(`.
pub(crate) fn parse_params(cursor: &mut TokenCursor) -> Result<ParamList> {
    let mut list = ParamList::default();
    if cursor.match_symbol(")") {
        return Ok(list);
    }
    if cursor.peek_identifier("void") && cursor.peek_nth(1).is_some_and(|t| t.is_symbol(")")) {
        cursor.get_token();
        cursor.get_token();
        return Ok(list);
    }

    loop {
        let mut uparam = ParamSpecifiers::default();
        if cursor.match_identifier("UPARAM") {
            let specifiers = parse_specifiers(cursor, "UPARAM")?;
            PARAM_SPECIFIERS.apply(&mut uparam, &specifiers)?;
            uparam.metadata.extend(&specifiers.meta);
        }

        let ty = parse_type(cursor, CONTEXT)?;
        let name = cursor.require_identifier(CONTEXT)?;
        if uparam.flags.contains(PropertyFlags::REFERENCE_PARM) && !ty.reference {
            return Err(Error::semantic(
                name.line(),
                format!("UPARAM(ref) on '{}' requires a reference parameter", name.text),
            ));
        }

        let (mut param, out) = parameter(&name.text, ty, name.line());
        param.flags |= uparam.flags;
        param.metadata = uparam.metadata;
        list.has_out_params |= out;

        if cursor.match_symbol("=") {
            param.default_value = Some(read_default(cursor)?);
        }
        list.params.push(param);

        if cursor.match_symbol(",") {
            continue;
        }
        cursor.require_symbol(")", CONTEXT)?;
        return Ok(list);
    }
}

/// Default argument text up to `,` or `)` at depth zero.
fn read_default(cursor: &mut TokenCursor) -> Result<String> {
    let mut text = String::new();
    let mut depth = 0usize;
    loop {
        let token = cursor.require_token(CONTEXT)?;
        if depth == 0 && (token.is_symbol(",") || token.is_symbol(")")) {
            cursor.unget();
            return Ok(text);
        }
        if token.is_symbol("(") || token.is_symbol("<") {
            depth += 1;
        } else if token.is_symbol(")") || token.is_symbol(">") {
            depth = depth.saturating_sub(1);
        }
        text.push_str(&token.text);
    }
}

impl HeaderParser<'_> {
    pub(crate) fn compile_function(&mut self, token: &Token) -> Result<()> {
        let line = token.line();
        self.check_placement(Annotation::Function, line)?;
        self.require_generated_body(line)?;
        if self.in_editor_only_data() {
            return Err(Error::semantic(line, "UFUNCTION must not be inside WITH_EDITORONLY_DATA"));
        }

        let specifiers = parse_specifiers(&mut self.cursor, &token.text)?;
        let mut builder = FunctionSpecifiers::default();
        FUNCTION_SPECIFIERS.apply(&mut builder, &specifiers)?;
        builder.metadata.extend(&specifiers.meta);

        let owner = member_owner(self.scope_entity(), line, "UFUNCTION")?;
        let in_interface = self.nest().kind == NestKind::NativeInterface;
        let access = self.nest().access;

        let mut qualifiers = Qualifiers::default();
        self.parse_leading_keywords(&mut qualifiers);
        let return_ty = parse_type(&mut self.cursor, CONTEXT)?;
        let name = self.cursor.require_identifier(CONTEXT)?;
        let line = name.line();
        self.cursor.require_symbol("(", CONTEXT)?;
        let params = parse_params(&mut self.cursor)?;
        self.parse_trailers(&mut qualifiers)?;

        let return_value = return_value(return_ty);
        qualifiers.has_return = return_value.is_some();
        let mut flags = builder.flags;
        // Implementable events have no native body.
        flags.set(FunctionFlags::NATIVE, !builder.implementable_event);
        flags |= match access {
            Access::Public => FunctionFlags::PUBLIC,
            Access::Protected => FunctionFlags::PROTECTED,
            Access::Private => FunctionFlags::PRIVATE,
        };
        let owner_flags = self.ctx.registry.get(owner).class_flags();
        flags.set(
            FunctionFlags::CONST,
            qualifiers.is_const || owner_flags.contains(ClassFlags::CONST),
        );
        flags.set(FunctionFlags::STATIC, qualifiers.is_static);
        flags.set(FunctionFlags::FINAL, qualifiers.is_final);
        flags.set(FunctionFlags::REQUIRED_API, qualifiers.exported);
        flags.set(
            FunctionFlags::HAS_OUT_PARMS,
            params.has_out_params || return_value.is_some(),
        );
        if flags.contains(FunctionFlags::NET) {
            flags |= FunctionFlags::EVENT;
        }

        let has_outputs = params.has_out_params || return_value.is_some();
        self.check_function(&name.text, line, &builder, flags, &qualifiers, in_interface, access, has_outputs)?;
        check_replicated_params(&params.params, flags)?;

        let mut descriptor = FunctionDescriptor::new(name.text.clone(), line);
        descriptor.rpc_id = builder.rpc_id;
        descriptor.rpc_response_id = builder.rpc_response_id;
        descriptor.metadata = builder.metadata;

        if flags.intersects(FunctionFlags::BLUEPRINT_CALLABLE | FunctionFlags::EXEC) {
            for param in &params.params {
                if let Some(default) = &param.default_value {
                    descriptor
                        .metadata
                        .insert(format!("CPP_Default_{}", param.name), default.as_str());
                    flags |= FunctionFlags::HAS_DEFAULTS;
                }
            }
        }
        descriptor.flags = flags;

        self.claim_service_ids(&descriptor)?;
        self.claim_function_name(owner, &name.text, line)?;
        self.queue(PendingMember::Function {
            owner,
            function: PendingFunction {
                descriptor,
                return_value,
                params: params.params,
            },
        });
        Ok(())
    }

    /// `[static] [virtual] [inline] [API]`
    fn parse_leading_keywords(&mut self, qualifiers: &mut Qualifiers) {
        loop {
            let Some(next) = self.cursor.peek() else {
                return;
            };
            if next.matches("static") {
                qualifiers.is_static = true;
            } else if next.matches("virtual") {
                qualifiers.is_virtual = true;
            } else if next.is_identifier() && next.text.ends_with("_API") {
                qualifiers.exported = true;
            } else if !INLINE_KEYWORDS.iter().any(|k| next.matches(k)) {
                return;
            }
            self.cursor.get_token();
        }
    }

    /// `[const] [override] [final] [= 0]` then `;` or a body.
    fn parse_trailers(&mut self, qualifiers: &mut Qualifiers) -> Result<()> {
        loop {
            if self.cursor.match_identifier("const") {
                qualifiers.is_const = true;
            } else if self.cursor.match_identifier("final") {
                qualifiers.is_final = true;
            } else if self.cursor.match_identifier("override") {
                // nothing to record
            } else if self.cursor.match_symbol("=") {
                let zero = self.cursor.require_int(CONTEXT)?;
                if zero != 0 {
                    return Err(Error::syntax(self.cursor.line(), "Expected '= 0' on a pure virtual function"));
                }
                qualifiers.pure_virtual = true;
            } else {
                break;
            }
        }

        if self.cursor.match_symbol("{") {
            self.cursor.skip_balanced("{", "}", CONTEXT)?;
            while self.cursor.match_symbol(";") {}
        } else {
            self.cursor.require_symbol(";", CONTEXT)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn check_function(
        &self,
        name: &str,
        line: u32,
        builder: &FunctionSpecifiers,
        flags: FunctionFlags,
        qualifiers: &Qualifiers,
        in_interface: bool,
        access: Access,
        has_outputs: bool,
    ) -> Result<()> {
        let fail = |message: &str| Err(Error::semantic(line, message.to_string()));
        let net = flags.contains(FunctionFlags::NET);

        if builder.native_event && builder.implementable_event {
            return fail("BlueprintNativeEvent and BlueprintImplementableEvent are mutually exclusive");
        }
        if builder.is_blueprint_event() {
            if net {
                return fail("BlueprintImplementableEvent or BlueprintNativeEvent functions cannot be replicated");
            }
            if access == Access::Private {
                return fail("A private function cannot be a BlueprintImplementableEvent or BlueprintNativeEvent");
            }
            if qualifiers.is_final {
                return fail("Blueprint events cannot be declared 'final'");
            }
        }
        if builder.native_event && qualifiers.is_virtual {
            return fail("BlueprintNativeEvent functions must be non-virtual");
        }
        if builder.sealed_event && !flags.contains(FunctionFlags::EVENT) {
            return fail("SealedEvent may only be used on events");
        }
        if flags.contains(FunctionFlags::EXEC) && net {
            return fail("Exec functions cannot be replicated");
        }
        if qualifiers.is_static && net {
            return fail("Static functions can't be replicated");
        }

        if net && !builder.service {
            if flags.contains(FunctionFlags::NET_SERVER) && !flags.contains(FunctionFlags::NET_VALIDATE) {
                return fail("Server RPC missing 'WithValidation' keyword in the UFUNCTION() declaration");
            }
            if builder.reliable && builder.unreliable {
                return fail("Reliable and Unreliable are mutually exclusive");
            }
            if !builder.reliable && !builder.unreliable {
                return fail("Replicated function: 'Reliable' or 'Unreliable' is required");
            }
            if qualifiers.has_return {
                return fail("Replicated functions can't have return values");
            }
        }
        if !net && builder.reliable {
            return fail("'Reliable' specified for non-replicated function");
        }
        if !net && builder.unreliable {
            return fail("'Unreliable' specified for non-replicated function");
        }

        if builder.service {
            if builder.endpoint.is_none() {
                return fail("Service functions must name an endpoint: MCP or Protobuffer");
            }
            if builder.endpoint == Some(ServiceEndpoint::Protobuffer) && builder.rpc_id.is_none() {
                return fail("Protobuffer service functions require an Id");
            }
            if builder.rpc_id.is_some() && builder.rpc_id == builder.rpc_response_id {
                return fail("Function Id and ResponseId must be different");
            }
            if flags.contains(FunctionFlags::NET_RESPONSE) && builder.rpc_response_id.is_some() {
                return fail("Response functions cannot have a ResponseId");
            }
        }

        let callable = flags.contains(FunctionFlags::BLUEPRINT_CALLABLE);
        if callable
            && !builder.metadata.contains("Category")
            && !builder.metadata.is_true("BlueprintInternalUseOnly")
            && !builder.metadata.contains("DeprecatedFunction")
        {
            return Err(Error::semantic(
                line,
                format!("Blueprint accessible function '{}' must have a category specified", name),
            ));
        }
        if flags.contains(FunctionFlags::BLUEPRINT_PURE) && !has_outputs {
            return fail("BlueprintPure specifier is not allowed for functions with no return value and no output parameters");
        }

        if in_interface {
            if !qualifiers.is_virtual && !builder.is_blueprint_event() {
                return fail("Interface functions that are not BlueprintImplementableEvents or BlueprintNativeEvents must be declared 'virtual'");
            }
            if qualifiers.is_final {
                return fail("Interface functions cannot be declared 'final'");
            }
        } else if qualifiers.pure_virtual {
            return fail("Pure virtual functions are only allowed in interfaces");
        }
        Ok(())
    }

    fn claim_service_ids(&mut self, descriptor: &FunctionDescriptor) -> Result<()> {
        let is_response = descriptor.flags.contains(FunctionFlags::NET_RESPONSE);
        if let Some(id) = descriptor.rpc_id {
            self.ctx
                .claim_rpc_id(id, &descriptor.name, descriptor.line, is_response)?;
        }
        if let Some(id) = descriptor.rpc_response_id {
            self.ctx
                .request_rpc_response(id, &descriptor.name, descriptor.line);
        }
        Ok(())
    }
}

/// Parameter rules for replicated functions that need only the written types.
fn check_replicated_params(params: &[PendingProperty], flags: FunctionFlags) -> Result<()> {
    let net = flags.contains(FunctionFlags::NET);
    for param in params {
        let line = param.line;
        if param.flags.contains(PropertyFlags::REP_SKIP) && !flags.contains(FunctionFlags::NET_REQUEST) {
            return Err(Error::semantic(
                line,
                "Only parameters in service request functions can be marked NotReplicated",
            ));
        }
        if !net {
            continue;
        }
        if param.flags.contains(PropertyFlags::OUT_PARM) {
            return Err(Error::semantic(
                line,
                format!("Replicated functions cannot contain out parameters ('{}')", param.name),
            ));
        }
        let ty = &param.ty;
        if CONST_REF_REPLICATED.contains(&ty.name.as_str()) && !(ty.is_const && ty.reference) {
            return Err(Error::semantic(
                line,
                format!("Replicated {} parameters must be passed by const reference", ty.name),
            ));
        }
    }
    Ok(())
}

/// Owner of a member declared in the current nest.
pub(crate) fn member_owner(owner: Option<EntityId>, line: u32, what: &str) -> Result<EntityId> {
    owner.ok_or_else(|| Error::semantic(line, format!("{} must occur inside the class or interface definition", what)))
}

#[cfg(test)]
mod tests {
    use crate::context::RunContext;
    use crate::declare::tests::parse;
    use crate::declare::{PendingFunction, PendingMember};
    use crate::module::unit::UnitId;
    use crate::registry::{FunctionFlags, PropertyFlags};

    fn class(body: &str) -> String {
        format!("UCLASS()\nclass UThing\n{{\n GENERATED_BODY()\npublic:\n{}\n}};\n", body)
    }

    fn functions(ctx: &RunContext) -> Vec<&PendingFunction> {
        ctx.pending[&UnitId::from_index(0)]
            .iter()
            .filter_map(|m| match m {
                PendingMember::Function { function, .. } => Some(function),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_signature_and_flags() {
        let ctx = parse(&class(
            "UFUNCTION(BlueprintCallable, Category=\"Shape\")\n\
             float Scale(float Factor, int32& OutCount, const FString& Label = TEXT(\"x\")) const;",
        ))
        .unwrap();
        let funcs = functions(&ctx);
        let f = funcs[0];
        let flags = f.descriptor.flags;
        assert!(flags.contains(
            FunctionFlags::NATIVE
                | FunctionFlags::PUBLIC
                | FunctionFlags::CONST
                | FunctionFlags::HAS_OUT_PARMS
                | FunctionFlags::HAS_DEFAULTS
        ));
        assert_eq!(f.params.len(), 3);
        assert!(f.params[1].flags.contains(PropertyFlags::OUT_PARM));
        assert!(f.params[2].flags.contains(PropertyFlags::CONST_PARM));
        assert!(f.return_value.as_ref().unwrap().flags.contains(PropertyFlags::RETURN_PARM));
        assert_eq!(
            f.descriptor.metadata.get("CPP_Default_Label"),
            Some("TEXT(\"x\")")
        );
    }

    #[test]
    fn test_inline_body_is_skipped() {
        let ctx = parse(&class(
            "UFUNCTION()\nvoid Reset() { Count = 0; }\nUFUNCTION()\nvoid Other();",
        ))
        .unwrap();
        let funcs = functions(&ctx);
        assert_eq!(funcs.len(), 2);
        assert!(funcs[0].return_value.is_none());
    }

    #[test]
    fn test_callable_needs_category() {
        let err = parse(&class("UFUNCTION(BlueprintCallable)\nvoid Fire();")).unwrap_err();
        assert!(err.message.contains("must have a category specified"));
    }

    #[test]
    fn test_pure_needs_output() {
        let err = parse(&class("UFUNCTION(BlueprintPure, Category=X)\nvoid Fire();")).unwrap_err();
        assert!(err.message.starts_with("BlueprintPure specifier is not allowed"));
    }

    #[test]
    fn test_net_rules() {
        let err = parse(&class("UFUNCTION(Client)\nvoid Notify();")).unwrap_err();
        assert!(err.message.contains("'Reliable' or 'Unreliable' is required"));

        let err = parse(&class("UFUNCTION(Server, Reliable)\nvoid Move();")).unwrap_err();
        assert!(err.message.contains("WithValidation"));

        let err = parse(&class("UFUNCTION(Reliable)\nvoid Move();")).unwrap_err();
        assert_eq!(err.message, "'Reliable' specified for non-replicated function");

        let err = parse(&class("UFUNCTION(NetMulticast, Unreliable)\nstatic void Ping();")).unwrap_err();
        assert_eq!(err.message, "Static functions can't be replicated");

        let ctx = parse(&class("UFUNCTION(NetMulticast, Unreliable)\nvoid Ping(const FString& Text);")).unwrap();
        assert!(functions(&ctx)[0].descriptor.flags.contains(FunctionFlags::EVENT | FunctionFlags::NET));
    }

    #[test]
    fn test_replicated_parameter_rules() {
        let err = parse(&class("UFUNCTION(Client, Reliable)\nvoid Sync(FString Text);")).unwrap_err();
        assert_eq!(err.message, "Replicated FString parameters must be passed by const reference");

        let err = parse(&class("UFUNCTION(Client, Reliable)\nvoid Sync(int32& Out);")).unwrap_err();
        assert!(err.message.starts_with("Replicated functions cannot contain out parameters"));
    }

    #[test]
    fn test_event_rules() {
        let err = parse(&class("UFUNCTION(BlueprintNativeEvent)\nvirtual void Hit();")).unwrap_err();
        assert_eq!(err.message, "BlueprintNativeEvent functions must be non-virtual");

        let err = parse(&class(
            "UFUNCTION(BlueprintNativeEvent, BlueprintImplementableEvent)\nvoid Hit();",
        ))
        .unwrap_err();
        assert!(err.message.contains("mutually exclusive"));

        let err = parse(&class("UFUNCTION(NetMulticast, Reliable, BlueprintImplementableEvent)\nvoid Hit();"))
            .unwrap_err();
        assert!(err.message.contains("cannot be replicated"));
    }

    #[test]
    fn test_private_event_rejected() {
        let err = parse(
            "UCLASS()\nclass UThing\n{\n GENERATED_BODY()\n\
             UFUNCTION(BlueprintImplementableEvent)\n void Hit();\n};\n",
        )
        .unwrap_err();
        assert!(err.message.starts_with("A private function cannot be"));
    }

    #[test]
    fn test_pure_virtual_outside_interface() {
        let err = parse(&class("UFUNCTION()\nvirtual void Tick() = 0;")).unwrap_err();
        assert_eq!(err.message, "Pure virtual functions are only allowed in interfaces");
    }

    #[test]
    fn test_duplicate_function() {
        let err = parse(&class("UFUNCTION()\nvoid Tick();\nUFUNCTION()\nvoid Tick();")).unwrap_err();
        assert_eq!(err.message, "Duplicate function 'Tick' in 'UThing'");
    }

    #[test]
    fn test_service_identifiers() {
        let ctx = parse(&class(
            "UFUNCTION(ServiceRequest(Protobuffer, Id=10, ResponseId=11))\nvoid Ask(const FString& Q);\n\
             UFUNCTION(ServiceResponse(Protobuffer, Id=11))\nvoid Answer(const FString& A);",
        ))
        .unwrap();
        assert!(ctx.check_rpc_responses().is_ok());
        assert_eq!(functions(&ctx)[0].descriptor.rpc_id, Some(10));

        let err = parse(&class(
            "UFUNCTION(ServiceRequest(Protobuffer, Id=10))\nvoid Ask();\n\
             UFUNCTION(ServiceRequest(Protobuffer, Id=10))\nvoid AskAgain();",
        ))
        .unwrap_err();
        assert!(err.message.contains("already uses identifier 10"));

        let err = parse(&class("UFUNCTION(ServiceRequest(Protobuffer))\nvoid Ask();")).unwrap_err();
        assert_eq!(err.message, "Protobuffer service functions require an Id");

        let ctx = parse(&class("UFUNCTION(ServiceRequest(MCP, ResponseId=30))\nvoid Ask();")).unwrap();
        assert!(ctx.check_rpc_responses().is_err());
    }

    #[test]
    fn test_not_replicated_param_only_for_requests() {
        let err = parse(&class("UFUNCTION()\nvoid Ask(UPARAM(NotReplicated) int32 Token);")).unwrap_err();
        assert!(err.message.starts_with("Only parameters in service request functions"));
    }

    #[test]
    fn test_editor_only_data_rejects_functions() {
        let err = parse(&class("#if WITH_EDITORONLY_DATA\nUFUNCTION()\nvoid Tick();\n#endif")).unwrap_err();
        assert_eq!(err.message, "UFUNCTION must not be inside WITH_EDITORONLY_DATA");
    }

    #[test]
    fn test_const_class_forces_const() {
        let ctx = parse("UCLASS(const)\nclass UThing\n{\n GENERATED_BODY()\npublic:\n UFUNCTION()\n void Tick();\n};\n").unwrap();
        assert!(functions(&ctx)[0].descriptor.flags.contains(FunctionFlags::CONST));
    }
}
