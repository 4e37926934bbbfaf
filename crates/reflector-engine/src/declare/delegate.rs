//! Dynamic delegate declarations.
//!
//! ```text
//! [UDELEGATE(meta)] DECLARE_DYNAMIC_[MULTICAST_]DELEGATE[_RetVal][_<N>Params][_Const](
//!     [RetType,] FName, Type1, Name1, ...)
//! ```

use crate::declare::dispatch::DELEGATE_SPECIFIERS;
use crate::declare::function::{parameter, return_value};
use crate::declare::specifiers::parse_specifiers;
use crate::declare::types::parse_type;
use crate::declare::{Annotation, HeaderParser, PendingFunction, PendingMember};
use crate::error::{Error, Result};
use crate::parser::Token;
use crate::registry::{ClassFlags, EntityData, FunctionDescriptor, FunctionFlags, Metadata};

const CONTEXT: &str = "delegate declaration";
const MACRO_PREFIX: &str = "DECLARE_DYNAMIC_";

const PARAM_COUNTS: [&str; 8] = [
    "OneParam",
    "TwoParams",
    "ThreeParams",
    "FourParams",
    "FiveParams",
    "SixParams",
    "SevenParams",
    "EightParams",
];

/// Shape encoded in a delegate macro name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DelegateMacro {
    pub multicast: bool,
    pub has_return: bool,
    pub param_count: usize,
    pub is_const: bool,
}

impl DelegateMacro {
    /// Parse a macro name, rejecting anything that does not round-trip to
    /// the canonical spelling.
    pub fn parse(name: &str, line: u32) -> Result<Self> {
        let mut shape = DelegateMacro::default();
        let rest = name.strip_prefix(MACRO_PREFIX).unwrap_or(name);
        let rest = match rest.strip_prefix("MULTICAST_") {
            Some(rest) => {
                shape.multicast = true;
                rest
            }
            None => rest,
        };
        if let Some(suffix) = rest.strip_prefix("DELEGATE") {
            for segment in suffix.split('_').filter(|s| !s.is_empty()) {
                if segment == "RetVal" {
                    shape.has_return = true;
                } else if segment == "Const" {
                    shape.is_const = true;
                } else if let Some(index) = PARAM_COUNTS.iter().position(|c| *c == segment) {
                    shape.param_count = index + 1;
                }
            }
        }

        let expected = shape.macro_name();
        if expected != name {
            return Err(Error::semantic(
                line,
                format!(
                    "Unable to parse delegate declaration; expected '{}' but found '{}'",
                    expected, name
                ),
            ));
        }
        Ok(shape)
    }

    pub fn macro_name(&self) -> String {
        let mut name = String::from(MACRO_PREFIX);
        if self.multicast {
            name.push_str("MULTICAST_");
        }
        name.push_str("DELEGATE");
        if self.has_return {
            name.push_str("_RetVal");
        }
        if self.param_count > 0 {
            name.push('_');
            name.push_str(PARAM_COUNTS[self.param_count - 1]);
        }
        if self.is_const {
            name.push_str("_Const");
        }
        name
    }
}

impl HeaderParser<'_> {
    /// `UDELEGATE(meta)` followed by a delegate macro.
    pub(crate) fn compile_udelegate(&mut self, token: &Token) -> Result<()> {
        self.check_placement(Annotation::Delegate, token.line())?;
        let specifiers = parse_specifiers(&mut self.cursor, &token.text)?;
        let mut metadata = Metadata::new();
        DELEGATE_SPECIFIERS.apply(&mut metadata, &specifiers)?;
        metadata.extend(&specifiers.meta);

        let next = self.cursor.require_identifier(CONTEXT)?;
        if !next.text.starts_with(MACRO_PREFIX) {
            return Err(Error::semantic(
                next.line(),
                format!("UDELEGATE must be followed by a dynamic delegate declaration, found '{}'", next.text),
            ));
        }
        self.compile_delegate_macro(&next, metadata)
    }

    pub(crate) fn compile_delegate_macro(&mut self, token: &Token, metadata: Metadata) -> Result<()> {
        let line = token.line();
        self.check_placement(Annotation::Delegate, line)?;
        let shape = DelegateMacro::parse(&token.text, line)?;
        if shape.multicast && shape.has_return {
            return Err(Error::semantic(
                line,
                "Multi-cast delegates function signatures must not return a value",
            ));
        }

        self.cursor.require_symbol("(", CONTEXT)?;
        let return_ty = if shape.has_return {
            let ty = parse_type(&mut self.cursor, CONTEXT)?;
            self.cursor.require_symbol(",", CONTEXT)?;
            Some(ty)
        } else {
            None
        };
        let name = self.cursor.require_identifier(CONTEXT)?;

        let mut params = Vec::new();
        let mut has_out_params = false;
        while self.cursor.match_symbol(",") {
            let ty = parse_type(&mut self.cursor, CONTEXT)?;
            self.cursor.require_symbol(",", CONTEXT)?;
            let param_name = self.cursor.require_identifier(CONTEXT)?;
            let (param, out) = parameter(&param_name.text, ty, param_name.line());
            has_out_params |= out;
            params.push(param);
        }
        self.cursor.require_symbol(")", CONTEXT)?;
        self.cursor.match_symbol(";");

        if params.len() != shape.param_count {
            return Err(Error::semantic(
                line,
                format!(
                    "Delegate '{}' declares {} parameters but its macro expects {}",
                    name.text,
                    params.len(),
                    shape.param_count
                ),
            ));
        }

        let signature_name = self
            .naming()
            .delegate_signature_name(&name.text)
            .map_err(|message| Error::semantic(line, message))?;

        let in_const_class = self
            .scope_entity()
            .is_some_and(|id| self.ctx.registry.get(id).class_flags().contains(ClassFlags::CONST));
        if in_const_class && !shape.is_const {
            return Err(Error::semantic(
                line,
                format!("Delegate '{}' is declared in a const class and must be _Const", name.text),
            ));
        }

        let return_value = return_ty.and_then(return_value);
        let mut flags = FunctionFlags::DELEGATE | FunctionFlags::PUBLIC;
        flags.set(FunctionFlags::MULTICAST_DELEGATE, shape.multicast);
        flags.set(FunctionFlags::CONST, shape.is_const);
        flags.set(
            FunctionFlags::HAS_OUT_PARMS,
            has_out_params || return_value.is_some(),
        );

        let mut descriptor = FunctionDescriptor::new(signature_name.clone(), line);
        descriptor.flags = flags;
        descriptor.metadata = metadata;

        let id = self.register(
            signature_name,
            EntityData::Delegate(descriptor.clone()),
            None,
            line,
        )?;
        self.ctx.registry.get_mut(id).metadata = descriptor.metadata.clone();
        self.queue(PendingMember::Signature {
            delegate: id,
            function: PendingFunction {
                descriptor,
                return_value,
                params,
            },
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declare::tests::parse;
    use crate::registry::Category;

    #[test]
    fn test_macro_name_round_trip() {
        let shape = DelegateMacro::parse("DECLARE_DYNAMIC_MULTICAST_DELEGATE_TwoParams", 1).unwrap();
        assert!(shape.multicast);
        assert_eq!(shape.param_count, 2);

        let shape = DelegateMacro::parse("DECLARE_DYNAMIC_DELEGATE_RetVal_OneParam_Const", 1).unwrap();
        assert!(shape.has_return && shape.is_const);

        let err = DelegateMacro::parse("DECLARE_DYNAMIC_DELEGATE_OneParam_RetVal", 1).unwrap_err();
        assert!(err.message.contains("expected 'DECLARE_DYNAMIC_DELEGATE_RetVal_OneParam'"));
    }

    #[test]
    fn test_global_multicast_delegate() {
        let ctx = parse("DECLARE_DYNAMIC_MULTICAST_DELEGATE_OneParam(FOnHealthChanged, float, NewHealth);\n").unwrap();
        let id = ctx
            .registry
            .find(Category::Delegate, "OnHealthChanged__DelegateSignature")
            .unwrap();
        let entity = ctx.registry.get(id);
        assert!(entity.is_multicast_delegate());
        assert!(entity.signature().unwrap().is_delegate());
    }

    #[test]
    fn test_delegate_inside_class_is_scoped() {
        let ctx = parse(
            "UCLASS()\nclass UThing\n{\n GENERATED_BODY()\n\
             DECLARE_DYNAMIC_DELEGATE(FOnDone);\n};\n",
        )
        .unwrap();
        assert!(ctx.registry.find(Category::Delegate, "OnDone__DelegateSignature").is_none());
        let class = ctx.registry.find(Category::Class, "UThing").unwrap();
        assert_eq!(ctx.registry.get(class).children.len(), 1);
    }

    #[test]
    fn test_udelegate_metadata() {
        let ctx = parse("UDELEGATE(meta=(ToolTip=\"Fired\"))\nDECLARE_DYNAMIC_DELEGATE(FOnFire);\n").unwrap();
        let id = ctx.registry.find(Category::Delegate, "OnFire__DelegateSignature").unwrap();
        assert_eq!(ctx.registry.get(id).metadata.get("ToolTip"), Some("Fired"));
    }

    #[test]
    fn test_delegate_errors() {
        let err = parse("DECLARE_DYNAMIC_MULTICAST_DELEGATE_RetVal(bool, FOnAsk);\n").unwrap_err();
        assert_eq!(err.message, "Multi-cast delegates function signatures must not return a value");

        let err = parse("DECLARE_DYNAMIC_DELEGATE_OneParam(FOnHit);\n").unwrap_err();
        assert!(err.message.contains("declares 0 parameters but its macro expects 1"));

        let err = parse("DECLARE_DYNAMIC_DELEGATE(OnHit);\n").unwrap_err();
        assert_eq!(err.message, "Delegate type declarations must start with F");

        let err = parse(
            "UCLASS(const)\nclass UThing\n{\n GENERATED_BODY()\n DECLARE_DYNAMIC_DELEGATE(FOnDone);\n};\n",
        )
        .unwrap_err();
        assert!(err.message.ends_with("must be _Const"));
    }
}
