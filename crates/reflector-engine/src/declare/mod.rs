//! Declaration parser.
//!
//! Walks the tokens of one pre-parsed unit and turns every annotated
//! declaration into registry entities. Members are not resolved here: each
//! property, function and delegate signature is queued as a
//! [`PendingMember`] with its type still in written form, and the type
//! resolver attaches them once the whole unit has been read.
//!
//! # Example
//!
//! ```rust,ignore
//! HeaderParser::parse_unit(&mut ctx, unit_id)?;
//! TypeResolver::resolve_unit(&mut ctx, unit_id)?;
//! ```

pub mod class;
pub mod delegate;
pub mod dispatch;
pub mod enums;
pub mod function;
pub mod property;
pub mod skip;
pub mod specifiers;
pub mod structs;
pub mod types;

pub use specifiers::{parse_specifiers, Specifier, SpecifierList};
pub use types::{parse_type, TypeSyntax};

use std::path::PathBuf;

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::NamingConvention;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::module::unit::UnitId;
use crate::parser::{tokenize, Token, TokenCursor};
use crate::registry::{
    BodyMacro, EntityData, EntityId, FunctionDescriptor, Metadata, NewEntity, Outer, PropertyFlags,
    StructFlags,
};

// ============================================================================
// Pending members
// ============================================================================

/// A property, parameter or return value whose type is not resolved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingProperty {
    pub name: String,
    pub ty: TypeSyntax,
    pub flags: PropertyFlags,
    pub rep_notify: Option<String>,
    /// Static array size expression.
    pub array_dim: Option<String>,
    /// `uint32 bFoo : 1`
    pub bitfield: bool,
    pub metadata: Metadata,
    /// Default value text of a parameter.
    pub default_value: Option<String>,
    pub line: u32,
}

impl PendingProperty {
    pub fn new(name: impl Into<String>, ty: TypeSyntax, line: u32) -> Self {
        Self {
            name: name.into(),
            ty,
            flags: PropertyFlags::EMPTY,
            rep_notify: None,
            array_dim: None,
            bitfield: false,
            metadata: Metadata::new(),
            default_value: None,
            line,
        }
    }
}

/// A function whose parameters are not resolved yet. The descriptor holds
/// everything except `params` and `return_value`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFunction {
    pub descriptor: FunctionDescriptor,
    pub return_value: Option<PendingProperty>,
    pub params: Vec<PendingProperty>,
}

/// A member queued for the type resolver, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingMember {
    Property {
        owner: EntityId,
        property: PendingProperty,
    },
    Function {
        owner: EntityId,
        function: PendingFunction,
    },
    /// Parameters of a delegate signature entity.
    Signature {
        delegate: EntityId,
        function: PendingFunction,
    },
}

// ============================================================================
// Nesting
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NestKind {
    Global,
    Class,
    /// Body of the `U` class of an interface.
    Interface,
    /// Body of the `I` class of an interface. Members belong to the `U` class.
    NativeInterface,
    Struct,
}

impl NestKind {
    fn description(&self) -> &'static str {
        match self {
            NestKind::Global => "global scope",
            NestKind::Class => "a class",
            NestKind::Interface => "an interface",
            NestKind::NativeInterface => "a native interface",
            NestKind::Struct => "a struct",
        }
    }

    fn generated_macros(&self) -> &'static [&'static str] {
        match self {
            NestKind::Global => &[],
            NestKind::Class => &["GENERATED_BODY", "GENERATED_UCLASS_BODY"],
            NestKind::Interface => &["GENERATED_BODY", "GENERATED_UINTERFACE_BODY"],
            NestKind::NativeInterface => &["GENERATED_BODY", "GENERATED_IINTERFACE_BODY"],
            NestKind::Struct => &["GENERATED_BODY", "GENERATED_USTRUCT_BODY"],
        }
    }
}

pub(crate) use crate::registry::MemberAccess as Access;

#[derive(Debug, Clone)]
pub(crate) struct Nest {
    pub kind: NestKind,
    pub entity: Option<EntityId>,
    pub access: Access,
    pub generated_body: bool,
    pub line: u32,
}

/// Region opened by a conditional directive the pre-parser kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DirectiveScope {
    EditorOnlyData,
    EditorOnlyFunctions,
    Other,
}

/// Annotation kinds, for the placement checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Annotation {
    Class,
    Interface,
    Struct,
    Enum,
    Function,
    Property,
    Delegate,
}

impl Annotation {
    fn name(&self) -> &'static str {
        match self {
            Annotation::Class => "UCLASS",
            Annotation::Interface => "UINTERFACE",
            Annotation::Struct => "USTRUCT",
            Annotation::Enum => "UENUM",
            Annotation::Function => "UFUNCTION",
            Annotation::Property => "UPROPERTY",
            Annotation::Delegate => "Delegate declaration",
        }
    }
}

const GENERATED_MACROS: &[&str] = &[
    "GENERATED_BODY",
    "GENERATED_UCLASS_BODY",
    "GENERATED_USTRUCT_BODY",
    "GENERATED_UINTERFACE_BODY",
    "GENERATED_IINTERFACE_BODY",
];

// ============================================================================
// Parser
// ============================================================================

/// Parser state for one unit.
pub struct HeaderParser<'a> {
    pub(crate) ctx: &'a mut RunContext,
    pub(crate) unit: UnitId,
    pub(crate) path: PathBuf,
    pub(crate) module: String,
    pub(crate) cursor: TokenCursor,
    nests: Vec<Nest>,
    directives: Vec<DirectiveScope>,
    /// `U` class of an interface whose native `I` class has not been seen.
    pending_interface: Option<EntityId>,
    function_names: FxHashMap<EntityId, FxHashSet<String>>,
    property_names: FxHashMap<EntityId, FxHashSet<String>>,
    pending: Vec<PendingMember>,
}

impl<'a> HeaderParser<'a> {
    /// Parse one unit, registering its entities and queueing its members in
    /// `ctx.pending`.
    pub fn parse_unit(ctx: &'a mut RunContext, unit: UnitId) -> Result<()> {
        let source = ctx.unit(unit);
        let path = source.path.clone();
        let module = source.module.clone();
        let tokens = tokenize(&source.text)?;

        let mut parser = HeaderParser {
            ctx,
            unit,
            path,
            module,
            cursor: TokenCursor::new(tokens),
            nests: vec![Nest {
                kind: NestKind::Global,
                entity: None,
                access: Access::Public,
                generated_body: false,
                line: 1,
            }],
            directives: Vec::new(),
            pending_interface: None,
            function_names: FxHashMap::default(),
            property_names: FxHashMap::default(),
            pending: Vec::new(),
        };
        parser.run()?;

        let HeaderParser {
            ctx, path, pending, ..
        } = parser;
        debug!(
            "parsed {}: {} entities, {} pending members",
            path.display(),
            ctx.unit(unit).entities.len(),
            pending.len()
        );
        ctx.pending.insert(unit, pending);
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        while let Some(token) = self.cursor.get_token() {
            self.compile_declaration(token)?;
        }

        if let Some(nest) = self.nests.last().filter(|n| n.kind != NestKind::Global) {
            let name = nest
                .entity
                .map_or_else(String::new, |id| self.ctx.registry.get(id).name.clone());
            return Err(Error::syntax(
                nest.line,
                format!("Missing '}}' for '{}' at end of file", name),
            ));
        }
        if let Some(interface) = self.pending_interface {
            let entity = self.ctx.registry.get(interface);
            return Err(Error::semantic(
                entity.line,
                format!(
                    "Interface '{}' is missing its native '{}' declaration",
                    entity.name,
                    self.naming().native_interface_name(&entity.name)
                ),
            ));
        }
        Ok(())
    }

    fn compile_declaration(&mut self, token: Token) -> Result<()> {
        if token.is_symbol("#") {
            return self.compile_directive(&token);
        }
        if token.is_symbol("}") && self.in_member_scope() {
            return self.close_nest(&token);
        }

        if token.is_identifier() {
            match token.text.as_str() {
                "public" | "protected" | "private"
                    if self.in_member_scope() && self.cursor.peek_symbol(":") =>
                {
                    self.cursor.get_token();
                    self.nest_mut().access = match token.text.as_str() {
                        "public" => Access::Public,
                        "protected" => Access::Protected,
                        _ => Access::Private,
                    };
                    return Ok(());
                }
                name if GENERATED_MACROS.contains(&name) => {
                    return self.compile_generated_body(&token);
                }
                "UCLASS" => return self.compile_class(&token, false),
                "UINTERFACE" => return self.compile_class(&token, true),
                "USTRUCT" => return self.compile_struct(&token),
                "UENUM" => return self.compile_enum(&token),
                "UFUNCTION" => return self.compile_function(&token),
                "UPROPERTY" => return self.compile_property(&token),
                "UDELEGATE" => return self.compile_udelegate(&token),
                name if name.starts_with("DECLARE_DYNAMIC_") => {
                    return self.compile_delegate_macro(&token, Metadata::new());
                }
                "class" if self.pending_interface.is_some() => {
                    if self.compile_native_interface(&token)? {
                        return Ok(());
                    }
                }
                _ => self.note_constructor(&token),
            }
        }

        self.cursor.unget();
        let member_scope = self.in_member_scope();
        skip::skip_declaration(&mut self.cursor, member_scope)
    }

    // ------------------------------------------------------------------------
    // Directives
    // ------------------------------------------------------------------------

    fn compile_directive(&mut self, hash: &Token) -> Result<()> {
        let line = hash.line();
        let keyword = match self.cursor.peek() {
            Some(t) if t.line() == line && t.is_identifier() => t.text.clone(),
            _ => return Ok(()),
        };
        self.cursor.get_token();

        match keyword.as_str() {
            "if" | "ifdef" | "ifndef" => {
                let condition = self.read_directive_line(line);
                let policy = &self.ctx.config.preprocessor;
                let scope = if policy.is_editor_only_data(&condition) {
                    DirectiveScope::EditorOnlyData
                } else if policy.is_editor_only_functions(&condition) {
                    DirectiveScope::EditorOnlyFunctions
                } else {
                    DirectiveScope::Other
                };
                self.directives.push(scope);
            }
            "endif" => {
                if self.directives.pop().is_none() {
                    return Err(Error::syntax(line, "Unmatched #endif"));
                }
                self.read_directive_line(line);
            }
            _ => {
                self.read_directive_line(line);
            }
        }
        Ok(())
    }

    /// Consume the rest of a directive line, following `\` continuations.
    fn read_directive_line(&mut self, line: u32) -> String {
        let mut current = line;
        let mut text = Vec::new();
        while let Some(token) = self.cursor.peek() {
            if token.line() != current {
                break;
            }
            if token.is_symbol("\\") {
                current += 1;
            } else {
                text.push(token.text.clone());
            }
            self.cursor.get_token();
        }
        text.join(" ")
    }

    pub(crate) fn in_editor_only_data(&self) -> bool {
        self.directives.contains(&DirectiveScope::EditorOnlyData)
    }

    pub(crate) fn in_editor_only_functions(&self) -> bool {
        self.directives.contains(&DirectiveScope::EditorOnlyFunctions)
    }

    // ------------------------------------------------------------------------
    // Nesting
    // ------------------------------------------------------------------------

    pub(crate) fn nest(&self) -> &Nest {
        // The global nest is never popped.
        &self.nests[self.nests.len() - 1]
    }

    fn nest_mut(&mut self) -> &mut Nest {
        let last = self.nests.len() - 1;
        &mut self.nests[last]
    }

    fn in_member_scope(&self) -> bool {
        self.nest().kind != NestKind::Global
    }

    pub(crate) fn push_nest(&mut self, kind: NestKind, entity: EntityId, access: Access, line: u32) {
        self.nests.push(Nest {
            kind,
            entity: Some(entity),
            access,
            generated_body: false,
            line,
        });
    }

    /// Entity whose body the cursor is in.
    pub(crate) fn scope_entity(&self) -> Option<EntityId> {
        self.nest().entity
    }

    pub(crate) fn outer(&self) -> Outer {
        match self.scope_entity() {
            Some(id) => Outer::Entity(id),
            None => Outer::Package(self.module.clone()),
        }
    }

    fn close_nest(&mut self, token: &Token) -> Result<()> {
        self.require_generated_body(token.line())?;
        let nest = self.nests.pop().ok_or_else(|| Error::syntax(token.line(), "Unexpected '}'"))?;
        self.cursor.require_symbol(";", "end of type declaration")?;

        match nest.kind {
            NestKind::Interface => self.pending_interface = nest.entity,
            NestKind::NativeInterface => self.pending_interface = None,
            _ => {}
        }
        Ok(())
    }

    /// Reject an annotation that cannot appear in the current nest.
    pub(crate) fn check_placement(&self, annotation: Annotation, line: u32) -> Result<()> {
        use Annotation as A;
        use NestKind as N;

        let kind = self.nest().kind;
        let message = match (annotation, kind) {
            (A::Class | A::Interface | A::Struct, N::Global) => return Ok(()),
            (A::Enum | A::Delegate, N::Global | N::Class) => return Ok(()),
            (A::Function, N::Class | N::NativeInterface) => return Ok(()),
            (A::Property, N::Class | N::Struct) => return Ok(()),
            (A::Function | A::Property, N::Global) => format!(
                "{} must occur inside the class or interface definition",
                annotation.name()
            ),
            (A::Function, N::Struct) => "USTRUCTs cannot contain UFUNCTIONs".to_string(),
            (A::Property, N::Interface | N::NativeInterface) => {
                "Interfaces are not allowed to have properties".to_string()
            }
            (A::Function, N::Interface) => {
                "Interface functions must be declared in the native interface class".to_string()
            }
            _ => format!("{} is not allowed in {}", annotation.name(), kind.description()),
        };
        Err(Error::semantic(line, message))
    }

    // ------------------------------------------------------------------------
    // Generated body and constructors
    // ------------------------------------------------------------------------

    fn compile_generated_body(&mut self, token: &Token) -> Result<()> {
        let name = token.text.as_str();
        self.cursor.require_symbol("(", name)?;
        self.cursor.skip_balanced("(", ")", name)?;
        self.cursor.match_symbol(";");

        let nest = self.nest().clone();
        if nest.kind == NestKind::Global {
            return Err(Error::semantic(
                token.line(),
                format!("{} must occur inside a class or struct definition", name),
            ));
        }
        if !nest.kind.generated_macros().contains(&name) {
            return Err(Error::semantic(
                token.line(),
                format!("{} is not allowed in {}", name, nest.kind.description()),
            ));
        }
        if nest.generated_body {
            return Err(Error::semantic(
                token.line(),
                format!("Duplicate {} in type body", name),
            ));
        }

        let legacy = name != "GENERATED_BODY";
        let body = BodyMacro {
            line: token.line(),
            legacy,
            access: nest.access,
        };
        let access = if legacy { Access::Public } else { nest.access };
        {
            let nest = self.nest_mut();
            nest.generated_body = true;
            nest.access = access;
        }

        if nest.kind == NestKind::Struct && access != Access::Public {
            let entity = nest.entity.map(|id| self.ctx.registry.get(id).name.clone());
            return Err(Error::semantic(
                token.line(),
                format!(
                    "The generated body of struct '{}' must be in public scope",
                    entity.unwrap_or_default()
                ),
            ));
        }

        let Some(id) = nest.entity else {
            return Ok(());
        };
        let entity = self.ctx.registry.get_mut(id);
        if let Some(data) = entity.struct_data_mut() {
            data.body = Some(body);
        } else if let Some(class) = entity.class_mut() {
            if nest.kind == NestKind::NativeInterface {
                class.native_body = Some(body);
            } else {
                class.body = Some(body);
            }
            if matches!(name, "GENERATED_UCLASS_BODY" | "GENERATED_UINTERFACE_BODY") {
                class.has_object_initializer_constructor = true;
            }
        }
        Ok(())
    }

    /// Fail if the current nest needs a generated body and has none yet.
    pub(crate) fn require_generated_body(&self, line: u32) -> Result<()> {
        let nest = self.nest();
        if nest.generated_body {
            return Ok(());
        }
        let message = match nest.kind {
            NestKind::Global => return Ok(()),
            NestKind::Class => "Expected a GENERATED_UCLASS_BODY() at the start of class",
            NestKind::Interface => "Expected a GENERATED_UINTERFACE_BODY() at the start of class",
            NestKind::NativeInterface => {
                "Expected a GENERATED_IINTERFACE_BODY() at the start of class"
            }
            NestKind::Struct => {
                let exported = nest.entity.is_some_and(|id| {
                    !self
                        .ctx
                        .registry
                        .get(id)
                        .struct_flags()
                        .contains(StructFlags::NO_EXPORT)
                });
                if !exported {
                    return Ok(());
                }
                "Expected a GENERATED_USTRUCT_BODY() at the start of struct"
            }
        };
        Err(Error::semantic(line, message))
    }

    /// Record `Name()` and `Name(const FObjectInitializer& X)` constructors of
    /// the class being parsed. The declaration itself is skipped afterwards.
    fn note_constructor(&mut self, token: &Token) {
        if self.nest().kind != NestKind::Class || !self.cursor.peek_symbol("(") {
            return;
        }
        let Some(class_id) = self.scope_entity() else {
            return;
        };
        if self.ctx.registry.get(class_id).name != token.text {
            return;
        }

        let mark = self.cursor.save();
        self.cursor.get_token();
        let default = self.cursor.match_symbol(")");
        let object_initializer = !default && self.match_object_initializer_param();
        self.cursor.rewind(mark);

        if let Some(class) = self.ctx.registry.get_mut(class_id).class_mut() {
            class.has_default_constructor |= default;
            class.has_object_initializer_constructor |= object_initializer;
        }
    }

    /// `const FObjectInitializer& [Name] [= FObjectInitializer::Get()] )`
    fn match_object_initializer_param(&mut self) -> bool {
        let c = &mut self.cursor;
        if !(c.match_identifier("const") && c.match_identifier("FObjectInitializer") && c.match_symbol("&")) {
            return false;
        }
        if c.peek().is_some_and(Token::is_identifier) {
            c.get_token();
        }
        if c.match_symbol("=")
            && !(c.match_identifier("FObjectInitializer")
                && c.match_symbol("::")
                && c.match_identifier("Get")
                && c.match_symbol("(")
                && c.match_symbol(")"))
        {
            return false;
        }
        c.match_symbol(")")
    }

    // ------------------------------------------------------------------------
    // Registration helpers
    // ------------------------------------------------------------------------

    pub(crate) fn naming(&self) -> &NamingConvention {
        &self.ctx.config.naming
    }

    /// Register an entity in the current scope and record it on the unit.
    pub(crate) fn register(
        &mut self,
        name: String,
        data: EntityData,
        raw_super: Option<String>,
        line: u32,
    ) -> Result<EntityId> {
        let id = self.ctx.registry.add(NewEntity {
            name,
            data,
            outer: self.outer(),
            raw_super,
            unit: self.unit,
            module: self.module.clone(),
            line,
        })?;
        self.ctx.unit_mut(self.unit).entities.push(id);
        Ok(id)
    }

    pub(crate) fn queue(&mut self, member: PendingMember) {
        self.pending.push(member);
    }

    /// Claim a function name in `owner`, rejecting a redeclaration.
    pub(crate) fn claim_function_name(&mut self, owner: EntityId, name: &str, line: u32) -> Result<()> {
        if self.function_names.entry(owner).or_default().insert(name.to_string()) {
            Ok(())
        } else {
            Err(Error::semantic(
                line,
                format!("Duplicate function '{}' in '{}'", name, self.ctx.registry.get(owner).name),
            ))
        }
    }

    /// Claim a property name in `owner`, rejecting a redeclaration.
    pub(crate) fn claim_property_name(&mut self, owner: EntityId, name: &str, line: u32) -> Result<()> {
        if self.property_names.entry(owner).or_default().insert(name.to_string()) {
            Ok(())
        } else {
            Err(Error::semantic(
                line,
                format!("Duplicate property '{}' in '{}'", name, self.ctx.registry.get(owner).name),
            ))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::module::unit::{SourceUnit, Visibility};
    use crate::registry::Category;

    pub(crate) fn context_with(text: &str) -> (RunContext, UnitId) {
        let mut ctx = RunContext::default();
        let id = UnitId::from_index(0);
        let mut unit = SourceUnit::new(id, PathBuf::from("Test.h"), "Game", Visibility::Public);
        unit.text = text.to_string();
        ctx.units.push(unit);
        (ctx, id)
    }

    pub(crate) fn parse(text: &str) -> Result<RunContext> {
        let (mut ctx, id) = context_with(text);
        HeaderParser::parse_unit(&mut ctx, id)?;
        Ok(ctx)
    }

    #[test]
    fn test_plain_header_produces_nothing() {
        let ctx = parse("#pragma once\nstruct FPlain { int x; };\nclass Foo : public Bar { void f() {} };\n").unwrap();
        assert!(ctx.registry.is_empty());
        assert!(ctx.pending[&UnitId::from_index(0)].is_empty());
    }

    #[test]
    fn test_property_at_global_scope() {
        let err = parse("UPROPERTY()\nint32 Loose;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
        assert_eq!(err.message, "UPROPERTY must occur inside the class or interface definition");
    }

    #[test]
    fn test_generated_body_outside_type() {
        let err = parse("GENERATED_BODY()").unwrap_err();
        assert!(err.message.contains("must occur inside a class or struct"));
    }

    #[test]
    fn test_missing_close_brace() {
        let err = parse("USTRUCT()\nstruct FOpen\n{\n GENERATED_BODY()\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert!(err.message.contains("FOpen"));
    }

    #[test]
    fn test_unannotated_members_skipped_inside_class() {
        let ctx = parse(
            "UCLASS()\nclass UThing\n{\n GENERATED_BODY()\n\
             int32 Plain;\n void Tick(float Delta) { Plain += 1; }\n\
             UPROPERTY()\n int32 Health;\n};",
        )
        .unwrap();
        let pending = &ctx.pending[&UnitId::from_index(0)];
        assert_eq!(pending.len(), 1);
        assert!(matches!(
            &pending[0],
            PendingMember::Property { property, .. } if property.name == "Health"
        ));
    }

    #[test]
    fn test_constructor_shapes() {
        let ctx = parse(
            "UCLASS()\nclass UThing\n{\n GENERATED_BODY()\n\
             UThing();\n UThing(const FObjectInitializer& ObjectInitializer = FObjectInitializer::Get());\n};",
        )
        .unwrap();
        let id = ctx.registry.find(Category::Class, "UThing").unwrap();
        let class = ctx.registry.get(id).class().unwrap();
        assert!(class.has_default_constructor);
        assert!(class.has_object_initializer_constructor);
    }

    #[test]
    fn test_editor_only_directive_tracking() {
        let ctx = parse(
            "USTRUCT()\nstruct FData\n{\n GENERATED_BODY()\n\
             #if WITH_EDITORONLY_DATA\n UPROPERTY()\n int32 EditorValue;\n#endif\n\
             UPROPERTY()\n int32 RuntimeValue;\n};",
        )
        .unwrap();
        let pending = &ctx.pending[&UnitId::from_index(0)];
        let flags: Vec<bool> = pending
            .iter()
            .map(|m| match m {
                PendingMember::Property { property, .. } => {
                    property.flags.contains(PropertyFlags::EDITOR_ONLY)
                }
                _ => false,
            })
            .collect();
        assert_eq!(flags, vec![true, false]);
    }
}
