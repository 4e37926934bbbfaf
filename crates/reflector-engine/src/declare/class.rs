//! `UCLASS` and `UINTERFACE` declarations.

use log::debug;

use crate::declare::dispatch::{ClassSpecifiers, CLASS_SPECIFIERS, INTERFACE_SPECIFIERS};
use crate::declare::specifiers::parse_specifiers;
use crate::declare::{Access, Annotation, HeaderParser, NestKind};
use crate::error::{Error, Result};
use crate::parser::Token;
use crate::preparser::scan::class_header;
use crate::preparser::SkeletonClass;
use crate::registry::{
    Category, ClassData, ClassFlags, EntityData, EntityId, ImplementedInterface, NewEntity,
};
use crate::resolve::TypeResolver;

/// Root of every interface `U` class.
const INTERFACE_ROOT: &str = "UInterface";

impl HeaderParser<'_> {
    pub(crate) fn compile_class(&mut self, token: &Token, is_interface: bool) -> Result<()> {
        let annotation = if is_interface {
            Annotation::Interface
        } else {
            Annotation::Class
        };
        self.check_placement(annotation, token.line())?;

        let specifiers = parse_specifiers(&mut self.cursor, &token.text)?;
        let header = class_header(&mut self.cursor, is_interface)?;
        self.cursor.require_symbol("{", "class declaration")?;

        let id = self.class_entity(&header)?;
        self.ctx.unit_mut(self.unit).entities.push(id);
        TypeResolver::resolve_super(&mut self.ctx.registry, id, header.line)?;

        let table = if is_interface {
            &*INTERFACE_SPECIFIERS
        } else {
            &*CLASS_SPECIFIERS
        };
        let mut builder = ClassSpecifiers::default();
        table.apply(&mut builder, &specifiers)?;

        let data = self.class_data(id, &header, &builder, is_interface)?;
        let mut metadata = builder.list_metadata();
        metadata.extend(&specifiers.meta);

        let entity = self.ctx.registry.get_mut(id);
        if let Some(class) = entity.class_mut() {
            let constructors = (class.has_default_constructor, class.has_object_initializer_constructor);
            *class = data;
            class.has_default_constructor = constructors.0;
            class.has_object_initializer_constructor = constructors.1;
        }
        entity.metadata.extend(&metadata);

        let kind = if is_interface {
            NestKind::Interface
        } else {
            NestKind::Class
        };
        self.push_nest(kind, id, Access::Private, header.line);
        debug!("class '{}' at line {}", header.name, header.line);
        Ok(())
    }

    /// The skeleton registered by the pre-parser, or a fresh entity.
    fn class_entity(&mut self, header: &SkeletonClass) -> Result<EntityId> {
        match self.ctx.registry.find(Category::Class, &header.name) {
            Some(id) if self.ctx.registry.get(id).unit == self.unit => {
                let entity = self.ctx.registry.get(id);
                if self.ctx.unit(self.unit).entities.contains(&id) || entity.complete {
                    return Err(Error::semantic(
                        header.line,
                        format!("Duplicate class '{}'", header.name),
                    ));
                }
                Ok(id)
            }
            Some(id) => {
                let previous = self.ctx.registry.get(id);
                Err(Error::semantic(
                    header.line,
                    format!(
                        "Duplicate class '{}' (previously declared in module '{}' at line {})",
                        header.name, previous.module, previous.line
                    ),
                ))
            }
            None => self.ctx.registry.add(NewEntity {
                name: header.name.clone(),
                data: EntityData::Class(ClassData::default()),
                outer: self.outer(),
                raw_super: header.raw_super.clone(),
                unit: self.unit,
                module: self.module.clone(),
                line: header.line,
            }),
        }
    }

    /// Apply specifiers on top of what the super class passes down.
    fn class_data(
        &self,
        id: EntityId,
        header: &SkeletonClass,
        builder: &ClassSpecifiers,
        is_interface: bool,
    ) -> Result<ClassData> {
        let registry = &self.ctx.registry;
        let naming = self.naming();
        let line = header.line;
        let super_entity = registry.get(id).super_entity.map(|s| registry.get(s));
        let super_flags = super_entity.map_or(ClassFlags::EMPTY, |s| s.class_flags());
        let super_class = super_entity.and_then(|s| s.class());

        let mut flags = super_flags.intersection(ClassFlags::INHERIT);
        flags |= builder.flags;
        flags = flags.difference(builder.cleared);
        flags |= ClassFlags::NATIVE;
        if is_interface {
            flags |= ClassFlags::INTERFACE | ClassFlags::ABSTRACT;
        }
        if header.api.is_some() {
            flags |= ClassFlags::REQUIRED_API;
        }

        if builder.flags.contains(ClassFlags::MINIMAL_API) && header.api.is_some() {
            return Err(Error::semantic(
                line,
                "MinimalAPI cannot be specified when the class is fully exported using a MODULENAME_API macro",
            ));
        }
        if builder.placeable && !super_flags.contains(ClassFlags::NOT_PLACEABLE) {
            return Err(Error::semantic(
                line,
                "The placeable specifier is deprecated. Classes are assumed to be placeable by default.",
            ));
        }

        if let Some(super_entity) = super_entity {
            if super_entity.is_deprecated() && !builder.flags.contains(ClassFlags::DEPRECATED) {
                return Err(Error::semantic(
                    line,
                    format!(
                        "Class '{}' must be marked deprecated because its super class '{}' is deprecated",
                        header.name, super_entity.name
                    ),
                ));
            }
            if is_interface && super_entity.name != INTERFACE_ROOT && !super_entity.is_interface() {
                return Err(Error::semantic(
                    line,
                    format!(
                        "Interface class '{}' cannot inherit from non interface class '{}'",
                        header.name, super_entity.name
                    ),
                ));
            }
        }

        let lineage = registry.lineage(id);
        if builder.flags.contains(ClassFlags::EDIT_INLINE_NEW)
            && naming
                .prefix_overrides
                .iter()
                .any(|o| lineage.contains(&o.root.as_str()))
        {
            return Err(Error::semantic(
                line,
                "Invalid class attribute: Creating actor instances via the property window is not allowed",
            ));
        }

        let expected = naming.expected_class_prefix(lineage.iter().copied());
        naming
            .check_class_name(&header.name, expected)
            .map_err(|message| Error::semantic(line, message))?;

        let super_config = super_class.and_then(|c| c.config_name.clone());
        let config_name = match builder.config.as_deref() {
            Some(name) if name.eq_ignore_ascii_case("inherit") => {
                Some(super_config.ok_or_else(|| {
                    Error::semantic(
                        line,
                        format!(
                            "Cannot inherit config filename for '{}': its super class has none",
                            header.name
                        ),
                    )
                })?)
            }
            Some(name) => Some(name.to_string()),
            None => super_config,
        };
        if config_name.is_some() {
            flags |= ClassFlags::CONFIG;
        }
        for (flag, name) in [
            (ClassFlags::DEFAULT_CONFIG, "DefaultConfig"),
            (ClassFlags::GLOBAL_USER_CONFIG, "GlobalUserConfig"),
        ] {
            if builder.flags.contains(flag) && config_name.is_none() {
                return Err(Error::semantic(
                    line,
                    format!(
                        "Classes with {} must specify a configuration file with the Config=(NAME) keyword",
                        name
                    ),
                ));
            }
        }

        let within = match &builder.within {
            Some(name) => Some(registry.find(Category::Class, name).ok_or_else(|| {
                Error::semantic(line, format!("Within class '{}' not found", name))
            })?),
            None => super_class.and_then(|c| c.within),
        };

        let mut interfaces = Vec::new();
        for base in header.bases.iter().skip(1) {
            let Some(class_name) = naming.interface_class_name(base) else {
                continue;
            };
            match registry.find(Category::Class, &class_name) {
                Some(interface) if registry.get(interface).is_interface() => {
                    interfaces.push(ImplementedInterface {
                        class: interface,
                        native: true,
                    });
                }
                Some(_) => {
                    return Err(Error::semantic(
                        line,
                        format!("Implements: Class '{}' is not an interface", class_name),
                    ));
                }
                None => debug!("base '{}' of '{}' is not a reflected interface", base, header.name),
            }
        }

        Ok(ClassData {
            flags,
            config_name,
            within,
            interfaces,
            api: header.api.clone(),
            ..Default::default()
        })
    }

    /// `class [API] IFoo [: bases] {` following a `UINTERFACE` block. Returns
    /// false, with the cursor untouched, for any other `class` declaration.
    pub(crate) fn compile_native_interface(&mut self, token: &Token) -> Result<bool> {
        let Some(interface) = self.pending_interface else {
            return Ok(false);
        };
        if self.nest().kind != NestKind::Global {
            return Ok(false);
        }
        let expected = self
            .naming()
            .native_interface_name(&self.ctx.registry.get(interface).name);

        let mark = self.cursor.save();
        let mut name = self.cursor.get_token();
        if name.as_ref().is_some_and(|t| t.text.ends_with("_API")) {
            name = self.cursor.get_token();
        }
        let declares_body = name.as_ref().is_some_and(|t| t.matches(&expected))
            && (self.cursor.peek_symbol("{") || self.cursor.peek_symbol(":"));
        if !declares_body {
            self.cursor.rewind(mark);
            return Ok(false);
        }

        if self.cursor.match_symbol(":") {
            while !self.cursor.peek_symbol("{") {
                self.cursor.require_token("native interface declaration")?;
            }
        }
        self.cursor.require_symbol("{", "native interface declaration")?;
        self.push_nest(NestKind::NativeInterface, interface, Access::Private, token.line());
        self.pending_interface = None;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::declare::tests::parse;
    use crate::error::ErrorKind;
    use crate::registry::{Category, ClassFlags};

    const BASE: &str = "UCLASS(config=Game, transient)\nclass UBase\n{\n GENERATED_BODY()\n};\n";

    #[test]
    fn test_flags_inherited_then_cleared() {
        let ctx = parse(&format!(
            "{}UCLASS(nonTransient)\nclass UChild : public UBase\n{{\n GENERATED_BODY()\n}};\n",
            BASE
        ))
        .unwrap();
        let child = ctx.registry.find(Category::Class, "UChild").unwrap();
        let class = ctx.registry.get(child).class().unwrap();
        assert!(!class.flags.contains(ClassFlags::TRANSIENT));
        assert!(class.flags.contains(ClassFlags::CONFIG));
        assert_eq!(class.config_name.as_deref(), Some("Game"));
        assert_eq!(ctx.registry.lineage(child), vec!["UChild", "UBase"]);
    }

    #[test]
    fn test_config_inherit() {
        let ctx = parse(BASE).unwrap();
        let base = ctx.registry.find(Category::Class, "UBase").unwrap();
        let class = ctx.registry.get(base).class().unwrap();
        assert_eq!(class.config_name.as_deref(), Some("Game"));
        assert!(class.flags.contains(ClassFlags::CONFIG | ClassFlags::TRANSIENT | ClassFlags::NATIVE));
    }

    #[test]
    fn test_default_config_requires_config() {
        let err = parse("UCLASS(defaultconfig)\nclass UThing\n{\n GENERATED_BODY()\n};").unwrap_err();
        assert!(err.message.starts_with("Classes with DefaultConfig"));
    }

    #[test]
    fn test_minimal_api_with_export_macro() {
        let err = parse("UCLASS(MinimalAPI)\nclass GAME_API UThing\n{\n GENERATED_BODY()\n};").unwrap_err();
        assert!(err.message.starts_with("MinimalAPI cannot be specified"));
    }

    #[test]
    fn test_placeable_is_deprecated() {
        let err = parse("UCLASS(placeable)\nclass UThing\n{\n GENERATED_BODY()\n};").unwrap_err();
        assert!(err.message.starts_with("The placeable specifier is deprecated"));
    }

    #[test]
    fn test_depends_on_rejected() {
        let err = parse("UCLASS(dependsOn=UOther)\nclass UThing\n{\n GENERATED_BODY()\n};").unwrap_err();
        assert!(err.message.starts_with("The dependsOn specifier is deprecated"));
    }

    #[test]
    fn test_missing_generated_body() {
        let err = parse("UCLASS()\nclass UThing\n{\n UPROPERTY()\n int32 Value;\n};").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
        assert_eq!(err.message, "Expected a GENERATED_UCLASS_BODY() at the start of class");
    }

    #[test]
    fn test_prefix_check() {
        let err = parse("UCLASS()\nclass Thing\n{\n GENERATED_BODY()\n};").unwrap_err();
        assert_eq!(err.message, "Class name 'Thing' is invalid, should be identified as 'UThing'");
    }

    #[test]
    fn test_interface_pair() {
        let ctx = parse(
            "UINTERFACE(MinimalAPI)\nclass UDamageable\n{\n GENERATED_BODY()\n};\n\
             class IDamageable\n{\n GENERATED_BODY()\npublic:\n\
             UFUNCTION(BlueprintNativeEvent)\n void TakeHit(float Amount);\n};\n",
        )
        .unwrap();
        let id = ctx.registry.find(Category::Class, "UDamageable").unwrap();
        assert!(ctx.registry.get(id).is_interface());
        assert_eq!(ctx.pending[&ctx.registry.get(id).unit].len(), 1);
    }

    #[test]
    fn test_interface_without_native_class() {
        let err = parse("UINTERFACE()\nclass UDamageable\n{\n GENERATED_BODY()\n};\n").unwrap_err();
        assert_eq!(
            err.message,
            "Interface 'UDamageable' is missing its native 'IDamageable' declaration"
        );
    }

    #[test]
    fn test_interface_properties_rejected() {
        let err = parse(
            "UINTERFACE()\nclass UDamageable\n{\n GENERATED_BODY()\n};\n\
             class IDamageable\n{\n GENERATED_BODY()\n UPROPERTY()\n int32 Health;\n};\n",
        )
        .unwrap_err();
        assert_eq!(err.message, "Interfaces are not allowed to have properties");
    }
}
