//! `UENUM` declarations.

use crate::declare::dispatch::{EnumSpecifiers, ENUM_SPECIFIERS};
use crate::declare::specifiers::{parse_meta_block, parse_specifiers};
use crate::declare::{Annotation, HeaderParser};
use crate::error::{Error, Result};
use crate::parser::Token;
use crate::registry::{EntityData, EnumData, EnumForm, EnumValue, Metadata};

const MAX_ENUM_VALUE: i64 = u8::MAX as i64;
const CONTEXT: &str = "enum declaration";

impl HeaderParser<'_> {
    pub(crate) fn compile_enum(&mut self, token: &Token) -> Result<()> {
        self.check_placement(Annotation::Enum, token.line())?;

        let specifiers = parse_specifiers(&mut self.cursor, &token.text)?;
        let mut builder = EnumSpecifiers::default();
        ENUM_SPECIFIERS.apply(&mut builder, &specifiers)?;

        let (form, name, underlying) = if self.cursor.match_identifier("namespace") {
            let name = self.cursor.require_identifier(CONTEXT)?;
            self.cursor.require_symbol("{", CONTEXT)?;
            self.cursor.require_keyword("enum", CONTEXT)?;
            self.cursor.require_keyword("Type", CONTEXT)?;
            (EnumForm::Namespaced, name, None)
        } else {
            self.cursor.require_keyword("enum", CONTEXT)?;
            if self.cursor.match_identifier("class") {
                let name = self.cursor.require_identifier(CONTEXT)?;
                self.cursor.require_symbol(":", CONTEXT)?;
                let underlying = self.cursor.require_identifier(CONTEXT)?;
                if underlying.text != "uint8" {
                    return Err(Error::semantic(
                        underlying.line(),
                        format!(
                            "Invalid underlying type '{}' for enum class '{}', only uint8 is supported",
                            underlying.text, name.text
                        ),
                    ));
                }
                (EnumForm::EnumClass, name, Some(underlying.text))
            } else {
                (EnumForm::Regular, self.cursor.require_identifier(CONTEXT)?, None)
            }
        };
        let line = name.line();
        self.naming()
            .check_enum_name(&name.text)
            .map_err(|message| Error::semantic(line, message))?;

        self.cursor.require_symbol("{", CONTEXT)?;
        let mut metadata = builder.metadata;
        metadata.extend(&specifiers.meta);
        let values = self.parse_enum_values(&name.text, form, &mut metadata)?;

        self.cursor.require_symbol(";", CONTEXT)?;
        if form == EnumForm::Namespaced {
            self.cursor.require_symbol("}", CONTEXT)?;
            self.cursor.match_symbol(";");
        }

        let id = self.register(
            name.text,
            EntityData::Enum(EnumData {
                form,
                values,
                underlying,
            }),
            None,
            line,
        )?;
        self.ctx.registry.get_mut(id).metadata.extend(&metadata);
        Ok(())
    }

    /// `Tag [= Value] [UMETA(...)] ,` up to and including the closing brace.
    fn parse_enum_values(&mut self, enum_name: &str, form: EnumForm, metadata: &mut Metadata) -> Result<Vec<EnumValue>> {
        let max_tag = format!("{}_MAX", enum_name);
        let mut values: Vec<EnumValue> = Vec::new();
        let mut next: i64 = 0;

        while !self.cursor.match_symbol("}") {
            let tag = self.cursor.require_identifier(CONTEXT)?;
            let line = tag.line();
            if values.iter().any(|v| v.name == tag.text) {
                return Err(Error::semantic(line, format!("Duplicate enumeration tag {}", tag.text)));
            }
            if tag.text == max_tag {
                return Err(Error::semantic(
                    line,
                    format!(
                        "Illegal enumeration tag specified.  Conflicts with auto-generated tag '{}'",
                        max_tag
                    ),
                ));
            }

            let qualified = form.qualify(enum_name, &tag.text);
            if let Some(owner) = self.enum_with_tag(&qualified) {
                return Err(Error::semantic(
                    line,
                    format!("Enumeration tag '{}' already in use by enum '{}'", tag.text, owner),
                ));
            }

            let value = if self.cursor.match_symbol("=") {
                let value = self.cursor.require_int(CONTEXT)?;
                if value < next || value > MAX_ENUM_VALUE {
                    return Err(Error::semantic(
                        line,
                        "Explicitly specified enum values must be greater than any previous value and less than 256",
                    ));
                }
                value
            } else {
                next
            };
            if value > MAX_ENUM_VALUE {
                return Err(Error::semantic(line, "Exceeded maximum of 255 enumerators"));
            }

            for spacer in next..value {
                // Regular enums share one scope, so their spacers are
                // qualified by the enum name.
                let name = match form {
                    EnumForm::Regular => format!("{}::UnusedSpacer_{}", enum_name, spacer),
                    EnumForm::Namespaced | EnumForm::EnumClass => format!("UnusedSpacer_{}", spacer),
                };
                metadata.insert(format!("{}.Hidden", name), "");
                metadata.insert(format!("{}.Spacer", name), "");
                values.push(EnumValue {
                    name,
                    value: spacer as u8,
                });
            }
            values.push(EnumValue {
                name: tag.text.clone(),
                value: value as u8,
            });
            next = value + 1;

            if self.cursor.match_identifier("UMETA") {
                let mut tag_meta = Metadata::new();
                parse_meta_block(&mut self.cursor, &mut tag_meta, "UMETA")?;
                for (key, value) in tag_meta.iter() {
                    metadata.insert(format!("{}.{}", tag.text, key), value);
                }
            }

            if !self.cursor.match_symbol(",") {
                self.cursor.require_symbol("}", CONTEXT)?;
                break;
            }
        }

        if values.is_empty() {
            return Err(Error::semantic(
                self.cursor.line(),
                "Enumeration must contain at least one enumerator",
            ));
        }
        if next > MAX_ENUM_VALUE {
            return Err(Error::semantic(self.cursor.line(), "Exceeded maximum of 255 enumerators"));
        }
        values.push(EnumValue {
            name: max_tag,
            value: next as u8,
        });
        Ok(values)
    }

    /// Path of an already registered enum that declares `qualified`.
    fn enum_with_tag(&self, qualified: &str) -> Option<String> {
        self.ctx.registry.iter().find_map(|entity| {
            let data = entity.enum_data()?;
            data.values
                .iter()
                .any(|v| data.qualified_name(&entity.name, &v.name) == qualified)
                .then(|| format!("/Script/{}.{}", entity.module, entity.name))
        })
    }
}
