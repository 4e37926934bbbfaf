//! Run configuration.
//!
//! Everything that is policy rather than algorithm lives here as plain data:
//! the naming prefix conventions with their grandfathered exception lists,
//! the conditional-compilation policy used by the pre-parser, and the
//! generator limits. All structs deserialize from TOML with defaults for
//! omitted fields.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading configuration from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub naming: NamingConvention,
    pub preprocessor: PreprocessorPolicy,
    pub generator: GeneratorConfig,
}

impl RunConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

// ============================================================================
// Naming
// ============================================================================

/// A class whose descendants use a different prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixOverride {
    pub root: String,
    pub prefix: String,
}

/// Category name prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConvention {
    pub class_prefix: String,
    pub prefix_overrides: Vec<PrefixOverride>,
    pub interface_prefix: String,
    pub struct_prefix: String,
    /// Enum names are unchecked when unset.
    pub enum_prefix: Option<String>,
    pub delegate_prefix: String,
    pub template_prefix: String,
    /// Struct names (without prefix) that take the template prefix.
    pub template_structs: Vec<String>,
    /// Struct names that take no prefix at all.
    pub unprefixed_structs: Vec<String>,
    pub deprecated_label: String,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            class_prefix: "U".to_string(),
            prefix_overrides: vec![PrefixOverride {
                root: "AActor".to_string(),
                prefix: "A".to_string(),
            }],
            interface_prefix: "I".to_string(),
            struct_prefix: "F".to_string(),
            enum_prefix: None,
            delegate_prefix: "F".to_string(),
            template_prefix: "T".to_string(),
            template_structs: [
                "IndirectArray",
                "BitArray",
                "SparseArray",
                "Set",
                "Map",
                "MultiMap",
                "SharedPtr",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            unprefixed_structs: ["uint64", "uint32", "double"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            deprecated_label: "DEPRECATED_".to_string(),
        }
    }
}

impl NamingConvention {
    /// Prefix a class must carry given its ancestry, nearest first. The list
    /// should start with the class itself.
    pub fn expected_class_prefix<'a>(&self, lineage: impl IntoIterator<Item = &'a str>) -> &str {
        for name in lineage {
            if let Some(o) = self.prefix_overrides.iter().find(|o| o.root == name) {
                return &o.prefix;
            }
        }
        &self.class_prefix
    }

    /// Every prefix a class may legally carry.
    pub fn class_prefixes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.class_prefix.as_str())
            .chain(self.prefix_overrides.iter().map(|o| o.prefix.as_str()))
    }

    pub fn is_deprecated_name(&self, name: &str) -> bool {
        !self.deprecated_label.is_empty() && name.contains(self.deprecated_label.as_str())
    }

    pub fn check_class_name(&self, name: &str, expected_prefix: &str) -> Result<(), String> {
        if self.is_deprecated_name(name) {
            return Ok(());
        }
        let stripped = self.strip_prefix_of(name, self.class_prefixes());
        if name.starts_with(expected_prefix) && stripped.len() < name.len() {
            return Ok(());
        }
        Err(format!(
            "Class name '{}' is invalid, should be identified as '{}{}'",
            name, expected_prefix, stripped
        ))
    }

    pub fn check_struct_name(&self, name: &str) -> Result<(), String> {
        if self.unprefixed_structs.iter().any(|s| s == name) {
            return Ok(());
        }
        let prefixes = [self.struct_prefix.as_str(), self.template_prefix.as_str()];
        let stripped = self.strip_prefix_of(name, prefixes);
        let has_prefix = stripped.len() < name.len();
        let expected = if self.template_structs.iter().any(|s| s == stripped) {
            &self.template_prefix
        } else {
            &self.struct_prefix
        };
        if has_prefix && name.starts_with(expected.as_str()) {
            Ok(())
        } else if has_prefix {
            Err(format!(
                "Struct '{}' has an invalid prefix, expecting '{}{}'",
                name, expected, stripped
            ))
        } else {
            Err(format!(
                "Struct '{}' is missing a valid prefix, expecting '{}{}'",
                name, expected, stripped
            ))
        }
    }

    pub fn check_enum_name(&self, name: &str) -> Result<(), String> {
        match &self.enum_prefix {
            Some(prefix) if !name.starts_with(prefix.as_str()) => Err(format!(
                "Enum '{}' is missing a valid prefix, expecting '{}{}'",
                name, prefix, name
            )),
            _ => Ok(()),
        }
    }

    /// Delegate type names carry the delegate prefix; the stored signature
    /// name drops it.
    pub fn delegate_signature_name(&self, name: &str) -> Result<String, String> {
        match name.strip_prefix(self.delegate_prefix.as_str()) {
            Some(rest) if !rest.is_empty() => Ok(format!("{}__DelegateSignature", rest)),
            _ => Err(format!(
                "Delegate type declarations must start with {}",
                self.delegate_prefix
            )),
        }
    }

    /// `IFoo` -> `UFoo`.
    pub fn interface_class_name(&self, native: &str) -> Option<String> {
        native
            .strip_prefix(self.interface_prefix.as_str())
            .filter(|rest| !rest.is_empty())
            .map(|rest| format!("{}{}", self.class_prefix, rest))
    }

    /// `UFoo` -> `IFoo`.
    pub fn native_interface_name(&self, class_name: &str) -> String {
        let rest = class_name
            .strip_prefix(self.class_prefix.as_str())
            .unwrap_or(class_name);
        format!("{}{}", self.interface_prefix, rest)
    }

    fn strip_prefix_of<'a, 'p>(
        &self,
        name: &'a str,
        prefixes: impl IntoIterator<Item = &'p str>,
    ) -> &'a str {
        for prefix in prefixes {
            if prefix.is_empty() {
                continue;
            }
            if let Some(rest) = name.strip_prefix(prefix) {
                if !rest.is_empty() {
                    return rest;
                }
            }
        }
        name
    }
}

// ============================================================================
// Preprocessor
// ============================================================================

/// What the pre-parser does with a conditional region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionalAction {
    /// `#if` branch discarded, `#else` branch kept.
    KeepElse,
    /// `#if` branch kept, `#else` branch discarded.
    KeepIf,
    /// Body and directive lines kept verbatim; `#else` is rejected.
    Verbatim,
    /// Both branches discarded.
    Discard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalRule {
    pub condition: String,
    pub action: ConditionalAction,
}

/// Data-driven conditional policy. Conditions not listed are discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessorPolicy {
    pub rules: Vec<ConditionalRule>,
    /// Verbatim conditions whose bodies hold editor-only data members.
    pub editor_only_data: Vec<String>,
    /// Verbatim conditions whose bodies hold editor-only functions.
    pub editor_only_functions: Vec<String>,
}

impl Default for PreprocessorPolicy {
    fn default() -> Self {
        let rule = |condition: &str, action| ConditionalRule {
            condition: condition.to_string(),
            action,
        };
        Self {
            rules: vec![
                rule("CPP", ConditionalAction::KeepElse),
                rule("!CPP", ConditionalAction::KeepIf),
                rule("WITH_EDITORONLY_DATA", ConditionalAction::Verbatim),
                rule("WITH_EDITOR", ConditionalAction::Verbatim),
            ],
            editor_only_data: vec!["WITH_EDITORONLY_DATA".to_string()],
            editor_only_functions: vec!["WITH_EDITOR".to_string()],
        }
    }
}

impl PreprocessorPolicy {
    /// Action for an `#if` condition. Whitespace is not significant.
    pub fn action_for(&self, condition: &str) -> ConditionalAction {
        let normalized = normalize_condition(condition);
        self.rules
            .iter()
            .find(|rule| normalize_condition(&rule.condition) == normalized)
            .map_or(ConditionalAction::Discard, |rule| rule.action)
    }

    pub fn is_editor_only_data(&self, condition: &str) -> bool {
        let normalized = normalize_condition(condition);
        self.editor_only_data
            .iter()
            .any(|c| normalize_condition(c) == normalized)
    }

    pub fn is_editor_only_functions(&self, condition: &str) -> bool {
        let normalized = normalize_condition(condition);
        self.editor_only_functions
            .iter()
            .any(|c| normalize_condition(c) == normalized)
    }
}

pub fn normalize_condition(condition: &str) -> String {
    condition.chars().filter(|c| !c.is_whitespace()).collect()
}

// ============================================================================
// Generator
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub max_lines_per_chunk: usize,
    /// Export macro used for cross-module declarations. Defaults to
    /// `<MODULE>_API`.
    pub api_macro: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_lines_per_chunk: 30000,
            api_macro: None,
        }
    }
}

impl GeneratorConfig {
    pub fn api_macro_for(&self, module: &str) -> String {
        self.api_macro
            .clone()
            .unwrap_or_else(|| format!("{}_API", module.to_uppercase()))
    }
}

// ============================================================================
// Module descriptor
// ============================================================================

/// Describes one module batch handed to the compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleDescriptor {
    pub name: String,
    pub base_directory: PathBuf,
    pub public_headers: Vec<PathBuf>,
    pub private_headers: Vec<PathBuf>,
    pub output_directory: PathBuf,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Whether a path is listed as a public header.
    pub fn is_public(&self, path: &Path) -> bool {
        self.public_headers
            .iter()
            .any(|p| p == path || self.base_directory.join(p) == path)
    }

    pub fn is_private(&self, path: &Path) -> bool {
        self.private_headers
            .iter()
            .any(|p| p == path || self.base_directory.join(p) == path)
    }
}
