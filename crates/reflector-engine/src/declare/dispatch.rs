//! Specifier dispatch tables.
//!
//! Each annotation category has a table of `(name, handler)` pairs. Names
//! are matched case-insensitively. A handler records the specifier on the
//! category's builder; checks that depend on more than one specifier run
//! after the whole block has been applied.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::declare::specifiers::{Specifier, SpecifierList};
use crate::error::{Error, Result};
use crate::registry::{ClassFlags, FunctionFlags, Metadata, PropertyFlags, StructFlags};

pub type Handler<B> = fn(&mut B, &Specifier) -> Result<()>;

/// Case-insensitive specifier table for one category.
pub struct DispatchTable<B: 'static> {
    category: &'static str,
    handlers: FxHashMap<String, Handler<B>>,
}

impl<B> DispatchTable<B> {
    pub fn new(category: &'static str, entries: &[(&'static str, Handler<B>)]) -> Self {
        let handlers = entries
            .iter()
            .map(|(name, handler)| (name.to_ascii_lowercase(), *handler))
            .collect();
        Self { category, handlers }
    }

    /// Run every specifier of `list` through its handler.
    pub fn apply(&self, builder: &mut B, list: &SpecifierList) -> Result<()> {
        for spec in &list.specifiers {
            let handler = self
                .handlers
                .get(&spec.key.to_ascii_lowercase())
                .ok_or_else(|| {
                    Error::semantic(
                        spec.line,
                        format!("Unknown {} specifier '{}'", self.category, spec.key),
                    )
                })?;
            handler(builder, spec)?;
        }
        Ok(())
    }
}

macro_rules! insert_flags {
    ($name:ident, $builder:ty, $flags:expr) => {
        fn $name(builder: &mut $builder, _: &Specifier) -> Result<()> {
            builder.flags.insert($flags);
            Ok(())
        }
    };
}

macro_rules! set_meta {
    ($name:ident, $builder:ty, $key:expr, $value:expr) => {
        fn $name(builder: &mut $builder, _: &Specifier) -> Result<()> {
            builder.metadata.insert($key, $value);
            Ok(())
        }
    };
}

fn deprecated_specifier(spec: &Specifier, message: &str) -> Result<()> {
    Err(Error::semantic(spec.line, message.to_string()))
}

fn list_values(spec: &Specifier) -> Result<Vec<String>> {
    if spec.values.is_empty() {
        return Err(Error::semantic(
            spec.line,
            format!("Missing value for specifier '{}'", spec.key),
        ));
    }
    Ok(spec.values.clone())
}

// ============================================================================
// Classes and interfaces
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ClassSpecifiers {
    pub flags: ClassFlags,
    /// Flags removed after the super class's flags are inherited.
    pub cleared: ClassFlags,
    pub within: Option<String>,
    pub config: Option<String>,
    pub placeable: bool,
    pub metadata: Metadata,
    pub show_categories: Vec<String>,
    pub hide_categories: Vec<String>,
    pub show_functions: Vec<String>,
    pub hide_functions: Vec<String>,
    pub auto_expand_categories: Vec<String>,
    pub auto_collapse_categories: Vec<String>,
    pub dont_auto_collapse_categories: Vec<String>,
    pub class_group_names: Vec<String>,
}

impl ClassSpecifiers {
    /// Fold the category lists into metadata.
    pub fn list_metadata(&self) -> Metadata {
        let mut metadata = self.metadata.clone();
        let lists = [
            ("ShowCategories", &self.show_categories),
            ("HideCategories", &self.hide_categories),
            ("ShowFunctions", &self.show_functions),
            ("HideFunctions", &self.hide_functions),
            ("AutoExpandCategories", &self.auto_expand_categories),
            ("AutoCollapseCategories", &self.auto_collapse_categories),
            ("DontAutoCollapseCategories", &self.dont_auto_collapse_categories),
            ("ClassGroupNames", &self.class_group_names),
        ];
        for (key, values) in lists {
            if !values.is_empty() {
                metadata.insert(key, values.join(" "));
            }
        }
        metadata
    }
}

insert_flags!(class_noexport, ClassSpecifiers, ClassFlags::NO_EXPORT);
insert_flags!(class_intrinsic, ClassSpecifiers, ClassFlags::INTRINSIC);
insert_flags!(class_editinlinenew, ClassSpecifiers, ClassFlags::EDIT_INLINE_NEW);
insert_flags!(class_notplaceable, ClassSpecifiers, ClassFlags::NOT_PLACEABLE);
insert_flags!(class_defaulttoinstanced, ClassSpecifiers, ClassFlags::DEFAULT_TO_INSTANCED);
insert_flags!(class_hidedropdown, ClassSpecifiers, ClassFlags::HIDE_DROP_DOWN);
insert_flags!(class_minimalapi, ClassSpecifiers, ClassFlags::MINIMAL_API);
insert_flags!(class_const, ClassSpecifiers, ClassFlags::CONST);
insert_flags!(class_perobjectconfig, ClassSpecifiers, ClassFlags::PER_OBJECT_CONFIG);
insert_flags!(
    class_configdonotcheckdefaults,
    ClassSpecifiers,
    ClassFlags::CONFIG_DO_NOT_CHECK_DEFAULTS
);
insert_flags!(class_abstract, ClassSpecifiers, ClassFlags::ABSTRACT);
insert_flags!(
    class_deprecated,
    ClassSpecifiers,
    ClassFlags::DEPRECATED | ClassFlags::NOT_PLACEABLE
);
insert_flags!(class_transient, ClassSpecifiers, ClassFlags::TRANSIENT);
insert_flags!(class_customconstructor, ClassSpecifiers, ClassFlags::CUSTOM_CONSTRUCTOR);
insert_flags!(class_defaultconfig, ClassSpecifiers, ClassFlags::DEFAULT_CONFIG);
insert_flags!(class_globaluserconfig, ClassSpecifiers, ClassFlags::GLOBAL_USER_CONFIG);
insert_flags!(class_collapsecategories, ClassSpecifiers, ClassFlags::COLLAPSE_CATEGORIES);
set_meta!(class_advancedclassdisplay, ClassSpecifiers, "AdvancedClassDisplay", "true");
set_meta!(class_conversionroot, ClassSpecifiers, "IsConversionRoot", "true");
set_meta!(class_blueprintable, ClassSpecifiers, "IsBlueprintBase", "true");
set_meta!(class_notblueprintable, ClassSpecifiers, "IsBlueprintBase", "false");
set_meta!(class_blueprinttype, ClassSpecifiers, "BlueprintType", "true");
set_meta!(class_notblueprinttype, ClassSpecifiers, "BlueprintType", "false");

fn class_noteditinlinenew(builder: &mut ClassSpecifiers, _: &Specifier) -> Result<()> {
    builder.flags.remove(ClassFlags::EDIT_INLINE_NEW);
    builder.cleared.insert(ClassFlags::EDIT_INLINE_NEW);
    Ok(())
}

fn class_placeable(builder: &mut ClassSpecifiers, _: &Specifier) -> Result<()> {
    builder.placeable = true;
    builder.cleared.insert(ClassFlags::NOT_PLACEABLE);
    Ok(())
}

fn class_nontransient(builder: &mut ClassSpecifiers, _: &Specifier) -> Result<()> {
    builder.flags.remove(ClassFlags::TRANSIENT);
    builder.cleared.insert(ClassFlags::TRANSIENT);
    Ok(())
}

fn class_dontcollapsecategories(builder: &mut ClassSpecifiers, _: &Specifier) -> Result<()> {
    builder.flags.remove(ClassFlags::COLLAPSE_CATEGORIES);
    builder.cleared.insert(ClassFlags::COLLAPSE_CATEGORIES);
    Ok(())
}

fn class_dependson(_: &mut ClassSpecifiers, spec: &Specifier) -> Result<()> {
    deprecated_specifier(
        spec,
        "The dependsOn specifier is deprecated. Please use #include \"ClassHeaderFilename.h\" instead.",
    )
}

fn class_within(builder: &mut ClassSpecifiers, spec: &Specifier) -> Result<()> {
    builder.within = Some(spec.single_value()?.to_string());
    Ok(())
}

fn class_config(builder: &mut ClassSpecifiers, spec: &Specifier) -> Result<()> {
    builder.config = Some(spec.single_value()?.to_string());
    Ok(())
}

fn class_showcategories(builder: &mut ClassSpecifiers, spec: &Specifier) -> Result<()> {
    let values = list_values(spec)?;
    builder.hide_categories.retain(|c| !values.contains(c));
    builder.show_categories.extend(values);
    Ok(())
}

fn class_hidecategories(builder: &mut ClassSpecifiers, spec: &Specifier) -> Result<()> {
    builder.hide_categories.extend(list_values(spec)?);
    Ok(())
}

fn class_showfunctions(builder: &mut ClassSpecifiers, spec: &Specifier) -> Result<()> {
    let values = list_values(spec)?;
    builder.hide_functions.retain(|f| !values.contains(f));
    builder.show_functions.extend(values);
    Ok(())
}

fn class_hidefunctions(builder: &mut ClassSpecifiers, spec: &Specifier) -> Result<()> {
    builder.hide_functions.extend(list_values(spec)?);
    Ok(())
}

fn class_classgroup(builder: &mut ClassSpecifiers, spec: &Specifier) -> Result<()> {
    builder.class_group_names.extend(list_values(spec)?);
    Ok(())
}

fn class_autoexpandcategories(builder: &mut ClassSpecifiers, spec: &Specifier) -> Result<()> {
    let values = list_values(spec)?;
    builder.auto_collapse_categories.retain(|c| !values.contains(c));
    builder.auto_expand_categories.extend(values);
    Ok(())
}

fn class_autocollapsecategories(builder: &mut ClassSpecifiers, spec: &Specifier) -> Result<()> {
    let values = list_values(spec)?;
    builder.auto_expand_categories.retain(|c| !values.contains(c));
    builder.auto_collapse_categories.extend(values);
    Ok(())
}

fn class_dontautocollapsecategories(builder: &mut ClassSpecifiers, spec: &Specifier) -> Result<()> {
    let values = list_values(spec)?;
    builder.auto_collapse_categories.retain(|c| !values.contains(c));
    builder.dont_auto_collapse_categories.extend(values);
    Ok(())
}

pub static CLASS_SPECIFIERS: Lazy<DispatchTable<ClassSpecifiers>> = Lazy::new(|| {
    DispatchTable::<ClassSpecifiers>::new(
        "class",
        &[
            ("noexport", class_noexport),
            ("intrinsic", class_intrinsic),
            ("within", class_within),
            ("editinlinenew", class_editinlinenew),
            ("noteditinlinenew", class_noteditinlinenew),
            ("placeable", class_placeable),
            ("notplaceable", class_notplaceable),
            ("defaulttoinstanced", class_defaulttoinstanced),
            ("hidedropdown", class_hidedropdown),
            ("dependson", class_dependson),
            ("minimalapi", class_minimalapi),
            ("const", class_const),
            ("perobjectconfig", class_perobjectconfig),
            ("configdonotcheckdefaults", class_configdonotcheckdefaults),
            ("abstract", class_abstract),
            ("deprecated", class_deprecated),
            ("transient", class_transient),
            ("nontransient", class_nontransient),
            ("customconstructor", class_customconstructor),
            ("config", class_config),
            ("defaultconfig", class_defaultconfig),
            ("globaluserconfig", class_globaluserconfig),
            ("showcategories", class_showcategories),
            ("hidecategories", class_hidecategories),
            ("showfunctions", class_showfunctions),
            ("hidefunctions", class_hidefunctions),
            ("classgroup", class_classgroup),
            ("autoexpandcategories", class_autoexpandcategories),
            ("autocollapsecategories", class_autocollapsecategories),
            ("dontautocollapsecategories", class_dontautocollapsecategories),
            ("collapsecategories", class_collapsecategories),
            ("dontcollapsecategories", class_dontcollapsecategories),
            ("advancedclassdisplay", class_advancedclassdisplay),
            ("conversionroot", class_conversionroot),
            ("blueprintable", class_blueprintable),
            ("notblueprintable", class_notblueprintable),
            ("blueprinttype", class_blueprinttype),
            ("notblueprinttype", class_notblueprinttype),
        ],
    )
});

pub static INTERFACE_SPECIFIERS: Lazy<DispatchTable<ClassSpecifiers>> = Lazy::new(|| {
    DispatchTable::<ClassSpecifiers>::new(
        "interface",
        &[
            ("minimalapi", class_minimalapi),
            ("blueprintable", class_blueprintable),
            ("notblueprintable", class_notblueprintable),
            ("blueprinttype", class_blueprinttype),
            ("conversionroot", class_conversionroot),
            ("dependson", class_dependson),
        ],
    )
});

// ============================================================================
// Structs and enums
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct StructSpecifiers {
    pub flags: StructFlags,
    pub cleared: StructFlags,
    pub immutable: bool,
    pub metadata: Metadata,
}

insert_flags!(struct_atomic, StructSpecifiers, StructFlags::ATOMIC);
set_meta!(struct_blueprinttype, StructSpecifiers, "BlueprintType", "true");

fn struct_noexport(builder: &mut StructSpecifiers, _: &Specifier) -> Result<()> {
    builder.flags.insert(StructFlags::NO_EXPORT);
    builder.cleared.insert(StructFlags::NATIVE);
    Ok(())
}

fn struct_immutable(builder: &mut StructSpecifiers, _: &Specifier) -> Result<()> {
    builder.flags.insert(StructFlags::IMMUTABLE | StructFlags::ATOMIC);
    builder.immutable = true;
    Ok(())
}

pub static STRUCT_SPECIFIERS: Lazy<DispatchTable<StructSpecifiers>> = Lazy::new(|| {
    DispatchTable::<StructSpecifiers>::new(
        "struct",
        &[
            ("noexport", struct_noexport),
            ("atomic", struct_atomic),
            ("immutable", struct_immutable),
            ("blueprinttype", struct_blueprinttype),
        ],
    )
});

#[derive(Debug, Clone, Default)]
pub struct EnumSpecifiers {
    pub metadata: Metadata,
}

set_meta!(enum_blueprinttype, EnumSpecifiers, "BlueprintType", "true");

pub static ENUM_SPECIFIERS: Lazy<DispatchTable<EnumSpecifiers>> = Lazy::new(|| {
    DispatchTable::<EnumSpecifiers>::new("enum", &[("blueprinttype", enum_blueprinttype)])
});

/// `UDELEGATE` carries metadata only.
pub static DELEGATE_SPECIFIERS: Lazy<DispatchTable<Metadata>> =
    Lazy::new(|| DispatchTable::<Metadata>::new("delegate", &[]));

// ============================================================================
// Functions and parameters
// ============================================================================

/// Endpoint of a network service function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceEndpoint {
    Mcp,
    Protobuffer,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionSpecifiers {
    pub flags: FunctionFlags,
    pub native_event: bool,
    pub implementable_event: bool,
    pub sealed_event: bool,
    pub reliable: bool,
    pub unreliable: bool,
    pub custom_thunk: bool,
    pub service: bool,
    pub endpoint: Option<ServiceEndpoint>,
    pub rpc_id: Option<u16>,
    pub rpc_response_id: Option<u16>,
    pub metadata: Metadata,
}

impl FunctionSpecifiers {
    pub fn is_blueprint_event(&self) -> bool {
        self.native_event || self.implementable_event
    }

    fn parse_service(&mut self, spec: &Specifier) -> Result<()> {
        self.service = true;
        for value in &spec.values {
            if let Some(id) = value.strip_prefix("Id=") {
                self.rpc_id = Some(parse_rpc_id(id, spec)?);
            } else if let Some(id) = value.strip_prefix("ResponseId=") {
                self.rpc_response_id = Some(parse_rpc_id(id, spec)?);
            } else if value.eq_ignore_ascii_case("MCP") {
                self.endpoint = Some(ServiceEndpoint::Mcp);
            } else if value.eq_ignore_ascii_case("Protobuffer") {
                self.endpoint = Some(ServiceEndpoint::Protobuffer);
            } else {
                return Err(Error::semantic(
                    spec.line,
                    format!("Invalid network identifier '{}' for function", value),
                ));
            }
        }
        Ok(())
    }
}

fn parse_rpc_id(text: &str, spec: &Specifier) -> Result<u16> {
    match text.trim().parse::<u32>() {
        Ok(id) if (1..=u16::MAX as u32).contains(&id) => Ok(id as u16),
        _ => Err(Error::semantic(
            spec.line,
            format!("Invalid network identifier '{}' for function", text),
        )),
    }
}

insert_flags!(func_exec, FunctionSpecifiers, FunctionFlags::EXEC);
insert_flags!(
    func_client,
    FunctionSpecifiers,
    FunctionFlags::NET | FunctionFlags::NET_CLIENT
);
insert_flags!(
    func_server,
    FunctionSpecifiers,
    FunctionFlags::NET | FunctionFlags::NET_SERVER
);
insert_flags!(
    func_netmulticast,
    FunctionSpecifiers,
    FunctionFlags::NET | FunctionFlags::NET_MULTICAST
);
insert_flags!(func_blueprintcallable, FunctionSpecifiers, FunctionFlags::BLUEPRINT_CALLABLE);
insert_flags!(
    func_blueprintpure,
    FunctionSpecifiers,
    FunctionFlags::BLUEPRINT_CALLABLE | FunctionFlags::BLUEPRINT_PURE
);
insert_flags!(
    func_blueprintauthorityonly,
    FunctionSpecifiers,
    FunctionFlags::BLUEPRINT_AUTHORITY_ONLY
);
insert_flags!(func_blueprintcosmetic, FunctionSpecifiers, FunctionFlags::BLUEPRINT_COSMETIC);
insert_flags!(func_withvalidation, FunctionSpecifiers, FunctionFlags::NET_VALIDATE);

fn func_nativeevent(builder: &mut FunctionSpecifiers, _: &Specifier) -> Result<()> {
    builder.native_event = true;
    builder.flags.insert(FunctionFlags::EVENT | FunctionFlags::BLUEPRINT_EVENT);
    Ok(())
}

fn func_implementableevent(builder: &mut FunctionSpecifiers, _: &Specifier) -> Result<()> {
    builder.implementable_event = true;
    builder.flags.insert(FunctionFlags::EVENT | FunctionFlags::BLUEPRINT_EVENT);
    Ok(())
}

fn func_sealedevent(builder: &mut FunctionSpecifiers, _: &Specifier) -> Result<()> {
    builder.sealed_event = true;
    Ok(())
}

fn func_reliable(builder: &mut FunctionSpecifiers, _: &Specifier) -> Result<()> {
    builder.reliable = true;
    builder.flags.insert(FunctionFlags::NET_RELIABLE);
    Ok(())
}

fn func_unreliable(builder: &mut FunctionSpecifiers, _: &Specifier) -> Result<()> {
    builder.unreliable = true;
    Ok(())
}

fn func_customthunk(builder: &mut FunctionSpecifiers, _: &Specifier) -> Result<()> {
    builder.custom_thunk = true;
    builder.metadata.insert("CustomThunk", "true");
    Ok(())
}

fn func_servicerequest(builder: &mut FunctionSpecifiers, spec: &Specifier) -> Result<()> {
    builder.flags.insert(
        FunctionFlags::NET | FunctionFlags::NET_RELIABLE | FunctionFlags::NET_REQUEST,
    );
    builder.parse_service(spec)
}

fn func_serviceresponse(builder: &mut FunctionSpecifiers, spec: &Specifier) -> Result<()> {
    builder.flags.insert(
        FunctionFlags::NET | FunctionFlags::NET_RELIABLE | FunctionFlags::NET_RESPONSE,
    );
    builder.parse_service(spec)
}

fn func_category(builder: &mut FunctionSpecifiers, spec: &Specifier) -> Result<()> {
    builder.metadata.insert("Category", spec.single_value()?);
    Ok(())
}

pub static FUNCTION_SPECIFIERS: Lazy<DispatchTable<FunctionSpecifiers>> = Lazy::new(|| {
    DispatchTable::<FunctionSpecifiers>::new(
        "function",
        &[
            ("BlueprintNativeEvent", func_nativeevent),
            ("BlueprintImplementableEvent", func_implementableevent),
            ("Exec", func_exec),
            ("SealedEvent", func_sealedevent),
            ("Server", func_server),
            ("Client", func_client),
            ("NetMulticast", func_netmulticast),
            ("ServiceRequest", func_servicerequest),
            ("ServiceResponse", func_serviceresponse),
            ("Reliable", func_reliable),
            ("Unreliable", func_unreliable),
            ("CustomThunk", func_customthunk),
            ("BlueprintCallable", func_blueprintcallable),
            ("BlueprintPure", func_blueprintpure),
            ("BlueprintAuthorityOnly", func_blueprintauthorityonly),
            ("BlueprintCosmetic", func_blueprintcosmetic),
            ("WithValidation", func_withvalidation),
            ("Category", func_category),
        ],
    )
});

/// `UPARAM(...)` on a function parameter.
#[derive(Debug, Clone, Default)]
pub struct ParamSpecifiers {
    pub flags: PropertyFlags,
    pub metadata: Metadata,
}

insert_flags!(param_ref, ParamSpecifiers, PropertyFlags::REFERENCE_PARM);
insert_flags!(param_const, ParamSpecifiers, PropertyFlags::CONST_PARM);
insert_flags!(param_notreplicated, ParamSpecifiers, PropertyFlags::REP_SKIP);

fn param_displayname(builder: &mut ParamSpecifiers, spec: &Specifier) -> Result<()> {
    builder.metadata.insert("DisplayName", spec.single_value()?);
    Ok(())
}

pub static PARAM_SPECIFIERS: Lazy<DispatchTable<ParamSpecifiers>> = Lazy::new(|| {
    DispatchTable::<ParamSpecifiers>::new(
        "parameter",
        &[
            ("ref", param_ref),
            ("const", param_const),
            ("NotReplicated", param_notreplicated),
            ("DisplayName", param_displayname),
        ],
    )
});

// ============================================================================
// Properties
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PropertySpecifiers {
    pub flags: PropertyFlags,
    /// First edit/visibility specifier seen.
    pub edit_specifier: Option<String>,
    /// First Blueprint access specifier seen.
    pub blueprint_specifier: Option<String>,
    pub rep_notify: Option<String>,
    pub non_pie_transient: bool,
    pub instanced: bool,
    pub metadata: Metadata,
}

impl PropertySpecifiers {
    fn set_edit(&mut self, spec: &Specifier, flags: PropertyFlags) -> Result<()> {
        if let Some(previous) = &self.edit_specifier {
            return Err(Error::semantic(
                spec.line,
                format!(
                    "Found more than one edit/visibility specifier ({}, {}), only one is allowed",
                    previous, spec.key
                ),
            ));
        }
        self.edit_specifier = Some(spec.key.clone());
        self.flags.insert(flags);
        Ok(())
    }

    fn set_blueprint(&mut self, spec: &Specifier, flags: PropertyFlags) -> Result<()> {
        if self.blueprint_specifier.is_some() {
            return Err(Error::semantic(
                spec.line,
                "Cannot specify a property as being both BlueprintReadOnly and BlueprintReadWrite.",
            ));
        }
        self.blueprint_specifier = Some(spec.key.clone());
        self.flags.insert(flags);
        Ok(())
    }
}

fn prop_editanywhere(builder: &mut PropertySpecifiers, spec: &Specifier) -> Result<()> {
    builder.set_edit(spec, PropertyFlags::EDIT)
}

fn prop_editinstanceonly(builder: &mut PropertySpecifiers, spec: &Specifier) -> Result<()> {
    builder.set_edit(spec, PropertyFlags::EDIT | PropertyFlags::DISABLE_EDIT_ON_TEMPLATE)
}

fn prop_editdefaultsonly(builder: &mut PropertySpecifiers, spec: &Specifier) -> Result<()> {
    builder.set_edit(spec, PropertyFlags::EDIT | PropertyFlags::DISABLE_EDIT_ON_INSTANCE)
}

fn prop_visibleanywhere(builder: &mut PropertySpecifiers, spec: &Specifier) -> Result<()> {
    builder.set_edit(spec, PropertyFlags::EDIT | PropertyFlags::EDIT_CONST)
}

fn prop_visibleinstanceonly(builder: &mut PropertySpecifiers, spec: &Specifier) -> Result<()> {
    builder.set_edit(
        spec,
        PropertyFlags::EDIT | PropertyFlags::EDIT_CONST | PropertyFlags::DISABLE_EDIT_ON_TEMPLATE,
    )
}

fn prop_visibledefaultsonly(builder: &mut PropertySpecifiers, spec: &Specifier) -> Result<()> {
    builder.set_edit(
        spec,
        PropertyFlags::EDIT | PropertyFlags::EDIT_CONST | PropertyFlags::DISABLE_EDIT_ON_INSTANCE,
    )
}

fn prop_blueprintreadwrite(builder: &mut PropertySpecifiers, spec: &Specifier) -> Result<()> {
    builder.set_blueprint(spec, PropertyFlags::BLUEPRINT_VISIBLE)
}

fn prop_blueprintreadonly(builder: &mut PropertySpecifiers, spec: &Specifier) -> Result<()> {
    builder.set_blueprint(
        spec,
        PropertyFlags::BLUEPRINT_VISIBLE | PropertyFlags::BLUEPRINT_READ_ONLY,
    )
}

insert_flags!(prop_config, PropertySpecifiers, PropertyFlags::CONFIG);
insert_flags!(
    prop_globalconfig,
    PropertySpecifiers,
    PropertyFlags::GLOBAL_CONFIG | PropertyFlags::CONFIG
);
insert_flags!(
    prop_localized,
    PropertySpecifiers,
    PropertyFlags::LOCALIZED | PropertyFlags::BLUEPRINT_READ_ONLY
);
insert_flags!(prop_transient, PropertySpecifiers, PropertyFlags::TRANSIENT);
insert_flags!(prop_duplicatetransient, PropertySpecifiers, PropertyFlags::DUPLICATE_TRANSIENT);
insert_flags!(
    prop_textexporttransient,
    PropertySpecifiers,
    PropertyFlags::TEXT_EXPORT_TRANSIENT
);
insert_flags!(
    prop_nonpieduplicatetransient,
    PropertySpecifiers,
    PropertyFlags::NON_PIE_DUPLICATE_TRANSIENT
);
insert_flags!(prop_export, PropertySpecifiers, PropertyFlags::EXPORT_OBJECT);
insert_flags!(prop_noclear, PropertySpecifiers, PropertyFlags::NO_CLEAR);
insert_flags!(prop_editfixedsize, PropertySpecifiers, PropertyFlags::EDIT_FIXED_SIZE);
insert_flags!(prop_replicated, PropertySpecifiers, PropertyFlags::NET);
insert_flags!(prop_notreplicated, PropertySpecifiers, PropertyFlags::REP_SKIP);
insert_flags!(prop_represtry, PropertySpecifiers, PropertyFlags::REP_RETRY);
insert_flags!(
    prop_interp,
    PropertySpecifiers,
    PropertyFlags::EDIT | PropertyFlags::BLUEPRINT_VISIBLE | PropertyFlags::INTERP
);
insert_flags!(prop_nontransactional, PropertySpecifiers, PropertyFlags::NON_TRANSACTIONAL);
insert_flags!(prop_blueprintassignable, PropertySpecifiers, PropertyFlags::BLUEPRINT_ASSIGNABLE);
insert_flags!(prop_blueprintcallable, PropertySpecifiers, PropertyFlags::BLUEPRINT_CALLABLE);
insert_flags!(
    prop_blueprintauthorityonly,
    PropertySpecifiers,
    PropertyFlags::BLUEPRINT_AUTHORITY_ONLY
);
insert_flags!(
    prop_assetregistrysearchable,
    PropertySpecifiers,
    PropertyFlags::ASSET_REGISTRY_SEARCHABLE
);
insert_flags!(prop_simpledisplay, PropertySpecifiers, PropertyFlags::SIMPLE_DISPLAY);
insert_flags!(prop_advanceddisplay, PropertySpecifiers, PropertyFlags::ADVANCED_DISPLAY);
insert_flags!(prop_savegame, PropertySpecifiers, PropertyFlags::SAVE_GAME);

fn prop_nonpietransient(builder: &mut PropertySpecifiers, _: &Specifier) -> Result<()> {
    builder.non_pie_transient = true;
    builder.flags.insert(PropertyFlags::NON_PIE_DUPLICATE_TRANSIENT);
    Ok(())
}

fn prop_editinline(_: &mut PropertySpecifiers, spec: &Specifier) -> Result<()> {
    deprecated_specifier(
        spec,
        "EditInline is deprecated. Remove it, or use Instanced instead.",
    )
}

fn prop_replicatedusing(builder: &mut PropertySpecifiers, spec: &Specifier) -> Result<()> {
    builder.rep_notify = Some(spec.single_value()?.to_string());
    builder.flags.insert(PropertyFlags::NET | PropertyFlags::REP_NOTIFY);
    Ok(())
}

fn prop_instanced(builder: &mut PropertySpecifiers, _: &Specifier) -> Result<()> {
    builder.instanced = true;
    builder.flags.insert(
        PropertyFlags::PERSISTENT_INSTANCE
            | PropertyFlags::EXPORT_OBJECT
            | PropertyFlags::INSTANCED_REFERENCE,
    );
    builder.metadata.insert("EditInline", "true");
    Ok(())
}

fn prop_category(builder: &mut PropertySpecifiers, spec: &Specifier) -> Result<()> {
    builder.metadata.insert("Category", spec.single_value()?);
    Ok(())
}

pub static PROPERTY_SPECIFIERS: Lazy<DispatchTable<PropertySpecifiers>> = Lazy::new(|| {
    DispatchTable::<PropertySpecifiers>::new(
        "property",
        &[
            ("EditAnywhere", prop_editanywhere),
            ("EditInstanceOnly", prop_editinstanceonly),
            ("EditDefaultsOnly", prop_editdefaultsonly),
            ("VisibleAnywhere", prop_visibleanywhere),
            ("VisibleInstanceOnly", prop_visibleinstanceonly),
            ("VisibleDefaultsOnly", prop_visibledefaultsonly),
            ("BlueprintReadWrite", prop_blueprintreadwrite),
            ("BlueprintReadOnly", prop_blueprintreadonly),
            ("Config", prop_config),
            ("GlobalConfig", prop_globalconfig),
            ("Localized", prop_localized),
            ("Transient", prop_transient),
            ("DuplicateTransient", prop_duplicatetransient),
            ("TextExportTransient", prop_textexporttransient),
            ("NonPIETransient", prop_nonpietransient),
            ("NonPIEDuplicateTransient", prop_nonpieduplicatetransient),
            ("Export", prop_export),
            ("EditInline", prop_editinline),
            ("NoClear", prop_noclear),
            ("EditFixedSize", prop_editfixedsize),
            ("Replicated", prop_replicated),
            ("ReplicatedUsing", prop_replicatedusing),
            ("NotReplicated", prop_notreplicated),
            ("RepRetry", prop_represtry),
            ("Interp", prop_interp),
            ("NonTransactional", prop_nontransactional),
            ("Instanced", prop_instanced),
            ("BlueprintAssignable", prop_blueprintassignable),
            ("BlueprintCallable", prop_blueprintcallable),
            ("BlueprintAuthorityOnly", prop_blueprintauthorityonly),
            ("AssetRegistrySearchable", prop_assetregistrysearchable),
            ("SimpleDisplay", prop_simpledisplay),
            ("AdvancedDisplay", prop_advanceddisplay),
            ("SaveGame", prop_savegame),
            ("Category", prop_category),
        ],
    )
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declare::specifiers::parse_specifiers;
    use crate::error::ErrorKind;
    use crate::parser::{tokenize, TokenCursor};

    fn specifiers(source: &str) -> SpecifierList {
        let mut cursor = TokenCursor::new(tokenize(source).unwrap());
        parse_specifiers(&mut cursor, "test").unwrap()
    }

    #[test]
    fn test_case_insensitive_dispatch() {
        let mut class = ClassSpecifiers::default();
        CLASS_SPECIFIERS
            .apply(&mut class, &specifiers("(Abstract, NOTPLACEABLE, config=Game)"))
            .unwrap();
        assert!(class.flags.contains(ClassFlags::ABSTRACT | ClassFlags::NOT_PLACEABLE));
        assert_eq!(class.config.as_deref(), Some("Game"));
    }

    #[test]
    fn test_unknown_specifier() {
        let mut class = ClassSpecifiers::default();
        let err = CLASS_SPECIFIERS
            .apply(&mut class, &specifiers("(Bogus)"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
        assert_eq!(err.message, "Unknown class specifier 'Bogus'");
    }

    #[test]
    fn test_interface_table_is_restricted() {
        let mut class = ClassSpecifiers::default();
        let err = INTERFACE_SPECIFIERS
            .apply(&mut class, &specifiers("(Abstract)"))
            .unwrap_err();
        assert_eq!(err.message, "Unknown interface specifier 'Abstract'");
    }

    #[test]
    fn test_category_lists_become_metadata() {
        let mut class = ClassSpecifiers::default();
        CLASS_SPECIFIERS
            .apply(
                &mut class,
                &specifiers("(hideCategories=(Input, Movement), showCategories=(Input))"),
            )
            .unwrap();
        let metadata = class.list_metadata();
        assert_eq!(metadata.get("HideCategories"), Some("Movement"));
        assert_eq!(metadata.get("ShowCategories"), Some("Input"));
    }

    #[test]
    fn test_edit_and_visible_conflict() {
        let mut prop = PropertySpecifiers::default();
        let err = PROPERTY_SPECIFIERS
            .apply(&mut prop, &specifiers("(EditAnywhere, VisibleAnywhere)"))
            .unwrap_err();
        assert!(err.message.contains("more than one edit/visibility specifier"));
    }

    #[test]
    fn test_service_identifiers() {
        let mut func = FunctionSpecifiers::default();
        FUNCTION_SPECIFIERS
            .apply(&mut func, &specifiers("(ServiceRequest(Protobuffer, Id=10, ResponseId=11))"))
            .unwrap();
        assert_eq!(func.rpc_id, Some(10));
        assert_eq!(func.rpc_response_id, Some(11));
        assert_eq!(func.endpoint, Some(ServiceEndpoint::Protobuffer));
        assert!(func.flags.contains(FunctionFlags::NET_REQUEST));

        let mut func = FunctionSpecifiers::default();
        assert!(FUNCTION_SPECIFIERS
            .apply(&mut func, &specifiers("(ServiceRequest(MCP, Id=70000))"))
            .is_err());
    }

    #[test]
    fn test_delegate_table_rejects_everything() {
        let mut metadata = Metadata::new();
        assert!(DELEGATE_SPECIFIERS
            .apply(&mut metadata, &specifiers("(BlueprintCallable)"))
            .is_err());
    }
}
