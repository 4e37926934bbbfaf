//! Registration code generation
//!
//! Reads the completed registry for one module and produces the text that
//! registers each reflected entity with the runtime. The generator only
//! reads; every entity it visits must already be complete.
//!
//! # Pipeline
//!
//! ```text
//! processed units → top-level entities (declaration order)
//!                     ├─ nested enums, delegates and functions
//!                     └─ entity accessor → UnitHash → chunk
//!                 → package accessor → ModuleOutput
//! processed units → generated header (body macros, thunks, wrappers)
//! ```
//!
//! Each accessor unit is hashed after it is written. The hash tag is then
//! used at the unit's link site, so a change to a function shows up in the
//! hash of its class.
//!
//! # Example
//!
//! ```rust,ignore
//! let output = CodeGenerator::generate(&ctx, "Game")?;
//! for chunk in &output.chunks {
//!     write_chunk(&descriptor.output_directory, chunk.index, &chunk.text)?;
//! }
//! ```

mod cpp_type;
pub mod hash;
mod header;
mod natives;
mod properties;
pub mod singleton;
mod units;
pub mod writer;

pub use hash::UnitHash;
pub use writer::{Chunk, CodeWriter};

use log::info;
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::module::unit::SourceUnit;
use crate::registry::{EntityData, EntityId, Registry};
use writer::ChunkedOutput;

/// What a generated unit registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnitKind {
    Class,
    Struct,
    Enum,
    Function,
    Delegate,
    Package,
    /// `{stem}.generated.h` of one source unit.
    Header,
}

/// One singleton accessor and its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    pub singleton_name: String,
    pub kind: UnitKind,
    /// Entity or function name
    pub name: String,
    pub text: String,
    pub hash: UnitHash,
}

/// Everything generated for one module.
#[derive(Debug, Clone)]
pub struct ModuleOutput {
    pub module: String,
    /// Units in emission order.
    pub units: Vec<GeneratedUnit>,
    pub chunks: Vec<Chunk>,
    /// Declarations of this module's own accessors.
    pub declarations: Vec<String>,
    /// Declarations of accessors owned by other modules.
    pub externs: Vec<String>,
    pub package: GeneratedUnit,
    /// One generated header per processed unit of the module.
    pub headers: Vec<GeneratedUnit>,
}

impl ModuleOutput {
    pub fn unit(&self, kind: UnitKind, name: &str) -> Option<&GeneratedUnit> {
        self.units.iter().find(|u| u.kind == kind && u.name == name)
    }

    /// Generated header by file name, e.g. `Thing.generated.h`.
    pub fn header(&self, name: &str) -> Option<&GeneratedUnit> {
        self.headers.iter().find(|h| h.name == name)
    }

    /// All chunks concatenated.
    pub fn text(&self) -> String {
        self.chunks.iter().map(|c| c.text.as_str()).collect()
    }
}

// ============================================================================
// Generator
// ============================================================================

pub struct CodeGenerator<'a> {
    ctx: &'a RunContext,
    registry: &'a Registry,
    module: &'a str,
    /// Accessors already declared, across both declaration lists.
    seen: FxHashSet<String>,
    /// Event names already defined in the output.
    event_names: FxHashSet<String>,
    declarations: Vec<String>,
    externs: Vec<String>,
    output: ChunkedOutput,
    units: Vec<GeneratedUnit>,
}

impl<'a> CodeGenerator<'a> {
    /// Generate registration code for every entity `module` declares.
    pub fn generate(ctx: &'a RunContext, module: &'a str) -> Result<ModuleOutput> {
        let generator = CodeGenerator {
            ctx,
            registry: &ctx.registry,
            module,
            seen: FxHashSet::default(),
            event_names: FxHashSet::default(),
            declarations: Vec::new(),
            externs: Vec::new(),
            output: ChunkedOutput::new(ctx.config.generator.max_lines_per_chunk),
            units: Vec::new(),
        };
        generator.run()
    }

    fn run(mut self) -> Result<ModuleOutput> {
        let ctx = self.ctx;
        let module = self.module;
        let units: Vec<&SourceUnit> = ctx
            .processed
            .iter()
            .map(|&unit| ctx.unit(unit))
            .filter(|unit| unit.module == module && !unit.entities.is_empty())
            .collect();
        let roots: Vec<EntityId> = units
            .iter()
            .flat_map(|unit| unit.entities.iter().copied())
            .filter(|&id| self.registry.get(id).owner().is_none())
            .collect();
        for id in roots {
            self.emit_entity(id)?;
        }
        let package = self.emit_package();
        let headers: Vec<GeneratedUnit> = units.iter().map(|unit| self.emit_header(unit)).collect();

        let chunks = self.output.into_chunks();
        info!(
            "generated {} units and {} headers in {} chunks for module '{}' ({} externs)",
            self.units.len(),
            headers.len(),
            chunks.len(),
            self.module,
            self.externs.len()
        );
        Ok(ModuleOutput {
            module: self.module.to_string(),
            units: self.units,
            chunks,
            declarations: self.declarations,
            externs: self.externs,
            package,
            headers,
        })
    }

    /// Emit one entity and everything nested in it. Returns the hash tag of
    /// its accessor, or `None` when the entity is provided by the runtime.
    fn emit_entity(&mut self, id: EntityId) -> Result<Option<u32>> {
        let entity = self.registry.get(id);
        if !entity.complete {
            return Err(Error::semantic(
                entity.line,
                format!("'{}' was not fully resolved before code generation", entity.name),
            )
            .with_file(self.ctx.unit(entity.unit).path.clone()));
        }
        match &entity.data {
            EntityData::Class(class) => self.emit_class(entity, class),
            EntityData::Struct(_) => Ok(Some(self.emit_struct(entity))),
            EntityData::Enum(data) => Ok(Some(self.emit_enum(entity, data))),
            EntityData::Delegate(signature) => Ok(Some(self.emit_delegate(entity, signature))),
        }
    }

    /// Append a finished unit to the output.
    fn finish(
        &mut self,
        kind: UnitKind,
        name: &str,
        singleton_name: String,
        out: CodeWriter,
        hash: UnitHash,
        trailer: CodeWriter,
    ) -> u32 {
        let text = out.into_string();
        let chunk = self.output.current();
        chunk.append(&text);
        chunk.append(trailer.as_str());
        chunk.line(0, "");

        let tag = hash.tag;
        self.units.push(GeneratedUnit {
            singleton_name,
            kind,
            name: name.to_string(),
            text,
            hash,
        });
        tag
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// Accessor of a referenced entity, declared on first use.
    fn reference(&mut self, id: EntityId) -> String {
        let entity = self.registry.get(id);
        let accessor = singleton::entity(self.registry, id);
        self.declare(&entity.module, singleton::object_type(entity.category()), &accessor);
        accessor
    }

    fn reference_no_register(&mut self, id: EntityId) -> String {
        let entity = self.registry.get(id);
        let accessor = singleton::no_register(&entity.name);
        self.declare(&entity.module, "UClass", &accessor);
        accessor
    }

    fn package_reference(&mut self) -> String {
        let accessor = singleton::package(self.module);
        self.declare_own("UPackage", &accessor);
        accessor
    }

    fn declare_own(&mut self, ty: &str, accessor: &str) {
        let module = self.module;
        self.declare(module, ty, accessor);
    }

    /// Record one declaration per accessor. Accessors of other modules are
    /// imported through that module's API macro.
    fn declare(&mut self, module: &str, ty: &str, accessor: &str) {
        if !self.seen.insert(accessor.to_string()) {
            return;
        }
        let api = self.ctx.config.generator.api_macro_for(module);
        let declaration = format!("{} class {}* {};", api, ty, accessor);
        if module == self.module {
            self.declarations.push(declaration);
        } else {
            self.externs.push(declaration);
        }
    }
}
