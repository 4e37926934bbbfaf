//! Module compilation driver.
//!
//! Runs one module batch through every stage:
//!
//! ```text
//! files → preparse → skeleton classes → link dependencies → order
//!       → per unit: parse declarations, resolve members
//!       → generate
//! ```
//!
//! Units are parsed depth-first so that a unit never starts before every
//! unit it depends on has finished.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::codegen::{CodeGenerator, ModuleOutput};
use crate::config::ModuleDescriptor;
use crate::context::RunContext;
use crate::declare::HeaderParser;
use crate::error::{Error, Result};
use crate::module::unit::{ResolutionMark, SourceUnit, UnitId, Visibility};
use crate::module::{link_dependencies, resolve_order};
use crate::preparser::preparse;
use crate::registry::{Category, ClassData, ClassFlags, EntityData, EntityId, NewEntity, Outer};
use crate::resolve::TypeResolver;

/// Compile one module. `files` holds each header's path and text, in the
/// order the headers were listed.
pub fn compile_module(
    ctx: &mut RunContext,
    descriptor: &ModuleDescriptor,
    files: &[(PathBuf, String)],
) -> Result<ModuleOutput> {
    let first = ctx.units.len();
    for (path, text) in files {
        add_unit(ctx, descriptor, path, text)?;
    }
    let batch: Vec<UnitId> = (first..ctx.units.len()).map(UnitId::from_index).collect();

    for &unit in &batch {
        register_skeletons(ctx, unit)?;
    }
    for &unit in &batch {
        link_skeletons(ctx, unit)?;
    }

    link_dependencies(&mut ctx.units[first..]);
    let order = resolve_order(&ctx.units[first..])?;
    debug!(
        "processing order for '{}': {:?}",
        descriptor.name,
        order
            .iter()
            .map(|&id| ctx.unit(id).file_name())
            .collect::<Vec<_>>()
    );

    for id in order {
        process_unit(ctx, id)?;
    }
    ctx.check_rpc_responses()?;

    let entities = ctx.registry.module_entities(&descriptor.name).count();
    info!(
        "module '{}': {} headers, {} entities, {} warnings",
        descriptor.name,
        batch.len(),
        entities,
        ctx.warnings.len()
    );
    CodeGenerator::generate(ctx, &descriptor.name)
}

fn add_unit(ctx: &mut RunContext, descriptor: &ModuleDescriptor, path: &Path, text: &str) -> Result<()> {
    let preparsed = preparse(path, text, &ctx.config)?;
    let visibility = if descriptor.is_private(path) {
        Visibility::Private
    } else {
        Visibility::Public
    };
    let id = UnitId::from_index(ctx.units.len());
    let mut unit = SourceUnit::new(id, path.to_path_buf(), descriptor.name.clone(), visibility);
    unit.text = preparsed.text;
    unit.skeletons = preparsed.skeletons;
    unit.dependencies = preparsed.dependencies;
    ctx.units.push(unit);
    Ok(())
}

/// Register every class found by the pre-parser, so any unit of the batch
/// can name it before its own unit is parsed.
fn register_skeletons(ctx: &mut RunContext, unit: UnitId) -> Result<()> {
    let source = ctx.unit(unit);
    let path = source.path.clone();
    let module = source.module.clone();
    let skeletons = source.skeletons.clone();

    for skeleton in skeletons {
        let mut class = ClassData::default();
        if skeleton.is_interface {
            class.flags |= ClassFlags::INTERFACE;
        }
        ctx.registry
            .add(NewEntity {
                name: skeleton.name,
                data: EntityData::Class(class),
                outer: Outer::Package(module.clone()),
                raw_super: skeleton.raw_super,
                unit,
                module: module.clone(),
                line: skeleton.line,
            })
            .map_err(|e| e.in_file(&path))?;
    }
    Ok(())
}

/// Link skeleton supers that are already known. Anything left unlinked is
/// reported when its class is parsed.
fn link_skeletons(ctx: &mut RunContext, unit: UnitId) -> Result<()> {
    let path = ctx.unit(unit).path.clone();
    for skeleton in ctx.unit(unit).skeletons.clone() {
        let Some(raw_super) = &skeleton.raw_super else {
            continue;
        };
        let (Some(id), Some(base)) = (
            ctx.registry.find(Category::Class, &skeleton.name),
            ctx.registry.find(Category::Class, raw_super),
        ) else {
            continue;
        };
        if base == id || ctx.registry.is_child_of(base, id) {
            return Err(circular_inheritance(ctx, id, base, skeleton.line).with_file(path));
        }
        ctx.registry
            .set_super(id, base, skeleton.line)
            .map_err(|e| e.in_file(&path))?;
    }
    Ok(())
}

/// Inheritance cycle between two skeleton classes, naming the header of
/// each side.
fn circular_inheritance(ctx: &RunContext, id: EntityId, base: EntityId, line: u32) -> Error {
    let class = ctx.registry.get(id);
    if base == id {
        return Error::dependency(line, format!("Class '{}' cannot inherit from itself", class.name));
    }
    let other = ctx.registry.get(base);
    Error::dependency(
        line,
        format!(
            "Circular inheritance: '{}' ({}:{}) derives from '{}' ({}:{}), which already derives from it",
            class.name,
            ctx.unit(class.unit).file_name(),
            class.line,
            other.name,
            ctx.unit(other.unit).file_name(),
            other.line
        ),
    )
}

/// Parse and resolve `id` after everything it depends on.
fn process_unit(ctx: &mut RunContext, id: UnitId) -> Result<()> {
    match ctx.unit(id).mark {
        ResolutionMark::Visited => return Ok(()),
        ResolutionMark::Visiting => {
            let unit = ctx.unit(id);
            return Err(Error::dependency(
                1,
                format!("'{}' is already being processed", unit.file_name()),
            )
            .with_file(unit.path.clone()));
        }
        ResolutionMark::Unvisited => {}
    }

    let path = ctx.unit(id).path.clone();
    ctx.unit_mut(id).mark = ResolutionMark::Visiting;
    ctx.push_file(path.clone());
    let result = process_dependencies(ctx, id).and_then(|()| {
        HeaderParser::parse_unit(ctx, id)?;
        TypeResolver::resolve_unit(ctx, id)
    });
    ctx.pop_file();
    result.map_err(|e| e.in_file(&path))?;

    let unit = ctx.unit_mut(id);
    unit.parsed = true;
    unit.mark = ResolutionMark::Visited;
    ctx.processed.push(id);
    Ok(())
}

fn process_dependencies(ctx: &mut RunContext, id: UnitId) -> Result<()> {
    let dependencies: Vec<UnitId> = ctx
        .unit(id)
        .dependencies
        .iter()
        .filter_map(|dep| dep.resolved)
        .filter(|&dep| dep != id)
        .collect();
    for dep in dependencies {
        process_unit(ctx, dep)?;
    }
    Ok(())
}
