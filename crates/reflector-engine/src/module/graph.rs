//! Unit dependency graph
//!
//! Tracks dependencies between the headers of one module batch and provides:
//! - Dependency linking by include file name and by base class name
//! - Cycle and self-dependency detection
//! - Depth-first processing order (dependencies first)

use std::path::{Path, PathBuf};

use log::debug;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::module::unit::{DependencyKind, ResolutionMark, SourceUnit, UnitId};

/// Errors related to dependency ordering
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CycleError {
    /// Two units reach each other through their dependencies
    #[error(
        "Circular dependency detected: '{}' and '{}' depend on each other",
        .from.display(),
        .to.display()
    )]
    Cycle { from: PathBuf, to: PathBuf, line: u32 },

    /// A unit names itself as a dependency
    #[error("'{}' depends on itself through '{name}'", .file.display())]
    SelfDependency { file: PathBuf, name: String, line: u32 },
}

impl CycleError {
    /// The file the error is reported against.
    pub fn file(&self) -> &Path {
        match self {
            CycleError::Cycle { from, .. } => from,
            CycleError::SelfDependency { file, .. } => file,
        }
    }

    pub fn line(&self) -> u32 {
        match self {
            CycleError::Cycle { line, .. } | CycleError::SelfDependency { line, .. } => *line,
        }
    }
}

/// A node in the dependency graph
#[derive(Debug, Clone)]
pub struct UnitNode {
    pub id: UnitId,
    pub path: PathBuf,
    /// Units this unit depends on, with the line of the dependency
    pub dependencies: Vec<(UnitId, u32)>,
    /// Dependency names that resolved to the unit itself
    self_references: Vec<(String, u32)>,
}

/// Dependency graph over one module batch
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<UnitNode>,
    index: FxHashMap<UnitId, usize>,
}

impl DependencyGraph {
    /// Build the graph from units whose dependencies are already linked.
    ///
    /// Dependencies resolved to units outside `units` are ignored.
    pub fn build(units: &[SourceUnit]) -> Self {
        let mut graph = Self::default();
        for unit in units {
            graph.index.insert(unit.id, graph.nodes.len());
            graph.nodes.push(UnitNode {
                id: unit.id,
                path: unit.path.clone(),
                dependencies: Vec::new(),
                self_references: Vec::new(),
            });
        }

        for unit in units {
            for dep in &unit.dependencies {
                let Some(target) = dep.resolved else { continue };
                if target == unit.id {
                    graph.node_mut(unit.id).self_references.push((dep.kind.name().to_string(), dep.line));
                    continue;
                }
                if !graph.index.contains_key(&target) {
                    continue;
                }
                let node = graph.node_mut(unit.id);
                if !node.dependencies.iter().any(|(id, _)| *id == target) {
                    node.dependencies.push((target, dep.line));
                }
            }
        }
        graph
    }

    fn node_mut(&mut self, id: UnitId) -> &mut UnitNode {
        let index = self.index[&id];
        &mut self.nodes[index]
    }

    /// Get a node by unit id
    pub fn get(&self, id: UnitId) -> Option<&UnitNode> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first processing order, dependencies before dependents.
    ///
    /// Units are started in input order and dependencies are followed in
    /// declaration order, so the result is deterministic.
    pub fn resolve_order(&self) -> Result<Vec<UnitId>, CycleError> {
        for node in &self.nodes {
            if let Some((name, line)) = node.self_references.first() {
                return Err(CycleError::SelfDependency {
                    file: node.path.clone(),
                    name: name.clone(),
                    line: *line,
                });
            }
        }

        let mut marks = vec![ResolutionMark::Unvisited; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        for start in 0..self.nodes.len() {
            if marks[start] == ResolutionMark::Unvisited {
                self.visit(start, &mut marks, &mut order)?;
            }
        }
        Ok(order)
    }

    /// DFS helper for ordering
    fn visit(
        &self,
        index: usize,
        marks: &mut [ResolutionMark],
        order: &mut Vec<UnitId>,
    ) -> Result<(), CycleError> {
        marks[index] = ResolutionMark::Visiting;
        let node = &self.nodes[index];

        for &(dep, line) in &node.dependencies {
            let dep_index = self.index[&dep];
            match marks[dep_index] {
                ResolutionMark::Unvisited => self.visit(dep_index, marks, order)?,
                ResolutionMark::Visiting => {
                    return Err(CycleError::Cycle {
                        from: node.path.clone(),
                        to: self.nodes[dep_index].path.clone(),
                        line,
                    });
                }
                ResolutionMark::Visited => {}
            }
        }

        marks[index] = ResolutionMark::Visited;
        order.push(node.id);
        Ok(())
    }
}

/// Resolve dependency names to units of the same batch.
///
/// Includes resolve by clean file name, base classes through the skeleton
/// class map. Names that resolve nowhere belong to another module batch and
/// stay unresolved.
pub fn link_dependencies(units: &mut [SourceUnit]) {
    let mut by_file: FxHashMap<String, UnitId> = FxHashMap::default();
    let mut by_class: FxHashMap<String, UnitId> = FxHashMap::default();
    for unit in units.iter() {
        by_file.entry(unit.file_name().to_string()).or_insert(unit.id);
        for skeleton in &unit.skeletons {
            by_class.entry(skeleton.name.clone()).or_insert(unit.id);
        }
    }

    for unit in units.iter_mut() {
        let module = unit.module.clone();
        let path = unit.path.clone();
        for dep in &mut unit.dependencies {
            dep.resolved = match &dep.kind {
                DependencyKind::Include(name) => by_file.get(name).copied(),
                DependencyKind::Base(name) => by_class.get(name).copied(),
            };
            if dep.resolved.is_none() {
                debug!(
                    "{}: skipping external dependency '{}' (module {})",
                    path.display(),
                    dep.kind.name(),
                    module
                );
            }
        }
    }
}

/// Processing order for a batch of linked units.
pub fn resolve_order(units: &[SourceUnit]) -> Result<Vec<UnitId>, CycleError> {
    DependencyGraph::build(units).resolve_order()
}
