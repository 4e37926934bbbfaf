//! Source units and the dependency graph that orders them.

pub mod graph;
pub mod unit;

pub use graph::{link_dependencies, resolve_order, CycleError, DependencyGraph};
pub use unit::{Dependency, DependencyKind, ResolutionMark, SourceUnit, UnitId, Visibility};
