//! Source units: one pre-parsed header each.

use std::path::{Path, PathBuf};

use crate::preparser::SkeletonClass;
use crate::registry::EntityId;

/// Arena handle to a source unit owned by the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u32);

impl UnitId {
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Three-state traversal marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionMark {
    #[default]
    Unvisited,
    Visiting,
    Visited,
}

/// Why one unit needs another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// `#include "Name.h"`, by clean file name
    Include(String),
    /// A declared base class, by class name
    Base(String),
}

impl DependencyKind {
    pub fn name(&self) -> &str {
        match self {
            DependencyKind::Include(name) | DependencyKind::Base(name) => name,
        }
    }
}

/// One dependency entry of a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub kind: DependencyKind,
    pub line: u32,
    /// Filled in by the dependency resolver when the name names a unit of
    /// the same module.
    pub resolved: Option<UnitId>,
}

impl Dependency {
    pub fn new(kind: DependencyKind, line: u32) -> Self {
        Self {
            kind,
            line,
            resolved: None,
        }
    }
}

/// Header visibility within its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// A pre-parsed header.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub id: UnitId,
    pub path: PathBuf,
    pub module: String,
    pub visibility: Visibility,
    /// Text after conditional flattening. Same line count as the input.
    pub text: String,
    pub dependencies: Vec<Dependency>,
    pub skeletons: Vec<SkeletonClass>,
    /// Entities declared by this unit, in declaration order.
    pub entities: Vec<EntityId>,
    pub mark: ResolutionMark,
    pub parsed: bool,
}

impl SourceUnit {
    pub fn new(id: UnitId, path: PathBuf, module: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            id,
            path,
            module: module.into(),
            visibility,
            text: String::new(),
            dependencies: Vec::new(),
            skeletons: Vec::new(),
            entities: Vec::new(),
            mark: ResolutionMark::Unvisited,
            parsed: false,
        }
    }

    /// File name without directories, as written in include directives.
    pub fn file_name(&self) -> &str {
        clean_file_name(&self.path)
    }

    /// File name without extension, used for generated symbol names.
    pub fn base_name(&self) -> &str {
        let name = self.file_name();
        name.rsplit_once('.').map_or(name, |(stem, _)| stem)
    }
}

/// Strip any directory part from an include path.
pub fn clean_file_name(path: &Path) -> &str {
    let text = path.to_str().unwrap_or_default();
    text.rsplit(['/', '\\']).next().unwrap_or(text)
}
