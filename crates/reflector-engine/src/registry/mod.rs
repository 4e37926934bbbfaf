//! Entity registry.
//!
//! The registry is an arena of [`EntityDescriptor`]s plus scoped name maps.
//! Names are unique per [`Category`] within a scope. A scope is either the
//! run-global scope or the body of an entity, so a delegate declared inside
//! a class does not clash with a delegate of the same name in another class.
//!
//! Lookup from inside an entity walks the entity's own scope and its super
//! chain, then the enclosing entity, and finally the global scope.

pub mod entity;
pub mod flags;
pub mod metadata;
pub mod property;

pub use entity::{
    BodyMacro, Category, ClassData, EntityData, EntityDescriptor, EntityId, EnumData, EnumForm,
    EnumValue, FunctionDescriptor, FunctionRef, ImplementedInterface, MemberAccess, Outer,
    StructData,
};
pub use flags::{ClassFlags, FunctionFlags, PropertyFlags, StructFlags};
pub use metadata::Metadata;
pub use property::{
    ArrayDim, ContainerKind, EnumWidth, ObjectWrapper, PrimitiveKind, PropertyDescriptor,
    TypeShape,
};

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::module::unit::UnitId;

type NameMap = FxHashMap<(Category, String), EntityId>;

/// Parameters for registering a new entity.
#[derive(Debug, Clone)]
pub struct NewEntity {
    pub name: String,
    pub data: EntityData,
    pub outer: Outer,
    pub raw_super: Option<String>,
    pub unit: UnitId,
    pub module: String,
    pub line: u32,
}

#[derive(Debug, Default)]
pub struct Registry {
    entities: Vec<EntityDescriptor>,
    global: NameMap,
    scoped: FxHashMap<EntityId, NameMap>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> &EntityDescriptor {
        &self.entities[id.index()]
    }

    pub fn get_mut(&mut self, id: EntityId) -> &mut EntityDescriptor {
        &mut self.entities[id.index()]
    }

    /// All entities in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.iter()
    }

    pub fn function(&self, func: FunctionRef) -> &FunctionDescriptor {
        &self.get(func.owner).functions[func.index]
    }

    /// Register an entity in the scope named by its outer.
    ///
    /// Fails on a duplicate in the same scope, and on shadowing a name from
    /// an enclosing scope unless the shadowed entity is deprecated.
    pub fn add(&mut self, new: NewEntity) -> Result<EntityId> {
        let category = match new.data {
            EntityData::Class(_) => Category::Class,
            EntityData::Struct(_) => Category::Struct,
            EntityData::Enum(_) => Category::Enum,
            EntityData::Delegate(_) => Category::Delegate,
        };
        let key = (category, new.name.clone());
        let owner = match new.outer {
            Outer::Entity(owner) => Some(owner),
            Outer::Package(_) => None,
        };

        let existing = match owner {
            Some(owner) => self.scoped.get(&owner).and_then(|m| m.get(&key)),
            None => self.global.get(&key),
        };
        if let Some(&existing) = existing {
            let previous = self.get(existing);
            return Err(Error::semantic(
                new.line,
                format!(
                    "Duplicate {} '{}' (previously declared at line {})",
                    category, new.name, previous.line
                ),
            ));
        }

        if let Some(owner) = owner {
            if let Some(shadowed) = self.lookup(Some(owner), category, &new.name) {
                let shadowed = self.get(shadowed);
                if !shadowed.is_deprecated() {
                    return Err(Error::semantic(
                        new.line,
                        format!(
                            "{} '{}' shadows a {} declared in an enclosing scope",
                            category, new.name, category
                        ),
                    ));
                }
            }
        }

        let id = EntityId::from_index(self.entities.len());
        self.entities.push(EntityDescriptor {
            id,
            name: new.name,
            data: new.data,
            super_entity: None,
            raw_super: new.raw_super,
            outer: new.outer,
            properties: Vec::new(),
            functions: Vec::new(),
            children: Vec::new(),
            metadata: Metadata::new(),
            unit: new.unit,
            module: new.module,
            line: new.line,
            complete: false,
        });

        match owner {
            Some(owner) => {
                self.scoped.entry(owner).or_default().insert(key, id);
                self.get_mut(owner).children.push(id);
            }
            None => {
                self.global.insert(key, id);
            }
        }
        Ok(id)
    }

    /// Global lookup in one category.
    pub fn find(&self, category: Category, name: &str) -> Option<EntityId> {
        self.global.get(&(category, name.to_string())).copied()
    }

    /// Scoped lookup in one category.
    pub fn lookup(&self, scope: Option<EntityId>, category: Category, name: &str) -> Option<EntityId> {
        let key = (category, name.to_string());
        self.scopes(scope)
            .into_iter()
            .find_map(|names| names.get(&key).copied())
    }

    /// Name maps visible from `scope`, innermost first: the entity and its
    /// super chain, then each enclosing entity the same way, then global.
    fn scopes(&self, scope: Option<EntityId>) -> Vec<&NameMap> {
        let mut maps = Vec::new();
        let mut enclosing = scope;
        while let Some(owner) = enclosing {
            for id in std::iter::once(owner).chain(self.super_chain(owner)) {
                if let Some(names) = self.scoped.get(&id) {
                    maps.push(names);
                }
            }
            enclosing = self.get(owner).owner();
        }
        maps.push(&self.global);
        maps
    }

    /// Link `id` to its super entity, rejecting cycles.
    pub fn set_super(&mut self, id: EntityId, super_id: EntityId, line: u32) -> Result<()> {
        if super_id == id || self.is_child_of(super_id, id) {
            return Err(Error::dependency(
                line,
                format!(
                    "'{}' cannot inherit from '{}': inheritance would be circular",
                    self.get(id).name,
                    self.get(super_id).name
                ),
            ));
        }
        self.get_mut(id).super_entity = Some(super_id);
        Ok(())
    }

    /// Super entities of `id`, nearest first, excluding `id` itself.
    pub fn super_chain(&self, id: EntityId) -> SuperChain<'_> {
        SuperChain {
            registry: self,
            next: self.get(id).super_entity,
        }
    }

    pub fn is_child_of(&self, id: EntityId, ancestor: EntityId) -> bool {
        self.super_chain(id).any(|s| s == ancestor)
    }

    /// Names of `id` and its ancestors, nearest first.
    pub fn lineage(&self, id: EntityId) -> Vec<&str> {
        std::iter::once(id)
            .chain(self.super_chain(id))
            .map(|e| self.get(e).name.as_str())
            .collect()
    }

    /// Find a property declared by an ancestor of `id`.
    pub fn find_inherited_property(&self, id: EntityId, name: &str) -> Option<(EntityId, &PropertyDescriptor)> {
        self.super_chain(id)
            .find_map(|s| self.get(s).find_property(name).map(|p| (s, p)))
    }

    /// Find a function declared by an ancestor of `id`.
    pub fn find_inherited_function(&self, id: EntityId, name: &str) -> Option<FunctionRef> {
        self.super_chain(id).find_map(|s| {
            self.get(s)
                .find_function(name)
                .map(|index| FunctionRef { owner: s, index })
        })
    }

    /// Entities declared at package scope or nested, for one module, in
    /// registration order.
    pub fn module_entities<'a>(&'a self, module: &'a str) -> impl Iterator<Item = &'a EntityDescriptor> + 'a {
        self.entities.iter().filter(move |e| e.module == module)
    }
}

/// Iterator over a super chain.
pub struct SuperChain<'a> {
    registry: &'a Registry,
    next: Option<EntityId>,
}

impl Iterator for SuperChain<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        let current = self.next?;
        self.next = self.registry.get(current).super_entity;
        Some(current)
    }
}
