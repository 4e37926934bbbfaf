//! Names of the generated singleton accessors.
//!
//! Every registered object is built on demand by a `Z_Construct_*`
//! function; other generated code refers to it by calling that function.

use crate::registry::{Category, EntityId, Outer, Registry};

/// Runtime type returned by a singleton accessor.
pub fn object_type(category: Category) -> &'static str {
    match category {
        Category::Class => "UClass",
        Category::Struct => "UScriptStruct",
        Category::Enum => "UEnum",
        Category::Delegate => "UFunction",
    }
}

/// Accessor for any registered entity.
pub fn entity(registry: &Registry, id: EntityId) -> String {
    let entity = registry.get(id);
    let scope = match &entity.outer {
        Outer::Package(module) => module.as_str(),
        Outer::Entity(owner) => registry.get(*owner).name.as_str(),
    };
    match entity.category() {
        Category::Class => format!("Z_Construct_UClass_{}()", entity.name),
        Category::Struct => match entity.outer {
            Outer::Package(_) => format!("Z_Construct_UScriptStruct_{}()", entity.name),
            Outer::Entity(_) => format!("Z_Construct_UScriptStruct_{}_{}()", scope, entity.name),
        },
        Category::Enum => format!("Z_Construct_UEnum_{}_{}()", scope, entity.name),
        Category::Delegate => format!("Z_Construct_UFunction_{}_{}()", scope, entity.name),
    }
}

/// Class accessor that returns the class without registering it.
pub fn no_register(class_name: &str) -> String {
    format!("Z_Construct_UClass_{}_NoRegister()", class_name)
}

pub fn function(owner: &str, name: &str) -> String {
    format!("Z_Construct_UFunction_{}_{}()", owner, name)
}

pub fn package(module: &str) -> String {
    format!("Z_Construct_UPackage_{}()", module)
}

/// Accessor name without the call parentheses.
pub fn symbol(singleton: &str) -> &str {
    singleton.strip_suffix("()").unwrap_or(singleton)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::unit::UnitId;
    use crate::registry::{ClassData, EntityData, EnumData, EnumForm, FunctionDescriptor, NewEntity};

    fn add(registry: &mut Registry, name: &str, data: EntityData, outer: Outer) -> EntityId {
        registry
            .add(NewEntity {
                name: name.to_string(),
                data,
                outer,
                raw_super: None,
                unit: UnitId::from_index(0),
                module: "Game".to_string(),
                line: 1,
            })
            .unwrap()
    }

    #[test]
    fn test_scoped_names() {
        let mut registry = Registry::new();
        let game = Outer::Package("Game".to_string());
        let class = add(&mut registry, "UThing", EntityData::Class(ClassData::default()), game.clone());
        let enum_data = EnumData {
            form: EnumForm::Regular,
            values: Vec::new(),
            underlying: None,
        };
        let global_enum = add(&mut registry, "EColor", EntityData::Enum(enum_data.clone()), game);
        let nested_enum = add(&mut registry, "EMode", EntityData::Enum(enum_data), Outer::Entity(class));
        let delegate = add(
            &mut registry,
            "OnHit__DelegateSignature",
            EntityData::Delegate(FunctionDescriptor::new("OnHit__DelegateSignature", 1)),
            Outer::Entity(class),
        );

        assert_eq!(entity(&registry, class), "Z_Construct_UClass_UThing()");
        assert_eq!(entity(&registry, global_enum), "Z_Construct_UEnum_Game_EColor()");
        assert_eq!(entity(&registry, nested_enum), "Z_Construct_UEnum_UThing_EMode()");
        assert_eq!(
            entity(&registry, delegate),
            "Z_Construct_UFunction_UThing_OnHit__DelegateSignature()"
        );
        assert_eq!(no_register("UThing"), "Z_Construct_UClass_UThing_NoRegister()");
        assert_eq!(symbol(&package("Game")), "Z_Construct_UPackage_Game");
    }
}
