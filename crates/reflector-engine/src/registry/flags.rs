//! Flag sets for classes, structs, functions and properties.
//!
//! Bit values match the runtime's registration ABI, since they are emitted
//! verbatim into generated code.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

macro_rules! flag_set {
    ($(#[$meta:meta])* $name:ident($repr:ty)) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name($repr);

        impl $name {
            /// No flags set
            pub const EMPTY: Self = Self(0);

            /// Create from raw bits
            pub const fn from_bits(bits: $repr) -> Self {
                Self(bits)
            }

            /// Get raw bits
            pub const fn bits(&self) -> $repr {
                self.0
            }

            pub const fn is_empty(&self) -> bool {
                self.0 == 0
            }

            /// Check if every flag in `other` is set
            pub const fn contains(&self, other: Self) -> bool {
                (self.0 & other.0) == other.0
            }

            /// Check if any flag in `other` is set
            pub const fn intersects(&self, other: Self) -> bool {
                (self.0 & other.0) != 0
            }

            pub const fn union(&self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            pub const fn intersection(&self, other: Self) -> Self {
                Self(self.0 & other.0)
            }

            /// Difference (remove flags)
            pub const fn difference(&self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }

            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }

            pub fn set(&mut self, other: Self, value: bool) {
                if value {
                    self.insert(other);
                } else {
                    self.remove(other);
                }
            }
        }

        impl BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl Not for $name {
            type Output = Self;
            fn not(self) -> Self {
                Self(!self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.0)
            }
        }
    };
}

flag_set!(
    /// Class flags
    ClassFlags(u32)
);

impl ClassFlags {
    pub const ABSTRACT: Self = Self(0x0000_0001);
    pub const DEFAULT_CONFIG: Self = Self(0x0000_0002);
    pub const CONFIG: Self = Self(0x0000_0004);
    pub const TRANSIENT: Self = Self(0x0000_0008);
    pub const PARSED: Self = Self(0x0000_0010);
    pub const NATIVE: Self = Self(0x0000_0080);
    pub const NO_EXPORT: Self = Self(0x0000_0100);
    pub const NOT_PLACEABLE: Self = Self(0x0000_0200);
    pub const PER_OBJECT_CONFIG: Self = Self(0x0000_0400);
    pub const EDIT_INLINE_NEW: Self = Self(0x0000_1000);
    pub const COLLAPSE_CATEGORIES: Self = Self(0x0000_2000);
    pub const INTERFACE: Self = Self(0x0000_4000);
    pub const CUSTOM_CONSTRUCTOR: Self = Self(0x0000_8000);
    pub const CONST: Self = Self(0x0001_0000);
    pub const MINIMAL_API: Self = Self(0x0008_0000);
    pub const REQUIRED_API: Self = Self(0x0010_0000);
    pub const DEFAULT_TO_INSTANCED: Self = Self(0x0020_0000);
    pub const GLOBAL_USER_CONFIG: Self = Self(0x0040_0000);
    pub const HAS_INSTANCED_REFERENCE: Self = Self(0x0080_0000);
    pub const HIDE_DROP_DOWN: Self = Self(0x0100_0000);
    pub const DEPRECATED: Self = Self(0x0200_0000);
    pub const INTRINSIC: Self = Self(0x1000_0000);
    pub const CONFIG_DO_NOT_CHECK_DEFAULTS: Self = Self(0x4000_0000);

    /// Flags a class takes from its super class.
    pub const INHERIT: Self = Self(
        Self::TRANSIENT.0
            | Self::DEFAULT_CONFIG.0
            | Self::CONFIG.0
            | Self::PER_OBJECT_CONFIG.0
            | Self::CONFIG_DO_NOT_CHECK_DEFAULTS.0
            | Self::NOT_PLACEABLE.0
            | Self::CONST.0
            | Self::HAS_INSTANCED_REFERENCE.0
            | Self::DEPRECATED.0
            | Self::DEFAULT_TO_INSTANCED.0
            | Self::GLOBAL_USER_CONFIG.0,
    );

    /// Flags the class registration code bakes in.
    pub const SAVE_IN_COMPILED_IN_CLASSES: Self = Self(
        Self::ABSTRACT.0
            | Self::DEFAULT_CONFIG.0
            | Self::GLOBAL_USER_CONFIG.0
            | Self::CONFIG.0
            | Self::TRANSIENT.0
            | Self::NATIVE.0
            | Self::NOT_PLACEABLE.0
            | Self::PER_OBJECT_CONFIG.0
            | Self::CONFIG_DO_NOT_CHECK_DEFAULTS.0
            | Self::EDIT_INLINE_NEW.0
            | Self::COLLAPSE_CATEGORIES.0
            | Self::INTERFACE.0
            | Self::DEFAULT_TO_INSTANCED.0
            | Self::HAS_INSTANCED_REFERENCE.0
            | Self::HIDE_DROP_DOWN.0
            | Self::DEPRECATED.0
            | Self::INTRINSIC.0
            | Self::CONST.0
            | Self::MINIMAL_API.0
            | Self::REQUIRED_API.0,
    );
}

flag_set!(
    /// Struct flags
    StructFlags(u32)
);

impl StructFlags {
    pub const NATIVE: Self = Self(0x0000_0001);
    pub const IDENTICAL_NATIVE: Self = Self(0x0000_0002);
    pub const HAS_INSTANCED_REFERENCE: Self = Self(0x0000_0004);
    pub const NO_EXPORT: Self = Self(0x0000_0008);
    pub const ATOMIC: Self = Self(0x0000_0010);
    pub const IMMUTABLE: Self = Self(0x0000_0020);
    pub const REQUIRED_API: Self = Self(0x0000_0200);

    /// Flags a struct takes from its base struct.
    pub const INHERIT: Self = Self(Self::HAS_INSTANCED_REFERENCE.0 | Self::ATOMIC.0);
}

flag_set!(
    /// Function flags
    FunctionFlags(u32)
);

impl FunctionFlags {
    pub const FINAL: Self = Self(0x0000_0001);
    pub const REQUIRED_API: Self = Self(0x0000_0002);
    pub const BLUEPRINT_AUTHORITY_ONLY: Self = Self(0x0000_0004);
    pub const BLUEPRINT_COSMETIC: Self = Self(0x0000_0008);
    pub const NET: Self = Self(0x0000_0040);
    pub const NET_RELIABLE: Self = Self(0x0000_0080);
    pub const NET_REQUEST: Self = Self(0x0000_0100);
    pub const EXEC: Self = Self(0x0000_0200);
    pub const NATIVE: Self = Self(0x0000_0400);
    pub const EVENT: Self = Self(0x0000_0800);
    pub const NET_RESPONSE: Self = Self(0x0000_1000);
    pub const STATIC: Self = Self(0x0000_2000);
    pub const NET_MULTICAST: Self = Self(0x0000_4000);
    pub const MULTICAST_DELEGATE: Self = Self(0x0001_0000);
    pub const PUBLIC: Self = Self(0x0002_0000);
    pub const PRIVATE: Self = Self(0x0004_0000);
    pub const PROTECTED: Self = Self(0x0008_0000);
    pub const DELEGATE: Self = Self(0x0010_0000);
    pub const NET_SERVER: Self = Self(0x0020_0000);
    pub const HAS_OUT_PARMS: Self = Self(0x0040_0000);
    pub const HAS_DEFAULTS: Self = Self(0x0080_0000);
    pub const NET_CLIENT: Self = Self(0x0100_0000);
    pub const DLL_IMPORT: Self = Self(0x0200_0000);
    pub const BLUEPRINT_CALLABLE: Self = Self(0x0400_0000);
    pub const BLUEPRINT_EVENT: Self = Self(0x0800_0000);
    pub const BLUEPRINT_PURE: Self = Self(0x1000_0000);
    pub const CONST: Self = Self(0x4000_0000);
    pub const NET_VALIDATE: Self = Self(0x8000_0000);

    /// Flags an override takes from the function it overrides.
    pub const INHERIT: Self = Self(
        Self::EXEC.0
            | Self::EVENT.0
            | Self::BLUEPRINT_CALLABLE.0
            | Self::BLUEPRINT_EVENT.0
            | Self::BLUEPRINT_AUTHORITY_ONLY.0
            | Self::BLUEPRINT_COSMETIC.0,
    );

    /// Replication flags. An override may not redefine them.
    pub const NET_FUNC_FLAGS: Self = Self(
        Self::NET.0
            | Self::NET_RELIABLE.0
            | Self::NET_SERVER.0
            | Self::NET_CLIENT.0
            | Self::NET_MULTICAST.0,
    );

    /// Flags that must agree between an override and the original.
    pub const OVERRIDE_MATCH: Self = Self(Self::EXEC.0 | Self::STATIC.0);
}

flag_set!(
    /// Property flags
    PropertyFlags(u64)
);

impl PropertyFlags {
    pub const EDIT: Self = Self(0x0000_0000_0000_0001);
    pub const CONST_PARM: Self = Self(0x0000_0000_0000_0002);
    pub const BLUEPRINT_VISIBLE: Self = Self(0x0000_0000_0000_0004);
    pub const EXPORT_OBJECT: Self = Self(0x0000_0000_0000_0008);
    pub const BLUEPRINT_READ_ONLY: Self = Self(0x0000_0000_0000_0010);
    pub const NET: Self = Self(0x0000_0000_0000_0020);
    pub const EDIT_FIXED_SIZE: Self = Self(0x0000_0000_0000_0040);
    pub const PARM: Self = Self(0x0000_0000_0000_0080);
    pub const OUT_PARM: Self = Self(0x0000_0000_0000_0100);
    pub const ZERO_CONSTRUCTOR: Self = Self(0x0000_0000_0000_0200);
    pub const RETURN_PARM: Self = Self(0x0000_0000_0000_0400);
    pub const DISABLE_EDIT_ON_TEMPLATE: Self = Self(0x0000_0000_0000_0800);
    pub const REP_RETRY: Self = Self(0x0000_0000_0000_1000);
    pub const TRANSIENT: Self = Self(0x0000_0000_0000_2000);
    pub const CONFIG: Self = Self(0x0000_0000_0000_4000);
    pub const LOCALIZED: Self = Self(0x0000_0000_0000_8000);
    pub const DISABLE_EDIT_ON_INSTANCE: Self = Self(0x0000_0000_0001_0000);
    pub const EDIT_CONST: Self = Self(0x0000_0000_0002_0000);
    pub const GLOBAL_CONFIG: Self = Self(0x0000_0000_0004_0000);
    pub const INSTANCED_REFERENCE: Self = Self(0x0000_0000_0008_0000);
    pub const DUPLICATE_TRANSIENT: Self = Self(0x0000_0000_0020_0000);
    pub const SUBOBJECT_REFERENCE: Self = Self(0x0000_0000_0040_0000);
    pub const SAVE_GAME: Self = Self(0x0000_0000_0100_0000);
    pub const NO_CLEAR: Self = Self(0x0000_0000_0200_0000);
    pub const REFERENCE_PARM: Self = Self(0x0000_0000_0800_0000);
    pub const BLUEPRINT_ASSIGNABLE: Self = Self(0x0000_0000_1000_0000);
    pub const DEPRECATED: Self = Self(0x0000_0000_2000_0000);
    pub const IS_PLAIN_OLD_DATA: Self = Self(0x0000_0000_4000_0000);
    pub const REP_SKIP: Self = Self(0x0000_0000_8000_0000);
    pub const REP_NOTIFY: Self = Self(0x0000_0001_0000_0000);
    pub const INTERP: Self = Self(0x0000_0002_0000_0000);
    pub const NON_TRANSACTIONAL: Self = Self(0x0000_0004_0000_0000);
    pub const EDITOR_ONLY: Self = Self(0x0000_0008_0000_0000);
    pub const NO_DESTRUCTOR: Self = Self(0x0000_0010_0000_0000);
    pub const AUTO_WEAK: Self = Self(0x0000_0040_0000_0000);
    pub const CONTAINS_INSTANCED_REFERENCE: Self = Self(0x0000_0080_0000_0000);
    pub const ASSET_REGISTRY_SEARCHABLE: Self = Self(0x0000_0100_0000_0000);
    pub const SIMPLE_DISPLAY: Self = Self(0x0000_0200_0000_0000);
    pub const ADVANCED_DISPLAY: Self = Self(0x0000_0400_0000_0000);
    pub const PROTECTED: Self = Self(0x0000_0800_0000_0000);
    pub const BLUEPRINT_CALLABLE: Self = Self(0x0000_1000_0000_0000);
    pub const BLUEPRINT_AUTHORITY_ONLY: Self = Self(0x0000_2000_0000_0000);
    pub const TEXT_EXPORT_TRANSIENT: Self = Self(0x0000_4000_0000_0000);
    pub const NON_PIE_DUPLICATE_TRANSIENT: Self = Self(0x0000_8000_0000_0000);
    pub const EXPOSE_ON_SPAWN: Self = Self(0x0001_0000_0000_0000);
    pub const PERSISTENT_INSTANCE: Self = Self(0x0002_0000_0000_0000);
    pub const UOBJECT_WRAPPER: Self = Self(0x0004_0000_0000_0000);
    pub const NATIVE_ACCESS_PUBLIC: Self = Self(0x0010_0000_0000_0000);
    pub const NATIVE_ACCESS_PROTECTED: Self = Self(0x0020_0000_0000_0000);
    pub const NATIVE_ACCESS_PRIVATE: Self = Self(0x0040_0000_0000_0000);

    /// Flags that only make sense on class members.
    pub const CLASS_ONLY: Self = Self(
        Self::TRANSIENT.0
            | Self::DUPLICATE_TRANSIENT.0
            | Self::TEXT_EXPORT_TRANSIENT.0
            | Self::NON_PIE_DUPLICATE_TRANSIENT.0
            | Self::CONFIG.0
            | Self::GLOBAL_CONFIG.0,
    );

    /// Flags an outer container property passes to its element properties.
    pub const PROPAGATE_TO_INNER: Self = Self(
        Self::EXPORT_OBJECT.0
            | Self::PERSISTENT_INSTANCE.0
            | Self::INSTANCED_REFERENCE.0
            | Self::CONTAINS_INSTANCED_REFERENCE.0
            | Self::CONFIG.0
            | Self::EDIT_CONST.0
            | Self::DEPRECATED.0
            | Self::EDITOR_ONLY.0
            | Self::AUTO_WEAK.0
            | Self::UOBJECT_WRAPPER.0,
    );

    /// Flags computed by the runtime, never emitted.
    pub const COMPUTED: Self = Self(
        Self::IS_PLAIN_OLD_DATA.0 | Self::NO_DESTRUCTOR.0 | Self::ZERO_CONSTRUCTOR.0,
    );

    /// Flags that only make sense for function parameters.
    pub const PARM_FLAGS: Self = Self(
        Self::PARM.0
            | Self::OUT_PARM.0
            | Self::RETURN_PARM.0
            | Self::REFERENCE_PARM.0
            | Self::CONST_PARM.0,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove() {
        let mut flags = ClassFlags::EMPTY;
        flags.insert(ClassFlags::ABSTRACT | ClassFlags::CONFIG);
        assert!(flags.contains(ClassFlags::ABSTRACT));
        flags.remove(ClassFlags::ABSTRACT);
        assert!(!flags.contains(ClassFlags::ABSTRACT));
        assert!(flags.intersects(ClassFlags::INHERIT));
    }

    #[test]
    fn test_inherit_masks() {
        assert!(ClassFlags::INHERIT.contains(ClassFlags::DEPRECATED));
        assert!(!ClassFlags::INHERIT.contains(ClassFlags::ABSTRACT));
        assert!(FunctionFlags::INHERIT.contains(FunctionFlags::BLUEPRINT_EVENT));
        assert!(!FunctionFlags::INHERIT.contains(FunctionFlags::NET));
    }

    #[test]
    fn test_property_flag_width() {
        assert_eq!(PropertyFlags::NATIVE_ACCESS_PRIVATE.bits(), 0x0040_0000_0000_0000);
        assert!((PropertyFlags::EDIT | PropertyFlags::EDITOR_ONLY)
            .difference(PropertyFlags::EDIT)
            .contains(PropertyFlags::EDITOR_ONLY));
    }
}
