//! Static type descriptors
//!
//! A process-wide, read-only table of per-type metadata. Comparison itself
//! dispatches on the variant's shape; this table backs the dynamic
//! predicates (is a string? is numeric? value-dependent size?) queried from
//! the script bridge and display code.

use super::UnderlyingType;
use once_cell::sync::Lazy;
use seeker_common::ScalarType;
use std::collections::HashMap;

/// Static descriptor for one underlying variant type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeTraits {
    /// Canonical display name
    pub name: &'static str,
    /// Fixed wire size; zero when the size depends on the value
    pub size: usize,
    pub numeric: bool,
    pub string: bool,
    pub structure: bool,
    /// Size depends on the specific value (strings and structures)
    pub dynamic: bool,
}

static NULL_TRAITS: TypeTraits = TypeTraits {
    name: "null",
    size: 0,
    numeric: false,
    string: false,
    structure: false,
    dynamic: false,
};

static TRAITS_TABLE: Lazy<HashMap<UnderlyingType, TypeTraits>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for ty in ScalarType::ALL {
        table.insert(
            UnderlyingType::Scalar(ty),
            TypeTraits {
                name: ty.name(),
                size: ty.size(),
                numeric: true,
                string: false,
                structure: false,
                dynamic: false,
            },
        );
    }
    table.insert(
        UnderlyingType::AsciiString,
        TypeTraits {
            name: "ascii string",
            size: 0,
            numeric: false,
            string: true,
            structure: false,
            dynamic: true,
        },
    );
    table.insert(
        UnderlyingType::WideString,
        TypeTraits {
            name: "wide string",
            size: 0,
            numeric: false,
            string: true,
            structure: false,
            dynamic: true,
        },
    );
    table.insert(
        UnderlyingType::Structure,
        TypeTraits {
            name: "struct",
            size: 0,
            numeric: false,
            string: false,
            structure: true,
            dynamic: true,
        },
    );
    table.insert(UnderlyingType::Null, NULL_TRAITS);
    table
});

/// Look up the descriptor for an underlying type
pub fn traits_for(ty: UnderlyingType) -> &'static TypeTraits {
    TRAITS_TABLE.get(&ty).unwrap_or(&NULL_TRAITS)
}
