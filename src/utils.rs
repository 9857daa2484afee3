//! Naming helpers shared by facets and the generator.

use convert_case::{Case, Casing};

/// Convert a string to snake_case
pub fn to_snake_case(s: &str) -> String {
    s.to_case(Case::Snake)
}

/// Convert a string to PascalCase
pub fn to_pascal_case(s: &str) -> String {
    s.to_case(Case::Pascal)
}

/// Convert a string to camelCase
pub fn to_camel_case(s: &str) -> String {
    s.to_case(Case::Camel)
}

/// Convert a dotted package name to a directory path (`a.b.c` -> `a/b/c`).
pub fn package_to_path(package: &str) -> String {
    package.replace('.', "/")
}
