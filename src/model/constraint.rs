//! Cross-attribute constraint declarations.
//!
//! These are declared on the owning object type, independent of any
//! facet; the sql facet derives concrete relational artifacts from them
//! during synthesis.

/// A set of attributes that must be jointly unique.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueConstraint {
    pub attribute_names: Vec<String>,
}

/// A named group of attributes that must be all-null or all-non-null together.
#[derive(Debug, Clone, PartialEq)]
pub struct CodependentConstraint {
    pub name: String,
    pub attribute_names: Vec<String>,
}

/// A named group of attributes of which at most one may be non-null.
#[derive(Debug, Clone, PartialEq)]
pub struct IncompatibleConstraint {
    pub name: String,
    pub attribute_names: Vec<String>,
}

/// An attribute whose non-null value requires other attributes to be non-null.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyConstraint {
    pub name: String,
    pub attribute_name: String,
    pub dependent_attribute_names: Vec<String>,
}

/// A self-referential scope check: following `attribute_name_path` from
/// the owning row must land on a value consistent with the designated
/// scoping attribute on the type `attribute_name` points at.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleConstraint {
    pub name: String,
    pub attribute_name: String,
    pub attribute_name_path: Vec<String>,
    pub scoping_attribute: String,
}
