//! Schema-level enumeration definitions.

use crate::facet::{ElementKind, ElementRef, Facets};
use indexmap::IndexMap;

/// The declared value set of an enumeration: either name-to-integer
/// pairs or a plain list of textual values.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumerationValues {
    Numeric(IndexMap<String, i64>),
    Textual(Vec<String>),
}

/// A named enumeration owned by a schema and referenced by attributes.
#[derive(Debug)]
pub struct Enumeration {
    name: String,
    pub(crate) schema: String,
    values: EnumerationValues,
    facets: Facets,
}

impl Enumeration {
    pub fn numeric(name: impl Into<String>, values: IndexMap<String, i64>) -> Self {
        Enumeration {
            name: name.into(),
            schema: String::new(),
            values: EnumerationValues::Numeric(values),
            facets: Facets::default(),
        }
    }

    pub fn textual(name: impl Into<String>, values: Vec<String>) -> Self {
        Enumeration {
            name: name.into(),
            schema: String::new(),
            values: EnumerationValues::Textual(values),
            facets: Facets::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn element_ref(&self) -> ElementRef {
        ElementRef::new(ElementKind::Enumeration, self.path())
    }

    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    pub fn values(&self) -> &EnumerationValues {
        &self.values
    }

    pub fn numeric_values(&self) -> bool {
        matches!(self.values, EnumerationValues::Numeric(_))
    }

    pub fn textual_values(&self) -> bool {
        matches!(self.values, EnumerationValues::Textual(_))
    }

    /// Numeric values in ascending order. Empty for textual enumerations.
    pub fn sorted_numeric_values(&self) -> Vec<i64> {
        match &self.values {
            EnumerationValues::Numeric(values) => {
                let mut sorted: Vec<i64> = values.values().copied().collect();
                sorted.sort_unstable();
                sorted
            }
            EnumerationValues::Textual(_) => Vec::new(),
        }
    }

    /// Textual values in declaration order. Empty for numeric enumerations.
    pub fn textual_value_list(&self) -> Vec<&str> {
        match &self.values {
            EnumerationValues::Textual(values) => values.iter().map(String::as_str).collect(),
            EnumerationValues::Numeric(_) => Vec::new(),
        }
    }

    /// Length of the longest textual value; storage sizing for textual
    /// enumeration columns.
    pub fn max_textual_length(&self) -> Option<u32> {
        match &self.values {
            EnumerationValues::Textual(values) => {
                values.iter().map(|v| v.len() as u32).max()
            }
            EnumerationValues::Numeric(_) => None,
        }
    }
}
