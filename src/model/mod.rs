//! Schema metamodel: schemas, object types, attributes, relationships,
//! and declared cross-attribute constraints.
//!
//! The metamodel is built through a validating builder API, then linked
//! and checked by [`schema::SchemaSet::verify`] before any facet runs
//! its synthesis pass.

pub mod attribute;
pub mod constraint;
pub mod enumeration;
pub mod object_type;
pub mod schema;
pub mod service;

pub use attribute::{Attribute, CollectionType, InverseKind, RefAction, ReferenceInfo};
pub use constraint::{
    CodependentConstraint, CycleConstraint, DependencyConstraint, IncompatibleConstraint,
    UniqueConstraint,
};
pub use enumeration::{Enumeration, EnumerationValues};
pub use object_type::ObjectType;
pub use schema::{Schema, SchemaSet};
pub use service::{Message, Method, Parameter, Service};
