//! The sql facet: storage mapping and relational constraint synthesis.

pub mod model;
pub mod script;
pub mod synthesize;

pub use model::{
    CheckConstraint, Column, Derived, ForeignKey, FunctionConstraint, Index, Origin,
    SqlSchemaView, Table, Trigger, TriggerEvent, Validation, DEFAULT_SCHEMA,
};
pub use script::{schema_script, script};
pub use synthesize::post_verify;

use crate::facet::{names, ElementKind, FacetCatalogBuilder};

pub(crate) fn register_facets(builder: &mut FacetCatalogBuilder) {
    builder.register(ElementKind::Schema, names::SQL, model::SqlSchemaView::new);
    builder.register(ElementKind::ObjectType, names::SQL, model::Table::new);
    builder.register(ElementKind::Attribute, names::SQL, model::Column::new);
}
