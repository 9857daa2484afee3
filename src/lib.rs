//! # Metagen: Metadata-Driven Code Generation Framework
//!
//! Metagen lets a team declare an abstract schema once — entities,
//! attributes, relationships, constraints — and render it through
//! pluggable facets into many target artifacts: SQL DDL and triggers,
//! Java interfaces, JPA persistence beans, GWT client stubs, and more.
//!
//! ## Features
//!
//! - **Schema metamodel**: object types with single inheritance,
//!   attributes, references, enumerations, and declared cross-attribute
//!   constraints, built through a validating builder API
//! - **Facet extension**: per-element views (sql, java, jpa, gwt, imit)
//!   attached lazily through a sealed catalog, so the core model knows
//!   nothing about facet code
//! - **Constraint synthesis**: indexes, foreign keys, check constraints,
//!   and trigger bodies derived from high-level declarations in a fixed,
//!   idempotent pass
//! - **Type mapping**: default vs boundary representation types, where a
//!   relationship degrades to its key type at a service boundary
//! - **YAML configuration**: one schema per file, loaded through serde
//!
//! ## Example: declaring a schema
//!
//! ```yaml
//! schema: core
//! java:
//!   package: epwp.model
//! sql:
//!   schema: dbo
//! object_types:
//!   - name: Submission
//!     attributes:
//!       - name: ID
//!         type: integer
//!         primary_key: true
//!         generated_value: true
//!       - name: User
//!         type: reference
//!         references: User
//!         immutable: true
//! ```

// Core registries and the extension mechanism
pub mod error;
pub mod facet;
pub mod typedb;

// Schema metamodel
pub mod model;

// Facets
pub mod gwt;
pub mod java;
pub mod sql;

// Renderer boundary and configuration loading
pub mod generator;
pub mod loader;
pub mod utils;

// Re-export key types
pub use error::{ConfigError, GenerateError};
pub use facet::{ElementKind, ElementRef, FacetCatalog, FacetCatalogBuilder, FacetView};
pub use generator::{RenderTarget, Template, TemplateEngine, TemplateSet};
pub use loader::{load_schema_doc, load_schema_set};
pub use model::{
    Attribute, Enumeration, Message, Method, ObjectType, Parameter, Schema, SchemaSet, Service,
};
pub use typedb::TypeDb;

/// Initialize and seal the process-wide registries: the characteristic
/// type registry and the facet catalog with the built-in facets.
///
/// Must run before any schema construction. Idempotent, so libraries
/// and tests may call it freely.
pub fn init() {
    TypeDb::bootstrap();
    facet::FacetCatalog::bootstrap_with(register_standard_facets);
}

/// As [`init`], additionally registering custom facet views. The extra
/// registrations only take effect on the first initialization of the
/// process.
pub fn init_with(register: impl FnOnce(&mut FacetCatalogBuilder)) {
    TypeDb::bootstrap();
    facet::FacetCatalog::bootstrap_with(|builder| {
        register_standard_facets(builder);
        register(builder);
    });
}

fn register_standard_facets(builder: &mut FacetCatalogBuilder) {
    sql::register_facets(builder);
    java::register_facets(builder);
    gwt::register_facets(builder);
    #[cfg(test)]
    facet::probe::register(builder);
}
