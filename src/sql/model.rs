//! Relational artifacts owned by the sql facet views.
//!
//! Derived artifacts are kept in name-keyed ordered arenas on the table
//! view. Every artifact is tagged with its provenance: `Owned` by the
//! table, or `Inherited` from a parent table. Synthesis stages skip work
//! when an owned artifact of the derived name already exists and replace
//! inherited ones, which makes the whole pass idempotent; explicit
//! declarations collide fatally with owned artifacts and override
//! inherited ones.

use crate::error::ConfigError;
use crate::facet::{self, names, ElementRef, FacetView};
use crate::model::{Attribute, ObjectType, RefAction, Schema, SchemaSet};
use crate::typedb::TypeDb;
use indexmap::IndexMap;
use serde_yaml::Value;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Storage schema name used when none is configured.
pub const DEFAULT_SCHEMA: &str = "dbo";

/// Provenance of a derived artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Owned,
    Inherited { from: String },
}

impl Origin {
    pub fn is_inherited(&self) -> bool {
        matches!(self, Origin::Inherited { .. })
    }
}

/// An artifact together with its provenance tag.
#[derive(Debug, Clone)]
pub struct Derived<T> {
    pub origin: Origin,
    pub value: T,
}

/// Events a trigger or validation fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

impl TriggerEvent {
    pub fn as_sql(&self) -> &'static str {
        match self {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
            TriggerEvent::Delete => "DELETE",
        }
    }
}

/// An index on a table.
#[derive(Debug, Clone)]
pub struct Index {
    object_type: String,
    pub attribute_names: Vec<String>,
    pub include_attribute_names: Vec<String>,
    pub filter: Option<String>,
    pub unique: bool,
    pub cluster: bool,
}

impl Index {
    pub fn new(object_type: &str, attribute_names: Vec<String>) -> Self {
        Index {
            object_type: object_type.to_string(),
            attribute_names,
            include_attribute_names: Vec::new(),
            filter: None,
            unique: false,
            cluster: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn cluster(mut self) -> Self {
        self.cluster = true;
        self
    }

    pub fn include(mut self, attribute_names: Vec<String>) -> Self {
        self.include_attribute_names = attribute_names;
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Derived name: `CL_`/`UQ_`/`IX_` prefix, owning type, attribute list.
    pub fn name(&self) -> String {
        let prefix = if self.cluster {
            "CL"
        } else if self.unique {
            "UQ"
        } else {
            "IX"
        };
        format!(
            "{}_{}_{}",
            prefix,
            self.object_type,
            self.attribute_names.join("_")
        )
    }
}

/// A physical foreign key.
#[derive(Debug, Clone)]
pub struct ForeignKey {
    object_type: String,
    pub attribute_names: Vec<String>,
    pub referenced_object_type: String,
    pub referenced_attribute_names: Vec<String>,
    pub on_update: RefAction,
    pub on_delete: RefAction,
}

impl ForeignKey {
    pub fn new(
        object_type: &str,
        attribute_names: Vec<String>,
        referenced_object_type: impl Into<String>,
        referenced_attribute_names: Vec<String>,
    ) -> Self {
        ForeignKey {
            object_type: object_type.to_string(),
            attribute_names,
            referenced_object_type: referenced_object_type.into(),
            referenced_attribute_names,
            on_update: RefAction::NoAction,
            on_delete: RefAction::NoAction,
        }
    }

    pub fn on_update(mut self, action: RefAction) -> Self {
        self.on_update = action;
        self
    }

    pub fn on_delete(mut self, action: RefAction) -> Self {
        self.on_delete = action;
        self
    }

    pub fn name(&self) -> String {
        self.attribute_names.join("_")
    }

    pub fn foreign_key_name(&self) -> String {
        format!("FK_{}_{}", self.object_type, self.name())
    }
}

/// A check constraint over one row.
#[derive(Debug, Clone)]
pub struct CheckConstraint {
    object_type: String,
    pub name: String,
    pub sql: String,
    /// Whether the constraint must always hold, not just on insert/update.
    pub invariant: bool,
}

impl CheckConstraint {
    pub fn new(object_type: &str, name: impl Into<String>, sql: impl Into<String>) -> Self {
        CheckConstraint {
            object_type: object_type.to_string(),
            name: name.into(),
            sql: sql.into(),
            invariant: true,
        }
    }

    pub fn constraint_name(&self) -> String {
        format!("CK_{}_{}", self.object_type, self.name)
    }
}

/// A function-backed constraint taking column values as parameters.
#[derive(Debug, Clone)]
pub struct FunctionConstraint {
    object_type: String,
    pub name: String,
    /// Column names passed as `@`-parameters to the function body.
    pub parameters: Vec<String>,
    /// SQL selecting a row exactly when the constraint holds.
    pub positive_sql: String,
    pub common_table_expression: Option<String>,
    pub invariant: bool,
}

impl FunctionConstraint {
    pub fn new(
        object_type: &str,
        name: impl Into<String>,
        parameters: Vec<String>,
        positive_sql: impl Into<String>,
    ) -> Self {
        FunctionConstraint {
            object_type: object_type.to_string(),
            name: name.into(),
            parameters,
            positive_sql: positive_sql.into(),
            common_table_expression: None,
            invariant: true,
        }
    }

    pub fn constraint_name(&self) -> String {
        format!("CK_{}_{}", self.object_type, self.name)
    }
}

/// A cross-row validation, wrapped into a trigger during synthesis.
#[derive(Debug, Clone)]
pub struct Validation {
    pub name: String,
    /// SQL selecting rows exactly when the validation is violated.
    pub negative_sql: String,
    pub common_table_expression: Option<String>,
    /// Guard predicate; the validation only runs when the guard is true.
    pub guard: Option<String>,
    /// Fire events; insert and update when unset.
    pub after: Option<Vec<TriggerEvent>>,
}

impl Validation {
    pub fn new(name: impl Into<String>, negative_sql: impl Into<String>) -> Self {
        Validation {
            name: name.into(),
            negative_sql: negative_sql.into(),
            common_table_expression: None,
            guard: None,
            after: None,
        }
    }

    pub fn guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    pub fn after(mut self, after: Vec<TriggerEvent>) -> Self {
        self.after = Some(after);
        self
    }
}

/// A trigger with a generated body.
#[derive(Debug, Clone)]
pub struct Trigger {
    object_type: String,
    pub name: String,
    pub sql: String,
    pub after: Vec<TriggerEvent>,
    pub instead_of: Vec<TriggerEvent>,
}

impl Trigger {
    pub fn new(object_type: &str, name: impl Into<String>, sql: impl Into<String>) -> Self {
        Trigger {
            object_type: object_type.to_string(),
            name: name.into(),
            sql: sql.into(),
            after: vec![TriggerEvent::Insert, TriggerEvent::Update],
            instead_of: Vec::new(),
        }
    }

    pub fn after(mut self, after: Vec<TriggerEvent>) -> Self {
        self.after = after;
        self
    }

    pub fn trigger_name(&self) -> String {
        format!("trg{}{}", self.object_type, self.name)
    }
}

/// How an insert behaves when an owned artifact of the same name exists.
#[derive(Clone, Copy)]
enum OwnedCollision {
    Skip,
    Error,
}

fn insert_artifact<T>(
    arena: &mut IndexMap<String, Derived<T>>,
    name: String,
    value: T,
    on_owned: OwnedCollision,
    table: &str,
) -> Result<bool, ConfigError> {
    match arena.get(&name) {
        Some(existing) if !existing.origin.is_inherited() => match on_owned {
            OwnedCollision::Skip => Ok(false),
            OwnedCollision::Error => Err(ConfigError::ArtifactCollision {
                artifact: name,
                table: table.to_string(),
            }),
        },
        _ => {
            arena.insert(
                name,
                Derived {
                    origin: Origin::Owned,
                    value,
                },
            );
            Ok(true)
        }
    }
}

/// The sql facet view of an object type: the table and its derived artifacts.
pub struct Table {
    node: ElementRef,
    table_name: RefCell<Option<String>>,
    partition_scheme: RefCell<Option<String>>,
    indexes: RefCell<IndexMap<String, Derived<Index>>>,
    constraints: RefCell<IndexMap<String, Derived<CheckConstraint>>>,
    function_constraints: RefCell<IndexMap<String, Derived<FunctionConstraint>>>,
    validations: RefCell<IndexMap<String, Derived<Validation>>>,
    triggers: RefCell<IndexMap<String, Derived<Trigger>>>,
    foreign_keys: RefCell<IndexMap<String, Derived<ForeignKey>>>,
}

impl Table {
    pub(crate) fn new(node: ElementRef) -> Self {
        Table {
            node,
            table_name: RefCell::new(None),
            partition_scheme: RefCell::new(None),
            indexes: RefCell::new(IndexMap::new()),
            constraints: RefCell::new(IndexMap::new()),
            function_constraints: RefCell::new(IndexMap::new()),
            validations: RefCell::new(IndexMap::new()),
            triggers: RefCell::new(IndexMap::new()),
            foreign_keys: RefCell::new(IndexMap::new()),
        }
    }

    /// The sql view of an object type.
    pub fn of(object_type: &ObjectType) -> Rc<Table> {
        object_type
            .facets()
            .attach_typed::<Table>(object_type.element_ref(), names::SQL)
    }

    /// Local name of the owning object type.
    pub fn object_type_name(&self) -> &str {
        self.node.local_name()
    }

    pub fn table_name(&self) -> String {
        self.table_name
            .borrow()
            .clone()
            .unwrap_or_else(|| format!("tbl{}", self.object_type_name()))
    }

    pub fn qualified_table_name(&self, set: &SchemaSet) -> String {
        let schema = set
            .schema(self.node.schema_name())
            .expect("table owner schema exists");
        format!(
            "{}.{}",
            SqlSchemaView::of(schema).schema_name(),
            self.table_name()
        )
    }

    pub fn set_partition_scheme(&self, scheme: impl Into<String>) {
        *self.partition_scheme.borrow_mut() = Some(scheme.into());
    }

    pub fn partition_scheme(&self) -> Option<String> {
        self.partition_scheme.borrow().clone()
    }

    /// Declare an index. Colliding with an owned index is fatal.
    pub fn index(&self, index: Index) -> Result<(), ConfigError> {
        let name = index.name();
        insert_artifact(
            &mut self.indexes.borrow_mut(),
            name,
            index,
            OwnedCollision::Error,
            &self.table_name(),
        )
        .map(|_| ())
    }

    /// Declare a clustering index over the named attributes.
    pub fn cluster(&self, attribute_names: Vec<String>) -> Result<(), ConfigError> {
        self.index(Index::new(self.object_type_name(), attribute_names).cluster())
    }

    /// Derive an index, skipping silently if an owned one already exists.
    pub(crate) fn derive_index(&self, index: Index) -> Result<(), ConfigError> {
        let name = index.name();
        insert_artifact(
            &mut self.indexes.borrow_mut(),
            name,
            index,
            OwnedCollision::Skip,
            &self.table_name(),
        )
        .map(|_| ())
    }

    pub fn constraint(&self, constraint: CheckConstraint) -> Result<(), ConfigError> {
        let name = constraint.name.clone();
        insert_artifact(
            &mut self.constraints.borrow_mut(),
            name,
            constraint,
            OwnedCollision::Error,
            &self.table_name(),
        )
        .map(|_| ())
    }

    pub(crate) fn derive_constraint(&self, constraint: CheckConstraint) -> Result<(), ConfigError> {
        let name = constraint.name.clone();
        insert_artifact(
            &mut self.constraints.borrow_mut(),
            name,
            constraint,
            OwnedCollision::Skip,
            &self.table_name(),
        )
        .map(|_| ())
    }

    pub fn function_constraint(&self, constraint: FunctionConstraint) -> Result<(), ConfigError> {
        let name = constraint.name.clone();
        insert_artifact(
            &mut self.function_constraints.borrow_mut(),
            name,
            constraint,
            OwnedCollision::Error,
            &self.table_name(),
        )
        .map(|_| ())
    }

    pub(crate) fn derive_function_constraint(
        &self,
        constraint: FunctionConstraint,
    ) -> Result<(), ConfigError> {
        let name = constraint.name.clone();
        insert_artifact(
            &mut self.function_constraints.borrow_mut(),
            name,
            constraint,
            OwnedCollision::Skip,
            &self.table_name(),
        )
        .map(|_| ())
    }

    pub fn validation(&self, validation: Validation) -> Result<(), ConfigError> {
        let name = validation.name.clone();
        insert_artifact(
            &mut self.validations.borrow_mut(),
            name,
            validation,
            OwnedCollision::Error,
            &self.table_name(),
        )
        .map(|_| ())
    }

    pub(crate) fn derive_validation(&self, validation: Validation) -> Result<(), ConfigError> {
        let name = validation.name.clone();
        insert_artifact(
            &mut self.validations.borrow_mut(),
            name,
            validation,
            OwnedCollision::Skip,
            &self.table_name(),
        )
        .map(|_| ())
    }

    pub fn trigger(&self, trigger: Trigger) -> Result<(), ConfigError> {
        let name = trigger.name.clone();
        insert_artifact(
            &mut self.triggers.borrow_mut(),
            name,
            trigger,
            OwnedCollision::Error,
            &self.table_name(),
        )
        .map(|_| ())
    }

    pub(crate) fn derive_trigger(&self, trigger: Trigger) -> Result<(), ConfigError> {
        let name = trigger.name.clone();
        insert_artifact(
            &mut self.triggers.borrow_mut(),
            name,
            trigger,
            OwnedCollision::Skip,
            &self.table_name(),
        )
        .map(|_| ())
    }

    pub fn foreign_key(&self, foreign_key: ForeignKey) -> Result<(), ConfigError> {
        let name = foreign_key.name();
        insert_artifact(
            &mut self.foreign_keys.borrow_mut(),
            name,
            foreign_key,
            OwnedCollision::Error,
            &self.table_name(),
        )
        .map(|_| ())
    }

    pub(crate) fn derive_foreign_key(&self, foreign_key: ForeignKey) -> Result<(), ConfigError> {
        let name = foreign_key.name();
        insert_artifact(
            &mut self.foreign_keys.borrow_mut(),
            name,
            foreign_key,
            OwnedCollision::Skip,
            &self.table_name(),
        )
        .map(|_| ())
    }

    pub fn indexes(&self) -> Vec<Derived<Index>> {
        self.indexes.borrow().values().cloned().collect()
    }

    pub fn index_by_name(&self, name: &str) -> Option<Derived<Index>> {
        self.indexes.borrow().get(name).cloned()
    }

    pub fn constraints(&self) -> Vec<Derived<CheckConstraint>> {
        self.constraints.borrow().values().cloned().collect()
    }

    pub fn constraint_by_name(&self, name: &str) -> Option<Derived<CheckConstraint>> {
        self.constraints.borrow().get(name).cloned()
    }

    pub fn function_constraints(&self) -> Vec<Derived<FunctionConstraint>> {
        self.function_constraints.borrow().values().cloned().collect()
    }

    pub fn function_constraint_by_name(&self, name: &str) -> Option<Derived<FunctionConstraint>> {
        self.function_constraints.borrow().get(name).cloned()
    }

    pub fn validations(&self) -> Vec<Derived<Validation>> {
        self.validations.borrow().values().cloned().collect()
    }

    pub fn validation_by_name(&self, name: &str) -> Option<Derived<Validation>> {
        self.validations.borrow().get(name).cloned()
    }

    pub fn triggers(&self) -> Vec<Derived<Trigger>> {
        self.triggers.borrow().values().cloned().collect()
    }

    pub fn trigger_by_name(&self, name: &str) -> Option<Derived<Trigger>> {
        self.triggers.borrow().get(name).cloned()
    }

    pub fn foreign_keys(&self) -> Vec<Derived<ForeignKey>> {
        self.foreign_keys.borrow().values().cloned().collect()
    }

    pub fn foreign_key_by_name(&self, name: &str) -> Option<Derived<ForeignKey>> {
        self.foreign_keys.borrow().get(name).cloned()
    }

    pub fn cluster_index_count(&self) -> usize {
        self.indexes
            .borrow()
            .values()
            .filter(|index| index.value.cluster)
            .count()
    }

    /// Copy every artifact of a parent table, tagged as inherited.
    /// Existing names are left untouched, so re-running is a no-op.
    pub(crate) fn inherit_from(&self, parent: &Table, from: &str) {
        fn copy<T: Clone>(
            target: &RefCell<IndexMap<String, Derived<T>>>,
            source: &RefCell<IndexMap<String, Derived<T>>>,
            from: &str,
        ) {
            let mut target = target.borrow_mut();
            for (name, artifact) in source.borrow().iter() {
                if !target.contains_key(name) {
                    target.insert(
                        name.clone(),
                        Derived {
                            origin: Origin::Inherited {
                                from: from.to_string(),
                            },
                            value: artifact.value.clone(),
                        },
                    );
                }
            }
        }
        copy(&self.indexes, &parent.indexes, from);
        copy(&self.constraints, &parent.constraints, from);
        copy(&self.function_constraints, &parent.function_constraints, from);
        copy(&self.validations, &parent.validations, from);
        copy(&self.triggers, &parent.triggers, from);
        copy(&self.foreign_keys, &parent.foreign_keys, from);
    }
}

impl FacetView for Table {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "table_name" => {
                *self.table_name.borrow_mut() = Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            "partition_scheme" => {
                *self.partition_scheme.borrow_mut() =
                    Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            _ => Err(facet::unknown_option(names::SQL, &self.node, key)),
        }
    }
}

/// The sql facet view of an attribute: its storage column.
pub struct Column {
    node: ElementRef,
    column_name: RefCell<Option<String>>,
    sql_type: RefCell<Option<String>>,
    identity: RefCell<Option<bool>>,
    sparse: Cell<bool>,
    default_value: RefCell<Option<String>>,
}

impl Column {
    pub(crate) fn new(node: ElementRef) -> Self {
        Column {
            node,
            column_name: RefCell::new(None),
            sql_type: RefCell::new(None),
            identity: RefCell::new(None),
            sparse: Cell::new(false),
            default_value: RefCell::new(None),
        }
    }

    /// The sql view of a persistent attribute. Asking for the column of a
    /// non-persistent attribute is a defect in calling code.
    pub fn of(attribute: &Attribute) -> Rc<Column> {
        if !attribute.is_persistent() {
            panic!(
                "Non-persistent attribute {} should not invoke sql column config",
                attribute.path()
            );
        }
        attribute
            .facets()
            .attach_typed::<Column>(attribute.element_ref(), names::SQL)
    }

    fn attribute<'a>(&self, set: &'a SchemaSet) -> &'a Attribute {
        set.attribute(&self.node.path)
            .unwrap_or_else(|_| panic!("model invariant violated: missing attribute {}", self.node.path))
    }

    /// Storage column name: the attribute name, or the referencing link
    /// name for reference attributes.
    pub fn column_name(&self, set: &SchemaSet) -> Result<String, ConfigError> {
        if let Some(name) = self.column_name.borrow().clone() {
            return Ok(name);
        }
        let attribute = self.attribute(set);
        if attribute.is_reference() {
            attribute.referencing_link_name(set)
        } else {
            Ok(attribute.name().to_string())
        }
    }

    /// Storage type, derived structurally unless overridden.
    pub fn sql_type(&self, set: &SchemaSet) -> Result<String, ConfigError> {
        if let Some(sql_type) = self.sql_type.borrow().clone() {
            return Ok(sql_type);
        }
        let attribute = self.attribute(set);
        if attribute.is_reference() {
            let target = attribute.referenced_object_type(set)?;
            let pk = target.primary_key(set)?;
            return Column::of(pk).sql_type(set);
        }
        if attribute.is_enumeration() {
            let enumeration = attribute.referenced_enumeration(set)?;
            if enumeration.numeric_values() {
                return Ok("INT".to_string());
            }
            let length = attribute
                .declared_length()
                .or_else(|| enumeration.max_textual_length())
                .unwrap_or(1);
            return Ok(format!("VARCHAR({})", length));
        }
        if attribute.is_text() {
            return Ok(match attribute.declared_length() {
                Some(length) => format!("VARCHAR({})", length),
                None => "VARCHAR(MAX)".to_string(),
            });
        }
        let characteristic_type = TypeDb::get()
            .characteristic_type(attribute.characteristic_type())
            .ok_or_else(|| ConfigError::UnknownCharacteristicType {
                name: attribute.characteristic_type().to_string(),
                owner: attribute.path(),
            })?;
        characteristic_type
            .config_str("sql.sql_type")
            .map(str::to_string)
            .ok_or_else(|| ConfigError::UnmappedType {
                characteristic_type: attribute.characteristic_type().to_string(),
                owner: attribute.path(),
            })
    }

    /// Whether this is an identity (auto-assigned) column.
    pub fn identity(&self, set: &SchemaSet) -> bool {
        self.identity
            .borrow()
            .unwrap_or_else(|| self.attribute(set).is_generated_value())
    }

    pub fn sparse(&self) -> bool {
        self.sparse.get()
    }

    pub fn default_value(&self) -> Option<String> {
        self.default_value.borrow().clone()
    }
}

impl FacetView for Column {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "column_name" => {
                *self.column_name.borrow_mut() = Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            "sql_type" => {
                *self.sql_type.borrow_mut() = Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            "identity" => {
                *self.identity.borrow_mut() = Some(facet::opt_bool(&self.node, key, value)?);
                Ok(())
            }
            "sparse" => {
                self.sparse.set(facet::opt_bool(&self.node, key, value)?);
                Ok(())
            }
            "default_value" => {
                *self.default_value.borrow_mut() = Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            _ => Err(facet::unknown_option(names::SQL, &self.node, key)),
        }
    }
}

/// The sql facet view of a schema: the storage schema it maps to.
pub struct SqlSchemaView {
    node: ElementRef,
    schema: RefCell<Option<String>>,
}

impl SqlSchemaView {
    pub(crate) fn new(node: ElementRef) -> Self {
        SqlSchemaView {
            node,
            schema: RefCell::new(None),
        }
    }

    pub fn of(schema: &Schema) -> Rc<SqlSchemaView> {
        schema
            .facets()
            .attach_typed::<SqlSchemaView>(schema.element_ref(), names::SQL)
    }

    /// Storage schema name; defaults to the schema's own name.
    pub fn schema_name(&self) -> String {
        self.schema
            .borrow()
            .clone()
            .unwrap_or_else(|| self.node.local_name().to_string())
    }

    pub fn default_schema(&self) -> bool {
        self.schema_name() == DEFAULT_SCHEMA
    }
}

impl FacetView for SqlSchemaView {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "schema" => {
                *self.schema.borrow_mut() = Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            _ => Err(facet::unknown_option(names::SQL, &self.node, key)),
        }
    }
}

/// A helper for the per-column facet of every persistent attribute of a table.
pub fn persistent_columns<'a>(
    set: &'a SchemaSet,
    object_type: &'a ObjectType,
) -> Vec<&'a Attribute> {
    object_type
        .attributes(set)
        .into_iter()
        .filter(|a| a.is_persistent())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facet::ElementKind;

    fn table() -> Table {
        Table::new(ElementRef::new(ElementKind::ObjectType, "core.Submission"))
    }

    #[test]
    fn test_index_name_prefixes() {
        let plain = Index::new("Submission", vec!["Name".to_string()]);
        assert_eq!(plain.name(), "IX_Submission_Name");
        let unique = Index::new("Submission", vec!["Name".to_string()]).unique();
        assert_eq!(unique.name(), "UQ_Submission_Name");
        let cluster = Index::new("Submission", vec!["A".to_string(), "B".to_string()]).cluster();
        assert_eq!(cluster.name(), "CL_Submission_A_B");
    }

    #[test]
    fn test_physical_names() {
        let constraint = CheckConstraint::new("Submission", "Name_NotEmpty", "LEN( Name ) > 0");
        assert_eq!(constraint.constraint_name(), "CK_Submission_Name_NotEmpty");
        let trigger = Trigger::new("Submission", "ImmuterValidation", "...");
        assert_eq!(trigger.trigger_name(), "trgSubmissionImmuterValidation");
        let fk = ForeignKey::new(
            "Submission",
            vec!["User".to_string()],
            "core.User",
            vec!["ID".to_string()],
        );
        assert_eq!(fk.foreign_key_name(), "FK_Submission_User");
        assert_eq!(table().table_name(), "tblSubmission");
    }

    #[test]
    fn test_owned_collision_is_fatal() {
        let table = table();
        table
            .constraint(CheckConstraint::new("Submission", "X", "1 = 1"))
            .unwrap();
        let err = table
            .constraint(CheckConstraint::new("Submission", "X", "2 = 2"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ArtifactCollision { .. }));
    }

    #[test]
    fn test_derive_skips_owned_and_replaces_inherited() {
        let parent = table();
        parent
            .constraint(CheckConstraint::new("Submission", "X", "original"))
            .unwrap();

        let child = Table::new(ElementRef::new(ElementKind::ObjectType, "core.Special"));
        child.inherit_from(&parent, "core.Submission");
        let inherited = child.constraint_by_name("X").unwrap();
        assert!(inherited.origin.is_inherited());

        // A derivation overrides the inherited artifact...
        child
            .derive_constraint(CheckConstraint::new("Special", "X", "derived"))
            .unwrap();
        let derived = child.constraint_by_name("X").unwrap();
        assert_eq!(derived.origin, Origin::Owned);
        assert_eq!(derived.value.sql, "derived");

        // ...and a repeat derivation leaves the owned artifact alone.
        child
            .derive_constraint(CheckConstraint::new("Special", "X", "ignored"))
            .unwrap();
        assert_eq!(child.constraint_by_name("X").unwrap().value.sql, "derived");
    }

    #[test]
    fn test_inherit_is_idempotent() {
        let parent = table();
        parent
            .index(Index::new("Submission", vec!["Name".to_string()]))
            .unwrap();
        let child = Table::new(ElementRef::new(ElementKind::ObjectType, "core.Special"));
        child.inherit_from(&parent, "core.Submission");
        child.inherit_from(&parent, "core.Submission");
        assert_eq!(child.indexes().len(), 1);
    }
}
