//! YAML schema loader.
//!
//! Schema sets are authored as YAML documents, one schema per file. The
//! declaration structs here are plain serde types; all validation lives
//! in the metamodel builder they are fed through, so programmatic and
//! YAML-built models behave identically.

use crate::error::ConfigError;
use crate::facet::names;
use crate::model::{
    Attribute, CollectionType, Enumeration, InverseKind, Message, Method, ObjectType, Parameter,
    RefAction, Schema, SchemaSet, Service,
};
use crate::sql::{Index, Table, Validation};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::path::Path;

type OptionsMap = IndexMap<String, Value>;

/// One schema document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDoc {
    pub schema: String,
    #[serde(default)]
    pub java: Option<OptionsMap>,
    #[serde(default)]
    pub sql: Option<OptionsMap>,
    #[serde(default)]
    pub jpa: Option<OptionsMap>,
    #[serde(default)]
    pub imit: Option<OptionsMap>,
    #[serde(default)]
    pub gwt: Option<OptionsMap>,
    #[serde(default)]
    pub enumerations: Vec<EnumerationDef>,
    #[serde(default)]
    pub object_types: Vec<ObjectTypeDef>,
    #[serde(default)]
    pub services: Vec<ServiceDef>,
    #[serde(default)]
    pub messages: Vec<MessageDef>,
}

/// Enumeration declaration: exactly one value form must be present.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumerationDef {
    pub name: String,
    #[serde(default)]
    pub numeric_values: Option<IndexMap<String, i64>>,
    #[serde(default)]
    pub textual_values: Option<Vec<String>>,
    #[serde(default)]
    pub java: Option<OptionsMap>,
    #[serde(default)]
    pub imit: Option<OptionsMap>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectTypeDef {
    pub name: String,
    #[serde(rename = "abstract", default)]
    pub is_abstract: bool,
    #[serde(rename = "final", default)]
    pub is_final: bool,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
    #[serde(default)]
    pub constraints: Option<ConstraintsDef>,
    /// Clustering index over the named attributes.
    #[serde(default)]
    pub cluster: Option<Vec<String>>,
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
    #[serde(default)]
    pub validations: Vec<ValidationDef>,
    #[serde(default)]
    pub java: Option<OptionsMap>,
    #[serde(default)]
    pub sql: Option<OptionsMap>,
    #[serde(default)]
    pub jpa: Option<OptionsMap>,
    #[serde(default)]
    pub imit: Option<OptionsMap>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexDef {
    pub attributes: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub cluster: bool,
}

/// A hand-declared validation with custom negative SQL.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationDef {
    pub name: String,
    pub negative_sql: String,
    #[serde(default)]
    pub guard: Option<String>,
}

fn default_persistent() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: String,
    /// Referenced object type for reference attributes.
    #[serde(default)]
    pub references: Option<String>,
    /// Named enumeration for enumeration attributes.
    #[serde(default)]
    pub enumeration: Option<String>,
    /// Inline enumeration values: a mapping declares a numeric
    /// enumeration, a list a textual one. Registers an enumeration named
    /// `<ObjectType><Attribute>` on the schema.
    #[serde(default)]
    pub values: Option<Value>,
    #[serde(rename = "struct", default)]
    pub struct_type: Option<String>,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub immutable: bool,
    #[serde(default = "default_persistent")]
    pub persistent: bool,
    #[serde(default)]
    pub set_once: bool,
    #[serde(default)]
    pub generated_value: bool,
    #[serde(default)]
    pub allow_blank: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub collection: Option<CollectionType>,
    #[serde(default)]
    pub inverse_name: Option<String>,
    #[serde(default)]
    pub inverse_kind: Option<InverseKind>,
    #[serde(default)]
    pub on_update: Option<RefAction>,
    #[serde(default)]
    pub on_delete: Option<RefAction>,
    #[serde(default)]
    pub polymorphic: bool,
    #[serde(default)]
    pub sql: Option<OptionsMap>,
    #[serde(default)]
    pub java: Option<OptionsMap>,
    #[serde(default)]
    pub imit: Option<OptionsMap>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintsDef {
    #[serde(default)]
    pub unique: Vec<Vec<String>>,
    #[serde(default)]
    pub codependent: Vec<GroupDef>,
    #[serde(default)]
    pub incompatible: Vec<GroupDef>,
    #[serde(default)]
    pub dependency: Vec<DependencyDef>,
    #[serde(default)]
    pub cycle: Vec<CycleDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupDef {
    pub name: String,
    pub attributes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyDef {
    pub name: String,
    pub attribute: String,
    pub requires: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CycleDef {
    pub name: String,
    pub attribute: String,
    pub path: Vec<String>,
    pub scoping_attribute: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceDef {
    pub name: String,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
    #[serde(default)]
    pub gwt: Option<OptionsMap>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodDef {
    pub name: String,
    #[serde(default)]
    pub returns: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterDef>,
    #[serde(default)]
    pub gwt: Option<OptionsMap>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterDef {
    pub name: String,
    #[serde(rename = "type")]
    pub parameter_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageDef {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDef>,
    #[serde(default)]
    pub gwt: Option<OptionsMap>,
}

/// Load every schema document in a directory into one verified set.
///
/// Files are processed in name order so generation output is stable.
/// Cross-file references resolve during the final verify pass.
pub fn load_schema_set<P: AsRef<Path>>(dir: P) -> Result<SchemaSet, ConfigError> {
    crate::init();
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|e| ConfigError::ReadFailed {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;
    let mut paths: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            )
        })
        .collect();
    paths.sort();

    let mut docs = Vec::new();
    for path in &paths {
        docs.push(load_schema_doc(path)?);
    }

    let mut set = SchemaSet::new();
    for doc in &docs {
        build_schema(&mut set, doc)?;
    }
    for doc in &docs {
        apply_facet_configuration(&set, doc)?;
    }
    set.verify()?;
    Ok(set)
}

/// Parse a single schema document.
pub fn load_schema_doc<P: AsRef<Path>>(path: P) -> Result<SchemaDoc, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn build_schema(set: &mut SchemaSet, doc: &SchemaDoc) -> Result<(), ConfigError> {
    tracing::debug!("building schema '{}'", doc.schema);
    let schema = set.define_schema(&doc.schema)?;
    for def in &doc.enumerations {
        schema.add_enumeration(enumeration_from_def(&doc.schema, def)?)?;
    }
    for def in &doc.object_types {
        build_object_type(schema, def)?;
    }
    for def in &doc.services {
        let mut service = Service::new(&def.name);
        for method_def in &def.methods {
            let mut method = Method::new(&method_def.name);
            if let Some(returns) = &method_def.returns {
                method = method.returns(returns);
            }
            for parameter in &method_def.parameters {
                method = method.parameter(Parameter::new(&parameter.name, &parameter.parameter_type));
            }
            service.define_method(method)?;
        }
        schema.add_service(service)?;
    }
    for def in &doc.messages {
        let mut message = Message::new(&def.name);
        for parameter in &def.parameters {
            message = message.parameter(Parameter::new(&parameter.name, &parameter.parameter_type));
        }
        schema.add_message(message)?;
    }
    Ok(())
}

fn enumeration_from_def(schema: &str, def: &EnumerationDef) -> Result<Enumeration, ConfigError> {
    match (&def.numeric_values, &def.textual_values) {
        (Some(values), None) => Ok(Enumeration::numeric(&def.name, values.clone())),
        (None, Some(values)) => Ok(Enumeration::textual(&def.name, values.clone())),
        _ => Err(ConfigError::ParseFailed {
            path: format!("{}.{}", schema, def.name),
            reason: "enumeration needs exactly one of numeric_values or textual_values".to_string(),
        }),
    }
}

fn build_object_type(schema: &mut Schema, def: &ObjectTypeDef) -> Result<(), ConfigError> {
    let mut object_type = ObjectType::new(&def.name);
    if let Some(parent) = &def.extends {
        object_type = object_type.extends(parent);
    }
    if def.is_abstract {
        object_type = object_type.abstract_type();
    }
    if def.is_final {
        object_type = object_type.final_type();
    }

    for attribute_def in &def.attributes {
        let (attribute, inline_enumeration) = attribute_from_def(&def.name, attribute_def)?;
        if let Some(enumeration) = inline_enumeration {
            schema.add_enumeration(enumeration)?;
        }
        object_type.declare_attribute(attribute)?;
    }

    if let Some(constraints) = &def.constraints {
        for attributes in &constraints.unique {
            object_type.unique(attributes.clone());
        }
        for group in &constraints.codependent {
            object_type.codependent_constraint(&group.name, group.attributes.clone());
        }
        for group in &constraints.incompatible {
            object_type.incompatible_constraint(&group.name, group.attributes.clone());
        }
        for dependency in &constraints.dependency {
            object_type.dependency_constraint(
                &dependency.name,
                &dependency.attribute,
                dependency.requires.clone(),
            );
        }
        for cycle in &constraints.cycle {
            object_type.cycle_constraint(
                &cycle.name,
                &cycle.attribute,
                cycle.path.clone(),
                &cycle.scoping_attribute,
            );
        }
    }

    schema.add_object_type(object_type)
}

fn attribute_from_def(
    object_type: &str,
    def: &AttributeDef,
) -> Result<(Attribute, Option<Enumeration>), ConfigError> {
    let owner = format!("{}.{}", object_type, def.name);
    let mut inline_enumeration = None;
    let mut attribute = match def.attribute_type.as_str() {
        "reference" => {
            let target = def.references.as_ref().ok_or_else(|| ConfigError::ParseFailed {
                path: owner.clone(),
                reason: "reference attribute needs a 'references' target".to_string(),
            })?;
            Attribute::reference(target).with_name(&def.name)
        }
        "enumeration" => {
            let enumeration_name = match (&def.enumeration, &def.values) {
                (Some(name), None) => name.clone(),
                (None, Some(values)) => {
                    let name = format!("{}{}", object_type, def.name);
                    inline_enumeration = Some(inline_enumeration_from_values(&owner, &name, values)?);
                    name
                }
                _ => {
                    return Err(ConfigError::ParseFailed {
                        path: owner,
                        reason: "enumeration attribute needs exactly one of 'enumeration' or 'values'"
                            .to_string(),
                    })
                }
            };
            Attribute::enumeration(&def.name, enumeration_name)
        }
        "struct" => {
            let struct_type = def.struct_type.as_ref().ok_or_else(|| ConfigError::ParseFailed {
                path: owner.clone(),
                reason: "struct attribute needs a 'struct' class name".to_string(),
            })?;
            Attribute::structure(&def.name, struct_type)
        }
        other => Attribute::new(&def.name, other),
    };

    if let Some(length) = def.length {
        attribute = attribute.length(length);
    }
    attribute = attribute
        .nullable(def.nullable)
        .immutable(def.immutable)
        .persistent(def.persistent)
        .set_once(def.set_once)
        .generated_value(def.generated_value)
        .allow_blank(def.allow_blank)
        .primary_key(def.primary_key);
    if let Some(collection) = def.collection {
        attribute = attribute.collection(collection);
    }
    if attribute.is_reference() {
        if let Some(inverse_name) = &def.inverse_name {
            attribute = attribute.inverse(
                inverse_name,
                def.inverse_kind.unwrap_or_default(),
            );
        }
        if let Some(action) = def.on_update {
            attribute = attribute.on_update(action);
        }
        if let Some(action) = def.on_delete {
            attribute = attribute.on_delete(action);
        }
        if def.polymorphic {
            attribute = attribute.polymorphic(true);
        }
    }
    Ok((attribute, inline_enumeration))
}

fn inline_enumeration_from_values(
    owner: &str,
    name: &str,
    values: &Value,
) -> Result<Enumeration, ConfigError> {
    match values {
        Value::Mapping(mapping) => {
            let mut numeric = IndexMap::new();
            for (key, value) in mapping {
                let key = key.as_str().ok_or_else(|| invalid_values(owner))?;
                let value = value.as_i64().ok_or_else(|| invalid_values(owner))?;
                numeric.insert(key.to_string(), value);
            }
            Ok(Enumeration::numeric(name, numeric))
        }
        Value::Sequence(sequence) => {
            let mut textual = Vec::new();
            for value in sequence {
                textual.push(value.as_str().ok_or_else(|| invalid_values(owner))?.to_string());
            }
            Ok(Enumeration::textual(name, textual))
        }
        _ => Err(invalid_values(owner)),
    }
}

fn invalid_values(owner: &str) -> ConfigError {
    ConfigError::ParseFailed {
        path: owner.to_string(),
        reason: "inline enumeration values must be a name-to-integer mapping or a string list"
            .to_string(),
    }
}

/// Apply facet option maps and hand-declared sql artifacts. Runs after
/// every schema is built, so option application can navigate the model.
fn apply_facet_configuration(set: &SchemaSet, doc: &SchemaDoc) -> Result<(), ConfigError> {
    let schema = set.schema(&doc.schema).expect("schema built from this doc");
    let schema_options = [
        (names::JAVA, &doc.java),
        (names::SQL, &doc.sql),
        (names::JPA, &doc.jpa),
        (names::IMIT, &doc.imit),
        (names::GWT, &doc.gwt),
    ];
    for (facet, options) in schema_options {
        if let Some(options) = options {
            schema
                .facets()
                .attach_with_options(schema.element_ref(), facet, options)?;
        }
    }

    for def in &doc.enumerations {
        let enumeration = schema
            .enumeration_by_name(&def.name)
            .expect("enumeration built from this doc");
        for (facet, options) in [(names::JAVA, &def.java), (names::IMIT, &def.imit)] {
            if let Some(options) = options {
                enumeration
                    .facets()
                    .attach_with_options(enumeration.element_ref(), facet, options)?;
            }
        }
    }

    for def in &doc.object_types {
        let object_type = schema
            .object_type_by_name(&def.name)
            .expect("object type built from this doc");
        let type_options = [
            (names::JAVA, &def.java),
            (names::SQL, &def.sql),
            (names::JPA, &def.jpa),
            (names::IMIT, &def.imit),
        ];
        for (facet, options) in type_options {
            if let Some(options) = options {
                object_type
                    .facets()
                    .attach_with_options(object_type.element_ref(), facet, options)?;
            }
        }

        let table = Table::of(object_type);
        if let Some(attributes) = &def.cluster {
            table.cluster(attributes.clone())?;
        }
        for index in &def.indexes {
            let mut artifact = Index::new(object_type.name(), index.attributes.clone());
            if index.unique {
                artifact = artifact.unique();
            }
            if index.cluster {
                artifact = artifact.cluster();
            }
            table.index(artifact)?;
        }
        for validation in &def.validations {
            let mut artifact = Validation::new(&validation.name, &validation.negative_sql);
            if let Some(guard) = &validation.guard {
                artifact = artifact.guard(guard);
            }
            table.validation(artifact)?;
        }

        for attribute_def in &def.attributes {
            let attribute = object_type
                .declared_attribute_by_name(&attribute_def.name)
                .expect("attribute built from this doc");
            let attribute_options = [
                (names::SQL, &attribute_def.sql),
                (names::JAVA, &attribute_def.java),
                (names::IMIT, &attribute_def.imit),
            ];
            for (facet, options) in attribute_options {
                if let Some(options) = options {
                    attribute
                        .facets()
                        .attach_with_options(attribute.element_ref(), facet, options)?;
                }
            }
        }
    }

    for def in &doc.services {
        let service = schema.service_by_name(&def.name).expect("service built");
        if let Some(options) = &def.gwt {
            service
                .facets()
                .attach_with_options(service.element_ref(), names::GWT, options)?;
        }
        for method_def in &def.methods {
            if let Some(options) = &method_def.gwt {
                let method = service
                    .methods()
                    .iter()
                    .find(|m| m.name() == method_def.name)
                    .expect("method built");
                method
                    .facets()
                    .attach_with_options(method.element_ref(), names::GWT, options)?;
            }
        }
    }
    for def in &doc.messages {
        let message = schema.message_by_name(&def.name).expect("message built");
        if let Some(options) = &def.gwt {
            message
                .facets()
                .attach_with_options(message.element_ref(), names::GWT, options)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::java::JavaSchema;
    use crate::sql::SqlSchemaView;
    use std::io::Write;

    const CORE_SCHEMA: &str = r#"
schema: core
java:
  package: epwp.model
sql:
  schema: dbo
object_types:
  - name: User
    attributes:
      - name: ID
        type: integer
        primary_key: true
        generated_value: true
      - name: Email
        type: text
        length: 255
    constraints:
      unique:
        - [Email]
  - name: Submission
    java:
      label_attribute: Name
    attributes:
      - name: ID
        type: integer
        primary_key: true
        generated_value: true
      - name: User
        type: reference
        references: User
        immutable: true
      - name: DataType
        type: enumeration
        values:
          STRING: 1
          TEXT: 2
      - name: Name
        type: text
        length: 255
        nullable: true
    validations:
      - name: SinglePrimary
        negative_sql: "SELECT I.ID FROM inserted I WHERE 1 = 0"
services:
  - name: SubmissionService
    methods:
      - name: submit
        parameters:
          - name: id
            type: integer
messages:
  - name: SubmissionUpdated
"#;

    fn write_schema(dir: &Path, name: &str, content: &str) {
        let mut file = fs::File::create(dir.join(name)).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_schema_set() {
        crate::init();
        let dir = tempfile::tempdir().unwrap();
        write_schema(dir.path(), "core.yaml", CORE_SCHEMA);
        let set = load_schema_set(dir.path()).unwrap();

        assert!(set.is_verified());
        let schema = set.schema("core").unwrap();
        assert_eq!(JavaSchema::of(schema).package(), "epwp.model");
        assert_eq!(SqlSchemaView::of(schema).schema_name(), "dbo");

        let submission = set.object_type("core.Submission").unwrap();
        let user_ref = submission.declared_attribute_by_name("User").unwrap();
        assert_eq!(user_ref.reference_info().unwrap().target, "core.User");

        // Inline enumeration values registered a schema-level enumeration.
        let enumeration = set.enumeration("core.SubmissionDataType").unwrap();
        assert!(enumeration.numeric_values());

        // The hand-declared validation landed on the table.
        let table = Table::of(submission);
        assert!(table.validation_by_name("SinglePrimary").is_some());

        assert_eq!(schema.services().len(), 1);
        assert_eq!(schema.messages().len(), 1);
    }

    #[test]
    fn test_cross_file_references_resolve() {
        crate::init();
        let dir = tempfile::tempdir().unwrap();
        write_schema(
            dir.path(),
            "a_iris.yaml",
            r#"
schema: iris
object_types:
  - name: Task
    attributes:
      - name: ID
        type: integer
        primary_key: true
      - name: Owner
        type: reference
        references: core.User
"#,
        );
        write_schema(
            dir.path(),
            "b_core.yaml",
            r#"
schema: core
object_types:
  - name: User
    attributes:
      - name: ID
        type: integer
        primary_key: true
"#,
        );
        let set = load_schema_set(dir.path()).unwrap();
        let owner = set
            .object_type("iris.Task")
            .unwrap()
            .declared_attribute_by_name("Owner")
            .unwrap();
        assert_eq!(owner.referencing_link_name(&set).unwrap(), "OwnerID");
    }

    #[test]
    fn test_unknown_field_rejected() {
        crate::init();
        let dir = tempfile::tempdir().unwrap();
        write_schema(
            dir.path(),
            "core.yaml",
            "schema: core\nobject_typos: []\n",
        );
        let err = load_schema_set(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed { .. }));
    }

    #[test]
    fn test_unknown_facet_option_rejected() {
        crate::init();
        let dir = tempfile::tempdir().unwrap();
        write_schema(
            dir.path(),
            "core.yaml",
            "schema: core\nsql:\n  bogus: dbo\n",
        );
        let err = load_schema_set(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOption { .. }));
    }

    #[test]
    fn test_dangling_reference_reported() {
        crate::init();
        let dir = tempfile::tempdir().unwrap();
        write_schema(
            dir.path(),
            "core.yaml",
            r#"
schema: core
object_types:
  - name: Task
    attributes:
      - name: ID
        type: integer
        primary_key: true
      - name: Owner
        type: reference
        references: Ghost
"#,
        );
        let err = load_schema_set(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnresolvedReferences { .. }));
    }
}
