//! Schemas and the schema set: the root of the metamodel.
//!
//! Object types may reference types defined later (or in other schemas),
//! so references are stored by name and resolved by an explicit verify
//! pass over the whole set. Verify collects every dangling reference and
//! reports them together rather than stopping at the first.

use crate::error::ConfigError;
use crate::facet::{ElementKind, ElementRef, Facets};

use super::attribute::Attribute;
use super::enumeration::Enumeration;
use super::object_type::ObjectType;
use super::service::{Message, Service};

/// A named namespace of object types, enumerations, services, and messages.
#[derive(Debug)]
pub struct Schema {
    name: String,
    pub(crate) object_types: Vec<ObjectType>,
    pub(crate) enumerations: Vec<Enumeration>,
    services: Vec<Service>,
    messages: Vec<Message>,
    facets: Facets,
}

impl Schema {
    fn new(name: &str) -> Self {
        Schema {
            name: name.to_string(),
            object_types: Vec::new(),
            enumerations: Vec::new(),
            services: Vec::new(),
            messages: Vec::new(),
            facets: Facets::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_ref(&self) -> ElementRef {
        ElementRef::new(ElementKind::Schema, self.name.clone())
    }

    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    /// Add an object type. Validates the type name against the schema
    /// namespace, the `extends` declaration against already-defined
    /// types, and the type's attributes against inherited attribute names.
    pub fn add_object_type(&mut self, mut object_type: ObjectType) -> Result<(), ConfigError> {
        let qualified = format!("{}.{}", self.name, object_type.name());
        if self.names_in_use(object_type.name()) {
            return Err(ConfigError::DuplicateName {
                kind: "Object type",
                name: object_type.name().to_string(),
                owner: self.name.clone(),
            });
        }
        if let Some(parent_name) = object_type.extends_name() {
            let parent = self.object_type_by_name(parent_name).ok_or_else(|| {
                ConfigError::UnresolvedReference {
                    target: parent_name.to_string(),
                    owner: qualified.clone(),
                }
            })?;
            if parent.is_final() {
                return Err(ConfigError::InvalidInheritance {
                    object_type: qualified.clone(),
                    reason: format!("cannot extend final object type {}", parent.path()),
                });
            }
            let inherited = self.inherited_attribute_names(parent_name);
            for attribute in object_type.declared_attributes() {
                if inherited.iter().any(|name| name == attribute.name()) {
                    return Err(ConfigError::DuplicateName {
                        kind: "Attribute",
                        name: attribute.name().to_string(),
                        owner: qualified,
                    });
                }
            }
        }
        object_type.attach_to_schema(&self.name);
        self.object_types.push(object_type);
        Ok(())
    }

    /// Add an enumeration. Shares the object type namespace.
    pub fn add_enumeration(&mut self, mut enumeration: Enumeration) -> Result<(), ConfigError> {
        if self.names_in_use(enumeration.name()) {
            return Err(ConfigError::DuplicateName {
                kind: "Enumeration",
                name: enumeration.name().to_string(),
                owner: self.name.clone(),
            });
        }
        enumeration.schema = self.name.clone();
        self.enumerations.push(enumeration);
        Ok(())
    }

    pub fn add_service(&mut self, mut service: Service) -> Result<(), ConfigError> {
        if self.service_by_name(service.name()).is_some() {
            return Err(ConfigError::DuplicateName {
                kind: "Service",
                name: service.name().to_string(),
                owner: self.name.clone(),
            });
        }
        service.attach_to_schema(&self.name);
        self.services.push(service);
        Ok(())
    }

    pub fn add_message(&mut self, mut message: Message) -> Result<(), ConfigError> {
        if self.message_by_name(message.name()).is_some() {
            return Err(ConfigError::DuplicateName {
                kind: "Message",
                name: message.name().to_string(),
                owner: self.name.clone(),
            });
        }
        message.schema = self.name.clone();
        self.messages.push(message);
        Ok(())
    }

    pub fn object_types(&self) -> &[ObjectType] {
        &self.object_types
    }

    pub fn object_type_by_name(&self, name: &str) -> Option<&ObjectType> {
        self.object_types.iter().find(|t| t.name() == name)
    }

    pub fn enumerations(&self) -> &[Enumeration] {
        &self.enumerations
    }

    pub fn enumeration_by_name(&self, name: &str) -> Option<&Enumeration> {
        self.enumerations.iter().find(|e| e.name() == name)
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn service_by_name(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name() == name)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message_by_name(&self, name: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.name() == name)
    }

    fn names_in_use(&self, name: &str) -> bool {
        self.object_type_by_name(name).is_some() || self.enumeration_by_name(name).is_some()
    }

    fn inherited_attribute_names(&self, parent_name: &str) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = self.object_type_by_name(parent_name);
        while let Some(object_type) = current {
            names.extend(
                object_type
                    .declared_attributes()
                    .iter()
                    .map(|a| a.name().to_string()),
            );
            current = object_type
                .extends_name()
                .and_then(|n| self.object_type_by_name(n));
        }
        names
    }
}

/// The full set of schemas built in one run.
#[derive(Debug, Default)]
pub struct SchemaSet {
    schemas: Vec<Schema>,
    verified: bool,
}

impl SchemaSet {
    pub fn new() -> Self {
        SchemaSet::default()
    }

    /// Define a schema and return it for population.
    pub fn define_schema(&mut self, name: &str) -> Result<&mut Schema, ConfigError> {
        if self.schema(name).is_some() {
            return Err(ConfigError::DuplicateName {
                kind: "Schema",
                name: name.to_string(),
                owner: "schema set".to_string(),
            });
        }
        self.verified = false;
        self.schemas.push(Schema::new(name));
        Ok(self.schemas.last_mut().expect("schema just pushed"))
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.name() == name)
    }

    pub fn schema_mut(&mut self, name: &str) -> Option<&mut Schema> {
        self.verified = false;
        self.schemas.iter_mut().find(|s| s.name() == name)
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// Look up an object type by qualified `Schema.Type` path.
    pub fn object_type(&self, path: &str) -> Result<&ObjectType, ConfigError> {
        let (schema_name, type_name) = split_path(path)?;
        self.schema(schema_name)
            .and_then(|s| s.object_type_by_name(type_name))
            .ok_or_else(|| ConfigError::UnresolvedReference {
                target: path.to_string(),
                owner: "schema set".to_string(),
            })
    }

    /// Look up an enumeration by qualified `Schema.Enumeration` path.
    pub fn enumeration(&self, path: &str) -> Result<&Enumeration, ConfigError> {
        let (schema_name, enum_name) = split_path(path)?;
        self.schema(schema_name)
            .and_then(|s| s.enumeration_by_name(enum_name))
            .ok_or_else(|| ConfigError::UnresolvedReference {
                target: path.to_string(),
                owner: "schema set".to_string(),
            })
    }

    /// Resolve a possibly-bare object type name relative to a schema.
    pub fn object_type_relative_to(
        &self,
        schema: &str,
        name: &str,
    ) -> Result<&ObjectType, ConfigError> {
        if name.contains('.') {
            self.object_type(name)
        } else {
            self.object_type(&format!("{}.{}", schema, name))
        }
    }

    /// Resolve a possibly-bare enumeration name relative to a schema.
    pub fn enumeration_relative_to(
        &self,
        schema: &str,
        name: &str,
    ) -> Result<&Enumeration, ConfigError> {
        if name.contains('.') {
            self.enumeration(name)
        } else {
            self.enumeration(&format!("{}.{}", schema, name))
        }
    }

    /// Look up an attribute by qualified `Schema.Type.Attribute` path.
    pub fn attribute(&self, path: &str) -> Result<&Attribute, ConfigError> {
        let (owner, name) = path
            .rsplit_once('.')
            .ok_or_else(|| ConfigError::UnresolvedReference {
                target: path.to_string(),
                owner: "schema set".to_string(),
            })?;
        self.object_type(owner)?.attribute_required(self, name)
    }

    /// Look up an object type that the model guarantees to exist.
    pub(crate) fn expect_object_type(&self, path: &str) -> &ObjectType {
        self.object_type(path)
            .unwrap_or_else(|_| panic!("model invariant violated: missing object type {}", path))
    }

    /// Post-construction link pass: resolve all deferred references,
    /// compute subtype lists, and validate structural invariants.
    ///
    /// All dangling references across the whole set are collected and
    /// reported together in one error.
    pub fn verify(&mut self) -> Result<(), ConfigError> {
        self.resolve_deferred_references()?;
        self.compute_subtypes();
        self.validate_structure()?;
        self.verified = true;
        Ok(())
    }

    fn resolve_deferred_references(&mut self) -> Result<(), ConfigError> {
        let mut failures: Vec<(String, String)> = Vec::new();
        let mut reference_fixups: Vec<(usize, usize, usize, String)> = Vec::new();
        let mut enum_fixups: Vec<(usize, usize, usize, String)> = Vec::new();

        for (si, schema) in self.schemas.iter().enumerate() {
            for (oi, object_type) in schema.object_types.iter().enumerate() {
                for (ai, attribute) in object_type.declared_attributes().iter().enumerate() {
                    if let Some(reference) = attribute.reference_info() {
                        match self.qualify_object_type_name(schema.name(), &reference.target) {
                            Some(qualified) => {
                                if qualified != reference.target {
                                    reference_fixups.push((si, oi, ai, qualified));
                                }
                            }
                            None => failures.push((attribute.path(), reference.target.clone())),
                        }
                    }
                    if let Some(name) = attribute.enumeration_name() {
                        match self.qualify_enumeration_name(schema.name(), name) {
                            Some(qualified) => {
                                if qualified != name {
                                    enum_fixups.push((si, oi, ai, qualified));
                                }
                            }
                            None => failures.push((attribute.path(), name.to_string())),
                        }
                    }
                }
            }
        }

        if !failures.is_empty() {
            return Err(ConfigError::UnresolvedReferences { failures });
        }
        for (si, oi, ai, qualified) in reference_fixups {
            self.schemas[si].object_types[oi].attributes[ai]
                .reference
                .as_mut()
                .expect("fixup recorded for a reference attribute")
                .target = qualified;
        }
        for (si, oi, ai, qualified) in enum_fixups {
            self.schemas[si].object_types[oi].attributes[ai].enumeration = Some(qualified);
        }
        Ok(())
    }

    fn compute_subtypes(&mut self) {
        for schema in &mut self.schemas {
            for object_type in &mut schema.object_types {
                object_type.subtypes.clear();
            }
        }
        let mut links: Vec<(usize, String, String)> = Vec::new();
        for (si, schema) in self.schemas.iter().enumerate() {
            for object_type in &schema.object_types {
                if let Some(parent) = object_type.extends_name() {
                    links.push((si, parent.to_string(), object_type.path()));
                }
            }
        }
        for (si, parent, child) in links {
            let parent = self.schemas[si]
                .object_types
                .iter_mut()
                .find(|t| t.name() == parent)
                .expect("extends validated when the object type was added");
            parent.subtypes.push(child);
        }
    }

    fn validate_structure(&self) -> Result<(), ConfigError> {
        for schema in &self.schemas {
            for object_type in schema.object_types() {
                self.validate_primary_key(object_type)?;
                self.validate_declared_constraints(object_type)?;
                self.validate_reference_targets(object_type)?;
            }
            for message in schema.messages() {
                message.validate()?;
            }
        }
        Ok(())
    }

    fn validate_primary_key(&self, object_type: &ObjectType) -> Result<(), ConfigError> {
        let count = object_type
            .attributes(self)
            .into_iter()
            .filter(|a| a.is_primary_key())
            .count();
        let valid = if object_type.is_abstract() {
            count <= 1
        } else {
            count == 1
        };
        if !valid {
            return Err(ConfigError::MissingPrimaryKey {
                object_type: object_type.path(),
            });
        }
        Ok(())
    }

    fn validate_declared_constraints(&self, object_type: &ObjectType) -> Result<(), ConfigError> {
        for constraint in &object_type.unique_constraints {
            for name in &constraint.attribute_names {
                object_type.attribute_required(self, name)?;
            }
        }
        for constraint in &object_type.codependent_constraints {
            for name in &constraint.attribute_names {
                object_type.attribute_required(self, name)?;
            }
        }
        for constraint in &object_type.incompatible_constraints {
            for name in &constraint.attribute_names {
                object_type.attribute_required(self, name)?;
            }
        }
        for constraint in &object_type.dependency_constraints {
            object_type.attribute_required(self, &constraint.attribute_name)?;
            for name in &constraint.dependent_attribute_names {
                object_type.attribute_required(self, name)?;
            }
        }
        for constraint in &object_type.cycle_constraints {
            let origin = object_type.attribute_required(self, &constraint.attribute_name)?;
            let target = origin.referenced_object_type(self)?;
            target.attribute_required(self, &constraint.scoping_attribute)?;
            let mut current = object_type;
            for hop in &constraint.attribute_name_path {
                let attribute = current.attribute_required(self, hop)?;
                if !attribute.is_reference() {
                    return Err(ConfigError::ParseFailed {
                        path: attribute.path(),
                        reason: format!(
                            "cycle constraint '{}' path element is not a reference",
                            constraint.name
                        ),
                    });
                }
                current = attribute.referenced_object_type(self)?;
            }
        }
        Ok(())
    }

    fn validate_reference_targets(&self, object_type: &ObjectType) -> Result<(), ConfigError> {
        for attribute in object_type.declared_attributes() {
            if !attribute.is_reference() {
                continue;
            }
            let target = attribute.referenced_object_type(self)?;
            if target.is_abstract() && target.concrete_descendants(self).is_empty() {
                return Err(ConfigError::InvalidInheritance {
                    object_type: target.path(),
                    reason: format!(
                        "abstract object type referenced from {} has no concrete subtypes",
                        attribute.path()
                    ),
                });
            }
        }
        Ok(())
    }

    fn qualify_object_type_name(&self, schema: &str, raw: &str) -> Option<String> {
        if raw.contains('.') {
            self.object_type(raw).ok().map(|_| raw.to_string())
        } else {
            let qualified = format!("{}.{}", schema, raw);
            self.object_type(&qualified).ok().map(|_| qualified)
        }
    }

    fn qualify_enumeration_name(&self, schema: &str, raw: &str) -> Option<String> {
        if raw.contains('.') {
            self.enumeration(raw).ok().map(|_| raw.to_string())
        } else {
            let qualified = format!("{}.{}", schema, raw);
            self.enumeration(&qualified).ok().map(|_| qualified)
        }
    }
}

fn split_path(path: &str) -> Result<(&str, &str), ConfigError> {
    path.split_once('.')
        .ok_or_else(|| ConfigError::UnresolvedReference {
            target: path.to_string(),
            owner: "schema set".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attribute::Attribute;

    fn set_with_user() -> SchemaSet {
        crate::init();
        let mut set = SchemaSet::new();
        let schema = set.define_schema("core").unwrap();
        let mut user = ObjectType::new("User");
        user.declare_attribute(Attribute::integer("ID").primary_key(true))
            .unwrap();
        user.declare_attribute(Attribute::string("Email", 255)).unwrap();
        schema.add_object_type(user).unwrap();
        set
    }

    #[test]
    fn test_duplicate_schema_rejected() {
        crate::init();
        let mut set = SchemaSet::new();
        set.define_schema("core").unwrap();
        let err = set.define_schema("core").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName { kind: "Schema", .. }));
    }

    #[test]
    fn test_extends_undefined_parent_rejected() {
        crate::init();
        let mut set = SchemaSet::new();
        let schema = set.define_schema("core").unwrap();
        let err = schema
            .add_object_type(ObjectType::new("Crew").extends("DeployableUnit"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_extends_final_parent_rejected() {
        crate::init();
        let mut set = SchemaSet::new();
        let schema = set.define_schema("core").unwrap();
        let mut task = ObjectType::new("Task").final_type();
        task.declare_attribute(Attribute::integer("ID").primary_key(true))
            .unwrap();
        schema.add_object_type(task).unwrap();
        let err = schema
            .add_object_type(ObjectType::new("SpecificTask").extends("Task"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInheritance { .. }));
    }

    #[test]
    fn test_inherited_attribute_collision_rejected() {
        crate::init();
        let mut set = SchemaSet::new();
        let schema = set.define_schema("core").unwrap();
        let mut task = ObjectType::new("Task").abstract_type();
        task.declare_attribute(Attribute::integer("ID").primary_key(true))
            .unwrap();
        task.declare_attribute(Attribute::string("Name", 50)).unwrap();
        schema.add_object_type(task).unwrap();
        let mut specific = ObjectType::new("SpecificTask").extends("Task");
        specific
            .declare_attribute(Attribute::string("Name", 100))
            .unwrap();
        let err = schema.add_object_type(specific).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName { kind: "Attribute", .. }));
    }

    #[test]
    fn test_verify_collects_all_unresolved_references() {
        let mut set = set_with_user();
        let schema = set.schema_mut("core").unwrap();
        let mut submission = ObjectType::new("Submission");
        submission
            .declare_attribute(Attribute::integer("ID").primary_key(true))
            .unwrap();
        submission
            .declare_attribute(Attribute::reference("Ghost"))
            .unwrap();
        submission
            .declare_attribute(Attribute::reference("other.Phantom"))
            .unwrap();
        schema.add_object_type(submission).unwrap();

        let err = set.verify().unwrap_err();
        match err {
            ConfigError::UnresolvedReferences { failures } => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].1, "Ghost");
                assert_eq!(failures[1].1, "other.Phantom");
            }
            other => panic!("expected UnresolvedReferences, got {:?}", other),
        }
    }

    #[test]
    fn test_verify_qualifies_bare_references() {
        let mut set = set_with_user();
        let schema = set.schema_mut("core").unwrap();
        let mut submission = ObjectType::new("Submission");
        submission
            .declare_attribute(Attribute::integer("ID").primary_key(true))
            .unwrap();
        submission
            .declare_attribute(Attribute::reference("User").immutable(true))
            .unwrap();
        schema.add_object_type(submission).unwrap();

        set.verify().unwrap();
        let submission = set.object_type("core.Submission").unwrap();
        let user_ref = submission.declared_attribute_by_name("User").unwrap();
        assert_eq!(user_ref.reference_info().unwrap().target, "core.User");
        assert_eq!(user_ref.referencing_link_name(&set).unwrap(), "UserID");
    }

    #[test]
    fn test_verify_computes_subtypes() {
        crate::init();
        let mut set = SchemaSet::new();
        let schema = set.define_schema("iris").unwrap();
        let mut unit = ObjectType::new("DeployableUnitType").abstract_type();
        unit.declare_attribute(Attribute::integer("ID").primary_key(true))
            .unwrap();
        schema.add_object_type(unit).unwrap();
        schema
            .add_object_type(ObjectType::new("CrewType").extends("DeployableUnitType"))
            .unwrap();
        schema
            .add_object_type(ObjectType::new("PhysicalUnitType").extends("DeployableUnitType"))
            .unwrap();

        set.verify().unwrap();
        let unit = set.object_type("iris.DeployableUnitType").unwrap();
        assert_eq!(unit.subtypes(), ["iris.CrewType", "iris.PhysicalUnitType"]);
        assert_eq!(unit.concrete_descendants(&set).len(), 2);
    }

    #[test]
    fn test_concrete_type_without_primary_key_rejected() {
        crate::init();
        let mut set = SchemaSet::new();
        let schema = set.define_schema("core").unwrap();
        let mut resource = ObjectType::new("Resource");
        resource
            .declare_attribute(Attribute::string("Name", 50))
            .unwrap();
        schema.add_object_type(resource).unwrap();
        let err = set.verify().unwrap_err();
        assert!(matches!(err, ConfigError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn test_abstract_reference_target_needs_concrete_subtype() {
        crate::init();
        let mut set = SchemaSet::new();
        let schema = set.define_schema("core").unwrap();
        let mut kind = ObjectType::new("UnitKind").abstract_type();
        kind.declare_attribute(Attribute::integer("ID").primary_key(true))
            .unwrap();
        schema.add_object_type(kind).unwrap();
        let mut unit = ObjectType::new("Unit");
        unit.declare_attribute(Attribute::integer("ID").primary_key(true))
            .unwrap();
        unit.declare_attribute(Attribute::reference("UnitKind")).unwrap();
        schema.add_object_type(unit).unwrap();
        let err = set.verify().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInheritance { .. }));
    }

    #[test]
    fn test_constraint_naming_unknown_attribute_rejected() {
        let mut set = set_with_user();
        let schema = set.schema_mut("core").unwrap();
        let mut attribute_row = ObjectType::new("AttributeRow");
        attribute_row
            .declare_attribute(Attribute::integer("ID").primary_key(true))
            .unwrap();
        attribute_row
            .declare_attribute(Attribute::string("Value", 50).nullable(true))
            .unwrap();
        attribute_row.codependent_constraint("value", vec![
            "Value".to_string(),
            "ValueDesc".to_string(),
        ]);
        schema.add_object_type(attribute_row).unwrap();
        let err = set.verify().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAttribute { .. }));
    }
}
