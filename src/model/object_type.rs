//! Object type definitions: persisted or transient domain concepts.

use crate::error::ConfigError;
use crate::facet::{ElementKind, ElementRef, Facets};
use crate::typedb::TypeDb;

use super::attribute::Attribute;
use super::constraint::{
    CodependentConstraint, CycleConstraint, DependencyConstraint, IncompatibleConstraint,
    UniqueConstraint,
};
use super::schema::SchemaSet;

/// A schema-level definition of a record type with named attributes.
///
/// Object types support single inheritance forming a tree: a parent must
/// be defined before it can be extended, so cycles cannot be declared.
/// Abstract object types generate no concrete storage table but
/// contribute attributes and constraints to their subtypes.
#[derive(Debug)]
pub struct ObjectType {
    name: String,
    pub(crate) schema: String,
    extends: Option<String>,
    is_abstract: bool,
    is_final: bool,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) unique_constraints: Vec<UniqueConstraint>,
    pub(crate) codependent_constraints: Vec<CodependentConstraint>,
    pub(crate) incompatible_constraints: Vec<IncompatibleConstraint>,
    pub(crate) dependency_constraints: Vec<DependencyConstraint>,
    pub(crate) cycle_constraints: Vec<CycleConstraint>,
    /// Qualified paths of direct subtypes, computed during verify.
    pub(crate) subtypes: Vec<String>,
    facets: Facets,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        ObjectType {
            name: name.into(),
            schema: String::new(),
            extends: None,
            is_abstract: false,
            is_final: false,
            attributes: Vec::new(),
            unique_constraints: Vec::new(),
            codependent_constraints: Vec::new(),
            incompatible_constraints: Vec::new(),
            dependency_constraints: Vec::new(),
            cycle_constraints: Vec::new(),
            subtypes: Vec::new(),
            facets: Facets::default(),
        }
    }

    /// Extend a previously defined object type in the same schema.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn final_type(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Add an attribute, validating its name and characteristic type.
    ///
    /// Duplicates against inherited attributes are checked when the
    /// object type is added to its schema, once the parent is known.
    pub fn declare_attribute(&mut self, attribute: Attribute) -> Result<(), ConfigError> {
        if self.declared_attribute_by_name(attribute.name()).is_some() {
            return Err(ConfigError::DuplicateName {
                kind: "Attribute",
                name: attribute.name().to_string(),
                owner: self.path(),
            });
        }
        if !TypeDb::get().is_registered(attribute.characteristic_type()) {
            return Err(ConfigError::UnknownCharacteristicType {
                name: attribute.characteristic_type().to_string(),
                owner: format!("{}.{}", self.path(), attribute.name()),
            });
        }
        self.validate_payload(&attribute)?;
        self.attributes.push(attribute);
        Ok(())
    }

    fn validate_payload(&self, attribute: &Attribute) -> Result<(), ConfigError> {
        let owner = format!("{}.{}", self.path(), attribute.name());
        let mismatch = |reason: &str| ConfigError::ParseFailed {
            path: owner.clone(),
            reason: reason.to_string(),
        };
        if attribute.is_reference() && attribute.reference_info().is_none() {
            return Err(mismatch("reference attribute missing a referenced object type"));
        }
        if !attribute.is_reference() && attribute.reference_info().is_some() {
            return Err(mismatch("reference configuration on a non-reference attribute"));
        }
        if attribute.is_enumeration() && attribute.enumeration_name().is_none() {
            return Err(mismatch("enumeration attribute missing an enumeration name"));
        }
        if attribute.is_struct() && attribute.struct_type().is_none() {
            return Err(mismatch("struct attribute missing a struct type"));
        }
        if attribute.is_primary_key() {
            if attribute.is_nullable() {
                return Err(mismatch("primary key attribute cannot be nullable"));
            }
            if !(attribute.is_integer() || attribute.is_text()) {
                return Err(mismatch("primary key attribute must be integer or text"));
            }
        }
        Ok(())
    }

    /// Declare that a set of attributes is jointly unique.
    pub fn unique(&mut self, attribute_names: Vec<String>) {
        self.unique_constraints.push(UniqueConstraint { attribute_names });
    }

    pub fn codependent_constraint(&mut self, name: impl Into<String>, attribute_names: Vec<String>) {
        self.codependent_constraints.push(CodependentConstraint {
            name: name.into(),
            attribute_names,
        });
    }

    pub fn incompatible_constraint(&mut self, name: impl Into<String>, attribute_names: Vec<String>) {
        self.incompatible_constraints.push(IncompatibleConstraint {
            name: name.into(),
            attribute_names,
        });
    }

    pub fn dependency_constraint(
        &mut self,
        name: impl Into<String>,
        attribute_name: impl Into<String>,
        dependent_attribute_names: Vec<String>,
    ) {
        self.dependency_constraints.push(DependencyConstraint {
            name: name.into(),
            attribute_name: attribute_name.into(),
            dependent_attribute_names,
        });
    }

    pub fn cycle_constraint(
        &mut self,
        name: impl Into<String>,
        attribute_name: impl Into<String>,
        attribute_name_path: Vec<String>,
        scoping_attribute: impl Into<String>,
    ) {
        self.cycle_constraints.push(CycleConstraint {
            name: name.into(),
            attribute_name: attribute_name.into(),
            attribute_name_path,
            scoping_attribute: scoping_attribute.into(),
        });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified path: `schema.Name` once added to a schema.
    pub fn path(&self) -> String {
        if self.schema.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }

    pub fn element_ref(&self) -> ElementRef {
        ElementRef::new(ElementKind::ObjectType, self.path())
    }

    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn extends_name(&self) -> Option<&str> {
        self.extends.as_deref()
    }

    /// Attributes declared directly on this object type.
    pub fn declared_attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn declared_attribute_by_name(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    /// The parent object type, if any. The parent is guaranteed to exist
    /// once this object type was accepted into its schema.
    pub fn supertype<'a>(&self, set: &'a SchemaSet) -> Option<&'a ObjectType> {
        let parent = self.extends.as_deref()?;
        Some(set.expect_object_type(&format!("{}.{}", self.schema, parent)))
    }

    /// Ancestor chain, root first.
    pub fn ancestors<'a>(&self, set: &'a SchemaSet) -> Vec<&'a ObjectType> {
        let mut chain = Vec::new();
        let mut current = self.supertype(set);
        while let Some(object_type) = current {
            chain.push(object_type);
            current = object_type.supertype(set);
        }
        chain.reverse();
        chain
    }

    /// All attributes: inherited (root-most first) then declared.
    pub fn attributes<'a>(&'a self, set: &'a SchemaSet) -> Vec<&'a Attribute> {
        let mut all = Vec::new();
        for ancestor in self.ancestors(set) {
            all.extend(ancestor.declared_attributes().iter());
        }
        all.extend(self.attributes.iter());
        all
    }

    /// Find an attribute by name among own and inherited attributes.
    pub fn attribute_by_name<'a>(&'a self, set: &'a SchemaSet, name: &str) -> Option<&'a Attribute> {
        self.attributes(set).into_iter().find(|a| a.name() == name)
    }

    /// As [`ObjectType::attribute_by_name`], erroring with the owner's path.
    pub fn attribute_required<'a>(
        &'a self,
        set: &'a SchemaSet,
        name: &str,
    ) -> Result<&'a Attribute, ConfigError> {
        self.attribute_by_name(set, name)
            .ok_or_else(|| ConfigError::UnknownAttribute {
                name: name.to_string(),
                owner: self.path(),
            })
    }

    /// The primary key attribute (own or inherited).
    pub fn primary_key<'a>(&'a self, set: &'a SchemaSet) -> Result<&'a Attribute, ConfigError> {
        self.attributes(set)
            .into_iter()
            .find(|a| a.is_primary_key())
            .ok_or_else(|| ConfigError::MissingPrimaryKey {
                object_type: self.path(),
            })
    }

    /// Qualified paths of direct subtypes, in declaration order.
    pub fn subtypes(&self) -> &[String] {
        &self.subtypes
    }

    /// All non-abstract descendants, in declaration order, nearest first.
    pub fn concrete_descendants<'a>(&self, set: &'a SchemaSet) -> Vec<&'a ObjectType> {
        let mut found = Vec::new();
        let mut pending: std::collections::VecDeque<String> =
            self.subtypes.iter().cloned().collect();
        while let Some(path) = pending.pop_front() {
            let object_type = set.expect_object_type(&path);
            if !object_type.is_abstract() {
                found.push(object_type);
            }
            pending.extend(object_type.subtypes.iter().cloned());
        }
        found
    }

    /// Whether this object type occupies concrete storage.
    pub fn concrete(&self) -> bool {
        !self.is_abstract
    }

    /// Stamp the owning schema onto this object type and its attributes.
    pub(crate) fn attach_to_schema(&mut self, schema: &str) {
        self.schema = schema.to_string();
        let path = self.path();
        for attribute in &mut self.attributes {
            attribute.owner = path.clone();
        }
    }
}
