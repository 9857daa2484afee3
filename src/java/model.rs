//! Facet views for the Java-family facets: java, jpa, and imit.
//!
//! Each view decorates a core element with naming for one tier. The jpa
//! views default their package to the java facet's; the imit views model
//! the client-replica tier and carry a client-side opt-out.

use crate::error::ConfigError;
use crate::facet::{self, names, ElementRef, FacetView};
use crate::model::{Attribute, Enumeration, ObjectType, Schema, SchemaSet};
use crate::utils::to_snake_case;
use serde_yaml::Value;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{Modality, IMIT_KEYS, JAVA_KEYS};

fn owner_schema<'a>(set: &'a SchemaSet, node: &ElementRef) -> &'a Schema {
    set.schema(node.schema_name())
        .unwrap_or_else(|| panic!("model invariant violated: missing schema {}", node.schema_name()))
}

/// The java facet view of a schema: the package it maps to.
pub struct JavaSchema {
    node: ElementRef,
    package: RefCell<Option<String>>,
}

impl JavaSchema {
    pub(crate) fn new(node: ElementRef) -> Self {
        JavaSchema {
            node,
            package: RefCell::new(None),
        }
    }

    pub fn of(schema: &Schema) -> Rc<JavaSchema> {
        schema
            .facets()
            .attach_typed::<JavaSchema>(schema.element_ref(), names::JAVA)
    }

    pub fn package(&self) -> String {
        self.package
            .borrow()
            .clone()
            .unwrap_or_else(|| to_snake_case(self.node.local_name()))
    }

    pub fn set_package(&self, package: impl Into<String>) {
        *self.package.borrow_mut() = Some(package.into());
    }
}

impl FacetView for JavaSchema {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "package" => {
                self.set_package(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            _ => Err(facet::unknown_option(names::JAVA, &self.node, key)),
        }
    }
}

/// The java facet view of an object type.
pub struct JavaClass {
    node: ElementRef,
    classname: RefCell<Option<String>>,
    label_attribute: RefCell<Option<String>>,
    debug_attributes: RefCell<Vec<String>>,
}

impl JavaClass {
    pub(crate) fn new(node: ElementRef) -> Self {
        JavaClass {
            node,
            classname: RefCell::new(None),
            label_attribute: RefCell::new(None),
            debug_attributes: RefCell::new(Vec::new()),
        }
    }

    pub fn of(object_type: &ObjectType) -> Rc<JavaClass> {
        object_type
            .facets()
            .attach_typed::<JavaClass>(object_type.element_ref(), names::JAVA)
    }

    pub fn classname(&self) -> String {
        self.classname
            .borrow()
            .clone()
            .unwrap_or_else(|| self.node.local_name().to_string())
    }

    pub fn qualified_name(&self, set: &SchemaSet) -> String {
        let schema = owner_schema(set, &self.node);
        format!("{}.{}", JavaSchema::of(schema).package(), self.classname())
    }

    /// Attribute shown when the entity is rendered as a label.
    pub fn label_attribute(&self) -> Option<String> {
        self.label_attribute.borrow().clone()
    }

    pub fn set_label_attribute(&self, attribute: impl Into<String>) {
        *self.label_attribute.borrow_mut() = Some(attribute.into());
    }

    /// Attributes included in generated debug output.
    pub fn debug_attributes(&self) -> Vec<String> {
        self.debug_attributes.borrow().clone()
    }

    pub fn set_debug_attributes(&self, attributes: Vec<String>) {
        *self.debug_attributes.borrow_mut() = attributes;
    }
}

impl FacetView for JavaClass {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "classname" => {
                *self.classname.borrow_mut() = Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            "label_attribute" => {
                self.set_label_attribute(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            "debug_attributes" => {
                self.set_debug_attributes(facet::opt_str_list(&self.node, key, value)?);
                Ok(())
            }
            _ => Err(facet::unknown_option(names::JAVA, &self.node, key)),
        }
    }
}

/// The java facet view of an attribute.
pub struct JavaField {
    node: ElementRef,
    java_type: RefCell<Option<String>>,
}

impl JavaField {
    pub(crate) fn new(node: ElementRef) -> Self {
        JavaField {
            node,
            java_type: RefCell::new(None),
        }
    }

    pub fn of(attribute: &Attribute) -> Rc<JavaField> {
        attribute
            .facets()
            .attach_typed::<JavaField>(attribute.element_ref(), names::JAVA)
    }

    fn attribute<'a>(&self, set: &'a SchemaSet) -> &'a Attribute {
        set.attribute(&self.node.path)
            .unwrap_or_else(|_| panic!("model invariant violated: missing attribute {}", self.node.path))
    }

    pub fn name(&self, set: &SchemaSet, modality: Modality) -> Result<String, ConfigError> {
        super::name(set, self.attribute(set), modality)
    }

    /// Representation type, honoring a declared override.
    pub fn java_type(&self, set: &SchemaSet, modality: Modality) -> Result<String, ConfigError> {
        if let Some(java_type) = self.java_type.borrow().clone() {
            return Ok(java_type);
        }
        super::java_type(set, self.attribute(set), modality, &JAVA_KEYS)
    }
}

impl FacetView for JavaField {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "java_type" => {
                *self.java_type.borrow_mut() = Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            _ => Err(facet::unknown_option(names::JAVA, &self.node, key)),
        }
    }
}

/// The java facet view of an enumeration.
pub struct JavaEnumeration {
    node: ElementRef,
    classname: RefCell<Option<String>>,
}

impl JavaEnumeration {
    pub(crate) fn new(node: ElementRef) -> Self {
        JavaEnumeration {
            node,
            classname: RefCell::new(None),
        }
    }

    pub fn of(enumeration: &Enumeration) -> Rc<JavaEnumeration> {
        enumeration
            .facets()
            .attach_typed::<JavaEnumeration>(enumeration.element_ref(), names::JAVA)
    }

    pub fn classname(&self) -> String {
        self.classname
            .borrow()
            .clone()
            .unwrap_or_else(|| self.node.local_name().to_string())
    }

    pub fn qualified_name(&self, set: &SchemaSet) -> String {
        let schema = owner_schema(set, &self.node);
        format!("{}.{}", JavaSchema::of(schema).package(), self.classname())
    }
}

impl FacetView for JavaEnumeration {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "classname" => {
                *self.classname.borrow_mut() = Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            _ => Err(facet::unknown_option(names::JAVA, &self.node, key)),
        }
    }
}

/// The jpa facet view of a schema. Defaults to the java package.
pub struct JpaSchema {
    node: ElementRef,
    package: RefCell<Option<String>>,
}

impl JpaSchema {
    pub(crate) fn new(node: ElementRef) -> Self {
        JpaSchema {
            node,
            package: RefCell::new(None),
        }
    }

    pub fn of(schema: &Schema) -> Rc<JpaSchema> {
        schema
            .facets()
            .attach_typed::<JpaSchema>(schema.element_ref(), names::JPA)
    }

    pub fn package(&self, set: &SchemaSet) -> String {
        self.package.borrow().clone().unwrap_or_else(|| {
            JavaSchema::of(owner_schema(set, &self.node)).package()
        })
    }
}

impl FacetView for JpaSchema {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "package" => {
                *self.package.borrow_mut() = Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            _ => Err(facet::unknown_option(names::JPA, &self.node, key)),
        }
    }
}

/// The jpa facet view of an object type: the persistence bean.
pub struct JpaClass {
    node: ElementRef,
    entity_name: RefCell<Option<String>>,
}

impl JpaClass {
    pub(crate) fn new(node: ElementRef) -> Self {
        JpaClass {
            node,
            entity_name: RefCell::new(None),
        }
    }

    pub fn of(object_type: &ObjectType) -> Rc<JpaClass> {
        object_type
            .facets()
            .attach_typed::<JpaClass>(object_type.element_ref(), names::JPA)
    }

    pub fn entity_name(&self) -> String {
        self.entity_name
            .borrow()
            .clone()
            .unwrap_or_else(|| self.node.local_name().to_string())
    }

    pub fn qualified_name(&self, set: &SchemaSet) -> String {
        let schema = owner_schema(set, &self.node);
        format!(
            "{}.{}",
            JpaSchema::of(schema).package(set),
            self.entity_name()
        )
    }
}

impl FacetView for JpaClass {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "entity_name" => {
                *self.entity_name.borrow_mut() = Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            _ => Err(facet::unknown_option(names::JPA, &self.node, key)),
        }
    }
}

/// The imit facet view of a schema: the client-replica tier layout.
pub struct ImitSchema {
    node: ElementRef,
    imitation_package: RefCell<Option<String>>,
}

impl ImitSchema {
    pub(crate) fn new(node: ElementRef) -> Self {
        ImitSchema {
            node,
            imitation_package: RefCell::new(None),
        }
    }

    pub fn of(schema: &Schema) -> Rc<ImitSchema> {
        schema
            .facets()
            .attach_typed::<ImitSchema>(schema.element_ref(), names::IMIT)
    }

    pub fn imitation_package(&self) -> String {
        self.imitation_package
            .borrow()
            .clone()
            .unwrap_or_else(|| format!("{}.client", to_snake_case(self.node.local_name())))
    }

    pub fn json_mapper_name(&self) -> String {
        format!("{}JSONMapper", self.node.local_name())
    }

    pub fn qualified_json_mapper_name(&self) -> String {
        format!("{}.{}", self.imitation_package(), self.json_mapper_name())
    }

    pub fn updater_name(&self) -> String {
        format!("{}Updater", self.node.local_name())
    }

    pub fn qualified_updater_name(&self) -> String {
        format!("{}.{}", self.imitation_package(), self.updater_name())
    }
}

impl FacetView for ImitSchema {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "imitation_package" => {
                *self.imitation_package.borrow_mut() =
                    Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            _ => Err(facet::unknown_option(names::IMIT, &self.node, key)),
        }
    }
}

/// The imit facet view of an object type: the client replica class.
pub struct ImitClass {
    node: ElementRef,
    imitation_name: RefCell<Option<String>>,
    client_side: Cell<bool>,
}

impl ImitClass {
    pub(crate) fn new(node: ElementRef) -> Self {
        ImitClass {
            node,
            imitation_name: RefCell::new(None),
            client_side: Cell::new(true),
        }
    }

    pub fn of(object_type: &ObjectType) -> Rc<ImitClass> {
        object_type
            .facets()
            .attach_typed::<ImitClass>(object_type.element_ref(), names::IMIT)
    }

    pub fn imitation_name(&self) -> String {
        self.imitation_name
            .borrow()
            .clone()
            .unwrap_or_else(|| self.node.local_name().to_string())
    }

    pub fn qualified_name(&self, set: &SchemaSet) -> String {
        let schema = owner_schema(set, &self.node);
        format!(
            "{}.{}",
            ImitSchema::of(schema).imitation_package(),
            self.imitation_name()
        )
    }

    pub fn client_side(&self) -> bool {
        self.client_side.get()
    }
}

impl FacetView for ImitClass {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "imitation_name" => {
                *self.imitation_name.borrow_mut() = Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            "client_side" => {
                self.client_side.set(facet::opt_bool(&self.node, key, value)?);
                Ok(())
            }
            _ => Err(facet::unknown_option(names::IMIT, &self.node, key)),
        }
    }
}

/// The imit facet view of an attribute.
pub struct ImitAttribute {
    node: ElementRef,
    client_side: Cell<bool>,
}

impl ImitAttribute {
    pub(crate) fn new(node: ElementRef) -> Self {
        ImitAttribute {
            node,
            client_side: Cell::new(true),
        }
    }

    pub fn of(attribute: &Attribute) -> Rc<ImitAttribute> {
        attribute
            .facets()
            .attach_typed::<ImitAttribute>(attribute.element_ref(), names::IMIT)
    }

    pub fn field_name(&self) -> String {
        self.node.local_name().to_string()
    }

    pub fn client_side(&self) -> bool {
        self.client_side.get()
    }

    pub fn java_type(&self, set: &SchemaSet, modality: Modality) -> Result<String, ConfigError> {
        let attribute = set
            .attribute(&self.node.path)
            .unwrap_or_else(|_| panic!("model invariant violated: missing attribute {}", self.node.path));
        super::java_type(set, attribute, modality, &IMIT_KEYS)
    }
}

impl FacetView for ImitAttribute {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "client_side" => {
                self.client_side.set(facet::opt_bool(&self.node, key, value)?);
                Ok(())
            }
            _ => Err(facet::unknown_option(names::IMIT, &self.node, key)),
        }
    }
}

/// The imit facet view of an enumeration.
pub struct ImitEnumeration {
    node: ElementRef,
    enumeration_name: RefCell<Option<String>>,
}

impl ImitEnumeration {
    pub(crate) fn new(node: ElementRef) -> Self {
        ImitEnumeration {
            node,
            enumeration_name: RefCell::new(None),
        }
    }

    pub fn of(enumeration: &Enumeration) -> Rc<ImitEnumeration> {
        enumeration
            .facets()
            .attach_typed::<ImitEnumeration>(enumeration.element_ref(), names::IMIT)
    }

    pub fn enumeration_name(&self) -> String {
        self.enumeration_name
            .borrow()
            .clone()
            .unwrap_or_else(|| self.node.local_name().to_string())
    }

    pub fn qualified_name(&self, set: &SchemaSet) -> String {
        let schema = owner_schema(set, &self.node);
        format!(
            "{}.{}",
            ImitSchema::of(schema).imitation_package(),
            self.enumeration_name()
        )
    }
}

impl FacetView for ImitEnumeration {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "enumeration_name" => {
                *self.enumeration_name.borrow_mut() =
                    Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            _ => Err(facet::unknown_option(names::IMIT, &self.node, key)),
        }
    }
}

/// Entity class name under the facet a [`super::FacetKeys`] selects.
pub(crate) fn entity_qualified_name(
    set: &SchemaSet,
    object_type: &ObjectType,
    facet: &str,
) -> String {
    match facet {
        names::JAVA => JavaClass::of(object_type).qualified_name(set),
        names::JPA => JpaClass::of(object_type).qualified_name(set),
        names::IMIT => ImitClass::of(object_type).qualified_name(set),
        other => panic!("No entity class naming for facet '{}'", other),
    }
}

/// Enumeration class name under the facet a [`super::FacetKeys`] selects.
pub(crate) fn enumeration_qualified_name(
    set: &SchemaSet,
    enumeration: &Enumeration,
    facet: &str,
) -> String {
    match facet {
        names::JAVA | names::JPA => JavaEnumeration::of(enumeration).qualified_name(set),
        names::IMIT => ImitEnumeration::of(enumeration).qualified_name(set),
        other => panic!("No enumeration class naming for facet '{}'", other),
    }
}

/// Struct class name under the facet a [`super::FacetKeys`] selects.
pub(crate) fn struct_qualified_name(set: &SchemaSet, attribute: &Attribute, facet: &str) -> String {
    let schema = set
        .schema(attribute.owner().split('.').next().unwrap_or_default())
        .unwrap_or_else(|| panic!("model invariant violated: missing schema for {}", attribute.path()));
    let struct_type = attribute
        .struct_type()
        .unwrap_or_else(|| panic!("struct type queried on non-struct attribute {}", attribute.path()));
    let package = match facet {
        names::JAVA => JavaSchema::of(schema).package(),
        names::JPA => JpaSchema::of(schema).package(set),
        names::IMIT => ImitSchema::of(schema).imitation_package(),
        other => panic!("No struct class naming for facet '{}'", other),
    };
    format!("{}.{}", package, struct_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, ObjectType, SchemaSet};

    fn labelled_set() -> SchemaSet {
        crate::init();
        let mut set = SchemaSet::new();
        let schema = set.define_schema("core").unwrap();
        JavaSchema::of(schema).set_package("epwp.model");
        let mut district = ObjectType::new("FireDistrict");
        district
            .declare_attribute(Attribute::integer("ID").primary_key(true))
            .unwrap();
        district.declare_attribute(Attribute::string("Name", 255)).unwrap();
        schema.add_object_type(district).unwrap();
        set.verify().unwrap();
        set
    }

    #[test]
    fn test_java_class_naming_and_label() {
        let set = labelled_set();
        let district = set.object_type("core.FireDistrict").unwrap();
        let view = JavaClass::of(district);
        assert_eq!(view.qualified_name(&set), "epwp.model.FireDistrict");
        view.set_label_attribute("Name");
        assert_eq!(view.label_attribute().as_deref(), Some("Name"));
    }

    #[test]
    fn test_jpa_package_defaults_to_java_package() {
        let set = labelled_set();
        let district = set.object_type("core.FireDistrict").unwrap();
        assert_eq!(
            JpaClass::of(district).qualified_name(&set),
            "epwp.model.FireDistrict"
        );
    }

    #[test]
    fn test_imit_naming() {
        let set = labelled_set();
        let schema = set.schema("core").unwrap();
        let imit = ImitSchema::of(schema);
        assert_eq!(imit.imitation_package(), "core.client");
        assert_eq!(imit.qualified_json_mapper_name(), "core.client.coreJSONMapper");
        assert_eq!(imit.qualified_updater_name(), "core.client.coreUpdater");
        let district = set.object_type("core.FireDistrict").unwrap();
        let view = ImitClass::of(district);
        assert!(view.client_side());
        assert_eq!(view.qualified_name(&set), "core.client.FireDistrict");
    }
}
