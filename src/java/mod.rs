//! Characteristic type mapping for the Java-family facets.
//!
//! Maps an abstract attribute's characteristic type to a concrete
//! representation type, distinguishing the in-process `Default` modality
//! from the `Boundary` modality used at a service/remote boundary. At a
//! boundary a relationship degrades to its target's key type rather than
//! the full referenced class.
//!
//! Which facet's class naming applies is selected by an explicit
//! [`FacetKeys`] strategy value rather than dispatch, so one mapping
//! implementation serves the java, jpa, and imit facets.

pub mod model;

pub use model::{
    ImitAttribute, ImitClass, ImitEnumeration, ImitSchema, JavaClass, JavaEnumeration, JavaField,
    JavaSchema, JpaClass, JpaSchema,
};

use crate::error::ConfigError;
use crate::facet::{names, FacetCatalogBuilder};
use crate::model::{Attribute, CollectionType, SchemaSet};
use crate::typedb::kinds;

/// Representation modality for a mapped attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Default,
    Boundary,
}

/// Strategy value selecting facet naming for the mapping functions.
#[derive(Debug, Clone, Copy)]
pub struct FacetKeys {
    /// Facet used to qualify entity and enumeration class names.
    pub primary: &'static str,
    /// Facet used to qualify struct class names.
    pub struct_key: &'static str,
    /// Representation of the `date` characteristic type.
    pub date_type: &'static str,
}

/// Plain Java tier.
pub const JAVA_KEYS: FacetKeys = FacetKeys {
    primary: names::JAVA,
    struct_key: names::JAVA,
    date_type: "java.util.Date",
};

/// EE/persistence tier (jpa-qualified classes).
pub const EE_KEYS: FacetKeys = FacetKeys {
    primary: names::JPA,
    struct_key: names::JPA,
    date_type: "java.util.Date",
};

/// Client-replica tier (imit-qualified classes, client-side date type).
pub const IMIT_KEYS: FacetKeys = FacetKeys {
    primary: names::IMIT,
    struct_key: names::IMIT,
    date_type: "org.metagen.client.ClientDate",
};

/// The fixed boxed-representation lookup table.
fn boxed_type(characteristic_type: &str) -> Option<&'static str> {
    match characteristic_type {
        kinds::INTEGER => Some("java.lang.Integer"),
        kinds::BOOLEAN => Some("java.lang.Boolean"),
        kinds::DATETIME => Some("java.util.Date"),
        kinds::TEXT => Some("java.lang.String"),
        kinds::VOID => Some("java.lang.Void"),
        _ => None,
    }
}

/// The name an attribute presents under a modality: at a boundary a
/// reference surfaces its link name (`SubmissionID`), not its own name.
pub fn name(set: &SchemaSet, attribute: &Attribute, modality: Modality) -> Result<String, ConfigError> {
    match modality {
        Modality::Default => Ok(attribute.name().to_string()),
        Modality::Boundary => {
            if attribute.is_reference() {
                attribute.referencing_link_name(set)
            } else {
                Ok(attribute.name().to_string())
            }
        }
    }
}

/// Whether the attribute maps to a native primitive under this modality.
pub fn primitive(
    set: &SchemaSet,
    attribute: &Attribute,
    modality: Modality,
) -> Result<bool, ConfigError> {
    if attribute.is_nullable() || attribute.is_generated_value() {
        return Ok(false);
    }
    if attribute.is_integer() || attribute.is_boolean() {
        return Ok(true);
    }
    if modality == Modality::Boundary
        && attribute.is_enumeration()
        && attribute.referenced_enumeration(set)?.numeric_values()
    {
        return Ok(true);
    }
    match modality {
        Modality::Default => Ok(false),
        Modality::Boundary => {
            if !attribute.is_reference() {
                return Ok(false);
            }
            let pk = attribute.referenced_object_type(set)?.primary_key(set)?;
            Ok(pk.is_integer() || pk.is_boolean())
        }
    }
}

/// The native primitive representation. Calling this for an attribute
/// that is not primitive-eligible is a defect in calling code.
pub fn primitive_java_type(
    set: &SchemaSet,
    attribute: &Attribute,
    modality: Modality,
) -> Result<String, ConfigError> {
    if attribute.is_integer() {
        return Ok("int".to_string());
    }
    if attribute.is_boolean() {
        return Ok("boolean".to_string());
    }
    if modality == Modality::Boundary {
        if attribute.is_reference() {
            let pk = attribute.referenced_object_type(set)?.primary_key(set)?;
            return primitive_java_type(set, pk, Modality::Default);
        }
        if attribute.is_enumeration() && attribute.referenced_enumeration(set)?.numeric_values() {
            return Ok("int".to_string());
        }
    }
    panic!(
        "primitive_java_type invoked for non-primitive attribute {}",
        attribute.path()
    );
}

/// The representation type of an attribute under a modality.
pub fn java_type(
    set: &SchemaSet,
    attribute: &Attribute,
    modality: Modality,
    keys: &FacetKeys,
) -> Result<String, ConfigError> {
    if attribute.is_void() {
        return Ok("void".to_string());
    }
    if primitive(set, attribute, modality)? {
        return primitive_java_type(set, attribute, modality);
    }
    non_primitive_java_type(set, attribute, modality, keys)
}

/// The boxed/object representation of an attribute under a modality.
pub fn non_primitive_java_type(
    set: &SchemaSet,
    attribute: &Attribute,
    modality: Modality,
    keys: &FacetKeys,
) -> Result<String, ConfigError> {
    if attribute.is_reference() {
        let target = attribute.referenced_object_type(set)?;
        return match modality {
            Modality::Default => Ok(model::entity_qualified_name(set, target, keys.primary)),
            // At a boundary the relationship degrades to its key type.
            Modality::Boundary => {
                let pk = target.primary_key(set)?;
                non_primitive_java_type(set, pk, modality, keys)
            }
        };
    }
    if attribute.is_enumeration() {
        let enumeration = attribute.referenced_enumeration(set)?;
        return match modality {
            Modality::Default => Ok(model::enumeration_qualified_name(
                set,
                enumeration,
                keys.primary,
            )),
            Modality::Boundary => {
                if enumeration.textual_values() {
                    Ok("java.lang.String".to_string())
                } else {
                    Ok("java.lang.Integer".to_string())
                }
            }
        };
    }
    if attribute.is_struct() {
        let qualified = model::struct_qualified_name(set, attribute, keys.struct_key);
        return Ok(match attribute.collection_type() {
            CollectionType::None => qualified,
            CollectionType::Sequence => format!("java.util.List<{}>", qualified),
        });
    }
    if attribute.characteristic_type() == kinds::DATE {
        return Ok(keys.date_type.to_string());
    }
    boxed_type(attribute.characteristic_type())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::UnmappedType {
            characteristic_type: attribute.characteristic_type().to_string(),
            owner: attribute.path(),
        })
}

/// Element type for collection-typed attributes; otherwise the plain type.
pub fn java_component_type(
    set: &SchemaSet,
    attribute: &Attribute,
    modality: Modality,
    keys: &FacetKeys,
) -> Result<String, ConfigError> {
    if attribute.is_struct() && attribute.collection_type() != CollectionType::None {
        return Ok(model::struct_qualified_name(set, attribute, keys.struct_key));
    }
    java_type(set, attribute, modality, keys)
}

pub(crate) fn register_facets(builder: &mut FacetCatalogBuilder) {
    use crate::facet::ElementKind;
    builder.register(ElementKind::Schema, names::JAVA, model::JavaSchema::new);
    builder.register(ElementKind::ObjectType, names::JAVA, model::JavaClass::new);
    builder.register(ElementKind::Attribute, names::JAVA, model::JavaField::new);
    builder.register(ElementKind::Enumeration, names::JAVA, model::JavaEnumeration::new);
    builder.register(ElementKind::Schema, names::JPA, model::JpaSchema::new);
    builder.register(ElementKind::ObjectType, names::JPA, model::JpaClass::new);
    builder.register(ElementKind::Schema, names::IMIT, model::ImitSchema::new);
    builder.register(ElementKind::ObjectType, names::IMIT, model::ImitClass::new);
    builder.register(ElementKind::Attribute, names::IMIT, model::ImitAttribute::new);
    builder.register(ElementKind::Enumeration, names::IMIT, model::ImitEnumeration::new);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, Enumeration, ObjectType, SchemaSet};
    use indexmap::IndexMap;

    fn boundary_set() -> SchemaSet {
        crate::init();
        let mut set = SchemaSet::new();
        let schema = set.define_schema("core").unwrap();
        JavaSchema::of(schema).set_package("epwp.model");
        let mut numeric = IndexMap::new();
        numeric.insert("STRING".to_string(), 1);
        numeric.insert("TEXT".to_string(), 2);
        schema.add_enumeration(Enumeration::numeric("DataType", numeric)).unwrap();
        schema
            .add_enumeration(Enumeration::textual(
                "State",
                vec!["OPEN".to_string(), "CLOSED".to_string()],
            ))
            .unwrap();
        let mut user = ObjectType::new("User");
        user.declare_attribute(Attribute::integer("ID").primary_key(true)).unwrap();
        schema.add_object_type(user).unwrap();
        let mut submission = ObjectType::new("Submission");
        submission
            .declare_attribute(Attribute::integer("ID").primary_key(true).generated_value(true))
            .unwrap();
        submission.declare_attribute(Attribute::reference("User")).unwrap();
        submission
            .declare_attribute(Attribute::reference("User").with_name("Reviewer").nullable(true))
            .unwrap();
        submission
            .declare_attribute(Attribute::enumeration("DataType", "DataType"))
            .unwrap();
        submission
            .declare_attribute(Attribute::enumeration("State", "State").nullable(true))
            .unwrap();
        submission.declare_attribute(Attribute::date("LodgedOn")).unwrap();
        submission.declare_attribute(Attribute::real("Weighting")).unwrap();
        submission
            .declare_attribute(
                Attribute::structure("Lines", "SubmissionLine")
                    .collection(crate::model::CollectionType::Sequence),
            )
            .unwrap();
        schema.add_object_type(submission).unwrap();
        set.verify().unwrap();
        set
    }

    fn attr<'a>(set: &'a SchemaSet, name: &str) -> &'a Attribute {
        set.object_type("core.Submission")
            .unwrap()
            .declared_attribute_by_name(name)
            .unwrap()
    }

    #[test]
    fn test_reference_boundary_degrades_to_key_type() {
        let set = boundary_set();
        let user_ref = attr(&set, "User");
        // In-process, the relationship is the referenced class...
        assert_eq!(
            java_type(&set, user_ref, Modality::Default, &JAVA_KEYS).unwrap(),
            "epwp.model.User"
        );
        // ...at the boundary it is the target's native key primitive.
        assert_eq!(
            java_type(&set, user_ref, Modality::Boundary, &JAVA_KEYS).unwrap(),
            "int"
        );
        assert_eq!(name(&set, user_ref, Modality::Boundary).unwrap(), "UserID");
        assert_eq!(name(&set, user_ref, Modality::Default).unwrap(), "User");
    }

    #[test]
    fn test_nullable_reference_boundary_is_boxed() {
        let set = boundary_set();
        let reviewer = attr(&set, "Reviewer");
        assert!(!primitive(&set, reviewer, Modality::Boundary).unwrap());
        assert_eq!(
            java_type(&set, reviewer, Modality::Boundary, &JAVA_KEYS).unwrap(),
            "java.lang.Integer"
        );
    }

    #[test]
    fn test_enumeration_mappings() {
        let set = boundary_set();
        let data_type = attr(&set, "DataType");
        assert_eq!(
            java_type(&set, data_type, Modality::Default, &JAVA_KEYS).unwrap(),
            "epwp.model.DataType"
        );
        // Numeric, non-nullable enumeration is primitive at the boundary.
        assert_eq!(
            java_type(&set, data_type, Modality::Boundary, &JAVA_KEYS).unwrap(),
            "int"
        );
        let state = attr(&set, "State");
        assert_eq!(
            java_type(&set, state, Modality::Boundary, &JAVA_KEYS).unwrap(),
            "java.lang.String"
        );
    }

    #[test]
    fn test_date_type_is_facet_specific() {
        let set = boundary_set();
        let lodged = attr(&set, "LodgedOn");
        assert_eq!(
            java_type(&set, lodged, Modality::Default, &EE_KEYS).unwrap(),
            "java.util.Date"
        );
        assert_eq!(
            java_type(&set, lodged, Modality::Default, &IMIT_KEYS).unwrap(),
            "org.metagen.client.ClientDate"
        );
    }

    #[test]
    fn test_struct_sequence_maps_to_list() {
        let set = boundary_set();
        let lines = attr(&set, "Lines");
        assert_eq!(
            java_type(&set, lines, Modality::Default, &JAVA_KEYS).unwrap(),
            "java.util.List<epwp.model.SubmissionLine>"
        );
        assert_eq!(
            java_component_type(&set, lines, Modality::Default, &JAVA_KEYS).unwrap(),
            "epwp.model.SubmissionLine"
        );
    }

    #[test]
    fn test_unmapped_type_is_fatal() {
        let set = boundary_set();
        let weighting = attr(&set, "Weighting");
        let err = java_type(&set, weighting, Modality::Default, &JAVA_KEYS).unwrap_err();
        assert!(matches!(err, ConfigError::UnmappedType { .. }));
    }

    #[test]
    #[should_panic(expected = "primitive_java_type invoked for non-primitive attribute")]
    fn test_primitive_type_for_non_primitive_panics() {
        let set = boundary_set();
        let reviewer = attr(&set, "Reviewer");
        let _ = primitive_java_type(&set, reviewer, Modality::Default);
    }

    #[test]
    fn test_void_maps_to_void() {
        crate::init();
        let mut set = SchemaSet::new();
        let schema = set.define_schema("core").unwrap();
        let mut probe = ObjectType::new("Probe");
        probe.declare_attribute(Attribute::integer("ID").primary_key(true)).unwrap();
        probe
            .declare_attribute(Attribute::new("Nothing", crate::typedb::kinds::VOID).persistent(false))
            .unwrap();
        schema.add_object_type(probe).unwrap();
        set.verify().unwrap();
        let nothing = set
            .object_type("core.Probe")
            .unwrap()
            .declared_attribute_by_name("Nothing")
            .unwrap();
        assert_eq!(
            java_type(&set, nothing, Modality::Default, &JAVA_KEYS).unwrap(),
            "void"
        );
    }
}
