//! Attribute definitions: a named, typed slot on an object type.

use crate::error::ConfigError;
use crate::facet::{ElementKind, ElementRef, Facets};
use crate::typedb::kinds;
use serde::{Deserialize, Serialize};

use super::enumeration::Enumeration;
use super::object_type::ObjectType;
use super::schema::SchemaSet;

/// Collection shape of an attribute's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionType {
    #[default]
    None,
    Sequence,
}

/// Kind of the inverse relationship a reference attribute induces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InverseKind {
    #[default]
    HasOne,
    None,
}

/// Referential action on update/delete of the referenced row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefAction {
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    #[default]
    NoAction,
}

impl RefAction {
    /// The SQL spelling of this action.
    pub fn as_sql(&self) -> &'static str {
        match self {
            RefAction::Cascade => "CASCADE",
            RefAction::Restrict => "RESTRICT",
            RefAction::SetNull => "SET NULL",
            RefAction::SetDefault => "SET DEFAULT",
            RefAction::NoAction => "NO ACTION",
        }
    }
}

/// Relationship configuration carried by a reference attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceInfo {
    /// Referenced object type, by name. Stored as declared (possibly a
    /// bare name) and rewritten to the qualified `Schema.Type` form
    /// during the verify pass.
    pub target: String,
    pub inverse_name: Option<String>,
    pub inverse_kind: InverseKind,
    pub on_update: RefAction,
    pub on_delete: RefAction,
    /// A polymorphic reference never materializes a physical foreign key,
    /// even when its target is concrete.
    pub polymorphic: bool,
}

/// A named, typed slot on an object type.
#[derive(Debug)]
pub struct Attribute {
    name: String,
    characteristic_type: String,
    /// Qualified path of the owning object type, stamped when the owner
    /// is added to a schema.
    pub(crate) owner: String,
    nullable: bool,
    immutable: bool,
    persistent: bool,
    set_once: bool,
    generated_value: bool,
    allow_blank: bool,
    primary_key: bool,
    length: Option<u32>,
    collection: CollectionType,
    pub(crate) reference: Option<ReferenceInfo>,
    /// Referenced enumeration, by name; qualified during verify.
    pub(crate) enumeration: Option<String>,
    struct_type: Option<String>,
    facets: Facets,
}

impl Attribute {
    /// Create an attribute of an arbitrary registered characteristic type.
    pub fn new(name: impl Into<String>, characteristic_type: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            characteristic_type: characteristic_type.into(),
            owner: String::new(),
            nullable: false,
            immutable: false,
            persistent: true,
            set_once: false,
            generated_value: false,
            allow_blank: false,
            primary_key: false,
            length: None,
            collection: CollectionType::None,
            reference: None,
            enumeration: None,
            struct_type: None,
            facets: Facets::default(),
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Attribute::new(name, kinds::INTEGER)
    }

    pub fn real(name: impl Into<String>) -> Self {
        Attribute::new(name, kinds::REAL)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Attribute::new(name, kinds::BOOLEAN)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Attribute::new(name, kinds::DATE)
    }

    pub fn datetime(name: impl Into<String>) -> Self {
        Attribute::new(name, kinds::DATETIME)
    }

    /// A bounded string attribute.
    pub fn string(name: impl Into<String>, length: u32) -> Self {
        let mut attribute = Attribute::new(name, kinds::TEXT);
        attribute.length = Some(length);
        attribute
    }

    /// An unbounded text attribute.
    pub fn text(name: impl Into<String>) -> Self {
        Attribute::new(name, kinds::TEXT)
    }

    /// A reference attribute. The attribute is named after the referenced
    /// object type unless renamed with [`Attribute::with_name`].
    pub fn reference(target: impl Into<String>) -> Self {
        let target = target.into();
        let name = target
            .rsplit('.')
            .next()
            .unwrap_or(target.as_str())
            .to_string();
        let mut attribute = Attribute::new(name, kinds::REFERENCE);
        attribute.reference = Some(ReferenceInfo {
            target,
            inverse_name: None,
            inverse_kind: InverseKind::default(),
            on_update: RefAction::default(),
            on_delete: RefAction::default(),
            polymorphic: false,
        });
        attribute
    }

    /// An enumeration attribute referencing a schema-level enumeration.
    pub fn enumeration(name: impl Into<String>, enumeration: impl Into<String>) -> Self {
        let mut attribute = Attribute::new(name, kinds::ENUMERATION);
        attribute.enumeration = Some(enumeration.into());
        attribute
    }

    /// A struct attribute carrying the struct's class base name.
    pub fn structure(name: impl Into<String>, struct_type: impl Into<String>) -> Self {
        let mut attribute = Attribute::new(name, kinds::STRUCT);
        attribute.struct_type = Some(struct_type.into());
        attribute
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn immutable(mut self, immutable: bool) -> Self {
        self.immutable = immutable;
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn set_once(mut self, set_once: bool) -> Self {
        self.set_once = set_once;
        self
    }

    pub fn generated_value(mut self, generated_value: bool) -> Self {
        self.generated_value = generated_value;
        self
    }

    pub fn allow_blank(mut self, allow_blank: bool) -> Self {
        self.allow_blank = allow_blank;
        self
    }

    pub fn primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn collection(mut self, collection: CollectionType) -> Self {
        self.collection = collection;
        self
    }

    /// Configure the inverse relationship of a reference attribute.
    pub fn inverse(mut self, name: impl Into<String>, kind: InverseKind) -> Self {
        let reference = self
            .reference
            .as_mut()
            .expect("inverse configured on a non-reference attribute");
        reference.inverse_name = Some(name.into());
        reference.inverse_kind = kind;
        self
    }

    pub fn on_update(mut self, action: RefAction) -> Self {
        self.reference
            .as_mut()
            .expect("on_update configured on a non-reference attribute")
            .on_update = action;
        self
    }

    pub fn on_delete(mut self, action: RefAction) -> Self {
        self.reference
            .as_mut()
            .expect("on_delete configured on a non-reference attribute")
            .on_delete = action;
        self
    }

    pub fn polymorphic(mut self, polymorphic: bool) -> Self {
        self.reference
            .as_mut()
            .expect("polymorphic configured on a non-reference attribute")
            .polymorphic = polymorphic;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn characteristic_type(&self) -> &str {
        &self.characteristic_type
    }

    /// Qualified path of the owning object type.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Qualified path of this attribute.
    pub fn path(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }

    pub fn element_ref(&self) -> ElementRef {
        ElementRef::new(ElementKind::Attribute, self.path())
    }

    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn is_set_once(&self) -> bool {
        self.set_once
    }

    pub fn is_generated_value(&self) -> bool {
        self.generated_value
    }

    pub fn allows_blank(&self) -> bool {
        self.allow_blank
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn declared_length(&self) -> Option<u32> {
        self.length
    }

    pub fn collection_type(&self) -> CollectionType {
        self.collection
    }

    pub fn reference_info(&self) -> Option<&ReferenceInfo> {
        self.reference.as_ref()
    }

    pub fn struct_type(&self) -> Option<&str> {
        self.struct_type.as_deref()
    }

    pub fn enumeration_name(&self) -> Option<&str> {
        self.enumeration.as_deref()
    }

    pub fn is_reference(&self) -> bool {
        self.characteristic_type == kinds::REFERENCE
    }

    pub fn is_enumeration(&self) -> bool {
        self.characteristic_type == kinds::ENUMERATION
    }

    pub fn is_integer(&self) -> bool {
        self.characteristic_type == kinds::INTEGER
    }

    pub fn is_boolean(&self) -> bool {
        self.characteristic_type == kinds::BOOLEAN
    }

    pub fn is_text(&self) -> bool {
        self.characteristic_type == kinds::TEXT
    }

    pub fn is_struct(&self) -> bool {
        self.characteristic_type == kinds::STRUCT
    }

    pub fn is_void(&self) -> bool {
        self.characteristic_type == kinds::VOID
    }

    pub fn is_date(&self) -> bool {
        self.characteristic_type == kinds::DATE || self.characteristic_type == kinds::DATETIME
    }

    /// The object type a reference attribute points at. Asking for the
    /// target of a non-reference attribute is a defect in calling code.
    pub fn referenced_object_type<'a>(
        &self,
        set: &'a SchemaSet,
    ) -> Result<&'a ObjectType, ConfigError> {
        let reference = self
            .reference
            .as_ref()
            .unwrap_or_else(|| panic!("{} is not a reference attribute", self.path()));
        set.object_type_relative_to(self.owner_schema(), &reference.target)
    }

    /// The enumeration an enumeration attribute draws its values from.
    /// Asking on a non-enumeration attribute is a defect in calling code.
    pub fn referenced_enumeration<'a>(
        &self,
        set: &'a SchemaSet,
    ) -> Result<&'a Enumeration, ConfigError> {
        let name = self
            .enumeration
            .as_deref()
            .unwrap_or_else(|| panic!("{} is not an enumeration attribute", self.path()));
        set.enumeration_relative_to(self.owner_schema(), name)
    }

    /// Whether this reference attribute points at an abstract object type.
    pub fn references_abstract(&self, set: &SchemaSet) -> Result<bool, ConfigError> {
        if !self.is_reference() {
            return Ok(false);
        }
        Ok(self.referenced_object_type(set)?.is_abstract())
    }

    /// The storage column name a reference attribute occupies: attribute
    /// name followed by the referenced primary key name (`Submission` ->
    /// `SubmissionID`).
    pub fn referencing_link_name(&self, set: &SchemaSet) -> Result<String, ConfigError> {
        let target = self.referenced_object_type(set)?;
        let pk = target.primary_key(set)?;
        Ok(format!("{}{}", self.name, pk.name()))
    }

    fn owner_schema(&self) -> &str {
        self.owner.split('.').next().unwrap_or(&self.owner)
    }
}
