//! Process-wide registry of characteristic types.
//!
//! Characteristic types are the primitive and structural kinds an
//! attribute's value can take (integer, text, reference, ...). The
//! registry is populated once during initialization and sealed before
//! any schema construction begins; afterwards it is read-only and can be
//! referenced from anywhere without synchronization.
//!
//! Each characteristic type carries a tree of named facet config
//! namespaces addressed by dotted keys (e.g. `sql.sql_type`), which
//! facets populate at registration time and query during synthesis.

use indexmap::IndexMap;
use serde_yaml::Value;
use std::sync::OnceLock;

/// Names of the standard characteristic types.
pub mod kinds {
    pub const VOID: &str = "void";
    pub const TEXT: &str = "text";
    pub const INTEGER: &str = "integer";
    pub const REAL: &str = "real";
    pub const DATE: &str = "date";
    pub const DATETIME: &str = "datetime";
    pub const BOOLEAN: &str = "boolean";
    pub const ENUMERATION: &str = "enumeration";
    pub const STRUCT: &str = "struct";
    pub const REFERENCE: &str = "reference";
}

/// A nested facet config namespace on a characteristic type.
#[derive(Debug, Default)]
pub struct ConfigNode {
    values: IndexMap<String, Value>,
    children: IndexMap<String, ConfigNode>,
}

impl ConfigNode {
    fn set(&mut self, dotted_key: &str, value: Value) {
        match dotted_key.split_once('.') {
            Some((head, rest)) => self
                .children
                .entry(head.to_string())
                .or_default()
                .set(rest, value),
            None => {
                self.values.insert(dotted_key.to_string(), value);
            }
        }
    }

    fn get(&self, dotted_key: &str) -> Option<&Value> {
        match dotted_key.split_once('.') {
            Some((head, rest)) => self.children.get(head)?.get(rest),
            None => self.values.get(dotted_key),
        }
    }
}

/// A named primitive or structural kind, immutable once the registry is sealed.
#[derive(Debug)]
pub struct CharacteristicType {
    name: String,
    config: ConfigNode,
}

impl CharacteristicType {
    /// The globally unique name of this characteristic type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a facet config value by dotted key (e.g. `sql.sql_type`).
    pub fn config_value(&self, dotted_key: &str) -> Option<&Value> {
        self.config.get(dotted_key)
    }

    /// Look up a facet config value expected to be a string.
    pub fn config_str(&self, dotted_key: &str) -> Option<&str> {
        self.config_value(dotted_key).and_then(Value::as_str)
    }
}

/// Builder used during the initialization phase, before the registry is sealed.
#[derive(Debug, Default)]
pub struct TypeDbBuilder {
    types: IndexMap<String, CharacteristicType>,
}

impl TypeDbBuilder {
    /// Register a characteristic type. Registering the same name twice is
    /// a defect in initialization code.
    pub fn characteristic_type(&mut self, name: &str) -> &mut Self {
        if self.types.contains_key(name) {
            panic!("Attempt to override characteristic type '{}'", name);
        }
        self.types.insert(
            name.to_string(),
            CharacteristicType {
                name: name.to_string(),
                config: ConfigNode::default(),
            },
        );
        self
    }

    /// Attach a facet config value to a registered characteristic type.
    pub fn configure(&mut self, type_name: &str, dotted_key: &str, value: &str) -> &mut Self {
        let characteristic_type = self
            .types
            .get_mut(type_name)
            .unwrap_or_else(|| panic!("Unable to locate characteristic type '{}'", type_name));
        characteristic_type
            .config
            .set(dotted_key, Value::String(value.to_string()));
        self
    }
}

/// The sealed, process-wide characteristic type registry.
#[derive(Debug)]
pub struct TypeDb {
    types: IndexMap<String, CharacteristicType>,
}

static TYPE_DB: OnceLock<TypeDb> = OnceLock::new();

impl TypeDb {
    /// Initialize the registry with the standard characteristic types and
    /// their facet config, sealing it. Idempotent: a second call returns
    /// the already-sealed registry.
    pub fn bootstrap() -> &'static TypeDb {
        TYPE_DB.get_or_init(|| {
            let mut builder = TypeDbBuilder::default();
            register_standard_types(&mut builder);
            TypeDb { types: builder.types }
        })
    }

    /// Initialize the registry with custom registrations on top of the
    /// standard set. Calling this after the registry is sealed is a defect.
    pub fn init_with(f: impl FnOnce(&mut TypeDbBuilder)) -> &'static TypeDb {
        if TYPE_DB.get().is_some() {
            panic!("TypeDb::init_with called after the registry was sealed");
        }
        TYPE_DB.get_or_init(|| {
            let mut builder = TypeDbBuilder::default();
            register_standard_types(&mut builder);
            f(&mut builder);
            TypeDb { types: builder.types }
        })
    }

    /// The sealed registry. Calling this before initialization is a defect.
    pub fn get() -> &'static TypeDb {
        TYPE_DB
            .get()
            .expect("TypeDb::get called before the registry was initialized; call metagen::init()")
    }

    /// Whether a characteristic type with this name is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Look up a characteristic type by name.
    pub fn characteristic_type(&self, name: &str) -> Option<&CharacteristicType> {
        self.types.get(name)
    }

    /// Registered characteristic type names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

fn register_standard_types(builder: &mut TypeDbBuilder) {
    builder
        .characteristic_type(kinds::VOID)
        .characteristic_type(kinds::TEXT)
        .characteristic_type(kinds::INTEGER)
        .characteristic_type(kinds::REAL)
        .characteristic_type(kinds::DATE)
        .characteristic_type(kinds::DATETIME)
        .characteristic_type(kinds::BOOLEAN)
        .characteristic_type(kinds::ENUMERATION)
        .characteristic_type(kinds::STRUCT)
        .characteristic_type(kinds::REFERENCE);

    // Storage types for the sql facet; enumeration and reference columns
    // derive their storage type structurally instead.
    builder
        .configure(kinds::TEXT, "sql.sql_type", "VARCHAR")
        .configure(kinds::INTEGER, "sql.sql_type", "INT")
        .configure(kinds::REAL, "sql.sql_type", "FLOAT")
        .configure(kinds::DATE, "sql.sql_type", "DATE")
        .configure(kinds::DATETIME, "sql.sql_type", "DATETIME")
        .configure(kinds::BOOLEAN, "sql.sql_type", "BIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_registers_standard_types() {
        let db = TypeDb::bootstrap();
        for name in [
            kinds::VOID,
            kinds::TEXT,
            kinds::INTEGER,
            kinds::REAL,
            kinds::DATE,
            kinds::DATETIME,
            kinds::BOOLEAN,
            kinds::ENUMERATION,
            kinds::STRUCT,
            kinds::REFERENCE,
        ] {
            assert!(db.is_registered(name), "missing standard type {}", name);
        }
        assert!(!db.is_registered("blob"));
    }

    #[test]
    fn test_bootstrap_is_idempotent() {
        let first = TypeDb::bootstrap();
        let second = TypeDb::bootstrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_sql_config_values() {
        let db = TypeDb::bootstrap();
        let integer = db.characteristic_type(kinds::INTEGER).unwrap();
        assert_eq!(integer.config_str("sql.sql_type"), Some("INT"));
        assert_eq!(integer.config_str("sql.unknown"), None);
        assert_eq!(integer.config_str("nope.sql_type"), None);
    }

    #[test]
    #[should_panic(expected = "Attempt to override characteristic type")]
    fn test_duplicate_registration_panics() {
        let mut builder = TypeDbBuilder::default();
        builder.characteristic_type("custom");
        builder.characteristic_type("custom");
    }
}
