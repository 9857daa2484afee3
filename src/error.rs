//! Error types for schema configuration and artifact generation.
//!
//! Configuration errors are always fatal: the run halts on the first one
//! and no output is written. Contract violations (misuse of the API by
//! calling code) panic instead; see the crate-level documentation.

use std::fmt;

/// Error raised while building, verifying, or synthesizing a schema set.
///
/// Every variant carries the qualified name of the owning element so the
/// offending declaration can be located.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A name was declared twice within one namespace.
    DuplicateName {
        kind: &'static str,
        name: String,
        owner: String,
    },
    /// An attribute declared a characteristic type missing from the registry.
    UnknownCharacteristicType {
        name: String,
        owner: String,
    },
    /// A by-name reference could not be resolved eagerly.
    UnresolvedReference {
        target: String,
        owner: String,
    },
    /// Deferred references left dangling after the verify pass, reported together.
    UnresolvedReferences {
        /// (owning element, referenced name) pairs.
        failures: Vec<(String, String)>,
    },
    /// The `extends` declaration is structurally invalid.
    InvalidInheritance {
        object_type: String,
        reason: String,
    },
    /// A concrete object type does not have exactly one primary key attribute.
    MissingPrimaryKey {
        object_type: String,
    },
    /// A constraint or artifact named an attribute that does not exist.
    UnknownAttribute {
        name: String,
        owner: String,
    },
    /// A derived or declared SQL artifact collided with an owned artifact.
    ArtifactCollision {
        artifact: String,
        table: String,
    },
    /// A partition scheme was set without any clustering index.
    MissingClusterIndex {
        table: String,
    },
    /// More than one clustering index was declared on a table.
    MultipleClusterIndexes {
        table: String,
    },
    /// An option map addressed a key the facet view does not understand.
    UnknownOption {
        key: String,
        facet: String,
        owner: String,
    },
    /// No representation mapping exists for a characteristic type.
    UnmappedType {
        characteristic_type: String,
        owner: String,
    },
    /// A file could not be read.
    ReadFailed {
        path: String,
        reason: String,
    },
    /// A schema document could not be parsed.
    ParseFailed {
        path: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DuplicateName { kind, name, owner } => {
                write!(f, "{} '{}' already defined on {}", kind, name, owner)
            }
            ConfigError::UnknownCharacteristicType { name, owner } => {
                write!(f, "Unknown characteristic type '{}' on {}", name, owner)
            }
            ConfigError::UnresolvedReference { target, owner } => {
                write!(f, "Unable to resolve '{}' referenced from {}", target, owner)
            }
            ConfigError::UnresolvedReferences { failures } => {
                write!(f, "Unresolved references after verify:")?;
                for (owner, target) in failures {
                    write!(f, "\n  {} -> {}", owner, target)?;
                }
                Ok(())
            }
            ConfigError::InvalidInheritance { object_type, reason } => {
                write!(f, "Invalid inheritance on {}: {}", object_type, reason)
            }
            ConfigError::MissingPrimaryKey { object_type } => {
                write!(
                    f,
                    "Object type {} must have exactly one primary key attribute",
                    object_type
                )
            }
            ConfigError::UnknownAttribute { name, owner } => {
                write!(f, "No attribute named '{}' on {}", name, owner)
            }
            ConfigError::ArtifactCollision { artifact, table } => {
                write!(f, "Artifact named {} already defined on table {}", artifact, table)
            }
            ConfigError::MissingClusterIndex { table } => {
                write!(
                    f,
                    "Table {} must specify a clustered index if using a partition scheme",
                    table
                )
            }
            ConfigError::MultipleClusterIndexes { table } => {
                write!(f, "Table {} defines multiple clustering indexes", table)
            }
            ConfigError::UnknownOption { key, facet, owner } => {
                write!(f, "Unknown option '{}' for facet '{}' on {}", key, facet, owner)
            }
            ConfigError::UnmappedType { characteristic_type, owner } => {
                write!(
                    f,
                    "No representation mapping for characteristic type '{}' on {}",
                    characteristic_type, owner
                )
            }
            ConfigError::ReadFailed { path, reason } => {
                write!(f, "Failed to read {}: {}", path, reason)
            }
            ConfigError::ParseFailed { path, reason } => {
                write!(f, "Failed to parse {}: {}", path, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Error raised at the template renderer boundary.
#[derive(Debug)]
pub enum GenerateError {
    /// The template engine failed to render a template.
    Render {
        template: String,
        reason: String,
    },
    /// A rendered artifact could not be written.
    WriteFailed {
        path: String,
        reason: String,
    },
    /// The model was invalid; carries the underlying configuration error.
    Config(ConfigError),
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::Render { template, reason } => {
                write!(f, "Failed to render template {}: {}", template, reason)
            }
            GenerateError::WriteFailed { path, reason } => {
                write!(f, "Failed to write {}: {}", path, reason)
            }
            GenerateError::Config(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for GenerateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerateError::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for GenerateError {
    fn from(err: ConfigError) -> Self {
        GenerateError::Config(err)
    }
}
