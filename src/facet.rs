//! Facet extension mechanism.
//!
//! A facet is a named cross-cutting concern (sql, java, jpa, gwt, imit,
//! ...) that attaches an additional view of data and behavior to core
//! schema elements. The core model knows nothing about facet code: each
//! node carries a generic cache from facet name to an opaque view
//! object, and a process-wide catalog maps (element kind, facet name) to
//! the concrete view constructor.
//!
//! Views are constructed lazily on first access, passing the node's
//! element reference as their sole back-reference, and cached for the
//! node's lifetime. Attaching a facet to an element kind it has no
//! registered view for is a defect in calling code and panics.

use crate::error::ConfigError;
use indexmap::IndexMap;
use serde_yaml::Value;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;

/// Well-known facet names.
pub mod names {
    pub const SQL: &str = "sql";
    pub const JAVA: &str = "java";
    pub const JPA: &str = "jpa";
    pub const IMIT: &str = "imit";
    pub const GWT: &str = "gwt";
}

/// The kinds of schema element a facet view can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Schema,
    ObjectType,
    Attribute,
    Enumeration,
    Service,
    Method,
    Message,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ElementKind::Schema => "schema",
            ElementKind::ObjectType => "object type",
            ElementKind::Attribute => "attribute",
            ElementKind::Enumeration => "enumeration",
            ElementKind::Service => "service",
            ElementKind::Method => "method",
            ElementKind::Message => "message",
        };
        write!(f, "{}", label)
    }
}

/// A back-reference from a facet view to its owning schema element.
///
/// The path is the element's qualified name, dot-separated from the
/// schema down (e.g. `core.Submission.PriorSubmission`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub kind: ElementKind,
    pub path: String,
}

impl ElementRef {
    pub fn new(kind: ElementKind, path: impl Into<String>) -> Self {
        ElementRef { kind, path: path.into() }
    }

    /// The schema segment of the path.
    pub fn schema_name(&self) -> &str {
        self.path.split('.').next().unwrap_or(&self.path)
    }

    /// The final segment of the path.
    pub fn local_name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    /// The path with the final segment removed, if any.
    pub fn parent_path(&self) -> Option<&str> {
        self.path.rsplit_once('.').map(|(head, _)| head)
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path)
    }
}

/// A facet-specific view attached to a schema element.
///
/// Views use interior mutability for their settable fields; the whole
/// model is single-threaded (see the crate documentation), so plain
/// `RefCell`/`Cell` fields are sufficient.
pub trait FacetView: Any {
    fn as_any(&self) -> &dyn Any;

    /// Apply a single, undotted option key to this view.
    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError>;

    /// Navigate to a nested sub-view for dotted option keys.
    fn sub_view(&self, _key: &str) -> Option<Rc<dyn FacetView>> {
        None
    }
}

/// Construct the standard unknown-option error for a view.
pub fn unknown_option(facet: &str, node: &ElementRef, key: &str) -> ConfigError {
    ConfigError::UnknownOption {
        key: key.to_string(),
        facet: facet.to_string(),
        owner: node.path.clone(),
    }
}

/// Coerce an option value to a string, with a located error otherwise.
pub fn opt_str(node: &ElementRef, key: &str, value: &Value) -> Result<String, ConfigError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::ParseFailed {
            path: node.path.clone(),
            reason: format!("option '{}' expects a string value", key),
        })
}

/// Coerce an option value to a bool, with a located error otherwise.
pub fn opt_bool(node: &ElementRef, key: &str, value: &Value) -> Result<bool, ConfigError> {
    value.as_bool().ok_or_else(|| ConfigError::ParseFailed {
        path: node.path.clone(),
        reason: format!("option '{}' expects a boolean value", key),
    })
}

/// Coerce an option value to a list of strings, with a located error otherwise.
pub fn opt_str_list(node: &ElementRef, key: &str, value: &Value) -> Result<Vec<String>, ConfigError> {
    let items = value.as_sequence().ok_or_else(|| ConfigError::ParseFailed {
        path: node.path.clone(),
        reason: format!("option '{}' expects a list of strings", key),
    })?;
    items
        .iter()
        .map(|item| opt_str(node, key, item))
        .collect()
}

/// Apply an options map to a view. Dotted keys address nested sub-views;
/// unknown keys are a hard error.
pub fn apply_options(
    view: &Rc<dyn FacetView>,
    facet: &str,
    node: &ElementRef,
    options: &IndexMap<String, Value>,
) -> Result<(), ConfigError> {
    for (key, value) in options {
        let mut target: Rc<dyn FacetView> = view.clone();
        let mut segments: Vec<&str> = key.split('.').collect();
        let last = segments.pop().expect("option key cannot be empty");
        for segment in segments {
            target = target
                .sub_view(segment)
                .ok_or_else(|| unknown_option(facet, node, key))?;
        }
        target.set_option(last, value)?;
    }
    Ok(())
}

struct CachedView {
    any: Rc<dyn Any>,
    view: Rc<dyn FacetView>,
}

type Constructor = Box<dyn Fn(ElementRef) -> CachedView + Send + Sync>;

/// Registration-time builder for the facet catalog.
#[derive(Default)]
pub struct FacetCatalogBuilder {
    constructors: HashMap<(ElementKind, &'static str), Constructor>,
}

impl FacetCatalogBuilder {
    /// Register the view type for an (element kind, facet name) pair.
    pub fn register<T: FacetView>(
        &mut self,
        kind: ElementKind,
        facet: &'static str,
        constructor: fn(ElementRef) -> T,
    ) -> &mut Self {
        if self.constructors.contains_key(&(kind, facet)) {
            panic!("Facet '{}' already registered for {}", facet, kind);
        }
        self.constructors.insert(
            (kind, facet),
            Box::new(move |node| {
                let view = Rc::new(constructor(node));
                CachedView {
                    any: view.clone() as Rc<dyn Any>,
                    view,
                }
            }),
        );
        self
    }
}

/// The sealed, process-wide table of facet view constructors.
pub struct FacetCatalog {
    constructors: HashMap<(ElementKind, &'static str), Constructor>,
}

static CATALOG: OnceLock<FacetCatalog> = OnceLock::new();

impl FacetCatalog {
    /// Build and seal the catalog. Idempotent: a second call returns the
    /// already-sealed catalog without running the registration closure.
    pub fn bootstrap_with(f: impl FnOnce(&mut FacetCatalogBuilder)) -> &'static FacetCatalog {
        CATALOG.get_or_init(|| {
            let mut builder = FacetCatalogBuilder::default();
            f(&mut builder);
            FacetCatalog {
                constructors: builder.constructors,
            }
        })
    }

    /// The sealed catalog. Calling this before initialization is a defect.
    pub fn global() -> &'static FacetCatalog {
        CATALOG
            .get()
            .expect("facet catalog not installed; call metagen::init()")
    }

    /// Whether a view type is registered for this (kind, facet) pair.
    pub fn supports(&self, kind: ElementKind, facet: &str) -> bool {
        self.constructors.contains_key(&(kind, facet))
    }

    fn construct(&self, facet: &str, node: ElementRef) -> CachedView {
        let constructor = self
            .constructors
            .get(&(node.kind, facet))
            .unwrap_or_else(|| {
                panic!("No '{}' facet view registered for {}", facet, node)
            });
        constructor(node)
    }
}

/// Per-node facet view cache. Owned by every schema element.
#[derive(Default)]
pub struct Facets {
    views: RefCell<IndexMap<&'static str, CachedView>>,
}

impl fmt::Debug for Facets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.views.borrow().keys().copied().collect();
        f.debug_struct("Facets").field("attached", &names).finish()
    }
}

impl Facets {
    /// Attach (or fetch the cached) view for a facet on this node.
    pub fn attach(&self, node: ElementRef, facet: &'static str) -> Rc<dyn FacetView> {
        if let Some(cached) = self.views.borrow().get(facet) {
            return cached.view.clone();
        }
        let built = FacetCatalog::global().construct(facet, node);
        let view = built.view.clone();
        self.views.borrow_mut().insert(facet, built);
        view
    }

    /// Attach and downcast to the concrete view type.
    pub fn attach_typed<T: FacetView>(&self, node: ElementRef, facet: &'static str) -> Rc<T> {
        let path = node.path.clone();
        let _ = self.attach(node, facet);
        let views = self.views.borrow();
        let cached = views.get(facet).expect("view cached by attach");
        cached
            .any
            .clone()
            .downcast::<T>()
            .unwrap_or_else(|_| {
                panic!(
                    "Facet '{}' view on {} is not a {}",
                    facet,
                    path,
                    std::any::type_name::<T>()
                )
            })
    }

    /// Attach a view and apply an options map to it.
    pub fn attach_with_options(
        &self,
        node: ElementRef,
        facet: &'static str,
        options: &IndexMap<String, Value>,
    ) -> Result<Rc<dyn FacetView>, ConfigError> {
        let node_for_errors = node.clone();
        let view = self.attach(node, facet);
        apply_options(&view, facet, &node_for_errors, options)?;
        Ok(view)
    }

    /// Whether a view for this facet has already been constructed.
    pub fn attached(&self, facet: &str) -> bool {
        self.views.borrow().contains_key(facet)
    }
}


#[cfg(test)]
mod tests {
    use super::probe::ProbeView;
    use super::*;

    fn probe_node() -> ElementRef {
        ElementRef::new(ElementKind::ObjectType, "core.Submission")
    }

    #[test]
    fn test_attach_caches_view() {
        crate::init();
        let facets = Facets::default();
        let first = facets.attach_typed::<ProbeView>(probe_node(), "probe");
        let second = facets.attach_typed::<ProbeView>(probe_node(), "probe");
        assert!(Rc::ptr_eq(&first, &second));
        assert!(facets.attached("probe"));
        assert!(!facets.attached("sql"));
    }

    #[test]
    fn test_options_applied() {
        crate::init();
        let facets = Facets::default();
        let mut options = IndexMap::new();
        options.insert("label".to_string(), Value::String("Widget".to_string()));
        facets
            .attach_with_options(probe_node(), "probe", &options)
            .unwrap();
        let view = facets.attach_typed::<ProbeView>(probe_node(), "probe");
        assert_eq!(view.label.borrow().as_deref(), Some("Widget"));
    }

    #[test]
    fn test_dotted_option_reaches_sub_view() {
        crate::init();
        let facets = Facets::default();
        let mut options = IndexMap::new();
        options.insert(
            "naming.suffix".to_string(),
            Value::String("Impl".to_string()),
        );
        facets
            .attach_with_options(probe_node(), "probe", &options)
            .unwrap();
        let view = facets.attach_typed::<ProbeView>(probe_node(), "probe");
        assert_eq!(view.naming.suffix.borrow().as_deref(), Some("Impl"));

        let mut bad = IndexMap::new();
        bad.insert("naming.nope".to_string(), Value::String("x".to_string()));
        let err = facets
            .attach_with_options(probe_node(), "probe", &bad)
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::UnknownOption { .. }));
        let mut missing = IndexMap::new();
        missing.insert("bogus.suffix".to_string(), Value::String("x".to_string()));
        let err = facets
            .attach_with_options(probe_node(), "probe", &missing)
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::UnknownOption { .. }));
    }

    #[test]
    fn test_unknown_option_is_error() {
        crate::init();
        let facets = Facets::default();
        let mut options = IndexMap::new();
        options.insert("nope".to_string(), Value::String("x".to_string()));
        let err = facets
            .attach_with_options(probe_node(), "probe", &options)
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::UnknownOption { .. }));
    }

    #[test]
    #[should_panic(expected = "No 'probe' facet view registered")]
    fn test_unsupported_kind_panics() {
        crate::init();
        let facets = Facets::default();
        let node = ElementRef::new(ElementKind::Message, "core.Ping");
        facets.attach(node, "probe");
    }

    #[test]
    fn test_element_ref_paths() {
        let node = ElementRef::new(ElementKind::Attribute, "core.Submission.Name");
        assert_eq!(node.schema_name(), "core");
        assert_eq!(node.local_name(), "Name");
        assert_eq!(node.parent_path(), Some("core.Submission"));
    }
}
