//! The template renderer boundary.
//!
//! The core exposes a pull-based surface: a [`Template`] describes which
//! element kind it applies to, an optional applicability guard over
//! facet state, and an output path pattern; a [`TemplateEngine`] (the
//! external collaborator) renders each selected element. Rendering is
//! two-phase: every artifact is rendered to memory before anything is
//! written, so a failure never leaves partial output behind.

use crate::facet::{ElementKind, ElementRef};
use crate::error::GenerateError;
use crate::java::{JavaClass, JavaSchema};
use crate::model::SchemaSet;
use crate::utils::package_to_path;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// A render target handed to the template engine.
pub struct RenderTarget<'a> {
    pub set: &'a SchemaSet,
    pub element: ElementRef,
}

/// The external rendering collaborator. The core never calls into
/// renderer logic except through this trait; the engine queries the
/// model through the target.
pub trait TemplateEngine {
    fn render(
        &self,
        template_path: &str,
        target: &RenderTarget<'_>,
    ) -> Result<String, GenerateError>;
}

type Guard = Box<dyn Fn(&SchemaSet, &ElementRef) -> bool>;

/// A template descriptor.
///
/// The output pattern substitutes `{placeholder}` keys: `{name}`,
/// `{schema}`, `{java_package_path}` (the owning schema's java package
/// as a directory path), and `{java_qualified_path}` (an object type's
/// or enumeration's java-qualified name as a path).
pub struct Template {
    pub element_kind: ElementKind,
    pub template_path: String,
    pub output_pattern: String,
    guard: Option<Guard>,
}

impl Template {
    pub fn new(
        element_kind: ElementKind,
        template_path: impl Into<String>,
        output_pattern: impl Into<String>,
    ) -> Self {
        Template {
            element_kind,
            template_path: template_path.into(),
            output_pattern: output_pattern.into(),
            guard: None,
        }
    }

    /// Restrict the template to elements the guard accepts.
    pub fn guarded(
        mut self,
        guard: impl Fn(&SchemaSet, &ElementRef) -> bool + 'static,
    ) -> Self {
        self.guard = Some(Box::new(guard));
        self
    }

    pub fn applies(&self, set: &SchemaSet, element: &ElementRef) -> bool {
        self.guard.as_ref().map_or(true, |guard| guard(set, element))
    }
}

/// The templates one facet contributes to a generation run, named after
/// the facet so runs can select which tiers to produce.
pub struct TemplateSet {
    pub name: String,
    pub templates: Vec<Template>,
}

impl TemplateSet {
    pub fn new(name: impl Into<String>) -> Self {
        TemplateSet {
            name: name.into(),
            templates: Vec::new(),
        }
    }

    pub fn template(mut self, template: Template) -> Self {
        self.templates.push(template);
        self
    }
}

/// As [`generate`], over the templates of several facet sets. Nothing
/// is written until every set has rendered.
pub fn generate_sets(
    set: &SchemaSet,
    template_sets: &[TemplateSet],
    engine: &dyn TemplateEngine,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, GenerateError> {
    assert!(
        set.is_verified(),
        "generation invoked before SchemaSet::verify"
    );
    let mut rendered = Vec::new();
    for templates in template_sets {
        tracing::debug!("rendering template set '{}'", templates.name);
        rendered.extend(render_all(set, &templates.templates, engine, output_dir)?);
    }
    write_all(rendered)
}

fn targets(set: &SchemaSet, kind: ElementKind) -> Vec<ElementRef> {
    let mut found = Vec::new();
    for schema in set.schemas() {
        match kind {
            ElementKind::Schema => found.push(schema.element_ref()),
            ElementKind::ObjectType => {
                found.extend(schema.object_types().iter().map(|t| t.element_ref()));
            }
            ElementKind::Enumeration => {
                found.extend(schema.enumerations().iter().map(|e| e.element_ref()));
            }
            ElementKind::Service => {
                found.extend(schema.services().iter().map(|s| s.element_ref()));
            }
            ElementKind::Message => {
                found.extend(schema.messages().iter().map(|m| m.element_ref()));
            }
            ElementKind::Attribute | ElementKind::Method => {}
        }
    }
    found
}

fn output_path(
    set: &SchemaSet,
    element: &ElementRef,
    pattern: &str,
) -> Result<String, GenerateError> {
    let placeholder = Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid");
    let mut result = String::new();
    let mut last = 0;
    for capture in placeholder.captures_iter(pattern) {
        let whole = capture.get(0).expect("capture 0 always present");
        let key = &capture[1];
        result.push_str(&pattern[last..whole.start()]);
        let substitution = match key {
            "name" => element.local_name().to_string(),
            "schema" => element.schema_name().to_string(),
            "java_package_path" => {
                let schema = set
                    .schema(element.schema_name())
                    .expect("render target schema exists");
                package_to_path(&JavaSchema::of(schema).package())
            }
            "java_qualified_path" => match element.kind {
                ElementKind::ObjectType => {
                    let object_type = set
                        .object_type(&element.path)
                        .expect("render target object type exists");
                    package_to_path(&JavaClass::of(object_type).qualified_name(set))
                }
                _ => {
                    return Err(GenerateError::Render {
                        template: pattern.to_string(),
                        reason: format!(
                            "placeholder '{}' is not defined for {}",
                            key, element
                        ),
                    })
                }
            },
            other => {
                return Err(GenerateError::Render {
                    template: pattern.to_string(),
                    reason: format!("unknown output placeholder '{}'", other),
                })
            }
        };
        result.push_str(&substitution);
        last = whole.end();
    }
    result.push_str(&pattern[last..]);
    Ok(result)
}

/// Render every applicable (template, element) pair and write the
/// results under `output_dir`. Files are written only after every
/// template has rendered successfully.
///
/// The set must be verified first; generating from an unverified model
/// is a defect in calling code.
pub fn generate(
    set: &SchemaSet,
    templates: &[Template],
    engine: &dyn TemplateEngine,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, GenerateError> {
    assert!(
        set.is_verified(),
        "generation invoked before SchemaSet::verify"
    );
    let rendered = render_all(set, templates, engine, output_dir)?;
    write_all(rendered)
}

fn render_all(
    set: &SchemaSet,
    templates: &[Template],
    engine: &dyn TemplateEngine,
    output_dir: &Path,
) -> Result<Vec<(PathBuf, String)>, GenerateError> {
    let mut rendered: Vec<(PathBuf, String)> = Vec::new();
    for template in templates {
        for element in targets(set, template.element_kind) {
            if !template.applies(set, &element) {
                continue;
            }
            let target = RenderTarget {
                set,
                element: element.clone(),
            };
            let text = engine.render(&template.template_path, &target)?;
            let relative = output_path(set, &element, &template.output_pattern)?;
            rendered.push((output_dir.join(relative), text));
        }
    }
    Ok(rendered)
}

fn write_all(rendered: Vec<(PathBuf, String)>) -> Result<Vec<PathBuf>, GenerateError> {
    let mut written = Vec::with_capacity(rendered.len());
    for (path, text) in rendered {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| GenerateError::WriteFailed {
                path: parent.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        fs::write(&path, text).map_err(|e| GenerateError::WriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!("generated {}", path.display());
        written.push(path);
    }
    Ok(written)
}
