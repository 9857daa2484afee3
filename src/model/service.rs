//! Service, method, and message definitions.
//!
//! These model the boundary surface of a schema (remote operations and
//! event payloads); client-tier facets such as gwt decorate them with
//! naming and dispatch configuration.

use crate::error::ConfigError;
use crate::facet::{ElementKind, ElementRef, Facets};
use crate::typedb::{kinds, TypeDb};

/// A named, typed parameter on a method or message.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub characteristic_type: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, characteristic_type: impl Into<String>) -> Self {
        Parameter {
            name: name.into(),
            characteristic_type: characteristic_type.into(),
        }
    }
}

/// An operation on a service.
#[derive(Debug)]
pub struct Method {
    name: String,
    pub(crate) owner: String,
    parameters: Vec<Parameter>,
    return_type: String,
    facets: Facets,
}

impl Method {
    pub fn new(name: impl Into<String>) -> Self {
        Method {
            name: name.into(),
            owner: String::new(),
            parameters: Vec::new(),
            return_type: kinds::VOID.to_string(),
            facets: Facets::default(),
        }
    }

    pub fn returns(mut self, characteristic_type: impl Into<String>) -> Self {
        self.return_type = characteristic_type.into();
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }

    pub fn element_ref(&self) -> ElementRef {
        ElementRef::new(ElementKind::Method, self.path())
    }

    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn return_type(&self) -> &str {
        &self.return_type
    }
}

/// A named collection of methods exposed at a service boundary.
#[derive(Debug)]
pub struct Service {
    name: String,
    pub(crate) schema: String,
    methods: Vec<Method>,
    facets: Facets,
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Service {
            name: name.into(),
            schema: String::new(),
            methods: Vec::new(),
            facets: Facets::default(),
        }
    }

    /// Add a method, validating its name is unique and its types are registered.
    pub fn define_method(&mut self, method: Method) -> Result<(), ConfigError> {
        if self.methods.iter().any(|m| m.name == method.name) {
            return Err(ConfigError::DuplicateName {
                kind: "Method",
                name: method.name.clone(),
                owner: self.path(),
            });
        }
        validate_parameter_types(&method.parameters, &method.return_type, &self.path())?;
        let mut method = method;
        method.owner = self.path();
        self.methods.push(method);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> String {
        if self.schema.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }

    pub fn element_ref(&self) -> ElementRef {
        ElementRef::new(ElementKind::Service, self.path())
    }

    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Stamp the owning schema onto this service and its methods.
    pub(crate) fn attach_to_schema(&mut self, schema: &str) {
        self.schema = schema.to_string();
        let path = self.path();
        for method in &mut self.methods {
            method.owner = path.clone();
        }
    }
}

/// A named event payload crossing the client boundary.
#[derive(Debug)]
pub struct Message {
    name: String,
    pub(crate) schema: String,
    parameters: Vec<Parameter>,
    facets: Facets,
}

impl Message {
    pub fn new(name: impl Into<String>) -> Self {
        Message {
            name: name.into(),
            schema: String::new(),
            parameters: Vec::new(),
            facets: Facets::default(),
        }
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn element_ref(&self) -> ElementRef {
        ElementRef::new(ElementKind::Message, self.path())
    }

    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        validate_parameter_types(&self.parameters, kinds::VOID, &self.path())
    }
}

fn validate_parameter_types(
    parameters: &[Parameter],
    return_type: &str,
    owner: &str,
) -> Result<(), ConfigError> {
    let db = TypeDb::get();
    for parameter in parameters {
        if !db.is_registered(&parameter.characteristic_type) {
            return Err(ConfigError::UnknownCharacteristicType {
                name: parameter.characteristic_type.clone(),
                owner: format!("{}.{}", owner, parameter.name),
            });
        }
    }
    if !db.is_registered(return_type) {
        return Err(ConfigError::UnknownCharacteristicType {
            name: return_type.to_string(),
            owner: owner.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_method_rejected() {
        crate::init();
        let mut service = Service::new("SubmissionService");
        service.define_method(Method::new("submit")).unwrap();
        let err = service.define_method(Method::new("submit")).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName { kind: "Method", .. }));
    }

    #[test]
    fn test_unknown_parameter_type_rejected() {
        crate::init();
        let mut service = Service::new("SubmissionService");
        let method = Method::new("submit").parameter(Parameter::new("blob", "binary"));
        let err = service.define_method(method).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCharacteristicType { .. }));
    }
}
