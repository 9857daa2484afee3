//! The gwt facet: client-tier naming for schemas, services, methods,
//! and messages.

use crate::error::ConfigError;
use crate::facet::{self, names, ElementKind, ElementRef, FacetCatalogBuilder, FacetView};
use crate::java::JavaSchema;
use crate::model::{Message, Method, Schema, SchemaSet, Service};
use serde_yaml::Value;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn owner_schema<'a>(set: &'a SchemaSet, node: &ElementRef) -> &'a Schema {
    set.schema(node.schema_name())
        .unwrap_or_else(|| panic!("model invariant violated: missing schema {}", node.schema_name()))
}

/// The gwt facet view of a schema: the client module and package layout.
pub struct GwtModule {
    node: ElementRef,
    module_name: RefCell<Option<String>>,
    package: RefCell<Option<String>>,
    shared_package: RefCell<Option<String>>,
    client_package: RefCell<Option<String>>,
    event_package: RefCell<Option<String>>,
    gin_package: RefCell<Option<String>>,
    server_package: RefCell<Option<String>>,
    gin_module_name: RefCell<Option<String>>,
}

impl GwtModule {
    pub(crate) fn new(node: ElementRef) -> Self {
        GwtModule {
            node,
            module_name: RefCell::new(None),
            package: RefCell::new(None),
            shared_package: RefCell::new(None),
            client_package: RefCell::new(None),
            event_package: RefCell::new(None),
            gin_package: RefCell::new(None),
            server_package: RefCell::new(None),
            gin_module_name: RefCell::new(None),
        }
    }

    pub fn of(schema: &Schema) -> Rc<GwtModule> {
        schema
            .facets()
            .attach_typed::<GwtModule>(schema.element_ref(), names::GWT)
    }

    pub fn module_name(&self) -> String {
        self.module_name
            .borrow()
            .clone()
            .unwrap_or_else(|| self.node.local_name().to_string())
    }

    pub fn package(&self, set: &SchemaSet) -> String {
        self.package
            .borrow()
            .clone()
            .unwrap_or_else(|| JavaSchema::of(owner_schema(set, &self.node)).package())
    }

    pub fn shared_package(&self, set: &SchemaSet) -> String {
        self.shared_package
            .borrow()
            .clone()
            .unwrap_or_else(|| format!("{}.shared", self.package(set)))
    }

    pub fn client_package(&self, set: &SchemaSet) -> String {
        self.client_package
            .borrow()
            .clone()
            .unwrap_or_else(|| format!("{}.client", self.package(set)))
    }

    pub fn event_package(&self, set: &SchemaSet) -> String {
        self.event_package
            .borrow()
            .clone()
            .unwrap_or_else(|| format!("{}.event", self.client_package(set)))
    }

    pub fn gin_package(&self, set: &SchemaSet) -> String {
        self.gin_package
            .borrow()
            .clone()
            .unwrap_or_else(|| format!("{}.gin", self.client_package(set)))
    }

    pub fn server_package(&self, set: &SchemaSet) -> String {
        self.server_package
            .borrow()
            .clone()
            .unwrap_or_else(|| format!("{}.server", self.package(set)))
    }

    pub fn gin_module_name(&self) -> String {
        self.gin_module_name
            .borrow()
            .clone()
            .unwrap_or_else(|| format!("{}ServicesGinModule", self.module_name()))
    }

    pub fn qualified_gin_module_name(&self, set: &SchemaSet) -> String {
        format!("{}.{}", self.gin_package(set), self.gin_module_name())
    }
}

impl FacetView for GwtModule {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        let slot = match key {
            "module_name" => &self.module_name,
            "package" => &self.package,
            "shared_package" => &self.shared_package,
            "client_package" => &self.client_package,
            "event_package" => &self.event_package,
            "gin_package" => &self.gin_package,
            "server_package" => &self.server_package,
            "gin_module_name" => &self.gin_module_name,
            _ => return Err(facet::unknown_option(names::GWT, &self.node, key)),
        };
        *slot.borrow_mut() = Some(facet::opt_str(&self.node, key, value)?);
        Ok(())
    }
}

/// The gwt facet view of a service: sync/async interfaces and servlet.
pub struct GwtService {
    node: ElementRef,
    xsrf_protected: Cell<bool>,
    service_name: RefCell<Option<String>>,
    servlet_name: RefCell<Option<String>>,
}

impl GwtService {
    pub(crate) fn new(node: ElementRef) -> Self {
        GwtService {
            node,
            xsrf_protected: Cell::new(true),
            service_name: RefCell::new(None),
            servlet_name: RefCell::new(None),
        }
    }

    pub fn of(service: &Service) -> Rc<GwtService> {
        service
            .facets()
            .attach_typed::<GwtService>(service.element_ref(), names::GWT)
    }

    pub fn xsrf_protected(&self) -> bool {
        self.xsrf_protected.get()
    }

    pub fn service_name(&self) -> String {
        self.service_name
            .borrow()
            .clone()
            .unwrap_or_else(|| self.node.local_name().to_string())
    }

    fn module<'a>(&self, set: &'a SchemaSet) -> Rc<GwtModule> {
        GwtModule::of(owner_schema(set, &self.node))
    }

    pub fn qualified_service_name(&self, set: &SchemaSet) -> String {
        format!("{}.{}", self.module(set).shared_package(set), self.service_name())
    }

    pub fn async_service_name(&self) -> String {
        format!("{}Async", self.service_name())
    }

    pub fn qualified_async_service_name(&self, set: &SchemaSet) -> String {
        format!(
            "{}.{}",
            self.module(set).shared_package(set),
            self.async_service_name()
        )
    }

    pub fn servlet_name(&self) -> String {
        self.servlet_name
            .borrow()
            .clone()
            .unwrap_or_else(|| format!("{}Servlet", self.service_name()))
    }

    pub fn qualified_servlet_name(&self, set: &SchemaSet) -> String {
        format!("{}.{}", self.module(set).server_package(set), self.servlet_name())
    }
}

impl FacetView for GwtService {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "xsrf_protected" => {
                self.xsrf_protected.set(facet::opt_bool(&self.node, key, value)?);
                Ok(())
            }
            "service_name" => {
                *self.service_name.borrow_mut() = Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            "servlet_name" => {
                *self.servlet_name.borrow_mut() = Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            _ => Err(facet::unknown_option(names::GWT, &self.node, key)),
        }
    }
}

/// The gwt facet view of a method.
pub struct GwtMethod {
    node: ElementRef,
    cancelable: Cell<bool>,
}

impl GwtMethod {
    pub(crate) fn new(node: ElementRef) -> Self {
        GwtMethod {
            node,
            cancelable: Cell::new(false),
        }
    }

    pub fn of(method: &Method) -> Rc<GwtMethod> {
        method
            .facets()
            .attach_typed::<GwtMethod>(method.element_ref(), names::GWT)
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable.get()
    }
}

impl FacetView for GwtMethod {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "cancelable" => {
                self.cancelable.set(facet::opt_bool(&self.node, key, value)?);
                Ok(())
            }
            _ => Err(facet::unknown_option(names::GWT, &self.node, key)),
        }
    }
}

/// The gwt facet view of a message: the client event and its handler.
pub struct GwtEvent {
    node: ElementRef,
    event_name: RefCell<Option<String>>,
    event_handler_name: RefCell<Option<String>>,
}

impl GwtEvent {
    pub(crate) fn new(node: ElementRef) -> Self {
        GwtEvent {
            node,
            event_name: RefCell::new(None),
            event_handler_name: RefCell::new(None),
        }
    }

    pub fn of(message: &Message) -> Rc<GwtEvent> {
        message
            .facets()
            .attach_typed::<GwtEvent>(message.element_ref(), names::GWT)
    }

    pub fn event_name(&self) -> String {
        self.event_name
            .borrow()
            .clone()
            .unwrap_or_else(|| format!("{}Event", self.node.local_name()))
    }

    pub fn qualified_event_name(&self, set: &SchemaSet) -> String {
        let module = GwtModule::of(owner_schema(set, &self.node));
        format!("{}.{}", module.event_package(set), self.event_name())
    }

    pub fn event_handler_name(&self) -> String {
        self.event_handler_name
            .borrow()
            .clone()
            .unwrap_or_else(|| format!("{}Handler", self.event_name()))
    }

    pub fn qualified_event_handler_name(&self, set: &SchemaSet) -> String {
        let module = GwtModule::of(owner_schema(set, &self.node));
        format!("{}.{}", module.event_package(set), self.event_handler_name())
    }
}

impl FacetView for GwtEvent {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_option(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "event_name" => {
                *self.event_name.borrow_mut() = Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            "event_handler_name" => {
                *self.event_handler_name.borrow_mut() =
                    Some(facet::opt_str(&self.node, key, value)?);
                Ok(())
            }
            _ => Err(facet::unknown_option(names::GWT, &self.node, key)),
        }
    }
}

pub(crate) fn register_facets(builder: &mut FacetCatalogBuilder) {
    builder.register(ElementKind::Schema, names::GWT, GwtModule::new);
    builder.register(ElementKind::Service, names::GWT, GwtService::new);
    builder.register(ElementKind::Method, names::GWT, GwtMethod::new);
    builder.register(ElementKind::Message, names::GWT, GwtEvent::new);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Message, Method, Service};

    fn gwt_set() -> SchemaSet {
        crate::init();
        let mut set = SchemaSet::new();
        let schema = set.define_schema("core").unwrap();
        JavaSchema::of(schema).set_package("epwp.model");
        let mut service = Service::new("SubmissionService");
        service.define_method(Method::new("submit")).unwrap();
        schema.add_service(service).unwrap();
        schema.add_message(Message::new("SubmissionUpdated")).unwrap();
        set.verify().unwrap();
        set
    }

    #[test]
    fn test_module_package_layout() {
        let set = gwt_set();
        let module = GwtModule::of(set.schema("core").unwrap());
        assert_eq!(module.package(&set), "epwp.model");
        assert_eq!(module.shared_package(&set), "epwp.model.shared");
        assert_eq!(module.event_package(&set), "epwp.model.client.event");
        assert_eq!(
            module.qualified_gin_module_name(&set),
            "epwp.model.client.gin.coreServicesGinModule"
        );
    }

    #[test]
    fn test_service_names() {
        let set = gwt_set();
        let service = set.schema("core").unwrap().service_by_name("SubmissionService").unwrap();
        let view = GwtService::of(service);
        assert!(view.xsrf_protected());
        assert_eq!(
            view.qualified_service_name(&set),
            "epwp.model.shared.SubmissionService"
        );
        assert_eq!(
            view.qualified_async_service_name(&set),
            "epwp.model.shared.SubmissionServiceAsync"
        );
        assert_eq!(
            view.qualified_servlet_name(&set),
            "epwp.model.server.SubmissionServiceServlet"
        );
        let method = &service.methods()[0];
        assert!(!GwtMethod::of(method).cancelable());
    }

    #[test]
    fn test_event_names() {
        let set = gwt_set();
        let message = set.schema("core").unwrap().message_by_name("SubmissionUpdated").unwrap();
        let view = GwtEvent::of(message);
        assert_eq!(view.event_name(), "SubmissionUpdatedEvent");
        assert_eq!(
            view.qualified_event_handler_name(&set),
            "epwp.model.client.event.SubmissionUpdatedEventHandler"
        );
    }
}
