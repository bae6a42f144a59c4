//! Route registration: web services, their routes and parameters.
//!
//! The builder only reads routes through the [`Route`] and
//! [`RouteContainer`] traits, so other routers can be adapted by
//! implementing them. [`WebService`] is the bundled implementation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::util::canonical_name_from_type_path;

pub const MIME_JSON: &str = "application/json";

/// Where a parameter lives in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Path,
    Query,
    Header,
    Form,
    Body,
}

/// Model types usable as request or response payloads
pub trait OpenApiModel {
    /// Fully qualified name used to look up the model's definition
    fn canonical_type_name() -> String
    where
        Self: Sized,
    {
        canonical_name_from_type_path(std::any::type_name::<Self>())
    }
}

macro_rules! primitive_models {
    ($($ty:ty),*) => {
        $(impl OpenApiModel for $ty {})*
    };
}

primitive_models!(u8, i8, u16, i16, i32, u32, i64, u64, isize, usize, f32, f64, bool);

impl OpenApiModel for String {
    fn canonical_type_name() -> String {
        "string".to_string()
    }
}

impl OpenApiModel for serde_json::Value {
    fn canonical_type_name() -> String {
        "object".to_string()
    }
}

/// Reference to a payload model by canonical type name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    name: String,
}

impl ModelRef {
    pub fn of<T: OpenApiModel>() -> Self {
        Self {
            name: T::canonical_type_name(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A declared request parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteParameter {
    pub name: String,
    pub description: String,
    pub kind: ParameterKind,
    pub data_type: String,
    pub required: bool,
    pub allow_multiple: bool,
}

impl RouteParameter {
    pub fn new(kind: ParameterKind, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            data_type: "string".to_string(),
            required: kind == ParameterKind::Path,
            allow_multiple: false,
        }
    }

    pub fn data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn allow_multiple(mut self, allow_multiple: bool) -> Self {
        self.allow_multiple = allow_multiple;
        self
    }
}

/// A declared response for a status code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCodeResponse {
    pub code: u16,
    pub message: String,
    pub model: Option<ModelRef>,
}

/// Read access to a registered route
pub trait Route {
    fn method(&self) -> &str;
    fn path(&self) -> &str;
    fn operation_name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> &[RouteParameter];
    fn status_code_responses(&self) -> &[StatusCodeResponse];
    fn request_payload_sample(&self) -> Option<&ModelRef>;
    fn response_payload_sample(&self) -> Option<&ModelRef>;
    fn consumes(&self) -> &[String];
    fn produces(&self) -> &[String];
    fn metadata(&self) -> &BTreeMap<String, serde_json::Value>;
}

/// A group of routes sharing a root path
pub trait RouteContainer {
    fn root_path(&self) -> &str;
    fn path_parameters(&self) -> &[RouteParameter];
    fn routes(&self) -> Vec<&dyn Route>;
}

/// A finished route of a [`WebService`]
#[derive(Debug, Clone, Default)]
pub struct RestRoute {
    method: String,
    path: String,
    operation: String,
    doc: String,
    parameters: Vec<RouteParameter>,
    responses: Vec<StatusCodeResponse>,
    read_sample: Option<ModelRef>,
    write_sample: Option<ModelRef>,
    consumes: Vec<String>,
    produces: Vec<String>,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl Route for RestRoute {
    fn method(&self) -> &str {
        &self.method
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn operation_name(&self) -> &str {
        &self.operation
    }

    fn description(&self) -> &str {
        &self.doc
    }

    fn parameters(&self) -> &[RouteParameter] {
        &self.parameters
    }

    fn status_code_responses(&self) -> &[StatusCodeResponse] {
        &self.responses
    }

    fn request_payload_sample(&self) -> Option<&ModelRef> {
        self.read_sample.as_ref()
    }

    fn response_payload_sample(&self) -> Option<&ModelRef> {
        self.write_sample.as_ref()
    }

    fn consumes(&self) -> &[String] {
        &self.consumes
    }

    fn produces(&self) -> &[String] {
        &self.produces
    }

    fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }
}

/// Fluent builder for a [`RestRoute`]
#[derive(Debug, Clone)]
pub struct RouteBuilder {
    root_path: String,
    sub_path: String,
    route: RestRoute,
}

impl RouteBuilder {
    pub fn path(mut self, sub_path: impl Into<String>) -> Self {
        self.sub_path = sub_path.into();
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.route.doc = doc.into();
        self
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.route.operation = operation.into();
        self
    }

    pub fn produces<I, S>(mut self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.route.produces = mime_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn consumes<I, S>(mut self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.route.consumes = mime_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn param(mut self, parameter: RouteParameter) -> Self {
        self.route.parameters.push(parameter);
        self
    }

    /// Declares the request body model and its `body` parameter
    pub fn reads<T: OpenApiModel>(self) -> Self {
        self.reads_model(ModelRef::of::<T>())
    }

    pub fn reads_model(mut self, model: ModelRef) -> Self {
        let body = RouteParameter::new(ParameterKind::Body, "body", "")
            .data_type(model.name())
            .required(true);
        self.route.parameters.retain(|p| p.kind != ParameterKind::Body);
        self.route.parameters.push(body);
        self.route.read_sample = Some(model);
        self
    }

    /// Declares the model written on success
    pub fn writes<T: OpenApiModel>(self) -> Self {
        self.writes_model(ModelRef::of::<T>())
    }

    pub fn writes_model(mut self, model: ModelRef) -> Self {
        self.route.write_sample = Some(model);
        self
    }

    pub fn returns<T: OpenApiModel>(self, code: u16, message: impl Into<String>) -> Self {
        self.returns_model(code, message, Some(ModelRef::of::<T>()))
    }

    pub fn returns_empty(self, code: u16, message: impl Into<String>) -> Self {
        self.returns_model(code, message, None)
    }

    pub fn returns_model(
        mut self,
        code: u16,
        message: impl Into<String>,
        model: Option<ModelRef>,
    ) -> Self {
        let response = StatusCodeResponse {
            code,
            message: message.into(),
            model,
        };
        match self.route.responses.iter_mut().find(|r| r.code == code) {
            Some(existing) => *existing = response,
            None => self.route.responses.push(response),
        }
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.route.metadata.insert(key.into(), value);
        self
    }

    pub fn build(mut self) -> RestRoute {
        self.route.path = concat_path(&self.root_path, &self.sub_path);
        self.route
    }
}

/// A set of routes registered under a root path
#[derive(Debug, Clone, Default)]
pub struct WebService {
    root_path: String,
    path_parameters: Vec<RouteParameter>,
    routes: Vec<RestRoute>,
    produces: Vec<String>,
    consumes: Vec<String>,
}

impl WebService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root used by routes created afterwards
    pub fn path(&mut self, root_path: impl Into<String>) -> &mut Self {
        self.root_path = root_path.into();
        self
    }

    /// Default MIME types for routes created afterwards
    pub fn produces<I, S>(&mut self, mime_types: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.produces = mime_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn consumes<I, S>(&mut self, mime_types: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.consumes = mime_types.into_iter().map(Into::into).collect();
        self
    }

    /// Parameter shared by every route of this service
    pub fn param(&mut self, parameter: RouteParameter) -> &mut Self {
        self.path_parameters.push(parameter);
        self
    }

    pub fn method(&self, method: &str) -> RouteBuilder {
        RouteBuilder {
            root_path: self.root_path.clone(),
            sub_path: String::new(),
            route: RestRoute {
                method: method.to_uppercase(),
                consumes: self.consumes.clone(),
                produces: self.produces.clone(),
                ..Default::default()
            },
        }
    }

    pub fn get(&self, sub_path: &str) -> RouteBuilder {
        self.method("GET").path(sub_path)
    }

    pub fn post(&self, sub_path: &str) -> RouteBuilder {
        self.method("POST").path(sub_path)
    }

    pub fn put(&self, sub_path: &str) -> RouteBuilder {
        self.method("PUT").path(sub_path)
    }

    pub fn delete(&self, sub_path: &str) -> RouteBuilder {
        self.method("DELETE").path(sub_path)
    }

    pub fn route(&mut self, builder: RouteBuilder) -> &mut Self {
        self.routes.push(builder.build());
        self
    }

    pub fn path_parameter(&self, name: &str, description: &str) -> RouteParameter {
        RouteParameter::new(ParameterKind::Path, name, description)
    }

    pub fn query_parameter(&self, name: &str, description: &str) -> RouteParameter {
        RouteParameter::new(ParameterKind::Query, name, description)
    }

    pub fn header_parameter(&self, name: &str, description: &str) -> RouteParameter {
        RouteParameter::new(ParameterKind::Header, name, description)
    }

    pub fn form_parameter(&self, name: &str, description: &str) -> RouteParameter {
        RouteParameter::new(ParameterKind::Form, name, description)
    }

    pub fn body_parameter(&self, name: &str, description: &str) -> RouteParameter {
        RouteParameter::new(ParameterKind::Body, name, description)
    }
}

impl RouteContainer for WebService {
    fn root_path(&self) -> &str {
        &self.root_path
    }

    fn path_parameters(&self) -> &[RouteParameter] {
        &self.path_parameters
    }

    fn routes(&self) -> Vec<&dyn Route> {
        self.routes.iter().map(|r| r as &dyn Route).collect()
    }
}

/// Holds the web services of an application
#[derive(Debug, Clone, Default)]
pub struct Container {
    web_services: Vec<WebService>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, web_service: WebService) -> &mut Self {
        self.web_services.push(web_service);
        self
    }

    pub fn registered_web_services(&self) -> &[WebService] {
        &self.web_services
    }
}

/// Joins a root and a sub path with exactly one `/` between them
pub fn concat_path(root: &str, sub: &str) -> String {
    let root = root.trim_end_matches('/');
    let sub = sub.trim_start_matches('/');
    match (root.is_empty(), sub.is_empty()) {
        (true, true) => "/".to_string(),
        (false, true) => root.to_string(),
        (true, false) => format!("/{}", sub),
        (false, false) => format!("{}/{}", root, sub),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;
    impl OpenApiModel for Widget {}

    #[test]
    fn test_route_paths_capture_root_at_creation() {
        let mut ws = WebService::new();
        ws.path("/foo");
        let foo = ws.get("/items/{id}");
        ws.path("/bar/");
        let bar = ws.get("items");
        ws.route(foo).route(bar);

        let routes = ws.routes();
        let paths: Vec<&str> = routes.iter().map(|r| r.path()).collect();
        assert_eq!(paths, vec!["/foo/items/{id}", "/bar/items"]);
    }

    #[test]
    fn test_reads_adds_required_body_parameter() {
        let ws = WebService::new();
        let route = ws
            .method("post")
            .path("/widgets")
            .reads::<Widget>()
            .build();

        assert_eq!(route.method(), "POST");
        let body = &route.parameters()[0];
        assert_eq!(body.kind, ParameterKind::Body);
        assert_eq!(body.name, "body");
        assert!(body.required);
        assert_eq!(body.data_type, Widget::canonical_type_name());
        assert_eq!(
            route.request_payload_sample().map(ModelRef::name),
            Some(body.data_type.as_str())
        );
    }

    #[test]
    fn test_parameter_defaults() {
        let ws = WebService::new();
        let path = ws.path_parameter("name", "name of the widget");
        assert!(path.required);
        assert_eq!(path.data_type, "string");

        let query = ws.query_parameter("limit", "").data_type("integer");
        assert!(!query.required);
        assert_eq!(query.data_type, "integer");
    }

    #[test]
    fn test_primitive_model_names() {
        assert_eq!(String::canonical_type_name(), "string");
        assert_eq!(i64::canonical_type_name(), "i64");
        assert!(Widget::canonical_type_name().ends_with("tests.Widget"));
    }

    #[test]
    fn test_returns_replaces_same_status_code() {
        let ws = WebService::new();
        let route = ws
            .get("/widgets")
            .returns_empty(200, "first")
            .returns::<Widget>(200, "OK")
            .build();
        assert_eq!(route.status_code_responses().len(), 1);
        assert_eq!(route.status_code_responses()[0].message, "OK");
    }

    #[test]
    fn test_concat_path() {
        assert_eq!(concat_path("", ""), "/");
        assert_eq!(concat_path("/", "/apis"), "/apis");
        assert_eq!(concat_path("/api/v1", ""), "/api/v1");
    }
}
