//! Builds Swagger 2.0 documents from registered routes.

use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};

use crate::common::{openapi_type_format, Config, OpenApiDefinition, EXTENSION_PREFIX, EXTENSION_V2_SCHEMA};
use crate::error::BuildError;
use crate::models::{Operation, Parameter, PathItem, Response, Responses, Schema, Swagger};
use crate::parameters::deduplicate_parameters;
use crate::restful::{
    ModelRef, OpenApiModel, ParameterKind, Route, RouteContainer, RouteParameter, WebService,
};
use crate::util::Trie;

type ParamKey = (String, ParameterKind);

/// Builds the full document for a set of web services
pub fn build_openapi_spec(web_services: &[WebService], config: &Config) -> Result<Swagger, BuildError> {
    let containers: Vec<&dyn RouteContainer> = web_services
        .iter()
        .map(|ws| ws as &dyn RouteContainer)
        .collect();
    build_openapi_spec_from_routes(&containers, config)
}

/// Builds the full document for any route containers
pub fn build_openapi_spec_from_routes(
    containers: &[&dyn RouteContainer],
    config: &Config,
) -> Result<Swagger, BuildError> {
    let mut builder = OpenApiBuilder::new(config);
    builder.build_paths(containers)?;
    builder.finalize()
}

/// Builds only the definitions needed by model `T`
pub fn build_openapi_definitions_for_resource<T: OpenApiModel>(
    config: &Config,
) -> Result<BTreeMap<String, Schema>, BuildError> {
    let mut builder = OpenApiBuilder::new(config);
    // only the definitions recorded as a side effect matter
    builder.to_schema(&T::canonical_type_name())?;
    let swagger = deduplicate_parameters(builder.swagger)?;
    Ok(swagger.definitions)
}

/// Builds a document holding the definitions of the given canonical names
pub fn build_openapi_definitions_for_resources(
    config: &Config,
    names: &[&str],
) -> Result<Swagger, BuildError> {
    let mut builder = OpenApiBuilder::new(config);
    for name in names {
        builder.to_schema(name)?;
    }
    builder.finalize()
}

struct OpenApiBuilder<'a> {
    config: &'a Config,
    swagger: Swagger,
    definitions: BTreeMap<String, OpenApiDefinition>,
}

impl<'a> OpenApiBuilder<'a> {
    fn new(config: &'a Config) -> Self {
        let mut swagger = Swagger::new();
        swagger.info = config.info.clone();
        swagger.responses = config.response_definitions.clone();
        Self {
            config,
            swagger,
            definitions: config.definitions(),
        }
    }

    fn finalize(mut self) -> Result<Swagger, BuildError> {
        if let Some(security_definitions) = &self.config.security_definitions {
            self.swagger.security_definitions = security_definitions.clone();
            self.swagger.security = self.config.default_security.clone();
        }
        if let Some(post_process) = &self.config.post_process_spec {
            self.swagger = post_process(self.swagger)?;
        }
        deduplicate_parameters(self.swagger)
    }

    fn build_paths(&mut self, containers: &[&dyn RouteContainer]) -> Result<(), BuildError> {
        let ignored = Trie::new(&self.config.ignore_prefixes);
        let mut operation_paths: HashMap<String, String> = HashMap::new();

        for container in containers {
            let root_path = container.root_path();
            if ignored.has_prefix(root_path) {
                debug!("Ignoring web service {}", root_path);
                continue;
            }
            let common_params = self.build_parameters(container.path_parameters())?;

            for (path, routes) in group_routes_by_path(container.routes()) {
                let path = strip_wildcard(&path);
                if ignored.has_prefix(&path) {
                    debug!("Ignoring path {}", path);
                    continue;
                }
                let (routes, unsupported): (Vec<&dyn Route>, Vec<&dyn Route>) = routes
                    .into_iter()
                    .partition(|route| PathItem::supports_method(route.method()));
                for route in unsupported {
                    warn!("Skipping route {} with unsupported method {}", path, route.method());
                }
                if routes.is_empty() {
                    continue;
                }
                let in_path_common = self.find_common_parameters(&routes)?;
                if self.swagger.paths.contains_key(&path) {
                    return Err(BuildError::DuplicatePath(path));
                }

                let mut path_item = PathItem {
                    parameters: common_params.clone(),
                    ..Default::default()
                };
                path_item.parameters.extend(in_path_common.values().cloned());
                sort_parameters(&mut path_item.parameters);

                for route in routes {
                    let mut op = self.build_operation(route, &in_path_common)?;
                    sort_parameters(&mut op.parameters);
                    if let Some(first) = operation_paths.get(&op.id) {
                        return Err(BuildError::DuplicateOperationId {
                            id: op.id,
                            first: first.clone(),
                            second: path,
                        });
                    }
                    operation_paths.insert(op.id.clone(), path.clone());
                    if let Some(slot) = path_item.operation_mut(route.method()) {
                        *slot = Some(op);
                    }
                }
                debug!("Built path item for {}", path);
                self.swagger.paths.insert(path, path_item);
            }
        }
        Ok(())
    }

    /// Parameters present (by name and kind) in every route of a path
    fn find_common_parameters(
        &mut self,
        routes: &[&dyn Route],
    ) -> Result<BTreeMap<ParamKey, Parameter>, BuildError> {
        let mut counts: BTreeMap<ParamKey, (usize, &RouteParameter)> = BTreeMap::new();
        for route in routes {
            let mut seen = Vec::new();
            for param in route.parameters() {
                let key = param_key(param);
                if seen.contains(&key) {
                    return Err(BuildError::DuplicateParameter {
                        name: param.name.clone(),
                        method: route.method().to_string(),
                        path: route.path().to_string(),
                    });
                }
                seen.push(key.clone());
                let entry = counts.entry(key).or_insert((0, param));
                entry.0 += 1;
                entry.1 = param;
            }
        }

        let mut common = BTreeMap::new();
        for (key, (count, param)) in counts {
            if count == routes.len() && param.kind != ParameterKind::Body {
                common.insert(key, self.build_parameter(param, None)?);
            }
        }
        Ok(common)
    }

    fn build_operation(
        &mut self,
        route: &dyn Route,
        in_path_common: &BTreeMap<ParamKey, Parameter>,
    ) -> Result<Operation, BuildError> {
        let mut op = Operation {
            description: route.description().to_string(),
            consumes: route.consumes().to_vec(),
            produces: route.produces().to_vec(),
            schemes: self.config.protocol_list.clone(),
            ..Default::default()
        };
        for (key, value) in route.metadata() {
            if key.starts_with(EXTENSION_PREFIX) {
                op.extensions.insert(key.clone(), value.clone());
            }
        }
        let (id, tags) = self.config.operation_id_and_tags(route)?;
        op.id = id;
        op.tags = tags;

        let mut responses = Responses::default();
        for declared in route.status_code_responses() {
            let response = self.build_response(declared.model.as_ref(), &declared.message)?;
            responses.status_code_responses.insert(declared.code, response);
        }
        // a write sample without declared responses means 200
        if responses.status_code_responses.is_empty() {
            if let Some(sample) = route.response_payload_sample() {
                let response = self.build_response(Some(sample), "OK")?;
                responses.status_code_responses.insert(200, response);
            }
        }
        for (code, response) in &self.config.common_responses {
            responses
                .status_code_responses
                .entry(*code)
                .or_insert_with(|| response.clone());
        }
        if responses.status_code_responses.is_empty() {
            responses.default = self.config.default_response.clone();
        }
        op.responses = Some(responses);

        for param in route.parameters() {
            if !in_path_common.contains_key(&param_key(param)) {
                let built = self.build_parameter(param, route.request_payload_sample())?;
                op.parameters.push(built);
            }
        }
        Ok(op)
    }

    fn build_response(&mut self, model: Option<&ModelRef>, description: &str) -> Result<Response, BuildError> {
        let mut response = Response::new(description);
        if let Some(model) = model {
            response.schema = Some(Box::new(self.to_schema(model.name())?));
        }
        Ok(response)
    }

    fn build_parameters(&mut self, params: &[RouteParameter]) -> Result<Vec<Parameter>, BuildError> {
        params
            .iter()
            .map(|p| self.build_parameter(p, None))
            .collect()
    }

    fn build_parameter(
        &mut self,
        param: &RouteParameter,
        body_sample: Option<&ModelRef>,
    ) -> Result<Parameter, BuildError> {
        let mut built = Parameter {
            name: param.name.clone(),
            description: param.description.clone(),
            required: param.required,
            ..Default::default()
        };
        let location = match param.kind {
            ParameterKind::Body => {
                let sample = body_sample
                    .ok_or_else(|| BuildError::UnsupportedBodyParameter(param.data_type.clone()))?;
                built.in_ = "body".to_string();
                built.schema = Some(Box::new(self.to_schema(sample.name())?));
                return Ok(built);
            }
            ParameterKind::Path if !param.required => {
                return Err(BuildError::PathParameterNotRequired(param.name.clone()));
            }
            ParameterKind::Path => "path",
            ParameterKind::Query => "query",
            ParameterKind::Header => "header",
            ParameterKind::Form => "formData",
        };
        built.in_ = location.to_string();

        let (type_, format) = openapi_type_format(&param.data_type).ok_or_else(|| {
            BuildError::NonSimpleParameterType {
                name: param.name.clone(),
                data_type: param.data_type.clone(),
            }
        })?;
        built.type_ = type_.to_string();
        built.format = format.to_string();
        built.unique_items = !param.allow_multiple;
        Ok(built)
    }

    /// Inline schema for simple types, otherwise a `$ref` to a built definition
    fn to_schema(&mut self, name: &str) -> Result<Schema, BuildError> {
        if let Some((type_, format)) = openapi_type_format(name) {
            return Ok(Schema::simple(type_, format));
        }
        self.build_definition_recursively(name)?;
        Ok(Schema::reference(self.config.definition_ref(name)))
    }

    fn build_definition_recursively(&mut self, name: &str) -> Result<(), BuildError> {
        let (unique_name, extensions) = self.config.definition_name(name);
        if self.swagger.definitions.contains_key(&unique_name) {
            return Ok(());
        }
        let item = self
            .definitions
            .get(name)
            .ok_or_else(|| BuildError::MissingDefinition(name.to_string()))?;

        let mut schema = item.schema.clone();
        schema.extensions.extend(extensions);
        if let Some(v2) = schema.extensions.remove(EXTENSION_V2_SCHEMA) {
            match serde_json::from_value::<Schema>(v2) {
                Ok(v2_schema) => schema = v2_schema,
                Err(e) => debug!("Ignoring invalid {} on {}: {}", EXTENSION_V2_SCHEMA, name, e),
            }
        }
        let dependencies = item.dependencies.clone();

        debug!("Adding definition {} for {}", unique_name, name);
        self.swagger.definitions.insert(unique_name, schema);
        for dependency in &dependencies {
            self.build_definition_recursively(dependency)?;
        }
        Ok(())
    }
}

fn param_key(param: &RouteParameter) -> ParamKey {
    (param.name.clone(), param.kind)
}

/// Routes grouped by path, keeping registration order within a path
fn group_routes_by_path(routes: Vec<&dyn Route>) -> BTreeMap<String, Vec<&dyn Route>> {
    let mut grouped: BTreeMap<String, Vec<&dyn Route>> = BTreeMap::new();
    for route in routes {
        grouped.entry(route.path().to_string()).or_default().push(route);
    }
    grouped
}

/// `{name:*}` at the end of a path is not valid OpenAPI; keep just `{name}`
fn strip_wildcard(path: &str) -> String {
    match path.strip_suffix(":*}") {
        Some(prefix) => format!("{}}}", prefix),
        None => path.to_string(),
    }
}

fn sort_parameters(params: &mut [Parameter]) {
    params.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.in_.cmp(&b.in_)));
}
