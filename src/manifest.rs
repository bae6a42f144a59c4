use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use walkdir::WalkDir;

use crate::common::{default_definition_name, Config, OpenApiDefinition};
use crate::idl::{apply_markers, parse_markers, IdlError};
use crate::models::{Extensions, Info, Response, Schema, SchemaOrArray, SchemaOrBool, SecurityScheme};
use crate::restful::{ModelRef, ParameterKind, RouteParameter, WebService};

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid YAML in {path:?}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("unsupported file format: {0:?}")]
    UnsupportedFormat(PathBuf),

    #[error("definition {name} is declared in both {first:?} and {second:?}")]
    DuplicateDefinition {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("invalid markers on {name}: {source}")]
    Markers { name: String, source: IdlError },

    #[error("failed to walk definitions directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Document-level settings read from the config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiConfig {
    pub protocols: Vec<String>,
    pub info: Option<Info>,
    pub ignore_prefixes: Vec<String>,
    pub default_response: Option<Response>,
    pub response_definitions: BTreeMap<String, Response>,
    pub common_responses: BTreeMap<u16, Response>,
    pub security_definitions: Option<BTreeMap<String, SecurityScheme>>,
    pub default_security: Vec<BTreeMap<String, Vec<String>>>,
    /// Added to every generated definition
    pub definition_extensions: Extensions,
}

impl ApiConfig {
    /// Builder configuration serving the given definitions
    pub fn into_config(self, definitions: BTreeMap<String, DefinitionFile>) -> Config {
        let definitions = Arc::new(definitions);
        let extensions = self.definition_extensions;
        Config {
            protocol_list: self.protocols,
            info: self.info,
            default_response: self.default_response,
            response_definitions: self.response_definitions,
            common_responses: self.common_responses,
            ignore_prefixes: self.ignore_prefixes,
            security_definitions: self.security_definitions,
            default_security: self.default_security,
            get_definitions: Some(Arc::new(move |reference: &dyn Fn(&str) -> String| {
                definitions
                    .iter()
                    .map(|(name, file)| (name.clone(), file.resolve(reference)))
                    .collect::<BTreeMap<_, _>>()
            })),
            get_definition_name: Some(Arc::new(move |name: &str| {
                (default_definition_name(name), extensions.clone())
            })),
            ..Default::default()
        }
    }
}

/// One model definition as written on disk
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefinitionFile {
    pub schema: Schema,
    pub dependencies: Vec<String>,
}

impl DefinitionFile {
    /// Rewrites bare `$ref` names into definition references.
    ///
    /// Every canonical name referenced this way is also recorded as a
    /// dependency so the builder pulls it into the document.
    pub fn resolve(&self, reference: &dyn Fn(&str) -> String) -> OpenApiDefinition {
        let mut schema = self.schema.clone();
        let mut dependencies = self.dependencies.clone();
        resolve_schema_refs(&mut schema, reference, &mut dependencies);
        OpenApiDefinition {
            schema,
            dependencies,
        }
    }
}

fn resolve_schema_refs(
    schema: &mut Schema,
    reference: &dyn Fn(&str) -> String,
    dependencies: &mut Vec<String>,
) {
    if let Some(target) = schema.reference.as_mut() {
        if !target.starts_with('#') {
            if !dependencies.contains(target) {
                dependencies.push(target.clone());
            }
            let resolved = reference(target.as_str());
            *target = resolved;
        }
    }
    for property in schema.properties.values_mut() {
        resolve_schema_refs(property, reference, dependencies);
    }
    for member in schema.all_of.iter_mut() {
        resolve_schema_refs(member, reference, dependencies);
    }
    match schema.items.as_mut() {
        Some(SchemaOrArray::Single(item)) => resolve_schema_refs(item, reference, dependencies),
        Some(SchemaOrArray::Multiple(items)) => {
            for item in items.iter_mut() {
                resolve_schema_refs(item, reference, dependencies);
            }
        }
        None => {}
    }
    if let Some(SchemaOrBool::Schema(additional)) = schema.additional_properties.as_mut() {
        resolve_schema_refs(additional, reference, dependencies);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DefinitionEntry {
    #[serde(flatten)]
    definition: DefinitionFile,
    /// `+key=value` markers for the whole schema
    markers: Vec<String>,
    /// `+key=value` markers per property
    property_markers: BTreeMap<String, Vec<String>>,
}

impl DefinitionEntry {
    fn into_definition(mut self, name: &str) -> Result<DefinitionFile, ManifestError> {
        let to_error = |source| ManifestError::Markers {
            name: name.to_string(),
            source,
        };
        let markers = parse_markers(&self.markers).map_err(to_error)?;
        apply_markers(&mut self.definition.schema, &markers).map_err(to_error)?;
        for (property, lines) in &self.property_markers {
            let markers = parse_markers(lines).map_err(to_error)?;
            match self.definition.schema.properties.get_mut(property) {
                Some(schema) => apply_markers(schema, &markers).map_err(to_error)?,
                None => warn!("Markers for unknown property {}.{}", name, property),
            }
        }
        Ok(self.definition)
    }
}

/// Web services and routes described in a manifest file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceManifest {
    pub web_services: Vec<WebServiceSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebServiceSpec {
    pub root_path: String,
    pub produces: Vec<String>,
    pub consumes: Vec<String>,
    pub params: Vec<ParameterSpec>,
    pub routes: Vec<RouteSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteSpec {
    pub method: String,
    pub path: String,
    pub doc: String,
    pub operation: String,
    pub produces: Option<Vec<String>>,
    pub consumes: Option<Vec<String>>,
    pub params: Vec<ParameterSpec>,
    pub reads: Option<String>,
    pub writes: Option<String>,
    pub returns: Vec<ReturnSpec>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    #[serde(default)]
    pub description: String,
    pub data_type: Option<String>,
    pub required: Option<bool>,
    #[serde(default)]
    pub allow_multiple: bool,
}

impl ParameterSpec {
    fn to_parameter(&self) -> RouteParameter {
        let mut param = RouteParameter::new(self.kind, self.name.as_str(), self.description.as_str())
            .allow_multiple(self.allow_multiple);
        if let Some(data_type) = &self.data_type {
            param = param.data_type(data_type.as_str());
        }
        if let Some(required) = self.required {
            param = param.required(required);
        }
        param
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReturnSpec {
    pub code: u16,
    #[serde(default)]
    pub message: String,
    pub model: Option<String>,
}

impl ServiceManifest {
    pub fn into_web_services(self) -> Vec<WebService> {
        self.web_services
            .into_iter()
            .map(WebServiceSpec::into_web_service)
            .collect()
    }
}

impl WebServiceSpec {
    fn into_web_service(self) -> WebService {
        let mut ws = WebService::new();
        ws.path(self.root_path.as_str())
            .produces(self.produces)
            .consumes(self.consumes);
        for param in &self.params {
            ws.param(param.to_parameter());
        }
        for route in self.routes {
            let mut builder = ws
                .method(&route.method)
                .path(route.path)
                .doc(route.doc)
                .operation(route.operation);
            if let Some(produces) = route.produces {
                builder = builder.produces(produces);
            }
            if let Some(consumes) = route.consumes {
                builder = builder.consumes(consumes);
            }
            for param in &route.params {
                builder = builder.param(param.to_parameter());
            }
            if let Some(model) = route.reads {
                builder = builder.reads_model(ModelRef::named(model));
            }
            if let Some(model) = route.writes {
                builder = builder.writes_model(ModelRef::named(model));
            }
            for ret in route.returns {
                builder = builder.returns_model(ret.code, ret.message, ret.model.map(ModelRef::named));
            }
            for (key, value) in route.metadata {
                builder = builder.metadata(key, value);
            }
            ws.route(builder);
        }
        ws
    }
}

/// Reads a JSON or YAML file, chosen by extension
pub fn load_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ManifestError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|source| ManifestError::Json {
            path: path.to_path_buf(),
            source,
        }),
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|source| ManifestError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => Err(ManifestError::UnsupportedFormat(path.to_path_buf())),
    }
}

fn is_definition_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("yaml") | Some("yml")
    )
}

/// Loads every definition file below `dir`, keyed by canonical name
pub fn load_definitions(dir: impl AsRef<Path>) -> Result<BTreeMap<String, DefinitionFile>, ManifestError> {
    let mut definitions = BTreeMap::new();
    let mut origins: BTreeMap<String, PathBuf> = BTreeMap::new();

    for entry in WalkDir::new(dir.as_ref()).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_definition_file(path) {
            continue;
        }
        debug!("Loading definitions from {:?}", path);
        let entries: BTreeMap<String, DefinitionEntry> = load_file(path)?;
        for (name, entry) in entries {
            if let Some(first) = origins.get(&name) {
                return Err(ManifestError::DuplicateDefinition {
                    name,
                    first: first.clone(),
                    second: path.to_path_buf(),
                });
            }
            let definition = entry.into_definition(&name)?;
            origins.insert(name.clone(), path.to_path_buf());
            definitions.insert(name, definition);
        }
    }

    debug!("Loaded {} definitions", definitions.len());
    Ok(definitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_openapi_spec;
    use crate::restful::{Route, RouteContainer};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const SERVICES: &str = r#"
webServices:
  - rootPath: /apis/apps/v1
    produces: [application/json]
    routes:
      - method: get
        path: /deployments/{name}
        operation: readDeployment
        doc: read the specified Deployment
        params:
          - name: name
            kind: path
            description: name of the Deployment
          - name: pretty
            kind: query
        returns:
          - code: 200
            message: OK
            model: example.com/api/apps/v1.Deployment
      - method: put
        path: /deployments/{name}
        operation: replaceDeployment
        params:
          - name: name
            kind: path
            description: name of the Deployment
        reads: example.com/api/apps/v1.Deployment
        writes: example.com/api/apps/v1.Deployment
        metadata:
          x-action: put
"#;

    const DEFINITIONS: &str = r#"
example.com/api/apps/v1.Deployment:
  schema:
    description: Deployment enables declarative updates
    properties:
      spec:
        $ref: example.com/api/apps/v1.DeploymentSpec
  propertyMarkers:
    spec: ["+structType=atomic"]
example.com/api/apps/v1.DeploymentSpec:
  schema:
    type: object
    properties:
      replicas:
        type: integer
        format: int32
"#;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        path
    }

    #[test]
    fn test_manifest_becomes_web_services() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "services.yaml", SERVICES);

        let manifest: ServiceManifest = load_file(&path).unwrap();
        let services = manifest.into_web_services();
        assert_eq!(services.len(), 1);

        let routes = services[0].routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].method(), "GET");
        assert_eq!(routes[0].path(), "/apis/apps/v1/deployments/{name}");
        assert_eq!(routes[0].produces(), ["application/json".to_string()]);
        assert!(routes[0].parameters()[0].required);
        assert_eq!(
            routes[1].request_payload_sample().map(ModelRef::name),
            Some("example.com/api/apps/v1.Deployment")
        );
    }

    #[test]
    fn test_definitions_resolve_bare_refs_and_markers() {
        let dir = tempdir().unwrap();
        write(dir.path(), "apps.yaml", DEFINITIONS);
        write(dir.path(), "README.md", "not a definition");

        let definitions = load_definitions(dir.path()).unwrap();
        assert_eq!(definitions.len(), 2);

        let config = ApiConfig::default().into_config(definitions);
        let resolved = config.definitions();
        let deployment = &resolved["example.com/api/apps/v1.Deployment"];
        assert_eq!(
            deployment.dependencies,
            vec!["example.com/api/apps/v1.DeploymentSpec".to_string()]
        );
        let spec = &deployment.schema.properties["spec"];
        assert_eq!(spec.reference.as_deref(), Some("#/definitions/v1.DeploymentSpec"));
        assert_eq!(spec.extensions["x-struct-type"], json!("atomic"));
    }

    #[test]
    fn test_duplicate_definitions_are_rejected() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.yaml", DEFINITIONS);
        write(dir.path(), "b.yaml", DEFINITIONS);
        assert!(matches!(
            load_definitions(dir.path()),
            Err(ManifestError::DuplicateDefinition { .. })
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "services.toml", "");
        assert!(matches!(
            load_file::<ServiceManifest>(&path),
            Err(ManifestError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_config_file_to_document() {
        let dir = tempdir().unwrap();
        let config_path = write(
            dir.path(),
            "api.json",
            r#"{
                "protocols": ["https"],
                "info": {"title": "Apps", "version": "v1"},
                "commonResponses": {"401": {"description": "Unauthorized"}},
                "definitionExtensions": {"x-group": "apps"}
            }"#,
        );
        let defs = dir.path().join("defs");
        fs::create_dir(&defs).unwrap();
        write(&defs, "apps.yml", DEFINITIONS);
        let services = write(dir.path(), "services.yaml", SERVICES);

        let api: ApiConfig = load_file(&config_path).unwrap();
        let config = api.into_config(load_definitions(&defs).unwrap());
        let manifest: ServiceManifest = load_file(&services).unwrap();
        let swagger = build_openapi_spec(&manifest.into_web_services(), &config).unwrap();

        let item = &swagger.paths["/apis/apps/v1/deployments/{name}"];
        let put = item.put.as_ref().unwrap();
        assert_eq!(put.extensions["x-action"], json!("put"));
        let codes: Vec<u16> = put
            .responses
            .as_ref()
            .unwrap()
            .status_code_responses
            .keys()
            .copied()
            .collect();
        assert_eq!(codes, vec![200, 401]);
        assert_eq!(
            swagger.definitions["v1.Deployment"].extensions["x-group"],
            json!("apps")
        );
        assert!(swagger.definitions.contains_key("v1.DeploymentSpec"));
        assert_eq!(swagger.info.as_ref().unwrap().title, "Apps");
    }
}
