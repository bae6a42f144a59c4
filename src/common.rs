//! Configuration and shared vocabulary for building Swagger documents.

use once_cell::sync::Lazy;
use std::{collections::BTreeMap, collections::HashMap, fmt, sync::Arc};

use crate::error::BuildError;
use crate::models::{Extensions, Info, Response, Schema, SecurityScheme, Swagger};
use crate::restful::Route;

/// Prefix of vendor extensions copied from route metadata
pub const EXTENSION_PREFIX: &str = "x-";

/// Extension holding a replacement schema for Swagger 2.0 output
pub const EXTENSION_V2_SCHEMA: &str = "x-v2-schema";

pub const EXTENSION_STRUCT_TYPE: &str = "x-struct-type";
pub const EXTENSION_LIST_TYPE: &str = "x-list-type";
pub const EXTENSION_LIST_MAP_KEYS: &str = "x-list-map-keys";
pub const EXTENSION_MAP_TYPE: &str = "x-map-type";

/// Schema of a model plus the canonical names of models it references
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenApiDefinition {
    pub schema: Schema,
    pub dependencies: Vec<String>,
}

/// Implemented by models that can describe themselves
pub trait OpenApiDefinitionGetter {
    fn openapi_definition() -> OpenApiDefinition;
}

/// Maps a canonical type name to a `#/definitions/...` reference
pub type ReferenceCallback<'a> = &'a dyn Fn(&str) -> String;

pub type GetDefinitionsFn =
    Arc<dyn Fn(ReferenceCallback<'_>) -> BTreeMap<String, OpenApiDefinition> + Send + Sync>;

pub type GetDefinitionNameFn = Arc<dyn Fn(&str) -> (String, Extensions) + Send + Sync>;

pub type GetOperationIdAndTagsFn =
    Arc<dyn Fn(&dyn Route) -> Result<(String, Vec<String>), BuildError> + Send + Sync>;

pub type PostProcessSpecFn = Arc<dyn Fn(Swagger) -> Result<Swagger, BuildError> + Send + Sync>;

/// Everything the builder needs besides the routes themselves
#[derive(Clone, Default)]
pub struct Config {
    /// Schemes written on every operation
    pub protocol_list: Vec<String>,
    pub info: Option<Info>,
    /// Used when an operation has no responses at all
    pub default_response: Option<Response>,
    /// Top-level `responses` of the document
    pub response_definitions: BTreeMap<String, Response>,
    /// Added to every operation missing that status code
    pub common_responses: BTreeMap<u16, Response>,
    /// Paths (and web service roots) starting with any of these are skipped
    pub ignore_prefixes: Vec<String>,
    pub security_definitions: Option<BTreeMap<String, SecurityScheme>>,
    pub default_security: Vec<BTreeMap<String, Vec<String>>>,
    pub get_definitions: Option<GetDefinitionsFn>,
    pub get_definition_name: Option<GetDefinitionNameFn>,
    pub get_operation_id_and_tags: Option<GetOperationIdAndTagsFn>,
    pub post_process_spec: Option<PostProcessSpecFn>,
}

impl Config {
    /// Friendly definition name and extra extensions for a canonical name
    pub fn definition_name(&self, canonical: &str) -> (String, Extensions) {
        match &self.get_definition_name {
            Some(namer) => namer(canonical),
            None => (default_definition_name(canonical), Extensions::new()),
        }
    }

    /// `$ref` target of the definition for a canonical name
    pub fn definition_ref(&self, canonical: &str) -> String {
        let (name, _) = self.definition_name(canonical);
        format!("#/definitions/{}", escape_json_pointer(&name))
    }

    pub fn operation_id_and_tags(
        &self,
        route: &dyn Route,
    ) -> Result<(String, Vec<String>), BuildError> {
        match &self.get_operation_id_and_tags {
            Some(callback) => callback(route),
            None => Ok((route.operation_name().to_string(), Vec::new())),
        }
    }

    /// Resolves every known definition, keyed by canonical name
    pub fn definitions(&self) -> BTreeMap<String, OpenApiDefinition> {
        match &self.get_definitions {
            Some(get_definitions) => {
                let reference = |name: &str| self.definition_ref(name);
                get_definitions(&reference)
            }
            None => BTreeMap::new(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("protocol_list", &self.protocol_list)
            .field("info", &self.info)
            .field("default_response", &self.default_response)
            .field("response_definitions", &self.response_definitions)
            .field("common_responses", &self.common_responses)
            .field("ignore_prefixes", &self.ignore_prefixes)
            .field("security_definitions", &self.security_definitions)
            .field("default_security", &self.default_security)
            .field("get_definitions", &self.get_definitions.is_some())
            .field("get_definition_name", &self.get_definition_name.is_some())
            .field(
                "get_operation_id_and_tags",
                &self.get_operation_id_and_tags.is_some(),
            )
            .field("post_process_spec", &self.post_process_spec.is_some())
            .finish()
    }
}

/// Text after the last `/` of a canonical name
pub fn default_definition_name(canonical: &str) -> String {
    match canonical.rfind('/') {
        Some(idx) => canonical[idx + 1..].to_string(),
        None => canonical.to_string(),
    }
}

/// Escapes a JSON pointer token (`~` → `~0`, `/` → `~1`)
pub fn escape_json_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

static TYPE_FORMATS: Lazy<HashMap<&'static str, (&'static str, &'static str)>> = Lazy::new(|| {
    HashMap::from([
        ("u8", ("integer", "byte")),
        ("i8", ("integer", "byte")),
        ("u16", ("integer", "int32")),
        ("i16", ("integer", "int32")),
        ("i32", ("integer", "int32")),
        ("u32", ("integer", "int64")),
        ("i64", ("integer", "int64")),
        ("u64", ("integer", "int64")),
        ("isize", ("integer", "int64")),
        ("usize", ("integer", "int64")),
        ("f32", ("number", "float")),
        ("f64", ("number", "double")),
        ("bool", ("boolean", "")),
        ("string", ("string", "")),
        ("integer", ("integer", "")),
        ("number", ("number", "")),
        ("boolean", ("boolean", "")),
        ("object", ("object", "")),
        ("bytes", ("string", "byte")),
        ("date-time", ("string", "date-time")),
    ])
});

/// OpenAPI type and format for a simple type name, if it is one
pub fn openapi_type_format(type_name: &str) -> Option<(&'static str, &'static str)> {
    TYPE_FORMATS.get(type_name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_definition_name() {
        assert_eq!(
            default_definition_name("example.com/api/pkg/builder.TestInput"),
            "builder.TestInput"
        );
        assert_eq!(default_definition_name("TestInput"), "TestInput");
    }

    #[test]
    fn test_definition_ref_is_escaped() {
        let config = Config {
            get_definition_name: Some(Arc::new(|name: &str| {
                (name.replace('.', "/"), Extensions::new())
            })),
            ..Default::default()
        };
        assert_eq!(config.definition_ref("v1.Pod"), "#/definitions/v1~1Pod");
        assert_eq!(escape_json_pointer("a~b"), "a~0b");
    }

    #[test]
    fn test_type_formats() {
        assert_eq!(openapi_type_format("i32"), Some(("integer", "int32")));
        assert_eq!(openapi_type_format("f64"), Some(("number", "double")));
        assert_eq!(openapi_type_format("string"), Some(("string", "")));
        assert_eq!(openapi_type_format("builder.TestInput"), None);
    }

    #[test]
    fn test_definitions_receive_reference_callback() {
        let config = Config {
            get_definitions: Some(Arc::new(|reference: &dyn Fn(&str) -> String| {
                let mut schema = Schema::default();
                schema
                    .properties
                    .insert("spec".into(), Schema::reference(reference("pkg/apps.Spec")));
                BTreeMap::from([(
                    "pkg/apps.Deployment".to_string(),
                    OpenApiDefinition {
                        schema,
                        dependencies: vec!["pkg/apps.Spec".into()],
                    },
                )])
            })),
            ..Default::default()
        };

        let definitions = config.definitions();
        let deployment = &definitions["pkg/apps.Deployment"];
        assert_eq!(
            deployment.schema.properties["spec"].reference.as_deref(),
            Some("#/definitions/apps.Spec")
        );
    }
}
