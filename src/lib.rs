//! Builds Swagger 2.0 documents from registered web service routes.

pub mod builder;
pub mod common;
pub mod error;
pub mod generator;
pub mod idl;
pub mod manifest;
pub mod models;
pub mod parameters;
pub mod restful;
pub mod util;

pub use builder::{
    build_openapi_definitions_for_resource, build_openapi_definitions_for_resources,
    build_openapi_spec, build_openapi_spec_from_routes,
};
pub use common::{Config, OpenApiDefinition, OpenApiDefinitionGetter};
pub use error::BuildError;
pub use models::Swagger;
