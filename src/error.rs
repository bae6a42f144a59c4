use thiserror::Error;

/// Errors raised while turning routes and definitions into a Swagger document
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("duplicate webservice route has been found for path: {0}")]
    DuplicatePath(String),

    #[error("duplicate operation id {id} for path {first} and {second}")]
    DuplicateOperationId {
        id: String,
        first: String,
        second: String,
    },

    #[error("duplicate parameter {name} for route {method} {path}")]
    DuplicateParameter {
        name: String,
        method: String,
        path: String,
    },

    #[error("cannot find model definition for {0}")]
    MissingDefinition(String),

    #[error("body parameters without a request sample are not supported: {0}")]
    UnsupportedBodyParameter(String),

    #[error("path parameter {0} should be marked as required")]
    PathParameterNotRequired(String),

    #[error("non-body parameter {name} should have a simple type, but got: {data_type}")]
    NonSimpleParameterType { name: String, data_type: String },

    #[error("shared parameters already exist in the document")]
    SharedParametersExist,

    #[error("failed to serialize parameter: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Raised by user callbacks such as `post_process_spec`
    #[error("{0}")]
    Custom(String),
}
