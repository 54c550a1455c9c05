//! Error types for role requirement analysis
//!
//! Every variant is a configuration error: it is raised while the OpenAPI
//! document is compiled and must stop the host from serving traffic.
//! Request-time denials are not errors, see [`crate::authorizer::Decision`].

/// Configuration error raised while compiling role requirements
#[derive(Debug, thiserror::Error)]
pub enum RolesError {
    #[error("OpenAPI definition is missing 'openapi' field")]
    OpenApiVersionMissing,

    #[error("OpenAPI version {0} not supported")]
    UnsupportedOpenApiVersion(String),

    #[error("OpenAPI definition is missing 'paths' object")]
    MissingPaths,

    #[error("Path {path} has operation {method} with required roles but no security requirements.")]
    MissingSecurity { path: String, method: String },

    #[error("Expected x-exegesis-roles in {path}/{method} to be an array.")]
    RolesNotArray { path: String, method: String },

    #[error("Invalid role {value} in {path}/{method} - roles must be strings or arrays of strings.")]
    InvalidRole {
        path: String,
        method: String,
        value: String,
    },

    #[error("Unknown role {role} - should be one of: {}.", .allowed.join(", "))]
    UnknownRole { role: String, allowed: Vec<String> },

    #[error("Cannot resolve non-local ref {0}")]
    NonLocalRef(String),

    #[error("Cannot resolve ref {0}")]
    UnresolvedRef(String),

    #[error("Ref {0} exceeds the maximum number of reference hops (cyclic reference?)")]
    RefCycle(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RolesError>;
