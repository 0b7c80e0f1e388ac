//! Error types for `rexi-openapi`.

use thiserror::Error;

/// Main error type for the endpoint index, dispatcher and resource surface.
#[derive(Error, Debug)]
pub enum RexiError {
    /// Caller input rejected before any network I/O (bad method, missing path parameter, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing spec/schema file or a schema name that escapes the schema directory.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport-level failure of the outbound call (DNS, connect, TLS, timeout).
    #[error("Request error: {0}")]
    Request(String),

    #[error("failed to parse OpenAPI spec '{location}': {source}")]
    SpecParse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to read '{path}': {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RexiError {
    /// Stable, machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RexiError::Validation(_) => "validation",
            RexiError::NotFound(_) => "not_found",
            RexiError::Request(_) => "request",
            RexiError::SpecParse { .. } => "spec",
            RexiError::ReadFile { .. } => "io",
            RexiError::Json(_) => "json",
        }
    }
}

/// Result type alias for `rexi-openapi` operations.
pub type Result<T> = std::result::Result<T, RexiError>;
