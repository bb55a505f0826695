//! Error types for the construct core.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while declaring or synthesizing a stack.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid name format: {0}")]
    InvalidNameFormat(String),

    #[error("Invalid app identity: {0}")]
    InvalidIdentity(String),

    #[error("Duplicate logical id: {0}")]
    DuplicateLogicalId(String),

    #[error("Invalid logical id: {0}")]
    InvalidLogicalId(String),

    #[error("Invalid property value: {0}")]
    InvalidProperty(String),

    #[error("Context lookup failed: {0}")]
    LookupFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
