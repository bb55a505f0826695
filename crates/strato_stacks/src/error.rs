//! Error types for stack composition.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error(transparent)]
    Core(#[from] strato_core::CoreError),

    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),
}

pub type StackResult<T> = Result<T, StackError>;
