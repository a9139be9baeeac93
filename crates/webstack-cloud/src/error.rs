//! Stack declaration error types

use thiserror::Error;

/// Errors raised while assembling or rendering a stack declaration
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Duplicate logical ID: {0}")]
    DuplicateLogicalId(String),

    #[error("Duplicate stack: {0}")]
    DuplicateStack(String),

    #[error(
        "Invalid stack name: {0:?} (must start with a letter, use only letters, digits and '-', and be at most {max} characters)",
        max = crate::stack::MAX_STACK_NAME_LEN
    )]
    InvalidStackName(String),

    #[error("Unknown reference: {from} refers to {to}, which is not declared")]
    UnknownReference { from: String, to: String },

    #[error("Circular dependency between: {}", .0.join(", "))]
    CircularDependency(Vec<String>),

    #[error("Invalid property: {0}")]
    InvalidProperty(String),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("JSON error")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
