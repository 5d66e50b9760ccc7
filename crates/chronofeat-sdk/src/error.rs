//! SDK error types

use thiserror::Error;

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Compiler error
    #[error("Compiler error: {0}")]
    CompileError(#[from] chronofeat_compiler::CompileError),

    /// Runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(#[from] chronofeat_runtime::RuntimeError),

    /// Invalid event or schema conflict on ingestion
    #[error("Event error: {0}")]
    EventError(#[from] chronofeat_core::CoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed JSON or YAML input
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A blocking task panicked or was cancelled
    #[error("Task error: {0}")]
    TaskError(String),
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        SdkError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for SdkError {
    fn from(err: serde_yaml::Error) -> Self {
        SdkError::SerializationError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SdkError {
    fn from(err: tokio::task::JoinError) -> Self {
        SdkError::TaskError(err.to_string())
    }
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
