//! Runtime error types

use chronofeat_compiler::CompileError;
use chronofeat_core::CoreError;
use thiserror::Error;

/// Runtime error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Malformed observation-date or scope configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Subtract called on an aggregate without an inverse
    #[error("Aggregate '{function}' does not support subtraction")]
    NotSubtractable { function: String },

    /// Expression evaluation failed
    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    /// Feature or predicate failed to compile or bind
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Event or schema error
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
