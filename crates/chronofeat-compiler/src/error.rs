//! Compiler error types

use chronofeat_parser::ParseError;
use thiserror::Error;

/// Compiler error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Feature text failed to parse
    #[error("Failed to parse '{feature}': {source}")]
    Parse {
        feature: String,
        #[source]
        source: ParseError,
    },

    /// Neither an aggregate nor a scalar function
    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    /// Attribute absent from every candidate event schema
    #[error("Unknown attribute '{attribute}' for event types [{}]", .event_types.join(", "))]
    UnknownAttribute {
        attribute: String,
        event_types: Vec<String>,
    },

    /// Two features produce the same output column
    #[error("Duplicate feature name: {alias}")]
    DuplicateAlias { alias: String },

    /// Structurally invalid expression
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    /// Operand kind does not fit its position
    #[error("Type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: String,
        found: String,
    },

    /// Wrong number of arguments to a scalar function
    #[error("Function '{function}' expects {expected} argument(s), got {actual}")]
    InvalidArguments {
        function: String,
        expected: String,
        actual: usize,
    },
}

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;
