//! Error types for chronofeat core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// An attribute value conflicts with the kind previously recorded for it
    #[error(
        "Schema mismatch for '{event_type}.{attribute}': expected {expected}, got {actual}"
    )]
    SchemaMismatch {
        event_type: String,
        attribute: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Invalid datetime: {0}")]
    InvalidDateTime(String),

    #[error("Type error: {0}")]
    TypeError(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch_display() {
        let err = CoreError::SchemaMismatch {
            event_type: "weather".to_string(),
            attribute: "MaxTemp".to_string(),
            expected: "float".to_string(),
            actual: "string".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("weather.MaxTemp"));
        assert!(msg.contains("expected float"));
        assert!(msg.contains("got string"));
    }

    #[test]
    fn test_invalid_event_display() {
        let err = CoreError::InvalidEvent("no entities".to_string());
        assert_eq!(err.to_string(), "Invalid event: no entities");
    }
}
