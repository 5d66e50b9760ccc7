//! Parser error types

use thiserror::Error;

/// Parser error
///
/// Every variant that stems from a concrete place in the input carries the
/// byte offset of that place.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Input was empty or whitespace
    #[error("Empty expression")]
    EmptyExpression,

    /// A character that starts no token
    #[error("Invalid character '{ch}' at position {position}")]
    InvalidCharacter { ch: char, position: usize },

    /// String literal without closing quote
    #[error("Unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },

    /// Malformed numeric literal
    #[error("Invalid number '{text}' at position {position}")]
    InvalidNumber { text: String, position: usize },

    /// Token that does not fit the grammar here
    #[error("Unexpected '{found}' at position {position}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        position: usize,
    },

    /// Input ended early
    #[error("Unexpected end of input at position {position}, expected {expected}")]
    UnexpectedEnd { expected: String, position: usize },

    /// Malformed `OVER` clause
    #[error("Invalid window at position {position}: {message}")]
    InvalidWindow { message: String, position: usize },
}

impl ParseError {
    /// Byte offset into the input the error refers to
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::EmptyExpression => None,
            ParseError::InvalidCharacter { position, .. }
            | ParseError::UnterminatedString { position }
            | ParseError::InvalidNumber { position, .. }
            | ParseError::UnexpectedToken { position, .. }
            | ParseError::UnexpectedEnd { position, .. }
            | ParseError::InvalidWindow { position, .. } => Some(*position),
        }
    }
}

/// Result type for parser operations
pub type Result<T> = std::result::Result<T, ParseError>;
