//! Chronofeat Parser - feature expression parser
//!
//! Turns feature strings such as `avg(MaxTemp) over last 7 days as f` into
//! the AST defined in `chronofeat-core`.

pub mod error;
pub mod expression;
pub mod lexer;

// Re-export main parser types
pub use error::{ParseError, Result};
pub use expression::ExpressionParser;
