//! Semantic analysis module
//!
//! Structural analysis and type checking for feature queries.

pub mod analyzer;
pub mod type_checker;

// Re-export for convenience
pub use analyzer::SemanticAnalyzer;
pub use type_checker::{TypeChecker, TypeInfo};
