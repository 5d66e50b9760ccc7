//! Code generation module
//!
//! Lowers analyzed AST into the compiled plan types of `chronofeat-core`.

pub mod expression_codegen;

pub use expression_codegen::ExpressionCompiler;
