//! Chronofeat Compiler - feature AST to query plan
//!
//! Compiles parsed feature expressions into the plan executed by
//! `chronofeat-runtime`, and binds that plan to learned event schemas.

pub mod binding;
pub mod codegen;
pub mod compiler;
pub mod error;
pub mod semantic;

// Re-export main types
pub use binding::SchemaBinder;
pub use compiler::{CompiledQuery, Compiler, CompilerOptions};
pub use error::{CompileError, Result};

pub use codegen::ExpressionCompiler;
pub use semantic::{SemanticAnalyzer, TypeChecker, TypeInfo};
