//! Intermediate Representation (IR)
//!
//! The IR is the resolved, execution-ready form of a feature query. It is
//! produced by the compiler from the AST.

pub mod aggregate;
pub mod function;
pub mod plan;

pub use aggregate::AggregateFunction;
pub use function::ScalarFunction;
pub use plan::{CompiledAggregate, CompiledExpr, CompiledFeature, CompiledPredicate};
