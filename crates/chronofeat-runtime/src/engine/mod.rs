//! Expression evaluation engine
//!
//! Evaluates compiled expressions against an observation point, a
//! candidate event and the already-computed aggregate slots of a feature.

pub mod eval;
mod operators;

pub use eval::{EvalContext, ExpressionEvaluator};
