//! Operator execution modules
//!
//! Evaluation of operators and scalar functions for the expression evaluator.

mod binary;
mod comparison;
mod dates;
mod function;
mod pattern;
mod unary;

pub(crate) use binary::execute_binary_op;
pub(crate) use comparison::{execute_compare, execute_membership};
pub(crate) use function::execute_function;
pub(crate) use unary::execute_unary_op;
