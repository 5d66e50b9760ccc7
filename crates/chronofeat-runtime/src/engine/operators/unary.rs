//! Unary operator execution

use super::binary::truthy;
use crate::error::{Result, RuntimeError};
use chronofeat_core::ast::UnaryOperator;
use chronofeat_core::Value;

/// Execute a unary operation
pub(crate) fn execute_unary_op(op: &UnaryOperator, operand: &Value) -> Result<Value> {
    match (op, operand) {
        (UnaryOperator::Not, value) => Ok(Value::Bool(!truthy(value))),
        (UnaryOperator::Negate, Value::Null) => Ok(Value::Null),
        (UnaryOperator::Negate, Value::Int(i)) => Ok(i
            .checked_neg()
            .map(Value::Int)
            .unwrap_or(Value::Float(-(*i as f64)))),
        (UnaryOperator::Negate, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOperator::Negate, other) => Err(RuntimeError::EvaluationError(format!(
            "Cannot negate {}",
            other.type_name()
        ))),
    }
}
