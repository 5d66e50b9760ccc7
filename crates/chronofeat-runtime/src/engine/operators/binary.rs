//! Binary operator execution

use super::comparison::{execute_compare, execute_membership};
use super::pattern;
use crate::error::{Result, RuntimeError};
use chronofeat_core::ast::Operator;
use chronofeat_core::Value;

/// Execute a binary operation on two evaluated operands
pub(crate) fn execute_binary_op(left: &Value, op: &Operator, right: &Value) -> Result<Value> {
    if op.is_comparison() {
        return execute_compare(left, op, right).map(Value::Bool);
    }

    match op {
        Operator::And => Ok(Value::Bool(truthy(left) && truthy(right))),
        Operator::Or => Ok(Value::Bool(truthy(left) || truthy(right))),
        Operator::In => execute_membership(left, right).map(Value::Bool),
        op if op.is_string_match() => execute_string_match(left, op, right).map(Value::Bool),
        _ => execute_arithmetic(left, op, right),
    }
}

/// `contains`, `starts_with`, `ends_with` and `regex`.
///
/// Null on either side is false, like a comparison. `contains` also
/// tests list membership.
fn execute_string_match(left: &Value, op: &Operator, right: &Value) -> Result<bool> {
    if left.is_null() || right.is_null() {
        return Ok(false);
    }
    match (left, op, right) {
        (Value::List(items), Operator::Contains, needle) => {
            Ok(items.iter().any(|item| item.loosely_equals(needle)))
        }
        (Value::String(l), Operator::Contains, Value::String(r)) => Ok(l.contains(r.as_str())),
        (Value::String(l), Operator::StartsWith, Value::String(r)) => Ok(l.starts_with(r.as_str())),
        (Value::String(l), Operator::EndsWith, Value::String(r)) => Ok(l.ends_with(r.as_str())),
        (Value::String(l), Operator::Regex, Value::String(r)) => pattern::is_match(l, r),
        _ => Err(invalid(left, op, right)),
    }
}

/// Null and non-boolean values count as false in logical operators
pub(crate) fn truthy(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}

fn execute_arithmetic(left: &Value, op: &Operator, right: &Value) -> Result<Value> {
    // Null in arithmetic propagates, so missing attributes yield a null feature
    if left.is_null() || right.is_null() {
        tracing::debug!(
            "Null in binary operation: {:?} {:?} {:?}, returning Null",
            left,
            op,
            right
        );
        return Ok(Value::Null);
    }

    match (left, op, right) {
        (Value::Int(l), Operator::Add, Value::Int(r)) => Ok(int_or_float(l.checked_add(*r), *l as f64 + *r as f64)),
        (Value::Int(l), Operator::Sub, Value::Int(r)) => Ok(int_or_float(l.checked_sub(*r), *l as f64 - *r as f64)),
        (Value::Int(l), Operator::Mul, Value::Int(r)) => Ok(int_or_float(l.checked_mul(*r), *l as f64 * *r as f64)),
        (Value::String(l), Operator::Add, Value::String(r)) => Ok(Value::String(format!("{}{}", l, r))),
        (l, _, r) if l.is_numeric() && r.is_numeric() => {
            let (l, r) = match (l.as_f64(), r.as_f64()) {
                (Some(l), Some(r)) => (l, r),
                _ => return Ok(Value::Null),
            };
            match op {
                Operator::Add => Ok(Value::Float(l + r)),
                Operator::Sub => Ok(Value::Float(l - r)),
                Operator::Mul => Ok(Value::Float(l * r)),
                Operator::Div => {
                    if r == 0.0 {
                        tracing::debug!("Division by zero: {} / {}, returning Null", l, r);
                        Ok(Value::Null)
                    } else {
                        Ok(Value::Float(l / r))
                    }
                }
                _ => Err(invalid(left, op, right)),
            }
        }
        _ => Err(invalid(left, op, right)),
    }
}

fn int_or_float(exact: Option<i64>, approx: f64) -> Value {
    exact.map(Value::Int).unwrap_or(Value::Float(approx))
}

fn invalid(left: &Value, op: &Operator, right: &Value) -> RuntimeError {
    RuntimeError::EvaluationError(format!(
        "Cannot apply {} to {} and {}",
        op,
        left.type_name(),
        right.type_name()
    ))
}
