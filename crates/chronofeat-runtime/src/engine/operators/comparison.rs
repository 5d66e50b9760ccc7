//! Comparison operator execution

use crate::error::{Result, RuntimeError};
use chronofeat_core::ast::Operator;
use chronofeat_core::types::parse_datetime;
use chronofeat_core::Value;
use std::cmp::Ordering;

/// Execute a comparison operation
pub(crate) fn execute_compare(left: &Value, op: &Operator, right: &Value) -> Result<bool> {
    // Null compared to anything is false, so missing attributes fail filters quietly
    if left.is_null() || right.is_null() {
        tracing::debug!(
            "Null comparison: {:?} {:?} {:?}, returning false",
            left,
            op,
            right
        );
        return Ok(false);
    }

    let (left, right) = coerce_datetimes(left, right);

    match op {
        Operator::Eq => Ok(left.loosely_equals(&right)),
        Operator::Ne => Ok(!left.loosely_equals(&right)),
        Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => {
            let ordering = left.compare(&right).ok_or_else(|| {
                RuntimeError::EvaluationError(format!(
                    "Cannot compare {} and {} with {}",
                    left.type_name(),
                    right.type_name(),
                    op
                ))
            })?;
            Ok(match op {
                Operator::Gt => ordering == Ordering::Greater,
                Operator::Ge => ordering != Ordering::Less,
                Operator::Lt => ordering == Ordering::Less,
                _ => ordering != Ordering::Greater,
            })
        }
        _ => Err(RuntimeError::EvaluationError(format!(
            "{} is not a comparison operator",
            op
        ))),
    }
}

/// `value in (..)`
pub(crate) fn execute_membership(value: &Value, list: &Value) -> Result<bool> {
    match list {
        Value::List(items) => {
            if value.is_null() {
                return Ok(false);
            }
            Ok(items.iter().any(|item| value.loosely_equals(item)))
        }
        Value::Null => Ok(false),
        other => Err(RuntimeError::EvaluationError(format!(
            "Right-hand side of 'in' must be a list, got {}",
            other.type_name()
        ))),
    }
}

/// String literals compared against datetimes are read as datetimes
fn coerce_datetimes(left: &Value, right: &Value) -> (Value, Value) {
    match (left, right) {
        (Value::DateTime(_), Value::String(s)) => match parse_datetime(s) {
            Ok(dt) => (left.clone(), Value::DateTime(dt)),
            Err(_) => (left.clone(), right.clone()),
        },
        (Value::String(s), Value::DateTime(_)) => match parse_datetime(s) {
            Ok(dt) => (Value::DateTime(dt), right.clone()),
            Err(_) => (left.clone(), right.clone()),
        },
        _ => (left.clone(), right.clone()),
    }
}
