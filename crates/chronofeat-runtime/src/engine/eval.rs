//! Compiled expression evaluator

use super::operators::{execute_binary_op, execute_function, execute_unary_op};
use crate::error::{Result, RuntimeError};
use crate::obs_dates::ObservationPoint;
use chronofeat_core::ast::{EntityScope, EventField, Operator};
use chronofeat_core::ir::CompiledExpr;
use chronofeat_core::{Event, Value};

/// Everything an expression may read from
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalContext<'a> {
    /// Observation point being computed
    pub point: Option<&'a ObservationPoint>,
    /// Event the point was taken from (`@attr`)
    pub source: Option<&'a Event>,
    /// Candidate event under aggregation (`attr`, `event_time`, ...)
    pub event: Option<&'a Event>,
    /// Aggregate results by slot
    pub aggregates: &'a [Value],
}

impl<'a> EvalContext<'a> {
    pub fn for_point(point: &'a ObservationPoint, source: Option<&'a Event>) -> Self {
        Self {
            point: Some(point),
            source,
            event: None,
            aggregates: &[],
        }
    }

    pub fn for_event(event: &'a Event) -> Self {
        Self {
            event: Some(event),
            ..Self::default()
        }
    }

    pub fn with_event(mut self, event: &'a Event) -> Self {
        self.event = Some(event);
        self
    }

    pub fn with_aggregates(mut self, aggregates: &'a [Value]) -> Self {
        self.aggregates = aggregates;
        self
    }
}

/// Stateless evaluator for [`CompiledExpr`] trees
pub struct ExpressionEvaluator;

impl ExpressionEvaluator {
    pub fn evaluate(expr: &CompiledExpr, ctx: &EvalContext<'_>) -> Result<Value> {
        match expr {
            CompiledExpr::Literal(value) => Ok(value.clone()),

            CompiledExpr::Attribute(name) => {
                Ok(ctx.event.map(|e| e.attr(name).clone()).unwrap_or(Value::Null))
            }

            CompiledExpr::SourceAttribute(name) => {
                Ok(ctx.source.map(|e| e.attr(name).clone()).unwrap_or(Value::Null))
            }

            CompiledExpr::EventField(field) => Ok(match (field, ctx.event) {
                (_, None) => Value::Null,
                (EventField::Type, Some(e)) => Value::String(e.event_type.clone()),
                (EventField::Time, Some(e)) => Value::DateTime(e.event_time),
                (EventField::Id, Some(e)) => e
                    .event_id
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            }),

            CompiledExpr::EntityRef { scope, entity_type } => {
                let id = match scope {
                    EntityScope::Observation => ctx.point.and_then(|p| p.context.get(entity_type)),
                    EntityScope::Event => match ctx.event {
                        Some(event) => event.entity(entity_type),
                        // projected outside an aggregate: the point's own event
                        None => ctx
                            .source
                            .and_then(|e| e.entity(entity_type))
                            .or_else(|| ctx.point.and_then(|p| p.context.get(entity_type))),
                    },
                };
                Ok(id.cloned().map(Value::String).unwrap_or(Value::Null))
            }

            CompiledExpr::ObservationDate => Ok(ctx
                .point
                .map(|p| Value::DateTime(p.instant))
                .unwrap_or(Value::Null)),

            // count(*) counts every candidate
            CompiledExpr::Wildcard => Ok(Value::Bool(true)),

            CompiledExpr::List(items) => items
                .iter()
                .map(|item| Self::evaluate(item, ctx))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),

            CompiledExpr::Unary { op, operand } => {
                let value = Self::evaluate(operand, ctx)?;
                execute_unary_op(op, &value)
            }

            CompiledExpr::Binary { left, op, right } => {
                let left = Self::evaluate(left, ctx)?;
                // short-circuit logical operators
                match (op, &left) {
                    (Operator::And, l) if !matches!(l, Value::Bool(true)) => {
                        return Ok(Value::Bool(false))
                    }
                    (Operator::Or, Value::Bool(true)) => return Ok(Value::Bool(true)),
                    _ => {}
                }
                let right = Self::evaluate(right, ctx)?;
                execute_binary_op(&left, op, &right)
            }

            CompiledExpr::Function { function, args } => {
                let args = args
                    .iter()
                    .map(|arg| Self::evaluate(arg, ctx))
                    .collect::<Result<Vec<_>>>()?;
                execute_function(function, &args)
            }

            CompiledExpr::Aggregate(slot) => ctx.aggregates.get(*slot).cloned().ok_or_else(|| {
                RuntimeError::EvaluationError(format!("Aggregate slot {} is not computed", slot))
            }),
        }
    }

    /// Evaluate as a filter: only `true` passes
    pub fn evaluate_predicate(expr: &CompiledExpr, ctx: &EvalContext<'_>) -> Result<bool> {
        Ok(matches!(Self::evaluate(expr, ctx)?, Value::Bool(true)))
    }
}
