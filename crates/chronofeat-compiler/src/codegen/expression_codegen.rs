//! Expression compiler
//!
//! Resolves function names and lifts aggregate calls out of the expression
//! tree into numbered slots.

use crate::error::{CompileError, Result};
use chronofeat_core::ast::{AggregateCall, Expression, FeatureDefinition, Having};
use chronofeat_core::ir::{
    AggregateFunction, CompiledAggregate, CompiledExpr, CompiledFeature, CompiledPredicate,
    ScalarFunction,
};
use chronofeat_core::Value;

/// Expression compiler
#[derive(Debug, Default)]
pub struct ExpressionCompiler {
    aggregates: Vec<CompiledAggregate>,
}

impl ExpressionCompiler {
    /// Compile an analyzed feature
    pub fn compile_feature(feature: &FeatureDefinition) -> Result<CompiledFeature> {
        let mut compiler = Self::default();
        let expr = compiler.compile(&feature.expression)?;
        Ok(CompiledFeature {
            name: feature.name().to_string(),
            raw: feature.raw.clone(),
            expr,
            aggregates: compiler.aggregates,
        })
    }

    /// Compile an analyzed event predicate
    pub fn compile_predicate(raw: &str, predicate: &Expression) -> Result<CompiledPredicate> {
        let mut compiler = Self::default();
        let expr = compiler.compile(predicate)?;
        let event_types = expr.pinned_event_types();
        Ok(CompiledPredicate {
            raw: raw.trim().to_string(),
            expr,
            event_types,
        })
    }

    fn compile(&mut self, expr: &Expression) -> Result<CompiledExpr> {
        match expr {
            Expression::Literal(value) => Ok(CompiledExpr::Literal(value.clone())),
            Expression::Attribute(name) => Ok(CompiledExpr::Attribute(name.clone())),
            Expression::SourceAttribute(name) => Ok(CompiledExpr::SourceAttribute(name.clone())),
            Expression::EventField(field) => Ok(CompiledExpr::EventField(*field)),
            Expression::EntityRef { scope, entity_type } => Ok(CompiledExpr::EntityRef {
                scope: *scope,
                entity_type: entity_type.clone(),
            }),
            Expression::ObservationDate => Ok(CompiledExpr::ObservationDate),
            Expression::Wildcard => Ok(CompiledExpr::Wildcard),

            Expression::List(items) => Ok(CompiledExpr::List(
                items.iter().map(|item| self.compile(item)).collect::<Result<_>>()?,
            )),

            Expression::Unary { op, operand } => Ok(CompiledExpr::Unary {
                op: *op,
                operand: Box::new(self.compile(operand)?),
            }),

            Expression::Binary { left, op, right } => Ok(CompiledExpr::Binary {
                left: Box::new(self.compile(left)?),
                op: *op,
                right: Box::new(self.compile(right)?),
            }),

            Expression::FunctionCall { name, args } => self.compile_function(name, args),

            Expression::Aggregate(call) => {
                let aggregate = self.compile_aggregate(call)?;
                self.aggregates.push(aggregate);
                Ok(CompiledExpr::Aggregate(self.aggregates.len() - 1))
            }
        }
    }

    fn compile_function(&mut self, name: &str, args: &[Expression]) -> Result<CompiledExpr> {
        let Some(function) = ScalarFunction::from_name(name) else {
            if AggregateFunction::from_name(name).is_some() || AggregateFunction::takes_parameter(name) {
                return Err(CompileError::InvalidExpression(format!(
                    "aggregate '{}' requires an OVER clause",
                    name
                )));
            }
            return Err(CompileError::UnknownFunction {
                name: name.to_string(),
            });
        };

        let (min, max) = function.arity();
        if args.len() < min || max.map_or(false, |max| args.len() > max) {
            let expected = match max {
                Some(max) if max == min => min.to_string(),
                Some(max) => format!("{}..{}", min, max),
                None => format!("at least {}", min),
            };
            return Err(CompileError::InvalidArguments {
                function: function.name().to_string(),
                expected,
                actual: args.len(),
            });
        }

        Ok(CompiledExpr::Function {
            function,
            args: args.iter().map(|arg| self.compile(arg)).collect::<Result<_>>()?,
        })
    }

    fn compile_aggregate(&mut self, call: &AggregateCall) -> Result<CompiledAggregate> {
        let function = Self::resolve_aggregate(call)?;

        if matches!(call.argument, Expression::Wildcard) && !function.accepts_wildcard() {
            return Err(CompileError::InvalidExpression(format!(
                "'*' is not a valid argument for {}",
                function
            )));
        }
        if function == AggregateFunction::TimeOfNext && !call.window.is_future_looking() {
            return Err(CompileError::InvalidExpression(format!(
                "time_of_next needs a forward window (next N <unit> or future), got '{}'",
                call.window
            )));
        }
        if call.group_by.is_some() && call.having.is_some() {
            return Err(CompileError::InvalidExpression(
                "group by and having cannot be combined in one aggregate".to_string(),
            ));
        }

        let argument = self.compile(&call.argument)?;
        let filter = call.filter.as_ref().map(|f| self.compile(f)).transpose()?;
        let group_by = call.group_by.as_ref().map(|g| self.compile(g)).transpose()?;
        let having = match &call.having {
            Some(having) => Some(Having {
                kind: having.kind,
                expr: self.compile(&having.expr)?,
            }),
            None => None,
        };
        let event_types = filter.as_ref().and_then(CompiledExpr::pinned_event_types);

        Ok(CompiledAggregate {
            function,
            argument,
            window: call.window,
            filter,
            group_by,
            having,
            event_types,
        })
    }

    /// Resolve the function name, folding `nth`'s position into the function
    fn resolve_aggregate(call: &AggregateCall) -> Result<AggregateFunction> {
        if AggregateFunction::takes_parameter(&call.function) {
            return match &call.parameter {
                Some(Expression::Literal(Value::Int(n))) => Ok(AggregateFunction::Nth(*n)),
                Some(other) => Err(CompileError::InvalidExpression(format!(
                    "the position of {} must be an integer literal, got {:?}",
                    call.function, other
                ))),
                None => Err(CompileError::InvalidArguments {
                    function: call.function.to_ascii_lowercase(),
                    expected: "2".to_string(),
                    actual: 1,
                }),
            };
        }

        let function = AggregateFunction::from_name(&call.function).ok_or_else(|| {
            CompileError::UnknownFunction {
                name: call.function.clone(),
            }
        })?;
        if call.parameter.is_some() {
            return Err(CompileError::InvalidArguments {
                function: function.name().to_string(),
                expected: "1".to_string(),
                actual: 2,
            });
        }
        Ok(function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronofeat_core::ast::Window;
    use chronofeat_parser::ExpressionParser;
    use std::collections::BTreeSet;

    fn compile(feature: &str) -> Result<CompiledFeature> {
        ExpressionCompiler::compile_feature(&ExpressionParser::parse_feature(feature).unwrap())
    }

    #[test]
    fn test_aggregates_lifted_into_slots() {
        let feature = compile("sum(x) over past / count(*) over last 3 days as ratio").unwrap();
        assert_eq!(feature.name, "ratio");
        assert_eq!(feature.aggregates.len(), 2);
        assert_eq!(feature.aggregates[0].function, AggregateFunction::Sum);
        assert_eq!(feature.aggregates[1].function, AggregateFunction::Count);
        assert_eq!(feature.aggregates[0].window, Window::Past);
        match feature.expr {
            CompiledExpr::Binary { left, right, .. } => {
                assert_eq!(*left, CompiledExpr::Aggregate(0));
                assert_eq!(*right, CompiledExpr::Aggregate(1));
            }
            other => panic!("Expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_pinned_event_types_recorded() {
        let feature =
            compile("sum(value) over last 10 day where event_type = 'transaction'").unwrap();
        assert_eq!(
            feature.aggregates[0].event_types,
            Some(BTreeSet::from(["transaction".to_string()]))
        );
    }

    #[test]
    fn test_unknown_aggregate_function() {
        let err = compile("mode(x) over past").unwrap_err();
        assert_eq!(err, CompileError::UnknownFunction { name: "mode".to_string() });
    }

    #[test]
    fn test_unknown_scalar_function() {
        let err = compile("frobnicate(@x)").unwrap_err();
        assert!(matches!(err, CompileError::UnknownFunction { .. }));
    }

    #[test]
    fn test_aggregate_without_over() {
        let err = compile("avg(@x)").unwrap_err();
        assert!(err.to_string().contains("OVER"));
    }

    #[test]
    fn test_wildcard_only_for_count() {
        let err = compile("sum(*) over past").unwrap_err();
        assert!(matches!(err, CompileError::InvalidExpression(_)));
    }

    #[test]
    fn test_scalar_arity() {
        let err = compile("abs(@a, @b)").unwrap_err();
        assert_eq!(
            err,
            CompileError::InvalidArguments {
                function: "abs".to_string(),
                expected: "1".to_string(),
                actual: 2,
            }
        );
    }

    #[test]
    fn test_nth_position_folded_into_function() {
        let feature = compile("nth(amount, -2) over past").unwrap();
        assert_eq!(feature.aggregates[0].function, AggregateFunction::Nth(-2));

        let err = compile("nth(amount) over past").unwrap_err();
        assert!(matches!(err, CompileError::InvalidArguments { actual: 1, .. }));

        let err = compile("nth(amount, @k) over past").unwrap_err();
        assert!(err.to_string().contains("integer literal"));

        let err = compile("sum(amount, 2) over past").unwrap_err();
        assert!(matches!(err, CompileError::InvalidArguments { actual: 2, .. }));
    }

    #[test]
    fn test_time_of_next_requires_forward_window() {
        assert!(compile("time_of_next(amount) over next 3 days").is_ok());
        assert!(compile("time_of_next(amount) over future").is_ok());
        let err = compile("time_of_next(amount) over last 3 days").unwrap_err();
        assert!(matches!(err, CompileError::InvalidExpression(_)));
    }

    #[test]
    fn test_having_compiled() {
        let feature = compile("avg(pressure) over past having max temperature").unwrap();
        let having = feature.aggregates[0].having.as_ref().unwrap();
        assert_eq!(having.expr, CompiledExpr::Attribute("temperature".to_string()));
        assert!(feature.aggregates[0].attributes().contains("temperature"));
    }

    #[test]
    fn test_avg_time_between_alias() {
        let feature = compile("avg_time_between(event_time) over past").unwrap();
        assert_eq!(feature.aggregates[0].function, AggregateFunction::AvgDaysBetween);
    }

    #[test]
    fn test_predicate_pins_event_types() {
        let expr = ExpressionParser::parse("event_type in ('a', 'b') and x > 1").unwrap();
        let predicate = ExpressionCompiler::compile_predicate(" event_type in ('a', 'b') and x > 1", &expr).unwrap();
        assert_eq!(predicate.raw, "event_type in ('a', 'b') and x > 1");
        assert_eq!(predicate.event_types.map(|t| t.len()), Some(2));
    }
}
