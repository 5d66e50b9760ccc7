//! Semantic analyzer
//!
//! Performs structural checks on parsed features before code generation:
//! where aggregates may appear, what may be referenced outside them, and
//! uniqueness of output column names.

use crate::error::{CompileError, Result};
use chronofeat_core::ast::{EntityScope, Expression, FeatureDefinition};
use std::collections::HashSet;

/// Where an expression is being analyzed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// Top level of a feature: observation context only
    Projection,
    /// Argument, WHERE or GROUP BY of an aggregate: candidate event available
    InAggregate,
    /// Stand-alone event predicate: candidate event only
    Predicate,
}

/// Semantic analyzer
#[derive(Debug, Default)]
pub struct SemanticAnalyzer {
    /// Output names already taken in the current query
    seen_names: HashSet<String>,
}

impl SemanticAnalyzer {
    /// Create a new semantic analyzer
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze one feature of a query, registering its output name
    pub fn analyze_feature(&mut self, feature: &FeatureDefinition) -> Result<()> {
        let name = feature.name();
        if name.is_empty() {
            return Err(CompileError::InvalidExpression(
                "Feature name cannot be empty".to_string(),
            ));
        }
        if !self.seen_names.insert(name.to_string()) {
            return Err(CompileError::DuplicateAlias {
                alias: name.to_string(),
            });
        }

        Self::analyze_expression(&feature.expression, Position::Projection)
    }

    /// Analyze a predicate evaluated against single events
    pub fn analyze_predicate(&self, predicate: &Expression) -> Result<()> {
        Self::analyze_expression(predicate, Position::Predicate)
    }

    fn analyze_expression(expr: &Expression, position: Position) -> Result<()> {
        match expr {
            Expression::Aggregate(call) => {
                if position != Position::Projection {
                    return Err(CompileError::InvalidExpression(format!(
                        "aggregate '{}' cannot be nested inside another aggregate or a predicate",
                        call.function
                    )));
                }
                if !matches!(call.argument, Expression::Wildcard) {
                    Self::analyze_expression(&call.argument, Position::InAggregate)?;
                }
                let clauses = call
                    .parameter
                    .iter()
                    .chain(call.filter.iter())
                    .chain(call.group_by.iter())
                    .chain(call.having.iter().map(|h| &h.expr));
                for clause in clauses {
                    Self::analyze_expression(clause, Position::InAggregate)?;
                }
                Ok(())
            }

            Expression::Wildcard => Err(CompileError::InvalidExpression(
                "'*' is only allowed as the argument of count".to_string(),
            )),

            Expression::Attribute(name) if position == Position::Projection => {
                Err(CompileError::InvalidExpression(format!(
                    "attribute '{}' must be aggregated; use @{} for the observed event",
                    name, name
                )))
            }

            Expression::EventField(field) if position == Position::Projection => {
                Err(CompileError::InvalidExpression(format!(
                    "event field {:?} is only available inside an aggregate",
                    field
                )))
            }

            Expression::ObservationDate
            | Expression::SourceAttribute(_)
            | Expression::EntityRef {
                scope: EntityScope::Observation,
                ..
            } if position == Position::Predicate => Err(CompileError::InvalidExpression(
                "event predicates cannot reference the observation point".to_string(),
            )),

            other => {
                for child in other.children() {
                    Self::analyze_expression(child, position)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronofeat_parser::ExpressionParser;

    fn analyze(features: &[&str]) -> Result<()> {
        let mut analyzer = SemanticAnalyzer::new();
        for feature in features {
            let definition = ExpressionParser::parse_feature(feature).unwrap();
            analyzer.analyze_feature(&definition)?;
        }
        Ok(())
    }

    #[test]
    fn test_valid_features() {
        assert!(analyze(&[
            "obs_dt",
            "@entities.city as city",
            "count(*) over past",
            "sum(goals) over past where entities.home_team == @entities.team",
            "sum(x) over past / count(*) over past as ratio",
        ])
        .is_ok());
    }

    #[test]
    fn test_event_entity_projection() {
        assert!(analyze(&["entities.city", "@entities.city"]).is_ok());
    }

    #[test]
    fn test_having_clause_checked_as_aggregate_scope() {
        assert!(analyze(&["first(event_type) over past having max temp"]).is_ok());
        let err = analyze(&["first(event_type) over past having max count(*) over past"]).unwrap_err();
        assert!(matches!(err, CompileError::InvalidExpression(_)));
    }

    #[test]
    fn test_duplicate_alias() {
        let err = analyze(&["count(*) over past as n", "sum(x) over past as n"]).unwrap_err();
        assert_eq!(err, CompileError::DuplicateAlias { alias: "n".to_string() });
    }

    #[test]
    fn test_duplicate_raw_text() {
        let err = analyze(&["count(*) over past", "count(*) over past"]).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateAlias { .. }));
    }

    #[test]
    fn test_nested_aggregate_rejected() {
        let err = analyze(&["max(count(*) over past) over past"]).unwrap_err();
        assert!(matches!(err, CompileError::InvalidExpression(_)));
    }

    #[test]
    fn test_wildcard_outside_aggregate_argument() {
        assert!(analyze(&["count(x) over past where * == 1"]).is_err());
    }

    #[test]
    fn test_bare_attribute_rejected() {
        let err = analyze(&["MaxTemp"]).unwrap_err();
        assert!(err.to_string().contains("must be aggregated"));
    }

    #[test]
    fn test_predicate_cannot_see_observation() {
        let analyzer = SemanticAnalyzer::new();
        let predicate = ExpressionParser::parse("event_time > obs_dt").unwrap();
        assert!(analyzer.analyze_predicate(&predicate).is_err());

        let predicate = ExpressionParser::parse("RainToday == 'Yes'").unwrap();
        assert!(analyzer.analyze_predicate(&predicate).is_ok());
    }
}
