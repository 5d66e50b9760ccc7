//! Expression AST
//!
//! Produced by the parser, consumed by the compiler. Function names are
//! kept as written here; resolving them to known aggregate or scalar
//! functions is a compile step.

use super::operator::{Operator, UnaryOperator};
use super::window::Window;
use crate::types::Value;
use serde::{Deserialize, Serialize};

/// Which entity map an `entities.<type>` reference reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityScope {
    /// `@entities.<type>`: the observation point's own context
    Observation,
    /// `entities.<type>`: the candidate event being aggregated
    Event,
}

/// Built-in fields of the candidate event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventField {
    Type,
    Time,
    Id,
}

/// Expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Literal value
    Literal(Value),

    /// Attribute of the candidate event (`MaxTemp`, `wind.speed`)
    Attribute(String),

    /// Attribute of the event an observation point was taken from (`@MaxTemp`)
    SourceAttribute(String),

    /// `event_type`, `event_time` or `event_id`
    EventField(EventField),

    /// Entity id lookup
    EntityRef {
        scope: EntityScope,
        entity_type: String,
    },

    /// `obs_dt`
    ObservationDate,

    /// `*` inside `count(*)`
    Wildcard,

    /// Parenthesised list, right-hand side of `in`
    List(Vec<Expression>),

    /// Unary operation
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// Binary operation
    Binary {
        left: Box<Expression>,
        op: Operator,
        right: Box<Expression>,
    },

    /// Scalar function call
    FunctionCall { name: String, args: Vec<Expression> },

    /// Windowed aggregate
    Aggregate(Box<AggregateCall>),
}

/// Which extreme a `having` clause keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HavingKind {
    Min,
    Max,
}

/// `HAVING MIN|MAX expr`: only the candidates at the extreme of `expr`
/// are aggregated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Having<E = Expression> {
    pub kind: HavingKind,
    pub expr: E,
}

/// `FUNC(expr[, param]) OVER window [WHERE predicate] [GROUP BY expr | HAVING MIN|MAX expr]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateCall {
    pub function: String,
    pub argument: Expression,
    /// Second argument, e.g. the index of `nth(expr, n)`
    pub parameter: Option<Expression>,
    pub window: Window,
    pub filter: Option<Expression>,
    pub group_by: Option<Expression>,
    pub having: Option<Having>,
}

impl Expression {
    /// Create a literal expression
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    /// Create a candidate-event attribute reference
    pub fn attribute(name: impl Into<String>) -> Self {
        Expression::Attribute(name.into())
    }

    pub fn entity(scope: EntityScope, entity_type: impl Into<String>) -> Self {
        Expression::EntityRef {
            scope,
            entity_type: entity_type.into(),
        }
    }

    /// Create a binary expression
    pub fn binary(left: Expression, op: Operator, right: Expression) -> Self {
        Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Create a unary expression
    pub fn unary(op: UnaryOperator, operand: Expression) -> Self {
        Expression::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Create a function call expression
    pub fn function_call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::FunctionCall {
            name: name.into(),
            args,
        }
    }

    pub fn aggregate(call: AggregateCall) -> Self {
        Expression::Aggregate(Box::new(call))
    }

    /// Direct children, aggregate clauses included
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::List(items) => items.iter().collect(),
            Expression::Unary { operand, .. } => vec![operand.as_ref()],
            Expression::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expression::FunctionCall { args, .. } => args.iter().collect(),
            Expression::Aggregate(call) => {
                let mut children = vec![&call.argument];
                children.extend(call.parameter.iter());
                children.extend(call.filter.iter());
                children.extend(call.group_by.iter());
                children.extend(call.having.iter().map(|h| &h.expr));
                children
            }
            _ => Vec::new(),
        }
    }

    /// True if `pred` holds for this node or any descendant
    pub fn any(&self, pred: &dyn Fn(&Expression) -> bool) -> bool {
        pred(self) || self.children().into_iter().any(|c| c.any(pred))
    }

    pub fn contains_aggregate(&self) -> bool {
        self.any(&|e| matches!(e, Expression::Aggregate(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_expression() {
        let expr = Expression::literal(42i64);
        assert_eq!(expr, Expression::Literal(Value::Int(42)));
    }

    #[test]
    fn test_binary_expression() {
        let expr = Expression::binary(
            Expression::attribute("MaxTemp"),
            Operator::Gt,
            Expression::literal(30i64),
        );
        match expr {
            Expression::Binary { left, op, right } => {
                assert_eq!(*left, Expression::Attribute("MaxTemp".to_string()));
                assert_eq!(op, Operator::Gt);
                assert_eq!(*right, Expression::Literal(Value::Int(30)));
            }
            _ => panic!("Expected Binary expression"),
        }
    }

    #[test]
    fn test_contains_aggregate() {
        let agg = Expression::aggregate(AggregateCall {
            function: "count".to_string(),
            argument: Expression::Wildcard,
            parameter: None,
            window: Window::Past,
            filter: None,
            group_by: None,
            having: None,
        });
        let ratio = Expression::binary(agg.clone(), Operator::Div, Expression::literal(2i64));
        assert!(ratio.contains_aggregate());
        assert!(!Expression::ObservationDate.contains_aggregate());
    }

    #[test]
    fn test_children_of_aggregate_cover_clauses() {
        let call = AggregateCall {
            function: "sum".to_string(),
            argument: Expression::attribute("amount"),
            parameter: None,
            window: Window::AllTime,
            filter: Some(Expression::literal(true)),
            group_by: Some(Expression::attribute("category")),
            having: None,
        };
        assert_eq!(Expression::aggregate(call).children().len(), 3);
    }

    #[test]
    fn test_children_include_having_and_parameter() {
        let call = AggregateCall {
            function: "nth".to_string(),
            argument: Expression::attribute("amount"),
            parameter: Some(Expression::literal(2i64)),
            window: Window::Past,
            filter: None,
            group_by: None,
            having: Some(Having {
                kind: HavingKind::Max,
                expr: Expression::attribute("temp"),
            }),
        };
        assert_eq!(Expression::aggregate(call).children().len(), 3);
    }
}
