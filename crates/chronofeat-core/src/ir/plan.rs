//! Compiled query plan
//!
//! The compiler lowers each feature's AST into a [`CompiledExpr`] tree in
//! which function names are resolved and every aggregate call is lifted
//! into a slot of [`CompiledFeature::aggregates`]. The executor computes
//! the aggregate slots for an observation point first and then evaluates
//! the outer expression over them.

use super::aggregate::AggregateFunction;
use super::function::ScalarFunction;
use crate::ast::{EntityScope, EventField, Having, Operator, UnaryOperator, Window};
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Resolved expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompiledExpr {
    Literal(Value),
    Attribute(String),
    SourceAttribute(String),
    EventField(EventField),
    EntityRef {
        scope: EntityScope,
        entity_type: String,
    },
    ObservationDate,
    Wildcard,
    List(Vec<CompiledExpr>),
    Unary {
        op: UnaryOperator,
        operand: Box<CompiledExpr>,
    },
    Binary {
        left: Box<CompiledExpr>,
        op: Operator,
        right: Box<CompiledExpr>,
    },
    Function {
        function: ScalarFunction,
        args: Vec<CompiledExpr>,
    },
    /// Index into the owning feature's aggregate slots
    Aggregate(usize),
}

impl CompiledExpr {
    pub fn children(&self) -> Vec<&CompiledExpr> {
        match self {
            CompiledExpr::List(items) => items.iter().collect(),
            CompiledExpr::Unary { operand, .. } => vec![operand.as_ref()],
            CompiledExpr::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            CompiledExpr::Function { args, .. } => args.iter().collect(),
            _ => Vec::new(),
        }
    }

    pub fn any(&self, pred: &dyn Fn(&CompiledExpr) -> bool) -> bool {
        pred(self) || self.children().into_iter().any(|c| c.any(pred))
    }

    /// True when the value never depends on which observation point of a
    /// scope group is being evaluated.
    ///
    /// `@entities.<type>` is fixed within a group; the observation instant
    /// and the source event are not.
    pub fn is_context_free(&self) -> bool {
        !self.any(&|e| {
            matches!(
                e,
                CompiledExpr::ObservationDate | CompiledExpr::SourceAttribute(_)
            )
        })
    }

    /// Candidate-event attributes referenced by this expression
    pub fn attributes(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_attributes(&mut out);
        out
    }

    fn collect_attributes(&self, out: &mut BTreeSet<String>) {
        if let CompiledExpr::Attribute(name) = self {
            out.insert(name.clone());
        }
        for child in self.children() {
            child.collect_attributes(out);
        }
    }

    /// Event types this predicate restricts candidates to, if it pins any.
    ///
    /// Recognises `event_type == '<t>'` and `event_type in (..)` joined by
    /// `and` / `or`. Returns `None` when any event type may pass.
    pub fn pinned_event_types(&self) -> Option<BTreeSet<String>> {
        match self {
            CompiledExpr::Binary { left, op, right } => match op {
                Operator::Eq => match (left.as_ref(), right.as_ref()) {
                    (CompiledExpr::EventField(EventField::Type), CompiledExpr::Literal(Value::String(t)))
                    | (CompiledExpr::Literal(Value::String(t)), CompiledExpr::EventField(EventField::Type)) => {
                        Some(BTreeSet::from([t.clone()]))
                    }
                    _ => None,
                },
                Operator::In => match (left.as_ref(), right.as_ref()) {
                    (CompiledExpr::EventField(EventField::Type), CompiledExpr::List(items)) => items
                        .iter()
                        .map(|item| match item {
                            CompiledExpr::Literal(Value::String(t)) => Some(t.clone()),
                            _ => None,
                        })
                        .collect(),
                    _ => None,
                },
                Operator::And => match (left.pinned_event_types(), right.pinned_event_types()) {
                    (Some(l), Some(r)) => Some(l.intersection(&r).cloned().collect()),
                    (Some(only), None) | (None, Some(only)) => Some(only),
                    (None, None) => None,
                },
                Operator::Or => match (left.pinned_event_types(), right.pinned_event_types()) {
                    (Some(l), Some(r)) => Some(l.union(&r).cloned().collect()),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        }
    }
}

/// One aggregate slot of a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledAggregate {
    pub function: AggregateFunction,
    pub argument: CompiledExpr,
    pub window: Window,
    pub filter: Option<CompiledExpr>,
    pub group_by: Option<CompiledExpr>,
    pub having: Option<Having<CompiledExpr>>,
    /// Event types pinned by the filter, `None` when unrestricted
    pub event_types: Option<BTreeSet<String>>,
}

impl CompiledAggregate {
    /// Filter, group key and having expression, in that order
    pub fn clauses(&self) -> impl Iterator<Item = &CompiledExpr> {
        self.filter
            .iter()
            .chain(self.group_by.iter())
            .chain(self.having.iter().map(|h| &h.expr))
    }

    /// Attributes of the candidate event read by argument and clauses
    pub fn attributes(&self) -> BTreeSet<String> {
        let mut attributes = self.argument.attributes();
        for clause in self.clauses() {
            attributes.extend(clause.attributes());
        }
        attributes
    }

    /// Whether the per-event inputs are the same for every point of a scope group
    pub fn is_context_free(&self) -> bool {
        self.argument.is_context_free() && self.clauses().all(CompiledExpr::is_context_free)
    }
}

/// A compiled output column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledFeature {
    /// Column name (alias or submitted text)
    pub name: String,
    pub raw: String,
    pub expr: CompiledExpr,
    pub aggregates: Vec<CompiledAggregate>,
}

/// Stand-alone predicate over events (conditional observation dates)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledPredicate {
    pub raw: String,
    pub expr: CompiledExpr,
    pub event_types: Option<BTreeSet<String>>,
}
