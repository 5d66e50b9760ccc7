//! Query executor
//!
//! Binds a compiled query to the event index and evaluates every feature
//! at every observation point:
//! - points sharing an entity and context form a group with one candidate set
//! - each aggregate slides or rescans its window across the group's points
//! - groups run on the rayon pool when the query is parallel
//! - rows are written back at their point's position, so output order does
//!   not depend on scheduling

mod scope;
mod strategy;

use crate::config::{EventScopeConfig, QueryConfig};
use crate::engine::{EvalContext, ExpressionEvaluator};
use crate::error::Result;
use crate::obs_dates::ObservationPoint;
use crate::storage::EventIndex;
use chronofeat_compiler::{CompiledQuery, SchemaBinder};
use chronofeat_core::{Entities, Value};
use rayon::prelude::*;
use scope::{validate_scope, Candidates};
use serde::Serialize;
use std::collections::BTreeMap;
use strategy::{AggregateOutcome, PointRef, Strategy, WindowEvaluator};
use tracing::{debug, warn};

/// A point whose row was left out because a filter failed to evaluate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedRow {
    pub point: ObservationPoint,
    pub feature: String,
    pub reason: String,
}

/// Query output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Feature names in declaration order
    pub columns: Vec<String>,
    /// Points with a row, aligned with `rows`
    pub points: Vec<ObservationPoint>,
    pub rows: Vec<Vec<Value>>,
    pub dropped: Vec<DroppedRow>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in row `row`
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(col)
    }

    /// Rows as JSON objects keyed by column, with entity and instant
    pub fn to_json_rows(&self) -> Vec<serde_json::Value> {
        self.points
            .iter()
            .zip(&self.rows)
            .map(|(point, row)| {
                let mut object = serde_json::Map::new();
                object.insert("entity_type".to_string(), point.entity_type.clone().into());
                object.insert("entity_id".to_string(), point.entity_id.clone().into());
                object.insert("obs_dt".to_string(), Value::DateTime(point.instant).to_json());
                for (column, value) in self.columns.iter().zip(row) {
                    object.insert(column.clone(), value.to_json());
                }
                serde_json::Value::Object(object)
            })
            .collect()
    }
}

enum PointOutcome {
    Row(Vec<Value>),
    Dropped { feature: String, reason: String },
}

type GroupKey<'p> = (&'p str, &'p str, &'p Entities);

/// Executes compiled queries against a read-only event index
pub struct QueryExecutor<'a> {
    index: &'a EventIndex,
    scope: &'a EventScopeConfig,
    config: &'a QueryConfig,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(index: &'a EventIndex, scope: &'a EventScopeConfig, config: &'a QueryConfig) -> Self {
        Self {
            index,
            scope,
            config,
        }
    }

    /// Run `query` at every point.
    ///
    /// Binding and scope errors abort before any aggregation runs.
    pub fn execute(&self, query: &CompiledQuery, points: &[ObservationPoint]) -> Result<QueryResult> {
        validate_scope(self.index, self.scope)?;
        let mut binder = SchemaBinder::new(self.index.schema());
        binder.bind_query(query)?;
        debug!(
            "Bound {} features ({} cached bindings) for {} points",
            query.len(),
            binder.cached_bindings(),
            points.len()
        );

        let mut groups: BTreeMap<GroupKey<'_>, Vec<usize>> = BTreeMap::new();
        for (i, point) in points.iter().enumerate() {
            groups
                .entry((point.entity_type.as_str(), point.entity_id.as_str(), &point.context))
                .or_default()
                .push(i);
        }
        let groups: Vec<Vec<usize>> = groups.into_values().collect();

        let evaluated: Vec<Vec<(usize, PointOutcome)>> = if self.config.parallel {
            groups
                .par_iter()
                .map(|group| self.run_group(query, points, group))
                .collect::<Result<_>>()?
        } else {
            groups
                .iter()
                .map(|group| self.run_group(query, points, group))
                .collect::<Result<_>>()?
        };

        let mut slots: Vec<Option<PointOutcome>> = Vec::with_capacity(points.len());
        slots.resize_with(points.len(), || None);
        for (i, outcome) in evaluated.into_iter().flatten() {
            slots[i] = Some(outcome);
        }

        let mut result = QueryResult {
            columns: query.columns(),
            points: Vec::with_capacity(points.len()),
            rows: Vec::with_capacity(points.len()),
            dropped: Vec::new(),
        };
        for (point, slot) in points.iter().zip(slots) {
            match slot {
                Some(PointOutcome::Row(row)) => {
                    result.points.push(point.clone());
                    result.rows.push(row);
                }
                Some(PointOutcome::Dropped { feature, reason }) => {
                    result.dropped.push(DroppedRow {
                        point: point.clone(),
                        feature,
                        reason,
                    });
                }
                None => {}
            }
        }

        if !result.dropped.is_empty() {
            warn!(
                "Dropped {} of {} rows on filter evaluation errors",
                result.dropped.len(),
                points.len()
            );
        }
        Ok(result)
    }

    fn run_group(
        &self,
        query: &CompiledQuery,
        points: &[ObservationPoint],
        group: &[usize],
    ) -> Result<Vec<(usize, PointOutcome)>> {
        let Some(&head) = group.first() else {
            return Ok(Vec::new());
        };
        let candidates = Candidates::collect(
            self.index,
            self.scope,
            &points[head],
            self.config.experiment_id.as_deref(),
        );

        // instant order keeps every window edge moving forward
        let mut order = group.to_vec();
        order.sort_by_key(|&i| points[i].instant);
        let refs: Vec<PointRef<'_>> = order
            .iter()
            .map(|&i| PointRef {
                point: &points[i],
                source: points[i]
                    .event_id
                    .as_deref()
                    .and_then(|id| self.index.get_by_id(id)),
            })
            .collect();

        // slot outcomes per feature, each aligned with `order`
        let mut per_feature = Vec::with_capacity(query.features.len());
        for feature in &query.features {
            let mut slots = Vec::with_capacity(feature.aggregates.len());
            for aggregate in &feature.aggregates {
                let strategy = Strategy::choose(aggregate);
                let evaluator =
                    WindowEvaluator::new(aggregate, &candidates, self.config.include_events_on_obs_date);
                slots.push(evaluator.evaluate(strategy, &refs)?);
            }
            per_feature.push(slots);
        }

        let mut outcomes = Vec::with_capacity(order.len());
        'points: for (pos, (&i, at)) in order.iter().zip(&refs).enumerate() {
            let mut row = Vec::with_capacity(query.features.len());
            for (feature, slots) in query.features.iter().zip(&per_feature) {
                let mut aggregates = Vec::with_capacity(slots.len());
                for slot in slots {
                    match &slot[pos] {
                        AggregateOutcome::Value(value) => aggregates.push(value.clone()),
                        AggregateOutcome::FilterFailed(reason) => {
                            outcomes.push((
                                i,
                                PointOutcome::Dropped {
                                    feature: feature.name.clone(),
                                    reason: reason.clone(),
                                },
                            ));
                            continue 'points;
                        }
                    }
                }
                let ctx = EvalContext::for_point(at.point, at.source).with_aggregates(&aggregates);
                row.push(ExpressionEvaluator::evaluate(&feature.expr, &ctx)?);
            }
            outcomes.push((i, PointOutcome::Row(row)));
        }
        Ok(outcomes)
    }
}
