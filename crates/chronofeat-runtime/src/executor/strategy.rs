//! Per-aggregate window evaluation strategies
//!
//! Within one group, points are visited in instant order, so every window
//! edge only moves forward. Subtractable functions slide one accumulator,
//! positional functions slide a monotonic deque, and everything else is
//! rebuilt from the window's candidates at each point. A `having` clause
//! needs the whole window to find its extreme, so it always rescans.

use super::scope::Candidates;
use crate::aggregate::{AggregateState, GroupedState, Input, MonotonicDeque};
use crate::engine::{EvalContext, ExpressionEvaluator};
use crate::error::Result;
use crate::obs_dates::ObservationPoint;
use chronofeat_core::ast::HavingKind;
use chronofeat_core::ir::CompiledAggregate;
use chronofeat_core::{Event, Value};
use std::cmp::Ordering;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strategy {
    Incremental,
    MonotonicDeque,
    Rescan,
}

impl Strategy {
    pub(crate) fn choose(aggregate: &CompiledAggregate) -> Self {
        if aggregate.group_by.is_some() || aggregate.having.is_some() || !aggregate.is_context_free() {
            Strategy::Rescan
        } else if aggregate.function.is_subtractable() {
            Strategy::Incremental
        } else if aggregate.function.supports_deque() {
            Strategy::MonotonicDeque
        } else {
            Strategy::Rescan
        }
    }
}

/// What one candidate event feeds into an aggregate
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Contribution {
    Skip,
    /// `rank` is the `having` expression's value when the aggregate has one
    Include {
        key: Option<Value>,
        value: Value,
        rank: Option<Value>,
    },
    /// The filter could not be evaluated on this event
    FilterFailed(String),
}

/// Aggregate result at one point
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AggregateOutcome {
    Value(Value),
    FilterFailed(String),
}

/// One point of a group, with the event it was taken from
#[derive(Debug, Clone, Copy)]
pub(crate) struct PointRef<'a> {
    pub point: &'a ObservationPoint,
    pub source: Option<&'a Event>,
}

/// Filter, argument, group key and rank of `aggregate` for one candidate.
///
/// Filter errors are captured; argument and key errors propagate.
pub(crate) fn contribution(
    aggregate: &CompiledAggregate,
    event: &Event,
    at: PointRef<'_>,
) -> Result<Contribution> {
    if let Some(pinned) = &aggregate.event_types {
        if !pinned.contains(&event.event_type) {
            return Ok(Contribution::Skip);
        }
    }
    let ctx = EvalContext::for_point(at.point, at.source).with_event(event);

    if let Some(filter) = &aggregate.filter {
        match ExpressionEvaluator::evaluate_predicate(filter, &ctx) {
            Ok(true) => {}
            Ok(false) => return Ok(Contribution::Skip),
            Err(e) => return Ok(Contribution::FilterFailed(e.to_string())),
        }
    }

    let value = ExpressionEvaluator::evaluate(&aggregate.argument, &ctx)?;
    let key = match &aggregate.group_by {
        Some(group_by) => Some(ExpressionEvaluator::evaluate(group_by, &ctx)?),
        None => None,
    };
    let rank = match &aggregate.having {
        Some(having) => Some(ExpressionEvaluator::evaluate(&having.expr, &ctx)?),
        None => None,
    };
    Ok(Contribution::Include { key, value, rank })
}

/// Evaluates one aggregate at every point of a group
pub(crate) struct WindowEvaluator<'a, 'c> {
    aggregate: &'a CompiledAggregate,
    candidates: &'c Candidates<'a>,
    include_obs: bool,
}

impl<'a, 'c> WindowEvaluator<'a, 'c> {
    pub(crate) fn new(
        aggregate: &'a CompiledAggregate,
        candidates: &'c Candidates<'a>,
        include_obs: bool,
    ) -> Self {
        Self {
            aggregate,
            candidates,
            include_obs,
        }
    }

    /// Outcomes aligned with `points`, which must be in instant order
    pub(crate) fn evaluate(
        &self,
        strategy: Strategy,
        points: &[PointRef<'_>],
    ) -> Result<Vec<AggregateOutcome>> {
        let Some(first) = points.first() else {
            return Ok(Vec::new());
        };
        match strategy {
            Strategy::Rescan => self.rescan(points),
            sliding => {
                // context-free: one pass over the candidates serves every point
                let contributions = self.contributions(*first)?;
                self.slide(sliding, &contributions, points)
            }
        }
    }

    fn window(&self, point: &ObservationPoint) -> Range<usize> {
        let bounds = self.aggregate.window.bounds(point.instant, self.include_obs);
        self.candidates.window(&bounds)
    }

    fn contributions(&self, at: PointRef<'_>) -> Result<Vec<Contribution>> {
        self.candidates
            .events()
            .iter()
            .map(|event| contribution(self.aggregate, event, at))
            .collect()
    }

    fn slide(
        &self,
        strategy: Strategy,
        contributions: &[Contribution],
        points: &[PointRef<'_>],
    ) -> Result<Vec<AggregateOutcome>> {
        let failures = FailureIndex::new(contributions);
        let function = self.aggregate.function;
        let mut sliding = match strategy {
            Strategy::MonotonicDeque => match MonotonicDeque::new(function) {
                Some(deque) => Sliding::Deque(deque),
                None => Sliding::Accumulator(AggregateState::new(function)),
            },
            _ => Sliding::Accumulator(AggregateState::new(function)),
        };
        let (mut lo, mut hi) = (0usize, 0usize);

        let mut outcomes = Vec::with_capacity(points.len());
        for at in points {
            let window = self.window(at.point);

            if window.start >= hi || window.start < lo || window.end < hi {
                // disjoint from (or not ahead of) the previous window
                sliding.reset();
                lo = window.start;
                hi = window.start;
            }
            for i in hi..window.end {
                if let Contribution::Include { value, .. } = &contributions[i] {
                    sliding.add(i, self.input(i, value))?;
                }
            }
            for i in lo..window.start {
                if let Contribution::Include { value, .. } = &contributions[i] {
                    sliding.remove(self.input(i, value))?;
                }
            }
            sliding.evict_before(window.start);
            lo = window.start;
            hi = window.end;

            outcomes.push(match failures.first_in(&window, contributions) {
                Some(reason) => AggregateOutcome::FilterFailed(reason),
                None => AggregateOutcome::Value(sliding.evaluate()),
            });
        }
        Ok(outcomes)
    }

    fn rescan(&self, points: &[PointRef<'_>]) -> Result<Vec<AggregateOutcome>> {
        let function = self.aggregate.function;
        let mut outcomes = Vec::with_capacity(points.len());

        'points: for at in points {
            let window = self.window(at.point);
            let mut state = AggregateState::new(function);
            let mut grouped = GroupedState::new(function);
            let mut ranked = Vec::new();

            for i in window {
                match contribution(self.aggregate, self.candidates.get(i), *at)? {
                    Contribution::Skip => {}
                    Contribution::FilterFailed(reason) => {
                        outcomes.push(AggregateOutcome::FilterFailed(reason));
                        continue 'points;
                    }
                    Contribution::Include { key: Some(key), value, .. } => {
                        grouped.add(&key, self.input(i, &value))?;
                    }
                    Contribution::Include { key: None, value, rank: Some(rank) } => {
                        ranked.push((i, value, rank));
                    }
                    Contribution::Include { key: None, value, rank: None } => {
                        state.add(self.input(i, &value))?;
                    }
                }
            }
            if let Some(having) = &self.aggregate.having {
                for (i, value) in at_extreme(having.kind, ranked) {
                    state.add(self.input(i, &value))?;
                }
            }

            let value = if self.aggregate.group_by.is_some() {
                grouped.evaluate()
            } else {
                state.evaluate()
            };
            outcomes.push(AggregateOutcome::Value(value));
        }
        Ok(outcomes)
    }

    fn input<'v>(&self, i: usize, value: &'v Value) -> Input<'v> {
        Input {
            time: self.candidates.get(i).event_time,
            value,
        }
    }
}

/// Entries whose rank ties the smallest (`Min`) or largest (`Max`) rank.
///
/// Null ranks never qualify; ranks incomparable with the current best are
/// passed over.
fn at_extreme(
    kind: HavingKind,
    ranked: Vec<(usize, Value, Value)>,
) -> impl Iterator<Item = (usize, Value)> {
    let wanted = match kind {
        HavingKind::Min => Ordering::Less,
        HavingKind::Max => Ordering::Greater,
    };
    let mut best: Option<Value> = None;
    for (_, _, rank) in &ranked {
        if rank.is_null() {
            continue;
        }
        match &best {
            Some(current) if rank.compare(current) != Some(wanted) => {}
            _ => best = Some(rank.clone()),
        }
    }
    ranked.into_iter().filter_map(move |(i, value, rank)| {
        let tied = best
            .as_ref()
            .map_or(false, |best| rank.compare(best) == Some(Ordering::Equal));
        tied.then_some((i, value))
    })
}

/// Sliding accumulator of either kind
enum Sliding {
    Accumulator(AggregateState),
    Deque(MonotonicDeque),
}

impl Sliding {
    fn reset(&mut self) {
        match self {
            Sliding::Accumulator(state) => *state = AggregateState::new(state.function()),
            Sliding::Deque(deque) => deque.clear(),
        }
    }

    fn add(&mut self, seq: usize, input: Input<'_>) -> Result<()> {
        match self {
            Sliding::Accumulator(state) => state.add(input),
            Sliding::Deque(deque) => {
                if !input.value.is_null() {
                    deque.push(seq as u64, input.time, input.value.clone());
                }
                Ok(())
            }
        }
    }

    fn remove(&mut self, input: Input<'_>) -> Result<()> {
        match self {
            Sliding::Accumulator(state) => state.subtract(input),
            // deque entries expire through evict_before
            Sliding::Deque(_) => Ok(()),
        }
    }

    fn evict_before(&mut self, start: usize) {
        if let Sliding::Deque(deque) = self {
            deque.evict_before(start as u64);
        }
    }

    fn evaluate(&self) -> Value {
        match self {
            Sliding::Accumulator(state) => state.evaluate(),
            Sliding::Deque(deque) => deque.evaluate(),
        }
    }
}

/// Prefix counts of filter failures, for O(1) checks per window
struct FailureIndex {
    prefix: Vec<usize>,
}

impl FailureIndex {
    fn new(contributions: &[Contribution]) -> Self {
        let mut prefix = Vec::with_capacity(contributions.len() + 1);
        prefix.push(0);
        for c in contributions {
            let failed = matches!(c, Contribution::FilterFailed(_)) as usize;
            prefix.push(prefix[prefix.len() - 1] + failed);
        }
        Self { prefix }
    }

    fn first_in(&self, window: &Range<usize>, contributions: &[Contribution]) -> Option<String> {
        if self.prefix[window.end] == self.prefix[window.start] {
            return None;
        }
        contributions[window.clone()].iter().find_map(|c| match c {
            Contribution::FilterFailed(reason) => Some(reason.clone()),
            _ => None,
        })
    }
}
