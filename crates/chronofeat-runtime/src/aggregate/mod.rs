//! Partial aggregates
//!
//! Every aggregate function is backed by an accumulator that can absorb one
//! input, merge with another partial and produce a value. Functions with an
//! exact inverse also implement [`SubtractPartialAggregate`], which lets the
//! executor slide a window by retracting the oldest inputs.

mod deque;
mod numeric;
mod ordered;

pub use deque::MonotonicDeque;
pub use numeric::{Count, CountDistinct, Mean, StdDev, Sum, Variance};
pub use ordered::{AvgDaysBetween, First, Last, Max, Median, Min, Nth, Values};

use crate::error::{Result, RuntimeError};
use chrono::NaiveDateTime;
use chronofeat_core::ir::AggregateFunction;
use chronofeat_core::Value;
use std::collections::BTreeMap;

/// One accumulator input: the candidate event's time and the evaluated
/// argument
#[derive(Debug, Clone, Copy)]
pub struct Input<'a> {
    pub time: NaiveDateTime,
    pub value: &'a Value,
}

pub trait PartialAggregate: Clone + Default {
    /// Empty accumulator
    fn identity() -> Self {
        Self::default()
    }

    fn add(&mut self, input: Input<'_>);

    fn merge(&self, other: &Self) -> Self;

    fn evaluate(&self) -> Value;
}

pub trait SubtractPartialAggregate: PartialAggregate {
    /// Retract an input previously passed to `add`
    fn subtract(&mut self, input: Input<'_>);
}

/// Accumulator for any [`AggregateFunction`]
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateState {
    Count(Count),
    CountDistinct(CountDistinct),
    Sum(Sum),
    Avg(Mean),
    Variance(Variance),
    StdDev(StdDev),
    Min(Min),
    Max(Max),
    First(First),
    Last(Last),
    TimeOfFirst(First),
    TimeOfLast(Last),
    TimeOfNext(First),
    Nth(Nth),
    Median(Median),
    Values(Values),
    AvgDaysBetween(AvgDaysBetween),
}

macro_rules! dispatch {
    ($state:expr, $acc:ident => $body:expr) => {
        match $state {
            AggregateState::Count($acc) => $body,
            AggregateState::CountDistinct($acc) => $body,
            AggregateState::Sum($acc) => $body,
            AggregateState::Avg($acc) => $body,
            AggregateState::Variance($acc) => $body,
            AggregateState::StdDev($acc) => $body,
            AggregateState::Min($acc) => $body,
            AggregateState::Max($acc) => $body,
            AggregateState::First($acc) => $body,
            AggregateState::Last($acc) => $body,
            AggregateState::TimeOfFirst($acc) => $body,
            AggregateState::TimeOfLast($acc) => $body,
            AggregateState::TimeOfNext($acc) => $body,
            AggregateState::Nth($acc) => $body,
            AggregateState::Median($acc) => $body,
            AggregateState::Values($acc) => $body,
            AggregateState::AvgDaysBetween($acc) => $body,
        }
    };
}

impl AggregateState {
    pub fn new(function: AggregateFunction) -> Self {
        match function {
            AggregateFunction::Count => AggregateState::Count(Count::identity()),
            AggregateFunction::CountDistinct => AggregateState::CountDistinct(CountDistinct::identity()),
            AggregateFunction::Sum => AggregateState::Sum(Sum::identity()),
            AggregateFunction::Avg => AggregateState::Avg(Mean::identity()),
            AggregateFunction::Variance => AggregateState::Variance(Variance::identity()),
            AggregateFunction::StdDev => AggregateState::StdDev(StdDev::identity()),
            AggregateFunction::Min => AggregateState::Min(Min::identity()),
            AggregateFunction::Max => AggregateState::Max(Max::identity()),
            AggregateFunction::First => AggregateState::First(First::identity()),
            AggregateFunction::Last => AggregateState::Last(Last::identity()),
            AggregateFunction::TimeOfFirst => AggregateState::TimeOfFirst(First::identity()),
            AggregateFunction::TimeOfLast => AggregateState::TimeOfLast(Last::identity()),
            AggregateFunction::TimeOfNext => AggregateState::TimeOfNext(First::identity()),
            AggregateFunction::Nth(n) => AggregateState::Nth(Nth::new(n)),
            AggregateFunction::Median => AggregateState::Median(Median::identity()),
            AggregateFunction::Values => AggregateState::Values(Values::identity()),
            AggregateFunction::AvgDaysBetween => AggregateState::AvgDaysBetween(AvgDaysBetween::identity()),
        }
    }

    pub fn function(&self) -> AggregateFunction {
        match self {
            AggregateState::Count(_) => AggregateFunction::Count,
            AggregateState::CountDistinct(_) => AggregateFunction::CountDistinct,
            AggregateState::Sum(_) => AggregateFunction::Sum,
            AggregateState::Avg(_) => AggregateFunction::Avg,
            AggregateState::Variance(_) => AggregateFunction::Variance,
            AggregateState::StdDev(_) => AggregateFunction::StdDev,
            AggregateState::Min(_) => AggregateFunction::Min,
            AggregateState::Max(_) => AggregateFunction::Max,
            AggregateState::First(_) => AggregateFunction::First,
            AggregateState::Last(_) => AggregateFunction::Last,
            AggregateState::TimeOfFirst(_) => AggregateFunction::TimeOfFirst,
            AggregateState::TimeOfLast(_) => AggregateFunction::TimeOfLast,
            AggregateState::TimeOfNext(_) => AggregateFunction::TimeOfNext,
            AggregateState::Nth(acc) => AggregateFunction::Nth(acc.n()),
            AggregateState::Median(_) => AggregateFunction::Median,
            AggregateState::Values(_) => AggregateFunction::Values,
            AggregateState::AvgDaysBetween(_) => AggregateFunction::AvgDaysBetween,
        }
    }

    /// Check an input before it reaches an accumulator.
    ///
    /// Returns `false` for null inputs, which every function skips.
    fn accepts(&self, input: &Input<'_>) -> Result<bool> {
        if input.value.is_null() {
            return Ok(false);
        }
        let function = self.function();
        if function.requires_numeric() && !input.value.is_numeric() {
            return Err(RuntimeError::EvaluationError(format!(
                "{} expects a numeric argument, got {}",
                function,
                input.value.type_name()
            )));
        }
        Ok(true)
    }

    pub fn add(&mut self, input: Input<'_>) -> Result<()> {
        if self.accepts(&input)? {
            dispatch!(self, acc => acc.add(input));
        }
        Ok(())
    }

    /// Retract an input; fails for functions without an inverse
    pub fn subtract(&mut self, input: Input<'_>) -> Result<()> {
        if !self.accepts(&input)? {
            return Ok(());
        }
        match self {
            AggregateState::Count(acc) => acc.subtract(input),
            AggregateState::CountDistinct(acc) => acc.subtract(input),
            AggregateState::Sum(acc) => acc.subtract(input),
            AggregateState::Avg(acc) => acc.subtract(input),
            AggregateState::Variance(acc) => acc.subtract(input),
            AggregateState::StdDev(acc) => acc.subtract(input),
            other => {
                return Err(RuntimeError::NotSubtractable {
                    function: other.function().name().to_string(),
                })
            }
        }
        Ok(())
    }

    pub fn merge(&self, other: &Self) -> Result<Self> {
        let merged = match (self, other) {
            (AggregateState::Count(a), AggregateState::Count(b)) => AggregateState::Count(a.merge(b)),
            (AggregateState::CountDistinct(a), AggregateState::CountDistinct(b)) => {
                AggregateState::CountDistinct(a.merge(b))
            }
            (AggregateState::Sum(a), AggregateState::Sum(b)) => AggregateState::Sum(a.merge(b)),
            (AggregateState::Avg(a), AggregateState::Avg(b)) => AggregateState::Avg(a.merge(b)),
            (AggregateState::Variance(a), AggregateState::Variance(b)) => AggregateState::Variance(a.merge(b)),
            (AggregateState::StdDev(a), AggregateState::StdDev(b)) => AggregateState::StdDev(a.merge(b)),
            (AggregateState::Min(a), AggregateState::Min(b)) => AggregateState::Min(a.merge(b)),
            (AggregateState::Max(a), AggregateState::Max(b)) => AggregateState::Max(a.merge(b)),
            (AggregateState::First(a), AggregateState::First(b)) => AggregateState::First(a.merge(b)),
            (AggregateState::Last(a), AggregateState::Last(b)) => AggregateState::Last(a.merge(b)),
            (AggregateState::TimeOfFirst(a), AggregateState::TimeOfFirst(b)) => {
                AggregateState::TimeOfFirst(a.merge(b))
            }
            (AggregateState::TimeOfLast(a), AggregateState::TimeOfLast(b)) => {
                AggregateState::TimeOfLast(a.merge(b))
            }
            (AggregateState::TimeOfNext(a), AggregateState::TimeOfNext(b)) => {
                AggregateState::TimeOfNext(a.merge(b))
            }
            (AggregateState::Nth(a), AggregateState::Nth(b)) if a.n() == b.n() => {
                AggregateState::Nth(a.merge(b))
            }
            (AggregateState::Median(a), AggregateState::Median(b)) => AggregateState::Median(a.merge(b)),
            (AggregateState::Values(a), AggregateState::Values(b)) => AggregateState::Values(a.merge(b)),
            (AggregateState::AvgDaysBetween(a), AggregateState::AvgDaysBetween(b)) => {
                AggregateState::AvgDaysBetween(a.merge(b))
            }
            (a, b) => {
                return Err(RuntimeError::EvaluationError(format!(
                    "Cannot merge {} with {}",
                    a.function(),
                    b.function()
                )))
            }
        };
        Ok(merged)
    }

    pub fn evaluate(&self) -> Value {
        match self {
            AggregateState::TimeOfFirst(acc) => acc.time(),
            AggregateState::TimeOfLast(acc) => acc.time(),
            AggregateState::TimeOfNext(acc) => acc.time(),
            other => dispatch!(other, acc => acc.evaluate()),
        }
    }
}

/// Group key: display form plus kind, so `1` and `"1"` stay apart
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    display: String,
    kind: &'static str,
}

impl GroupKey {
    fn of(value: &Value) -> Self {
        Self {
            display: value.to_string(),
            kind: value.type_name(),
        }
    }
}

/// Per-key accumulators for `group by`.
///
/// Evaluates to a map keyed by the group value's display form. Keys of
/// different kinds sharing a display form are written as `<kind>:<display>`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedState {
    function: AggregateFunction,
    groups: BTreeMap<GroupKey, AggregateState>,
}

impl GroupedState {
    pub fn new(function: AggregateFunction) -> Self {
        Self {
            function,
            groups: BTreeMap::new(),
        }
    }

    /// Null keys are skipped
    pub fn add(&mut self, key: &Value, input: Input<'_>) -> Result<()> {
        if key.is_null() {
            return Ok(());
        }
        let function = self.function;
        self.groups
            .entry(GroupKey::of(key))
            .or_insert_with(|| AggregateState::new(function))
            .add(input)
    }

    pub fn merge(&self, other: &Self) -> Result<Self> {
        let mut merged = self.clone();
        for (key, state) in &other.groups {
            let combined = match merged.groups.get(key) {
                Some(existing) => existing.merge(state)?,
                None => state.clone(),
            };
            merged.groups.insert(key.clone(), combined);
        }
        Ok(merged)
    }

    pub fn evaluate(&self) -> Value {
        let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
        for key in self.groups.keys() {
            *kinds.entry(key.display.as_str()).or_insert(0) += 1;
        }
        Value::Map(
            self.groups
                .iter()
                .map(|(key, state)| {
                    let name = if kinds.get(key.display.as_str()).copied().unwrap_or(0) > 1 {
                        format!("{}:{}", key.kind, key.display)
                    } else {
                        key.display.clone()
                    };
                    (name, state.evaluate())
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronofeat_core::types::parse_datetime;

    fn input(value: &Value) -> Input<'_> {
        Input {
            time: parse_datetime("2020-01-01").unwrap(),
            value,
        }
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(AggregateState::new(AggregateFunction::Count).evaluate(), Value::Int(0));
        assert_eq!(AggregateState::new(AggregateFunction::Avg).evaluate(), Value::Null);
        assert_eq!(AggregateState::new(AggregateFunction::Values).evaluate(), Value::List(vec![]));
    }

    #[test]
    fn test_nulls_skipped() {
        let mut count = AggregateState::new(AggregateFunction::Count);
        count.add(input(&Value::Null)).unwrap();
        count.add(input(&Value::Int(1))).unwrap();
        assert_eq!(count.evaluate(), Value::Int(1));
    }

    #[test]
    fn test_numeric_argument_required() {
        let mut sum = AggregateState::new(AggregateFunction::Sum);
        let err = sum.add(input(&Value::from("x"))).unwrap_err();
        assert!(matches!(err, RuntimeError::EvaluationError(_)));
    }

    #[test]
    fn test_subtract_rejected_for_median() {
        let mut median = AggregateState::new(AggregateFunction::Median);
        median.add(input(&Value::Int(1))).unwrap();
        let err = median.subtract(input(&Value::Int(1))).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::NotSubtractable {
                function: "median".to_string()
            }
        );
    }

    #[test]
    fn test_merge_mismatch() {
        let a = AggregateState::new(AggregateFunction::Sum);
        let b = AggregateState::new(AggregateFunction::Max);
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn test_time_of_first() {
        let mut state = AggregateState::new(AggregateFunction::TimeOfFirst);
        let value = Value::Int(1);
        let time = parse_datetime("2020-01-05").unwrap();
        state.add(Input { time, value: &value }).unwrap();
        assert_eq!(state.evaluate(), Value::DateTime(time));
    }

    #[test]
    fn test_grouped() {
        let mut grouped = GroupedState::new(AggregateFunction::Count);
        for key in ["a", "b", "a"] {
            grouped
                .add(&Value::from(key), input(&Value::Bool(true)))
                .unwrap();
        }
        grouped.add(&Value::Null, input(&Value::Bool(true))).unwrap();

        let other = grouped.clone();
        match grouped.merge(&other).unwrap().evaluate() {
            Value::Map(map) => {
                assert_eq!(map.len(), 2);
                assert_eq!(map.get("a"), Some(&Value::Int(4)));
            }
            other => panic!("Expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_grouped_keys_of_different_kinds() {
        let mut grouped = GroupedState::new(AggregateFunction::Count);
        grouped.add(&Value::Int(1), input(&Value::Bool(true))).unwrap();
        grouped.add(&Value::from("1"), input(&Value::Bool(true))).unwrap();
        grouped.add(&Value::from("2"), input(&Value::Bool(true))).unwrap();

        match grouped.evaluate() {
            Value::Map(map) => {
                assert_eq!(map.len(), 3);
                assert_eq!(map.get("int:1"), Some(&Value::Int(1)));
                assert_eq!(map.get("string:1"), Some(&Value::Int(1)));
                assert_eq!(map.get("2"), Some(&Value::Int(1)));
            }
            other => panic!("Expected map, got {:?}", other),
        }
    }
}
