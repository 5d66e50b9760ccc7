//! Order and time based accumulators
//!
//! These keep whole values or positions and have no inverse; windows over
//! them are rebuilt or served by [`super::MonotonicDeque`].

use super::{Input, PartialAggregate};
use chrono::NaiveDateTime;
use chronofeat_core::Value;
use std::cmp::Ordering;

/// Smallest (`Min`) or largest (`Max`) value by [`Value::compare`]
#[derive(Debug, Clone, PartialEq)]
pub struct Extreme<const MAX: bool> {
    best: Option<Value>,
}

pub type Min = Extreme<false>;
pub type Max = Extreme<true>;

impl<const MAX: bool> Default for Extreme<MAX> {
    fn default() -> Self {
        Self { best: None }
    }
}

impl<const MAX: bool> Extreme<MAX> {
    fn wins(candidate: &Value, current: &Value) -> bool {
        let wanted = if MAX { Ordering::Greater } else { Ordering::Less };
        candidate.compare(current) == Some(wanted)
    }

    fn offer(&mut self, value: &Value) {
        match &self.best {
            Some(current) if !Self::wins(value, current) => {}
            _ => self.best = Some(value.clone()),
        }
    }
}

impl<const MAX: bool> PartialAggregate for Extreme<MAX> {
    fn add(&mut self, input: Input<'_>) {
        self.offer(input.value);
    }

    fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        if let Some(value) = &other.best {
            merged.offer(value);
        }
        merged
    }

    fn evaluate(&self) -> Value {
        self.best.clone().unwrap_or(Value::Null)
    }
}

/// Earliest (`First`) or latest (`Last`) input by time.
///
/// Ties keep the earlier-added input for `First` and the later one for
/// `Last`, matching candidate order.
#[derive(Debug, Clone, PartialEq)]
pub struct Positional<const LAST: bool> {
    held: Option<(NaiveDateTime, Value)>,
}

pub type First = Positional<false>;
pub type Last = Positional<true>;

impl<const LAST: bool> Default for Positional<LAST> {
    fn default() -> Self {
        Self { held: None }
    }
}

impl<const LAST: bool> Positional<LAST> {
    fn offer(&mut self, time: NaiveDateTime, value: &Value) {
        let replace = match &self.held {
            None => true,
            Some((held, _)) if LAST => time >= *held,
            Some((held, _)) => time < *held,
        };
        if replace {
            self.held = Some((time, value.clone()));
        }
    }

    pub fn time(&self) -> Value {
        self.held
            .as_ref()
            .map(|(t, _)| Value::DateTime(*t))
            .unwrap_or(Value::Null)
    }
}

impl<const LAST: bool> PartialAggregate for Positional<LAST> {
    fn add(&mut self, input: Input<'_>) {
        self.offer(input.time, input.value);
    }

    fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        if let Some((time, value)) = &other.held {
            merged.offer(*time, value);
        }
        merged
    }

    fn evaluate(&self) -> Value {
        self.held
            .as_ref()
            .map(|(_, v)| v.clone())
            .unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Median {
    values: Vec<f64>,
}

impl PartialAggregate for Median {
    fn add(&mut self, input: Input<'_>) {
        if let Some(x) = input.value.as_f64() {
            self.values.push(x);
        }
    }

    fn merge(&self, other: &Self) -> Self {
        let mut values = self.values.clone();
        values.extend_from_slice(&other.values);
        Median { values }
    }

    fn evaluate(&self) -> Value {
        if self.values.is_empty() {
            return Value::Null;
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        Value::Float(median)
    }
}

/// Every value, in time order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    items: Vec<(NaiveDateTime, Value)>,
}

impl PartialAggregate for Values {
    fn add(&mut self, input: Input<'_>) {
        self.items.push((input.time, input.value.clone()));
    }

    fn merge(&self, other: &Self) -> Self {
        let mut items = self.items.clone();
        items.extend(other.items.iter().cloned());
        // stable, equal times keep their order
        items.sort_by_key(|(t, _)| *t);
        Values { items }
    }

    fn evaluate(&self) -> Value {
        Value::List(self.items.iter().map(|(_, v)| v.clone()).collect())
    }
}

/// Value at a fixed position in time order.
///
/// `n >= 0` counts from the earliest input (0 is the first), negative `n`
/// from the latest (-1 is the last). Out of range is null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Nth {
    n: i64,
    values: Values,
}

impl Nth {
    pub fn new(n: i64) -> Self {
        Self {
            n,
            values: Values::default(),
        }
    }

    pub fn n(&self) -> i64 {
        self.n
    }
}

impl PartialAggregate for Nth {
    fn add(&mut self, input: Input<'_>) {
        self.values.add(input);
    }

    fn merge(&self, other: &Self) -> Self {
        Nth {
            n: self.n,
            values: self.values.merge(&other.values),
        }
    }

    fn evaluate(&self) -> Value {
        let items = &self.values.items;
        let index = if self.n >= 0 {
            usize::try_from(self.n).ok()
        } else {
            usize::try_from(self.n.unsigned_abs())
                .ok()
                .and_then(|back| items.len().checked_sub(back))
        };
        index
            .and_then(|i| items.get(i))
            .map(|(_, v)| v.clone())
            .unwrap_or(Value::Null)
    }
}

fn combine(
    a: Option<NaiveDateTime>,
    b: Option<NaiveDateTime>,
    pick: fn(NaiveDateTime, NaiveDateTime) -> NaiveDateTime,
) -> Option<NaiveDateTime> {
    match (a, b) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (a, b) => a.or(b),
    }
}

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Mean gap in days between consecutive inputs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvgDaysBetween {
    first: Option<NaiveDateTime>,
    last: Option<NaiveDateTime>,
    n: usize,
}

impl PartialAggregate for AvgDaysBetween {
    fn add(&mut self, input: Input<'_>) {
        self.first = Some(self.first.map_or(input.time, |t| t.min(input.time)));
        self.last = Some(self.last.map_or(input.time, |t| t.max(input.time)));
        self.n += 1;
    }

    fn merge(&self, other: &Self) -> Self {
        AvgDaysBetween {
            first: combine(self.first, other.first, NaiveDateTime::min),
            last: combine(self.last, other.last, NaiveDateTime::max),
            n: self.n + other.n,
        }
    }

    fn evaluate(&self) -> Value {
        match (self.first, self.last) {
            (Some(first), Some(last)) if self.n >= 2 => {
                let span = (last - first).num_milliseconds() as f64 / MILLIS_PER_DAY;
                Value::Float(span / (self.n - 1) as f64)
            }
            _ => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronofeat_core::types::parse_datetime;

    fn at(s: &str) -> NaiveDateTime {
        parse_datetime(s).unwrap()
    }

    #[test]
    fn test_min_max() {
        let mut min = Min::default();
        let mut max = Max::default();
        for v in [Value::Int(3), Value::Float(1.5), Value::Int(7)] {
            let input = Input {
                time: at("2020-01-01"),
                value: &v,
            };
            min.add(input);
            max.add(input);
        }
        assert_eq!(min.evaluate(), Value::Float(1.5));
        assert_eq!(max.evaluate(), Value::Int(7));
    }

    #[test]
    fn test_first_last_ties() {
        let mut first = First::default();
        let mut last = Last::default();
        let t = at("2020-01-01");
        for v in [Value::from("a"), Value::from("b")] {
            first.add(Input { time: t, value: &v });
            last.add(Input { time: t, value: &v });
        }
        assert_eq!(first.evaluate(), Value::from("a"));
        assert_eq!(last.evaluate(), Value::from("b"));
        assert_eq!(last.time(), Value::DateTime(t));
    }

    #[test]
    fn test_median() {
        let mut median = Median::default();
        for v in [Value::Int(5), Value::Int(1), Value::Int(3), Value::Int(4)] {
            median.add(Input {
                time: at("2020-01-01"),
                value: &v,
            });
        }
        assert_eq!(median.evaluate(), Value::Float(3.5));
    }

    #[test]
    fn test_values_merge_in_time_order() {
        let mut early = Values::default();
        let mut late = Values::default();
        late.add(Input {
            time: at("2020-01-03"),
            value: &Value::Int(3),
        });
        early.add(Input {
            time: at("2020-01-01"),
            value: &Value::Int(1),
        });
        assert_eq!(
            late.merge(&early).evaluate(),
            Value::List(vec![Value::Int(1), Value::Int(3)])
        );
    }

    #[test]
    fn test_nth_from_both_ends() {
        let mut second = Nth::new(1);
        let mut last = Nth::new(-1);
        let mut too_far = Nth::new(-4);
        for (day, v) in [("2020-01-01", 10), ("2020-01-02", 20), ("2020-01-03", 30)] {
            let value = Value::Int(v);
            let input = Input {
                time: at(day),
                value: &value,
            };
            second.add(input);
            last.add(input);
            too_far.add(input);
        }
        assert_eq!(second.evaluate(), Value::Int(20));
        assert_eq!(last.evaluate(), Value::Int(30));
        assert_eq!(too_far.evaluate(), Value::Null);
        assert_eq!(Nth::new(3).merge(&Nth::new(3)).evaluate(), Value::Null);
    }

    #[test]
    fn test_avg_days_between() {
        let mut gaps = AvgDaysBetween::default();
        for day in ["2020-01-01", "2020-01-02", "2020-01-05"] {
            gaps.add(Input {
                time: at(day),
                value: &Value::Bool(true),
            });
        }
        assert_eq!(gaps.evaluate(), Value::Float(2.0));
        assert_eq!(AvgDaysBetween::default().evaluate(), Value::Null);
    }
}
