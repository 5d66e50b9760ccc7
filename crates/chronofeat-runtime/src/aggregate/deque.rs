//! Monotonic deque for sliding-window extremes and positional aggregates
//!
//! Entries carry a sequence number assigned in candidate order. The window
//! only moves forward, so expired entries always leave from the front.

use chrono::NaiveDateTime;
use chronofeat_core::ir::AggregateFunction;
use chronofeat_core::Value;
use std::cmp::Ordering;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retention {
    /// Values strictly increasing from the front
    Min,
    /// Values strictly decreasing from the front
    Max,
    /// Every entry, front is the earliest
    All,
    /// Only the newest entry
    Newest,
}

#[derive(Debug, Clone)]
pub struct MonotonicDeque {
    function: AggregateFunction,
    retention: Retention,
    entries: VecDeque<(u64, NaiveDateTime, Value)>,
}

impl MonotonicDeque {
    /// `None` when the function cannot be maintained this way
    pub fn new(function: AggregateFunction) -> Option<Self> {
        let retention = match function {
            AggregateFunction::Min => Retention::Min,
            AggregateFunction::Max => Retention::Max,
            AggregateFunction::First
            | AggregateFunction::TimeOfFirst
            | AggregateFunction::TimeOfNext => Retention::All,
            AggregateFunction::Last | AggregateFunction::TimeOfLast => Retention::Newest,
            _ => return None,
        };
        Some(Self {
            function,
            retention,
            entries: VecDeque::new(),
        })
    }

    /// Append an entry; `seq` must increase between calls
    pub fn push(&mut self, seq: u64, time: NaiveDateTime, value: Value) {
        match self.retention {
            Retention::Min => self.pop_dominated(&value, Ordering::Less),
            Retention::Max => self.pop_dominated(&value, Ordering::Greater),
            Retention::All => {}
            Retention::Newest => self.entries.clear(),
        }
        self.entries.push_back((seq, time, value));
    }

    /// Drop back entries the new value beats or ties
    fn pop_dominated(&mut self, value: &Value, wanted: Ordering) {
        while let Some((_, _, back)) = self.entries.back() {
            match value.compare(back) {
                Some(ordering) if ordering == wanted || ordering == Ordering::Equal => {
                    self.entries.pop_back();
                }
                _ => break,
            }
        }
    }

    /// Expire entries with sequence numbers below `seq`
    pub fn evict_before(&mut self, seq: u64) {
        while matches!(self.entries.front(), Some((s, _, _)) if *s < seq) {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn evaluate(&self) -> Value {
        let entry = match self.retention {
            Retention::Newest => self.entries.back(),
            _ => self.entries.front(),
        };
        match (entry, self.function) {
            (None, _) => Value::Null,
            (Some((_, time, _)), function) if function.is_time_valued() => Value::DateTime(*time),
            (Some((_, _, value)), _) => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronofeat_core::types::parse_datetime;

    fn t(day: u32) -> NaiveDateTime {
        parse_datetime(&format!("2020-01-{:02}", day)).unwrap()
    }

    #[test]
    fn test_sliding_max() {
        let mut deque = MonotonicDeque::new(AggregateFunction::Max).unwrap();
        for (seq, v) in [3, 1, 2, 5, 4].iter().enumerate() {
            deque.push(seq as u64, t(seq as u32 + 1), Value::Int(*v));
        }
        assert_eq!(deque.evaluate(), Value::Int(5));
        // 5 and 4 remain
        assert_eq!(deque.len(), 2);
        deque.evict_before(4);
        assert_eq!(deque.evaluate(), Value::Int(4));
    }

    #[test]
    fn test_sliding_min_with_eviction() {
        let mut deque = MonotonicDeque::new(AggregateFunction::Min).unwrap();
        deque.push(0, t(1), Value::Int(1));
        deque.push(1, t(2), Value::Int(4));
        deque.push(2, t(3), Value::Int(2));
        deque.evict_before(1);
        assert_eq!(deque.evaluate(), Value::Int(2));
    }

    #[test]
    fn test_first_and_time_of_last() {
        let mut first = MonotonicDeque::new(AggregateFunction::First).unwrap();
        let mut last = MonotonicDeque::new(AggregateFunction::TimeOfLast).unwrap();
        for seq in 0..3u64 {
            first.push(seq, t(seq as u32 + 1), Value::Int(seq as i64));
            last.push(seq, t(seq as u32 + 1), Value::Int(seq as i64));
        }
        first.evict_before(1);
        assert_eq!(first.evaluate(), Value::Int(1));
        assert_eq!(last.evaluate(), Value::DateTime(t(3)));
        last.evict_before(3);
        assert_eq!(last.evaluate(), Value::Null);
    }

    #[test]
    fn test_unsupported_function() {
        assert!(MonotonicDeque::new(AggregateFunction::Median).is_none());
    }
}
