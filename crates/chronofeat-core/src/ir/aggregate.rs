//! Aggregate function catalogue

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate functions usable in `FUNC(expr) OVER window`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    /// Count of events (`count(*)`) or of non-null values
    Count,

    /// Count of distinct non-null values
    CountDistinct,

    /// Sum of values
    Sum,

    /// Average of values
    Avg,

    /// Minimum value
    Min,

    /// Maximum value
    Max,

    /// Value of the earliest event in the window
    First,

    /// Value of the latest event in the window
    Last,

    /// Median of values
    Median,

    /// Sample variance
    Variance,

    /// Sample standard deviation
    StdDev,

    /// All values in time order
    Values,

    /// Time of the earliest event with a non-null value
    TimeOfFirst,

    /// Time of the latest event with a non-null value
    TimeOfLast,

    /// Time of the earliest event with a non-null value in a forward window
    TimeOfNext,

    /// Value at a position in time order: `n >= 0` counts from the
    /// earliest, `-1` is the latest
    Nth(i64),

    /// Mean gap in days between consecutive events
    AvgDaysBetween,
}

impl AggregateFunction {
    /// Every function that takes no parameter
    pub const ALL: [AggregateFunction; 16] = [
        AggregateFunction::Count,
        AggregateFunction::CountDistinct,
        AggregateFunction::Sum,
        AggregateFunction::Avg,
        AggregateFunction::Min,
        AggregateFunction::Max,
        AggregateFunction::First,
        AggregateFunction::Last,
        AggregateFunction::Median,
        AggregateFunction::Variance,
        AggregateFunction::StdDev,
        AggregateFunction::Values,
        AggregateFunction::TimeOfFirst,
        AggregateFunction::TimeOfLast,
        AggregateFunction::TimeOfNext,
        AggregateFunction::AvgDaysBetween,
    ];

    /// Look up a function by its DSL name (case-insensitive).
    ///
    /// `nth` needs its position and is built with [`AggregateFunction::Nth`].
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        let function = match name.as_str() {
            "count" => AggregateFunction::Count,
            "count_distinct" => AggregateFunction::CountDistinct,
            "sum" => AggregateFunction::Sum,
            "avg" | "mean" => AggregateFunction::Avg,
            "min" => AggregateFunction::Min,
            "max" => AggregateFunction::Max,
            "first" => AggregateFunction::First,
            "last" => AggregateFunction::Last,
            "median" => AggregateFunction::Median,
            "var" | "variance" => AggregateFunction::Variance,
            "stdev" | "stddev" => AggregateFunction::StdDev,
            "values" => AggregateFunction::Values,
            "time_of_first" => AggregateFunction::TimeOfFirst,
            "time_of_last" => AggregateFunction::TimeOfLast,
            "time_of_next" => AggregateFunction::TimeOfNext,
            "avg_days_between" | "avg_time_between" => AggregateFunction::AvgDaysBetween,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::CountDistinct => "count_distinct",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::First => "first",
            AggregateFunction::Last => "last",
            AggregateFunction::Median => "median",
            AggregateFunction::Variance => "var",
            AggregateFunction::StdDev => "stdev",
            AggregateFunction::Values => "values",
            AggregateFunction::TimeOfFirst => "time_of_first",
            AggregateFunction::TimeOfLast => "time_of_last",
            AggregateFunction::TimeOfNext => "time_of_next",
            AggregateFunction::Nth(_) => "nth",
            AggregateFunction::AvgDaysBetween => "avg_days_between",
        }
    }

    /// Whether the DSL name takes a second, positional parameter
    pub fn takes_parameter(name: &str) -> bool {
        name.eq_ignore_ascii_case("nth")
    }

    /// Whether the result is the time of an event rather than a value
    pub fn is_time_valued(&self) -> bool {
        matches!(
            self,
            AggregateFunction::TimeOfFirst
                | AggregateFunction::TimeOfLast
                | AggregateFunction::TimeOfNext
        )
    }

    /// Whether the accumulator has a genuine inverse for removing one input
    pub fn is_subtractable(&self) -> bool {
        matches!(
            self,
            AggregateFunction::Count
                | AggregateFunction::CountDistinct
                | AggregateFunction::Sum
                | AggregateFunction::Avg
                | AggregateFunction::Variance
                | AggregateFunction::StdDev
        )
    }

    /// Whether a monotonic deque can maintain the result under a window
    /// whose edges only move forward
    pub fn supports_deque(&self) -> bool {
        matches!(
            self,
            AggregateFunction::Min
                | AggregateFunction::Max
                | AggregateFunction::First
                | AggregateFunction::Last
                | AggregateFunction::TimeOfFirst
                | AggregateFunction::TimeOfLast
                | AggregateFunction::TimeOfNext
        )
    }

    /// Whether the function only accepts numeric inputs
    pub fn requires_numeric(&self) -> bool {
        matches!(
            self,
            AggregateFunction::Sum
                | AggregateFunction::Avg
                | AggregateFunction::Median
                | AggregateFunction::Variance
                | AggregateFunction::StdDev
        )
    }

    pub fn accepts_wildcard(&self) -> bool {
        matches!(self, AggregateFunction::Count)
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateFunction::Nth(n) => write!(f, "nth({})", n),
            other => f.write_str(other.name()),
        }
    }
}
