//! Time windows relative to an observation instant
//!
//! A window is resolved against an observation instant into a pair of
//! bounds. Whether an event stamped exactly at the instant belongs to the
//! past side or the future side is decided by `include_events_on_obs_date`;
//! it always belongs to exactly one of them.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Bound;
use std::str::FromStr;

/// Granularity of a fixed-length window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl TimeUnit {
    /// `n` units as a duration, `None` on overflow
    pub fn duration(&self, n: i64) -> Option<Duration> {
        match self {
            TimeUnit::Millisecond => Duration::try_milliseconds(n),
            TimeUnit::Second => Duration::try_seconds(n),
            TimeUnit::Minute => Duration::try_minutes(n),
            TimeUnit::Hour => Duration::try_hours(n),
            TimeUnit::Day => Duration::try_days(n),
            TimeUnit::Week => Duration::try_weeks(n),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TimeUnit::Millisecond => "millisecond",
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    /// Case-insensitive, a trailing plural `s` is accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.strip_suffix('s').unwrap_or(&lower) {
            "millisecond" => Ok(TimeUnit::Millisecond),
            "second" => Ok(TimeUnit::Second),
            "minute" => Ok(TimeUnit::Minute),
            "hour" => Ok(TimeUnit::Hour),
            "day" => Ok(TimeUnit::Day),
            "week" => Ok(TimeUnit::Week),
            _ => Err(format!("unknown time unit '{}'", s)),
        }
    }
}

/// Window specification of an aggregate call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    /// `last N units`
    Last { n: i64, unit: TimeUnit },
    /// `next N units`
    Next { n: i64, unit: TimeUnit },
    /// `past`
    Past,
    /// `future`
    Future,
    /// `all time`
    AllTime,
    /// `ytd`, from the start of the observation's year
    YearToDate,
    /// `mtd`, from the start of the observation's month
    MonthToDate,
}

/// Concrete interval a window resolves to at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub lower: Bound<NaiveDateTime>,
    pub upper: Bound<NaiveDateTime>,
}

impl WindowBounds {
    pub fn unbounded() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    /// Whether `t` lies below the lower bound
    pub fn is_before(&self, t: &NaiveDateTime) -> bool {
        match self.lower {
            Bound::Included(l) => t < &l,
            Bound::Excluded(l) => t <= &l,
            Bound::Unbounded => false,
        }
    }

    /// Whether `t` lies at or below the upper bound
    pub fn reaches(&self, t: &NaiveDateTime) -> bool {
        match self.upper {
            Bound::Included(u) => t <= &u,
            Bound::Excluded(u) => t < &u,
            Bound::Unbounded => true,
        }
    }

    pub fn contains(&self, t: &NaiveDateTime) -> bool {
        !self.is_before(t) && self.reaches(t)
    }
}

impl Window {
    /// True when the window only looks backwards from the instant
    pub fn is_past_looking(&self) -> bool {
        matches!(
            self,
            Window::Last { .. } | Window::Past | Window::YearToDate | Window::MonthToDate
        )
    }

    /// True when the window only looks forward from the instant
    pub fn is_future_looking(&self) -> bool {
        matches!(self, Window::Next { .. } | Window::Future)
    }

    /// Resolve the window at `obs`.
    ///
    /// `include_obs` places events stamped exactly at `obs` on the past side.
    pub fn bounds(&self, obs: NaiveDateTime, include_obs: bool) -> WindowBounds {
        let past_upper = if include_obs {
            Bound::Included(obs)
        } else {
            Bound::Excluded(obs)
        };
        let future_lower = if include_obs {
            Bound::Excluded(obs)
        } else {
            Bound::Included(obs)
        };

        match self {
            Window::Last { n, unit } => {
                let lower = unit
                    .duration(*n)
                    .and_then(|d| obs.checked_sub_signed(d))
                    .map(|start| {
                        if include_obs {
                            Bound::Excluded(start)
                        } else {
                            Bound::Included(start)
                        }
                    })
                    .unwrap_or(Bound::Unbounded);
                WindowBounds {
                    lower,
                    upper: past_upper,
                }
            }
            Window::Next { n, unit } => {
                let upper = unit
                    .duration(*n)
                    .and_then(|d| obs.checked_add_signed(d))
                    .map(|end| {
                        if include_obs {
                            Bound::Included(end)
                        } else {
                            Bound::Excluded(end)
                        }
                    })
                    .unwrap_or(Bound::Unbounded);
                WindowBounds {
                    lower: future_lower,
                    upper,
                }
            }
            Window::Past => WindowBounds {
                lower: Bound::Unbounded,
                upper: past_upper,
            },
            Window::Future => WindowBounds {
                lower: future_lower,
                upper: Bound::Unbounded,
            },
            Window::AllTime => WindowBounds::unbounded(),
            Window::YearToDate => WindowBounds {
                lower: start_of(obs.year(), 1),
                upper: past_upper,
            },
            Window::MonthToDate => WindowBounds {
                lower: start_of(obs.year(), obs.month()),
                upper: past_upper,
            },
        }
    }
}

fn start_of(year: i32, month: u32) -> Bound<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Bound::Included)
        .unwrap_or(Bound::Unbounded)
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::Last { n, unit } => write!(f, "last {} {}", n, unit.name()),
            Window::Next { n, unit } => write!(f, "next {} {}", n, unit.name()),
            Window::Past => write!(f, "past"),
            Window::Future => write!(f, "future"),
            Window::AllTime => write!(f, "all time"),
            Window::YearToDate => write!(f, "ytd"),
            Window::MonthToDate => write!(f, "mtd"),
        }
    }
}
