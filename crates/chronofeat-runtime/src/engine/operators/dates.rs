//! Date functions

use crate::error::{Result, RuntimeError};
use chrono::{Datelike, NaiveDateTime, Timelike};
use chronofeat_core::types::parse_datetime;
use chronofeat_core::Value;
use std::fmt::Write;

/// Datetime view of a value; strings are parsed like `event_time`
pub(crate) fn as_datetime(function: &str, value: &Value) -> Result<NaiveDateTime> {
    match value {
        Value::DateTime(dt) => Ok(*dt),
        Value::String(s) => parse_datetime(s)
            .map_err(|e| RuntimeError::EvaluationError(format!("{}(): {}", function, e))),
        other => Err(RuntimeError::EvaluationError(format!(
            "{}() expects a datetime, got {}",
            function,
            other.type_name()
        ))),
    }
}

/// Whole calendar days from `to` to `from`
pub(crate) fn date_diff(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (from.date() - to.date()).num_days()
}

/// Numeric component of a datetime
pub(crate) fn extract(part: &str, dt: NaiveDateTime) -> Result<i64> {
    let value = match part.to_ascii_lowercase().as_str() {
        "year" => dt.year() as i64,
        "quarter" => ((dt.month() - 1) / 3 + 1) as i64,
        "month" => dt.month() as i64,
        "week" => dt.iso_week().week() as i64,
        "day" => dt.day() as i64,
        "dayofyear" | "day_of_year" => dt.ordinal() as i64,
        // Monday is 1
        "weekday" | "dayofweek" => dt.weekday().number_from_monday() as i64,
        "hour" => dt.hour() as i64,
        "minute" => dt.minute() as i64,
        "second" => dt.second() as i64,
        "millisecond" => (dt.nanosecond() / 1_000_000) as i64,
        other => {
            return Err(RuntimeError::EvaluationError(format!(
                "Invalid date part '{}'",
                other
            )))
        }
    };
    Ok(value)
}

/// strftime-style rendering; unknown directives are an error
pub(crate) fn format(format: &str, dt: NaiveDateTime) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", dt.format(format)).map_err(|_| {
        RuntimeError::EvaluationError(format!("Invalid date format '{}'", format))
    })?;
    Ok(out)
}
