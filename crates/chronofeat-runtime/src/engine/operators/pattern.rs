//! Regular expression functions and the `regex` operator
//!
//! Patterns are compiled once per distinct pattern string and shared by
//! every worker thread.

use crate::error::{Result, RuntimeError};
use chronofeat_core::Value;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;

/// Compiled patterns are dropped wholesale past this many entries
const MAX_CACHED_PATTERNS: usize = 1024;

static PATTERNS: Lazy<DashMap<String, Regex>> = Lazy::new(DashMap::new);

/// Compiled form of `pattern`
pub(crate) fn compiled(pattern: &str) -> Result<Regex> {
    if let Some(regex) = PATTERNS.get(pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(pattern).map_err(|e| {
        RuntimeError::EvaluationError(format!("Invalid regex pattern '{}': {}", pattern, e))
    })?;
    if PATTERNS.len() >= MAX_CACHED_PATTERNS {
        tracing::debug!("Regex cache full, clearing {} patterns", PATTERNS.len());
        PATTERNS.clear();
    }
    PATTERNS.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

pub(crate) fn is_match(text: &str, pattern: &str) -> Result<bool> {
    Ok(compiled(pattern)?.is_match(text))
}

/// First match, `Null` when the pattern does not occur
pub(crate) fn extract(text: &str, pattern: &str) -> Result<Value> {
    Ok(compiled(pattern)?
        .find(text)
        .map(|m| Value::String(m.as_str().to_string()))
        .unwrap_or(Value::Null))
}

/// Replace every match; `$1`-style group references are expanded
pub(crate) fn replace_all(text: &str, pattern: &str, replacement: &str) -> Result<String> {
    Ok(compiled(pattern)?.replace_all(text, replacement).into_owned())
}

pub(crate) fn split(text: &str, pattern: &str) -> Result<Value> {
    Ok(Value::List(
        compiled(pattern)?
            .split(text)
            .map(|part| Value::String(part.to_string()))
            .collect(),
    ))
}

/// Number of non-overlapping matches
pub(crate) fn count(text: &str, pattern: &str) -> Result<i64> {
    Ok(compiled(pattern)?.find_iter(text).count() as i64)
}
