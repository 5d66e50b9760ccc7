//! Scalar function catalogue

use serde::{Deserialize, Serialize};

/// Scalar functions usable anywhere in an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarFunction {
    // Numeric
    Abs,
    Round,
    Floor,
    Ceil,
    Sqrt,
    Ln,

    // Text
    Lower,
    Upper,
    Length,
    Trim,
    Concat,
    Contains,
    StartsWith,
    EndsWith,
    /// `substr(s, start[, length])`, character based
    Substr,
    Replace,

    // Regular expressions
    RegexMatch,
    /// First match of the pattern, null when there is none
    RegexExtract,
    RegexReplace,
    RegexSplit,
    RegexCount,

    // Dates
    /// Whole days from the second argument to the first
    DateDiff,
    Hour,
    /// `extract(part, datetime)`
    Extract,
    /// `format_date(format, datetime)` with strftime directives
    FormatDate,

    Coalesce,
}

impl ScalarFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name.to_ascii_lowercase().as_str() {
            "abs" => ScalarFunction::Abs,
            "round" => ScalarFunction::Round,
            "floor" => ScalarFunction::Floor,
            "ceil" => ScalarFunction::Ceil,
            "sqrt" => ScalarFunction::Sqrt,
            "ln" => ScalarFunction::Ln,
            "lower" => ScalarFunction::Lower,
            "upper" => ScalarFunction::Upper,
            "length" | "len" => ScalarFunction::Length,
            "trim" => ScalarFunction::Trim,
            "concat" => ScalarFunction::Concat,
            "contains" => ScalarFunction::Contains,
            "starts_with" => ScalarFunction::StartsWith,
            "ends_with" => ScalarFunction::EndsWith,
            "substr" | "substring" => ScalarFunction::Substr,
            "replace" => ScalarFunction::Replace,
            "regex_match" => ScalarFunction::RegexMatch,
            "regex_extract" => ScalarFunction::RegexExtract,
            "regex_replace" => ScalarFunction::RegexReplace,
            "regex_split" => ScalarFunction::RegexSplit,
            "regex_count" => ScalarFunction::RegexCount,
            "date_diff" => ScalarFunction::DateDiff,
            "hour" => ScalarFunction::Hour,
            "extract" | "date_part" => ScalarFunction::Extract,
            "format_date" => ScalarFunction::FormatDate,
            "coalesce" => ScalarFunction::Coalesce,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScalarFunction::Abs => "abs",
            ScalarFunction::Round => "round",
            ScalarFunction::Floor => "floor",
            ScalarFunction::Ceil => "ceil",
            ScalarFunction::Sqrt => "sqrt",
            ScalarFunction::Ln => "ln",
            ScalarFunction::Lower => "lower",
            ScalarFunction::Upper => "upper",
            ScalarFunction::Length => "length",
            ScalarFunction::Trim => "trim",
            ScalarFunction::Concat => "concat",
            ScalarFunction::Contains => "contains",
            ScalarFunction::StartsWith => "starts_with",
            ScalarFunction::EndsWith => "ends_with",
            ScalarFunction::Substr => "substr",
            ScalarFunction::Replace => "replace",
            ScalarFunction::RegexMatch => "regex_match",
            ScalarFunction::RegexExtract => "regex_extract",
            ScalarFunction::RegexReplace => "regex_replace",
            ScalarFunction::RegexSplit => "regex_split",
            ScalarFunction::RegexCount => "regex_count",
            ScalarFunction::DateDiff => "date_diff",
            ScalarFunction::Hour => "hour",
            ScalarFunction::Extract => "extract",
            ScalarFunction::FormatDate => "format_date",
            ScalarFunction::Coalesce => "coalesce",
        }
    }

    /// Accepted argument count as (min, max); `None` max means variadic
    pub fn arity(&self) -> (usize, Option<usize>) {
        match self {
            ScalarFunction::Coalesce => (1, None),
            ScalarFunction::Concat => (2, None),
            ScalarFunction::Substr => (2, Some(3)),
            ScalarFunction::Replace | ScalarFunction::RegexReplace => (3, Some(3)),
            ScalarFunction::Contains
            | ScalarFunction::StartsWith
            | ScalarFunction::EndsWith
            | ScalarFunction::RegexMatch
            | ScalarFunction::RegexExtract
            | ScalarFunction::RegexSplit
            | ScalarFunction::RegexCount
            | ScalarFunction::DateDiff
            | ScalarFunction::Extract
            | ScalarFunction::FormatDate => (2, Some(2)),
            _ => (1, Some(1)),
        }
    }
}
