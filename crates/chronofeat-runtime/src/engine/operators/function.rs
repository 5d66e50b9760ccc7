//! Scalar function execution

use super::{dates, pattern};
use crate::error::{Result, RuntimeError};
use chronofeat_core::ir::ScalarFunction;
use chronofeat_core::Value;

/// Apply a scalar function to evaluated arguments.
///
/// Null in is null out, except for `coalesce` which picks the first
/// non-null argument.
pub(crate) fn execute_function(function: &ScalarFunction, args: &[Value]) -> Result<Value> {
    if let ScalarFunction::Coalesce = function {
        return Ok(args
            .iter()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(Value::Null));
    }

    let (min, max) = function.arity();
    if args.len() < min || max.map_or(false, |max| args.len() > max) {
        return Err(RuntimeError::EvaluationError(format!(
            "{}() cannot take {} argument(s)",
            function.name(),
            args.len()
        )));
    }
    if args.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }
    let arg = &args[0];

    match function {
        ScalarFunction::Abs => match arg {
            Value::Int(i) => Ok(i.checked_abs().map(Value::Int).unwrap_or(Value::Null)),
            other => numeric(function, other, f64::abs),
        },
        ScalarFunction::Round => integral(function, arg, f64::round),
        ScalarFunction::Floor => integral(function, arg, f64::floor),
        ScalarFunction::Ceil => integral(function, arg, f64::ceil),
        ScalarFunction::Sqrt => numeric(function, arg, f64::sqrt),
        ScalarFunction::Ln => numeric(function, arg, f64::ln),
        ScalarFunction::Lower => text(function, arg, str::to_lowercase),
        ScalarFunction::Upper => text(function, arg, str::to_uppercase),
        ScalarFunction::Trim => text(function, arg, |s| s.trim().to_string()),
        ScalarFunction::Length => match arg {
            Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
            Value::List(items) => Ok(Value::Int(items.len() as i64)),
            Value::Map(map) => Ok(Value::Int(map.len() as i64)),
            other => Err(wrong_type(function, other)),
        },
        ScalarFunction::Concat => {
            let parts = args
                .iter()
                .map(|arg| string(function, arg))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::String(parts.concat()))
        }
        ScalarFunction::Contains => match (arg, &args[1]) {
            (Value::List(items), needle) => {
                Ok(Value::Bool(items.iter().any(|item| item.loosely_equals(needle))))
            }
            (haystack, needle) => Ok(Value::Bool(
                string(function, haystack)?.contains(string(function, needle)?),
            )),
        },
        ScalarFunction::StartsWith => Ok(Value::Bool(
            string(function, arg)?.starts_with(string(function, &args[1])?),
        )),
        ScalarFunction::EndsWith => Ok(Value::Bool(
            string(function, arg)?.ends_with(string(function, &args[1])?),
        )),
        ScalarFunction::Substr => substr(function, args),
        ScalarFunction::Replace => Ok(Value::String(string(function, arg)?.replace(
            string(function, &args[1])?,
            string(function, &args[2])?,
        ))),
        ScalarFunction::RegexMatch => Ok(Value::Bool(pattern::is_match(
            string(function, arg)?,
            string(function, &args[1])?,
        )?)),
        ScalarFunction::RegexExtract => {
            pattern::extract(string(function, arg)?, string(function, &args[1])?)
        }
        ScalarFunction::RegexReplace => Ok(Value::String(pattern::replace_all(
            string(function, arg)?,
            string(function, &args[1])?,
            string(function, &args[2])?,
        )?)),
        ScalarFunction::RegexSplit => {
            pattern::split(string(function, arg)?, string(function, &args[1])?)
        }
        ScalarFunction::RegexCount => Ok(Value::Int(pattern::count(
            string(function, arg)?,
            string(function, &args[1])?,
        )?)),
        ScalarFunction::DateDiff => {
            let from = dates::as_datetime(function.name(), arg)?;
            let to = dates::as_datetime(function.name(), &args[1])?;
            Ok(Value::Int(dates::date_diff(from, to)))
        }
        ScalarFunction::Hour => {
            let dt = dates::as_datetime(function.name(), arg)?;
            Ok(Value::Int(dates::extract("hour", dt)?))
        }
        ScalarFunction::Extract => {
            let dt = dates::as_datetime(function.name(), &args[1])?;
            Ok(Value::Int(dates::extract(string(function, arg)?, dt)?))
        }
        ScalarFunction::FormatDate => {
            let dt = dates::as_datetime(function.name(), &args[1])?;
            Ok(Value::String(dates::format(string(function, arg)?, dt)?))
        }
        ScalarFunction::Coalesce => Ok(arg.clone()),
    }
}

fn numeric(function: &ScalarFunction, arg: &Value, f: fn(f64) -> f64) -> Result<Value> {
    let x = arg.as_f64().ok_or_else(|| wrong_type(function, arg))?;
    let y = f(x);
    if y.is_nan() {
        Ok(Value::Null)
    } else {
        Ok(Value::Float(y))
    }
}

/// Rounding functions keep integers as they are
fn integral(function: &ScalarFunction, arg: &Value, f: fn(f64) -> f64) -> Result<Value> {
    match arg {
        Value::Int(i) => Ok(Value::Int(*i)),
        other => numeric(function, other, f),
    }
}

fn text(function: &ScalarFunction, arg: &Value, f: fn(&str) -> String) -> Result<Value> {
    Ok(Value::String(f(string(function, arg)?)))
}

fn string<'v>(function: &ScalarFunction, arg: &'v Value) -> Result<&'v str> {
    arg.as_str().ok_or_else(|| wrong_type(function, arg))
}

fn integer(function: &ScalarFunction, arg: &Value) -> Result<i64> {
    match arg {
        Value::Int(i) => Ok(*i),
        other => Err(wrong_type(function, other)),
    }
}

/// `substr(s, start[, length])` over characters, `start` counted from 0.
///
/// A range reaching past the end of the string is an error.
fn substr(function: &ScalarFunction, args: &[Value]) -> Result<Value> {
    let s = string(function, &args[0])?;
    let start = integer(function, &args[1])?;
    let total = s.chars().count() as i64;
    let length = match args.get(2) {
        Some(length) => integer(function, length)?,
        None => total - start,
    };
    let in_bounds = start >= 0 && length >= 0 && start.checked_add(length).map_or(false, |end| end <= total);
    if !in_bounds {
        return Err(RuntimeError::EvaluationError(format!(
            "substr({}, {}) out of bounds for a string of {} characters",
            start, length, total
        )));
    }
    Ok(Value::String(
        s.chars().skip(start as usize).take(length as usize).collect(),
    ))
}

fn wrong_type(function: &ScalarFunction, arg: &Value) -> RuntimeError {
    RuntimeError::EvaluationError(format!(
        "{}() does not accept {}",
        function.name(),
        arg.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(function: ScalarFunction, args: &[Value]) -> Result<Value> {
        execute_function(&function, args)
    }

    fn s(text: &str) -> Value {
        Value::String(text.to_string())
    }

    #[test]
    fn test_rounding() {
        assert_eq!(
            execute_function(&ScalarFunction::Round, &[Value::Float(2.6)]).unwrap(),
            Value::Float(3.0)
        );
        assert_eq!(
            execute_function(&ScalarFunction::Floor, &[Value::Int(5)]).unwrap(),
            Value::Int(5)
        );
    }

    #[test]
    fn test_invalid_domain_is_null() {
        assert_eq!(
            execute_function(&ScalarFunction::Sqrt, &[Value::Int(-1)]).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            execute_function(&ScalarFunction::Upper, &[Value::String("ab".into())]).unwrap(),
            Value::String("AB".into())
        );
        assert_eq!(
            execute_function(&ScalarFunction::Length, &[Value::String("héllo".into())]).unwrap(),
            Value::Int(5)
        );
        assert!(execute_function(&ScalarFunction::Lower, &[Value::Int(1)]).is_err());
    }

    #[test]
    fn test_coalesce() {
        let args = [Value::Null, Value::Int(2), Value::Int(3)];
        assert_eq!(
            execute_function(&ScalarFunction::Coalesce, &args).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            execute_function(&ScalarFunction::Coalesce, &[Value::Null]).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_text_functions() {
        assert_eq!(call(ScalarFunction::Trim, &[s("  x y ")]).unwrap(), s("x y"));
        assert_eq!(call(ScalarFunction::Concat, &[s("a"), s("b"), s("c")]).unwrap(), s("abc"));
        assert_eq!(
            call(ScalarFunction::Replace, &[s("a.b.c"), s("."), s("/")]).unwrap(),
            s("a/b/c")
        );
        assert_eq!(
            call(ScalarFunction::StartsWith, &[s("Sydney"), s("Syd")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call(ScalarFunction::EndsWith, &[s("Sydney"), s("Syd")]).unwrap(),
            Value::Bool(false)
        );
        assert!(call(ScalarFunction::Concat, &[s("a"), Value::Int(1)]).is_err());
    }

    #[test]
    fn test_contains_string_and_list() {
        assert_eq!(
            call(ScalarFunction::Contains, &[s("Melbourne"), s("bour")]).unwrap(),
            Value::Bool(true)
        );
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(
            call(ScalarFunction::Contains, &[list, Value::Float(2.0)]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_substr() {
        assert_eq!(call(ScalarFunction::Substr, &[s("héllo"), Value::Int(1), Value::Int(3)]).unwrap(), s("éll"));
        assert_eq!(call(ScalarFunction::Substr, &[s("hello"), Value::Int(2)]).unwrap(), s("llo"));
        assert!(call(ScalarFunction::Substr, &[s("hi"), Value::Int(1), Value::Int(5)]).is_err());
        assert!(call(ScalarFunction::Substr, &[s("hi"), Value::Int(-1)]).is_err());
    }

    #[test]
    fn test_regex_functions() {
        assert_eq!(
            call(ScalarFunction::RegexMatch, &[s("A-17"), s(r"^[A-Z]-\d+$")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(call(ScalarFunction::RegexExtract, &[s("v=12;"), s(r"\d+")]).unwrap(), s("12"));
        assert_eq!(call(ScalarFunction::RegexCount, &[s("a,b,,c"), s(",")]).unwrap(), Value::Int(3));
        assert_eq!(
            call(ScalarFunction::RegexReplace, &[s("2020-01-02"), s("-"), s("")]).unwrap(),
            s("20200102")
        );
        assert_eq!(
            call(ScalarFunction::RegexSplit, &[s("a1b"), s(r"\d")]).unwrap(),
            Value::List(vec![s("a"), s("b")])
        );
    }

    #[test]
    fn test_date_functions() {
        let dt = Value::DateTime(chronofeat_core::types::parse_datetime("2020-03-04 18:30").unwrap());
        assert_eq!(call(ScalarFunction::Hour, &[dt.clone()]).unwrap(), Value::Int(18));
        assert_eq!(call(ScalarFunction::Extract, &[s("month"), dt.clone()]).unwrap(), Value::Int(3));
        assert_eq!(
            call(ScalarFunction::FormatDate, &[s("%d.%m.%Y"), dt.clone()]).unwrap(),
            s("04.03.2020")
        );
        assert_eq!(
            call(ScalarFunction::DateDiff, &[dt, s("2020-03-01")]).unwrap(),
            Value::Int(3)
        );
    }

    #[test]
    fn test_null_argument_yields_null() {
        assert_eq!(call(ScalarFunction::Concat, &[s("a"), Value::Null]).unwrap(), Value::Null);
        assert_eq!(call(ScalarFunction::RegexMatch, &[Value::Null, s("x")]).unwrap(), Value::Null);
    }

    #[test]
    fn test_arity_checked() {
        assert!(call(ScalarFunction::Replace, &[s("a"), s("b")]).is_err());
    }
}
