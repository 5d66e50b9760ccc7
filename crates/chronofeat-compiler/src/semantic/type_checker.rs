//! Type checker
//!
//! Infers operand kinds over compiled expressions and rejects operations
//! that can never succeed. Attribute kinds come from an event schema when
//! one is registered; otherwise attributes are `Unknown` and pass.

use crate::error::{CompileError, Result};
use chronofeat_core::ast::{EventField, Operator, UnaryOperator};
use chronofeat_core::ir::{AggregateFunction, CompiledAggregate, CompiledExpr, CompiledFeature, ScalarFunction};
use chronofeat_core::types::EventSchema;
use chronofeat_core::{Value, ValueKind};
use std::collections::HashMap;
use std::fmt;

/// Type information for expressions
#[derive(Debug, Clone, PartialEq)]
pub enum TypeInfo {
    Number,
    String,
    Boolean,
    DateTime,
    List,
    Map,
    Any,
    Unknown,
}

impl TypeInfo {
    pub fn from_kind(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => TypeInfo::Boolean,
            ValueKind::Int | ValueKind::Float => TypeInfo::Number,
            ValueKind::String => TypeInfo::String,
            ValueKind::DateTime => TypeInfo::DateTime,
            ValueKind::List => TypeInfo::List,
            ValueKind::Map => TypeInfo::Map,
        }
    }

    /// Check if this type is compatible with another type
    pub fn is_compatible_with(&self, other: &TypeInfo) -> bool {
        match (self, other) {
            (TypeInfo::Any, _) | (_, TypeInfo::Any) => true,
            (TypeInfo::Unknown, _) | (_, TypeInfo::Unknown) => true,
            // string literals are coerced to instants at evaluation
            (TypeInfo::DateTime, TypeInfo::String) | (TypeInfo::String, TypeInfo::DateTime) => true,
            (l, r) => l == r,
        }
    }

    /// Check if this type can be used in a numeric operation
    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeInfo::Number | TypeInfo::Any | TypeInfo::Unknown)
    }

    /// Check if this type can be used in a boolean operation
    pub fn is_boolean(&self) -> bool {
        matches!(self, TypeInfo::Boolean | TypeInfo::Any | TypeInfo::Unknown)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TypeInfo::Number => "number",
            TypeInfo::String => "string",
            TypeInfo::Boolean => "boolean",
            TypeInfo::DateTime => "datetime",
            TypeInfo::List => "list",
            TypeInfo::Map => "map",
            TypeInfo::Any => "any",
            TypeInfo::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type checker
#[derive(Debug, Default)]
pub struct TypeChecker {
    /// Type information for known attributes of the candidate event
    field_types: HashMap<String, TypeInfo>,
}

impl TypeChecker {
    /// Create a type checker that knows no attributes
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a type checker for one event type's schema
    pub fn for_schema(schema: &EventSchema) -> Self {
        let mut checker = Self::new();
        for (attribute, kind) in &schema.attributes {
            checker.register_field(attribute.clone(), TypeInfo::from_kind(*kind));
        }
        checker
    }

    /// Register an attribute with its type
    pub fn register_field(&mut self, path: String, type_info: TypeInfo) {
        self.field_types.insert(path, type_info);
    }

    /// Get the type of an attribute
    pub fn get_field_type(&self, path: &str) -> Option<&TypeInfo> {
        self.field_types.get(path)
    }

    /// Check a whole feature and return its output type
    pub fn check_feature(&self, feature: &CompiledFeature) -> Result<TypeInfo> {
        let aggregate_types = feature
            .aggregates
            .iter()
            .map(|aggregate| self.check_aggregate(aggregate))
            .collect::<Result<Vec<_>>>()?;
        self.check_expression(&feature.expr, &aggregate_types)
    }

    /// Check one aggregate slot and return its result type
    pub fn check_aggregate(&self, aggregate: &CompiledAggregate) -> Result<TypeInfo> {
        let argument = self.check_expression(&aggregate.argument, &[])?;
        let function = aggregate.function;

        if function.requires_numeric() && !argument.is_numeric() {
            return Err(CompileError::TypeMismatch {
                context: format!("argument of {}", function),
                expected: "number".to_string(),
                found: argument.to_string(),
            });
        }

        if let Some(filter) = &aggregate.filter {
            let filter_type = self.check_expression(filter, &[])?;
            if !filter_type.is_boolean() {
                return Err(CompileError::TypeMismatch {
                    context: format!("WHERE clause of {}", function),
                    expected: "boolean".to_string(),
                    found: filter_type.to_string(),
                });
            }
        }

        if let Some(having) = &aggregate.having {
            let having_type = self.check_expression(&having.expr, &[])?;
            if matches!(having_type, TypeInfo::List | TypeInfo::Map) {
                return Err(CompileError::TypeMismatch {
                    context: format!("HAVING clause of {}", function),
                    expected: "orderable value".to_string(),
                    found: having_type.to_string(),
                });
            }
        }

        if let Some(group_by) = &aggregate.group_by {
            self.check_expression(group_by, &[])?;
            return Ok(TypeInfo::Map);
        }

        Ok(match function {
            AggregateFunction::Count
            | AggregateFunction::CountDistinct
            | AggregateFunction::Sum
            | AggregateFunction::Avg
            | AggregateFunction::Median
            | AggregateFunction::Variance
            | AggregateFunction::StdDev
            | AggregateFunction::AvgDaysBetween => TypeInfo::Number,
            AggregateFunction::Min
            | AggregateFunction::Max
            | AggregateFunction::First
            | AggregateFunction::Last
            | AggregateFunction::Nth(_) => argument,
            AggregateFunction::Values => TypeInfo::List,
            AggregateFunction::TimeOfFirst
            | AggregateFunction::TimeOfLast
            | AggregateFunction::TimeOfNext => TypeInfo::DateTime,
        })
    }

    /// Infer and validate the type of an expression
    ///
    /// `aggregates` holds the result types of the owning feature's
    /// aggregate slots.
    pub fn check_expression(&self, expr: &CompiledExpr, aggregates: &[TypeInfo]) -> Result<TypeInfo> {
        match expr {
            CompiledExpr::Literal(value) => Ok(Self::infer_literal_type(value)),

            CompiledExpr::Attribute(name) => Ok(self
                .field_types
                .get(name)
                .cloned()
                .unwrap_or(TypeInfo::Unknown)),

            CompiledExpr::SourceAttribute(_) => Ok(TypeInfo::Unknown),

            CompiledExpr::EventField(EventField::Time) | CompiledExpr::ObservationDate => {
                Ok(TypeInfo::DateTime)
            }

            CompiledExpr::EventField(_) | CompiledExpr::EntityRef { .. } => Ok(TypeInfo::String),

            CompiledExpr::Wildcard => Ok(TypeInfo::Any),

            CompiledExpr::List(items) => {
                for item in items {
                    self.check_expression(item, aggregates)?;
                }
                Ok(TypeInfo::List)
            }

            CompiledExpr::Unary { op, operand } => {
                let operand_type = self.check_expression(operand, aggregates)?;
                self.check_unary_operation(op, &operand_type)
            }

            CompiledExpr::Binary { left, op, right } => {
                let left_type = self.check_expression(left, aggregates)?;
                let right_type = self.check_expression(right, aggregates)?;
                self.check_binary_operation(&left_type, op, &right_type)
            }

            CompiledExpr::Function { function, args } => {
                let arg_types = args
                    .iter()
                    .map(|arg| self.check_expression(arg, aggregates))
                    .collect::<Result<Vec<_>>>()?;
                self.check_function(*function, &arg_types)
            }

            CompiledExpr::Aggregate(slot) => {
                Ok(aggregates.get(*slot).cloned().unwrap_or(TypeInfo::Unknown))
            }
        }
    }

    /// Infer the type of a literal value
    fn infer_literal_type(value: &Value) -> TypeInfo {
        match value {
            Value::Null => TypeInfo::Any,
            Value::Bool(_) => TypeInfo::Boolean,
            Value::Int(_) | Value::Float(_) => TypeInfo::Number,
            Value::String(_) => TypeInfo::String,
            Value::DateTime(_) => TypeInfo::DateTime,
            Value::List(_) => TypeInfo::List,
            Value::Map(_) => TypeInfo::Map,
        }
    }

    /// Check if a binary operation is valid for the given types
    fn check_binary_operation(
        &self,
        left: &TypeInfo,
        op: &Operator,
        right: &TypeInfo,
    ) -> Result<TypeInfo> {
        let mismatch = |side: &str, expected: &str, found: &TypeInfo| CompileError::TypeMismatch {
            context: format!("{} operand of '{}'", side, op),
            expected: expected.to_string(),
            found: found.to_string(),
        };

        match op {
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div => {
                if !left.is_numeric() {
                    return Err(mismatch("left", "number", left));
                }
                if !right.is_numeric() {
                    return Err(mismatch("right", "number", right));
                }
                Ok(TypeInfo::Number)
            }

            Operator::Eq | Operator::Ne => Ok(TypeInfo::Boolean),

            Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => {
                if !left.is_compatible_with(right) {
                    return Err(mismatch("right", left.name(), right));
                }
                Ok(TypeInfo::Boolean)
            }

            Operator::And | Operator::Or => {
                if !left.is_boolean() {
                    return Err(mismatch("left", "boolean", left));
                }
                if !right.is_boolean() {
                    return Err(mismatch("right", "boolean", right));
                }
                Ok(TypeInfo::Boolean)
            }

            Operator::In => {
                if !matches!(right, TypeInfo::List | TypeInfo::Unknown | TypeInfo::Any) {
                    return Err(mismatch("right", "list", right));
                }
                Ok(TypeInfo::Boolean)
            }

            Operator::Contains if *left == TypeInfo::List => Ok(TypeInfo::Boolean),

            Operator::Contains | Operator::StartsWith | Operator::EndsWith | Operator::Regex => {
                if !left.is_compatible_with(&TypeInfo::String) {
                    return Err(mismatch("left", "string", left));
                }
                if !right.is_compatible_with(&TypeInfo::String) {
                    return Err(mismatch("right", "string", right));
                }
                Ok(TypeInfo::Boolean)
            }
        }
    }

    /// Check if a unary operation is valid for the given type
    fn check_unary_operation(&self, op: &UnaryOperator, operand: &TypeInfo) -> Result<TypeInfo> {
        match op {
            UnaryOperator::Not if operand.is_boolean() => Ok(TypeInfo::Boolean),
            UnaryOperator::Negate if operand.is_numeric() => Ok(TypeInfo::Number),
            UnaryOperator::Not | UnaryOperator::Negate => Err(CompileError::TypeMismatch {
                context: format!("operand of {:?}", op),
                expected: if matches!(op, UnaryOperator::Not) { "boolean" } else { "number" }.to_string(),
                found: operand.to_string(),
            }),
        }
    }

    fn check_function(&self, function: ScalarFunction, args: &[TypeInfo]) -> Result<TypeInfo> {
        let expect = |expected: TypeInfo| -> Result<()> {
            match args.first() {
                Some(found) if !found.is_compatible_with(&expected) => Err(CompileError::TypeMismatch {
                    context: format!("argument of {}", function.name()),
                    expected: expected.to_string(),
                    found: found.to_string(),
                }),
                _ => Ok(()),
            }
        };

        match function {
            ScalarFunction::Abs
            | ScalarFunction::Round
            | ScalarFunction::Floor
            | ScalarFunction::Ceil
            | ScalarFunction::Sqrt
            | ScalarFunction::Ln => {
                expect(TypeInfo::Number)?;
                Ok(TypeInfo::Number)
            }
            ScalarFunction::Lower
            | ScalarFunction::Upper
            | ScalarFunction::Trim
            | ScalarFunction::Substr
            | ScalarFunction::Replace
            | ScalarFunction::RegexExtract
            | ScalarFunction::RegexReplace
            | ScalarFunction::FormatDate => {
                expect(TypeInfo::String)?;
                Ok(TypeInfo::String)
            }
            ScalarFunction::Concat => Ok(TypeInfo::String),
            ScalarFunction::StartsWith | ScalarFunction::EndsWith | ScalarFunction::RegexMatch => {
                expect(TypeInfo::String)?;
                Ok(TypeInfo::Boolean)
            }
            // also list membership
            ScalarFunction::Contains => Ok(TypeInfo::Boolean),
            ScalarFunction::RegexSplit => {
                expect(TypeInfo::String)?;
                Ok(TypeInfo::List)
            }
            ScalarFunction::RegexCount | ScalarFunction::Extract => {
                expect(TypeInfo::String)?;
                Ok(TypeInfo::Number)
            }
            ScalarFunction::DateDiff | ScalarFunction::Hour => {
                expect(TypeInfo::DateTime)?;
                Ok(TypeInfo::Number)
            }
            ScalarFunction::Length => Ok(TypeInfo::Number),
            ScalarFunction::Coalesce => Ok(args
                .iter()
                .find(|t| !matches!(t, TypeInfo::Any | TypeInfo::Unknown))
                .cloned()
                .unwrap_or(TypeInfo::Unknown)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronofeat_core::ast::Window;

    fn attr(name: &str) -> CompiledExpr {
        CompiledExpr::Attribute(name.to_string())
    }

    fn lit(value: impl Into<Value>) -> CompiledExpr {
        CompiledExpr::Literal(value.into())
    }

    fn binary(left: CompiledExpr, op: Operator, right: CompiledExpr) -> CompiledExpr {
        CompiledExpr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    fn aggregate(function: AggregateFunction, argument: CompiledExpr) -> CompiledAggregate {
        CompiledAggregate {
            function,
            argument,
            window: Window::Past,
            filter: None,
            group_by: None,
            having: None,
            event_types: None,
        }
    }

    fn weather_checker() -> TypeChecker {
        TypeChecker::for_schema(
            &EventSchema::new()
                .with_attribute("MaxTemp", ValueKind::Float)
                .with_attribute("RainToday", ValueKind::String),
        )
    }

    #[test]
    fn test_unknown_attributes_pass() {
        let checker = TypeChecker::new();
        let result = checker.check_expression(&binary(attr("x"), Operator::Add, lit(1i64)), &[]);
        assert_eq!(result, Ok(TypeInfo::Number));
    }

    #[test]
    fn test_literal_arithmetic_mismatch() {
        let checker = TypeChecker::new();
        let result = checker.check_expression(&binary(lit("a"), Operator::Mul, lit(2i64)), &[]);
        assert!(matches!(result, Err(CompileError::TypeMismatch { .. })));
    }

    #[test]
    fn test_numeric_aggregate_over_string_attribute() {
        let checker = weather_checker();
        let err = checker
            .check_aggregate(&aggregate(AggregateFunction::Avg, attr("RainToday")))
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::TypeMismatch {
                context: "argument of avg".to_string(),
                expected: "number".to_string(),
                found: "string".to_string(),
            }
        );
    }

    #[test]
    fn test_min_keeps_argument_type() {
        let checker = weather_checker();
        let result = checker.check_aggregate(&aggregate(AggregateFunction::Min, attr("RainToday")));
        assert_eq!(result, Ok(TypeInfo::String));
    }

    #[test]
    fn test_group_by_yields_map() {
        let checker = weather_checker();
        let mut grouped = aggregate(AggregateFunction::Count, CompiledExpr::Wildcard);
        grouped.group_by = Some(attr("RainToday"));
        assert_eq!(checker.check_aggregate(&grouped), Ok(TypeInfo::Map));
    }

    #[test]
    fn test_filter_must_be_boolean() {
        let checker = weather_checker();
        let mut filtered = aggregate(AggregateFunction::Count, CompiledExpr::Wildcard);
        filtered.filter = Some(attr("MaxTemp"));
        assert!(checker.check_aggregate(&filtered).is_err());
    }

    #[test]
    fn test_ordering_datetime_against_string_allowed() {
        let checker = TypeChecker::new();
        let expr = binary(
            CompiledExpr::EventField(EventField::Time),
            Operator::Gt,
            lit("2020-01-01"),
        );
        assert_eq!(checker.check_expression(&expr, &[]), Ok(TypeInfo::Boolean));
    }

    #[test]
    fn test_string_operators() {
        let checker = weather_checker();
        let expr = binary(attr("RainToday"), Operator::StartsWith, lit("Y"));
        assert_eq!(checker.check_expression(&expr, &[]), Ok(TypeInfo::Boolean));

        let expr = binary(attr("MaxTemp"), Operator::Regex, lit("^3"));
        assert!(checker.check_expression(&expr, &[]).is_err());
    }

    #[test]
    fn test_nth_and_time_of_next_types() {
        let checker = weather_checker();
        let nth = checker.check_aggregate(&aggregate(AggregateFunction::Nth(1), attr("MaxTemp")));
        assert_eq!(nth, Ok(TypeInfo::Number));
        let next = checker.check_aggregate(&aggregate(AggregateFunction::TimeOfNext, attr("MaxTemp")));
        assert_eq!(next, Ok(TypeInfo::DateTime));
    }

    #[test]
    fn test_scalar_function_types() {
        let checker = weather_checker();
        let call = |function: ScalarFunction, args: Vec<CompiledExpr>| {
            checker.check_expression(&CompiledExpr::Function { function, args }, &[])
        };
        assert_eq!(call(ScalarFunction::RegexCount, vec![attr("RainToday"), lit("s")]), Ok(TypeInfo::Number));
        assert_eq!(call(ScalarFunction::RegexSplit, vec![attr("RainToday"), lit(",")]), Ok(TypeInfo::List));
        assert_eq!(
            call(ScalarFunction::Hour, vec![CompiledExpr::EventField(EventField::Time)]),
            Ok(TypeInfo::Number)
        );
        assert!(call(ScalarFunction::Trim, vec![attr("MaxTemp")]).is_err());
        assert!(call(ScalarFunction::DateDiff, vec![attr("MaxTemp"), lit("2020-01-01")]).is_err());
    }

    #[test]
    fn test_ordering_string_against_number_rejected() {
        let checker = weather_checker();
        let expr = binary(attr("RainToday"), Operator::Gt, lit(3i64));
        assert!(checker.check_expression(&expr, &[]).is_err());
    }
}
