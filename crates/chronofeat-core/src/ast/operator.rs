//! Operators of the feature expression language

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    // Comparison operators
    /// Equal (`==` or `=`)
    Eq,
    /// Not equal (`!=`)
    Ne,
    /// Greater than (`>`)
    Gt,
    /// Greater than or equal (`>=`)
    Ge,
    /// Less than (`<`)
    Lt,
    /// Less than or equal (`<=`)
    Le,

    // Arithmetic operators
    Add,
    Sub,
    Mul,
    Div,

    // Logical operators
    And,
    Or,

    /// Membership (`x in ('a', 'b')`)
    In,

    // String operators
    /// Substring or list membership (`name contains 'x'`)
    Contains,
    StartsWith,
    EndsWith,
    /// Regular expression match (`name regex '^a.*'`)
    Regex,
}

impl Operator {
    /// Returns true if this is a comparison operator
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Ne | Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le
        )
    }

    /// Returns true if this is an arithmetic operator
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Operator::Add | Operator::Sub | Operator::Mul | Operator::Div)
    }

    /// Returns true if this is a logical operator
    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }

    /// Returns true if this operator tests a string against a pattern
    pub fn is_string_match(&self) -> bool {
        matches!(
            self,
            Operator::Contains | Operator::StartsWith | Operator::EndsWith | Operator::Regex
        )
    }

    /// Whether the operator yields a boolean
    pub fn is_predicate(&self) -> bool {
        self.is_comparison() || self.is_logical() || self.is_string_match() || *self == Operator::In
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::In => "in",
            Operator::Contains => "contains",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::Regex => "regex",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Logical not
    Not,
    /// Arithmetic negation
    Negate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_classes() {
        assert!(Operator::Le.is_comparison());
        assert!(!Operator::Le.is_arithmetic());
        assert!(Operator::Div.is_arithmetic());
        assert!(Operator::Or.is_logical());
        assert!(Operator::In.is_predicate());
        assert!(!Operator::Add.is_predicate());
        assert!(Operator::Regex.is_string_match());
        assert!(Operator::StartsWith.is_predicate());
        assert!(!Operator::In.is_string_match());
    }

    #[test]
    fn test_operator_display() {
        assert_eq!(Operator::Ge.to_string(), ">=");
        assert_eq!(Operator::And.to_string(), "and");
        assert_eq!(Operator::EndsWith.to_string(), "ends_with");
    }
}
