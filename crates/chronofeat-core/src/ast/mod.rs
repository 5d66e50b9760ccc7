//! Abstract Syntax Tree (AST) definitions
//!
//! This module contains the AST node definitions for:
//! - Expressions and aggregate calls
//! - Operators
//! - Time windows
//! - Feature definitions

pub mod expression;
pub mod feature;
pub mod operator;
pub mod window;

pub use expression::{AggregateCall, EntityScope, EventField, Expression, Having, HavingKind};
pub use feature::FeatureDefinition;
pub use operator::{Operator, UnaryOperator};
pub use window::{TimeUnit, Window, WindowBounds};
