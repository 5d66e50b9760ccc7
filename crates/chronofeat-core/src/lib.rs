//! chronofeat core - shared types for the temporal feature engine
//!
//! This crate provides the fundamental types used across the workspace:
//! - Value types for event attributes and computed features
//! - Events, entity keys and the per-event-type schema registry
//! - AST (Abstract Syntax Tree) of the feature expression language
//! - IR (Intermediate Representation) produced by the compiler
//! - Error types

pub mod ast;
pub mod error;
pub mod ir;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use types::{
    Entities, EntityId, EntityType, Event, EventId, SchemaRegistry, Value, ValueKind,
};
