//! Chronofeat SDK
//!
//! High-level async API: build an engine, ingest events, run feature queries.

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod request;

// Re-export main types
pub use builder::FeatureEngineBuilder;
pub use config::EngineConfig;
pub use engine::FeatureEngine;
pub use error::{Result, SdkError};
pub use request::QueryRequest;

// Re-export commonly used types from dependencies
pub use chronofeat_core::{Entities, Event, Value, ValueKind};
pub use chronofeat_runtime::{
    DatePart, DroppedRow, EventScopeConfig, ObservationDatesConfig, ObservationPoint, QueryConfig,
    QueryResult,
};
