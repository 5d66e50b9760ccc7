//! chronofeat runtime - event index and query execution
//!
//! This crate holds the runtime side of the feature engine:
//! - the in-memory, time-ordered event index
//! - observation point generation
//! - partial aggregates with incremental and deque-based windows
//! - the query executor, sequential or on a rayon pool

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod obs_dates;
pub mod query;
pub mod storage;

// Re-export main types
pub use aggregate::{AggregateState, GroupedState, MonotonicDeque, PartialAggregate, SubtractPartialAggregate};
pub use config::{EventScopeConfig, QueryConfig};
pub use engine::{EvalContext, ExpressionEvaluator};
pub use error::{Result, RuntimeError};
pub use executor::{DroppedRow, QueryExecutor, QueryResult};
pub use obs_dates::{DatePart, ObservationDateGenerator, ObservationDatesConfig, ObservationPoint};
pub use query::{query, query_compiled};
pub use storage::{EventIndex, EventRange, EventRef};
