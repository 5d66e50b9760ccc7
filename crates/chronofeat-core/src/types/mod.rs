//! Type definitions

pub mod event;
pub mod schema;
pub mod time;
pub mod value;

pub use event::{Entities, EntityId, EntityType, Event, EventId};
pub use schema::{EventSchema, SchemaRegistry, ValueKind};
pub use time::{format_datetime, parse_datetime};
pub use value::Value;
