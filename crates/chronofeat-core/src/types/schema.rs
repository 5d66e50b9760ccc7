//! Per-event-type attribute schemas
//!
//! The registry records, for every event type, the kind of value each
//! attribute has carried so far. Kinds are learned on ingestion; an
//! incoming value must agree with the recorded kind, except that an
//! integer attribute may widen to float.

use super::event::Event;
use super::value::Value;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Declared kind of an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    String,
    DateTime,
    List,
    Map,
}

impl ValueKind {
    /// Kind of a concrete value; null has no kind
    pub fn of(value: &Value) -> Option<ValueKind> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Int(_) => Some(ValueKind::Int),
            Value::Float(_) => Some(ValueKind::Float),
            Value::String(_) => Some(ValueKind::String),
            Value::DateTime(_) => Some(ValueKind::DateTime),
            Value::List(_) => Some(ValueKind::List),
            Value::Map(_) => Some(ValueKind::Map),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::DateTime => "datetime",
            ValueKind::List => "list",
            ValueKind::Map => "map",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueKind::Int | ValueKind::Float)
    }

    /// Kind after observing `incoming` on an attribute recorded as `self`.
    ///
    /// Returns `None` when the two kinds conflict.
    pub fn unify(self, incoming: ValueKind) -> Option<ValueKind> {
        match (self, incoming) {
            (a, b) if a == b => Some(a),
            (ValueKind::Int, ValueKind::Float) | (ValueKind::Float, ValueKind::Int) => {
                Some(ValueKind::Float)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Attribute kinds of one event type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSchema {
    pub attributes: BTreeMap<String, ValueKind>,
}

impl EventSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.attributes.insert(name.into(), kind);
        self
    }

    pub fn get(&self, attribute: &str) -> Option<ValueKind> {
        self.attributes.get(attribute).copied()
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.attributes.contains_key(attribute)
    }
}

/// Schemas of all event types seen so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaRegistry {
    event_types: BTreeMap<String, EventSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an attribute up front, before any event arrives
    pub fn declare(
        &mut self,
        event_type: impl Into<String>,
        attribute: impl Into<String>,
        kind: ValueKind,
    ) {
        self.event_types
            .entry(event_type.into())
            .or_default()
            .attributes
            .insert(attribute.into(), kind);
    }

    pub fn get(&self, event_type: &str) -> Option<&EventSchema> {
        self.event_types.get(event_type)
    }

    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.event_types.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.event_types.is_empty()
    }

    /// Validate an event against the recorded kinds without changing anything.
    ///
    /// Returns the attribute kinds that would be recorded if the event were
    /// accepted.
    pub fn check(&self, event: &Event) -> Result<Vec<(String, ValueKind)>> {
        let schema = self.event_types.get(&event.event_type);
        let mut updates = Vec::new();

        for (attribute, value) in &event.attrs {
            let Some(incoming) = ValueKind::of(value) else {
                continue;
            };
            if let Value::List(items) = value {
                if let Some(bad) = items.iter().find(|v| matches!(v, Value::List(_) | Value::Map(_))) {
                    return Err(CoreError::TypeError(format!(
                        "list attribute '{}' may only hold scalars, found {}",
                        attribute,
                        bad.type_name()
                    )));
                }
            }

            match schema.and_then(|s| s.get(attribute)) {
                None => updates.push((attribute.clone(), incoming)),
                Some(recorded) => match recorded.unify(incoming) {
                    Some(unified) if unified == recorded => {}
                    Some(unified) => updates.push((attribute.clone(), unified)),
                    None => {
                        return Err(CoreError::SchemaMismatch {
                            event_type: event.event_type.clone(),
                            attribute: attribute.clone(),
                            expected: recorded.to_string(),
                            actual: incoming.to_string(),
                        })
                    }
                },
            }
        }

        Ok(updates)
    }

    /// Validate and record the attribute kinds of an event.
    ///
    /// Either every attribute is accepted and recorded, or nothing changes.
    pub fn observe(&mut self, event: &Event) -> Result<()> {
        let updates = self.check(event)?;
        let schema = self.event_types.entry(event.event_type.clone()).or_default();
        for (attribute, kind) in updates {
            if let Some(previous) = schema.attributes.insert(attribute.clone(), kind) {
                log::debug!(
                    "widened {}.{} from {} to {}",
                    event.event_type,
                    attribute,
                    previous,
                    kind
                );
            }
        }
        Ok(())
    }

    /// Event type -> attribute -> kind
    pub fn snapshot(&self) -> BTreeMap<String, BTreeMap<String, ValueKind>> {
        self.event_types
            .iter()
            .map(|(event_type, schema)| (event_type.clone(), schema.attributes.clone()))
            .collect()
    }
}
