//! Events and entity keys
//!
//! An [`Event`] is an immutable, timestamped record scoped to one or more
//! entities. Events cross into the engine as JSON-shaped data; nested
//! attribute objects are flattened to dotted keys on the way in.

use super::time::serde_datetime;
use super::value::Value;
use crate::error::{CoreError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type EntityType = String;
pub type EntityId = String;
pub type EventId = String;

/// Entity type -> entity id
pub type Entities = BTreeMap<EntityType, EntityId>;

/// Immutable event record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent")]
pub struct Event {
    pub event_type: String,
    #[serde(with = "serde_datetime")]
    pub event_time: NaiveDateTime,
    pub entities: Entities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, Value>,
}

/// Wire shape of an event before validation and flattening
#[derive(Debug, Deserialize)]
struct RawEvent {
    event_type: String,
    #[serde(with = "serde_datetime")]
    event_time: NaiveDateTime,
    entities: BTreeMap<EntityType, serde_json::Value>,
    #[serde(default)]
    event_id: Option<serde_json::Value>,
    #[serde(default)]
    experiment_id: Option<String>,
    #[serde(default)]
    attrs: Option<serde_json::Map<String, serde_json::Value>>,
}

impl TryFrom<RawEvent> for Event {
    type Error = CoreError;

    fn try_from(raw: RawEvent) -> Result<Self> {
        let mut entities = Entities::new();
        for (entity_type, id) in raw.entities {
            let id = scalar_to_id(&id).ok_or_else(|| {
                CoreError::InvalidEvent(format!(
                    "entity '{}' must have a string or integer id, got {}",
                    entity_type, id
                ))
            })?;
            entities.insert(entity_type, id);
        }

        let event_id = match raw.event_id {
            None | Some(serde_json::Value::Null) => None,
            Some(id) => Some(scalar_to_id(&id).ok_or_else(|| {
                CoreError::InvalidEvent(format!("event_id must be a string or integer, got {}", id))
            })?),
        };

        let mut attrs = BTreeMap::new();
        if let Some(raw_attrs) = raw.attrs {
            for (key, value) in raw_attrs {
                flatten_into(&mut attrs, key, value);
            }
        }

        let mut event = Event::new(raw.event_type, raw.event_time, entities)?;
        event.event_id = event_id;
        event.experiment_id = raw.experiment_id;
        event.attrs = attrs;
        Ok(event)
    }
}

fn scalar_to_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Nested objects become dotted keys, everything else is stored as is
fn flatten_into(attrs: &mut BTreeMap<String, Value>, key: String, value: serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (child, nested) in map {
                flatten_into(attrs, format!("{}.{}", key, child), nested);
            }
        }
        other => {
            attrs.insert(key, Value::from(other));
        }
    }
}

impl Event {
    /// Create an event with no attributes.
    ///
    /// Fails when `entities` is empty or the event type is blank.
    pub fn new(
        event_type: impl Into<String>,
        event_time: NaiveDateTime,
        entities: Entities,
    ) -> Result<Self> {
        let event_type = event_type.into();
        if event_type.trim().is_empty() {
            return Err(CoreError::InvalidEvent("event_type must not be empty".to_string()));
        }
        if entities.is_empty() {
            return Err(CoreError::InvalidEvent(format!(
                "event of type '{}' must reference at least one entity",
                event_type
            )));
        }
        Ok(Self {
            event_type,
            event_time,
            entities,
            event_id: None,
            experiment_id: None,
            attrs: BTreeMap::new(),
        })
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn with_experiment_id(mut self, experiment_id: impl Into<String>) -> Self {
        self.experiment_id = Some(experiment_id.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Parse an event from its JSON representation
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::InvalidEvent(e.to_string()))
    }

    /// Attribute value, `Value::Null` when absent
    pub fn attr(&self, name: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.attrs.get(name).unwrap_or(&NULL)
    }

    pub fn entity(&self, entity_type: &str) -> Option<&EntityId> {
        self.entities.get(entity_type)
    }

    /// Whether this event is visible to a query running under `experiment_id`
    pub fn visible_in(&self, experiment_id: Option<&str>) -> bool {
        match &self.experiment_id {
            None => true,
            Some(own) => experiment_id == Some(own.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::time::parse_datetime;

    #[test]
    fn test_event_from_json() {
        let json = r#"{
            "event_type": "weather",
            "event_time": "2021-01-01 00:00:00",
            "entities": {"city": "Sydney"},
            "event_id": 17,
            "attrs": {"MaxTemp": 20, "Rain": 0.4, "RainToday": false}
        }"#;
        let event = Event::from_json_str(json).unwrap();
        assert_eq!(event.event_type, "weather");
        assert_eq!(event.entity("city"), Some(&"Sydney".to_string()));
        assert_eq!(event.event_id.as_deref(), Some("17"));
        assert_eq!(event.attr("MaxTemp"), &Value::Int(20));
        assert_eq!(event.attr("Rain"), &Value::Float(0.4));
        assert_eq!(event.attr("Missing"), &Value::Null);
    }

    #[test]
    fn test_event_nested_attrs_flattened() {
        let json = r#"{
            "event_type": "weather",
            "event_time": "2021-01-01",
            "entities": {"city": "Sydney"},
            "attrs": {"wind": {"speed": 12, "dir": {"label": "NW"}}}
        }"#;
        let event = Event::from_json_str(json).unwrap();
        assert_eq!(event.attr("wind.speed"), &Value::Int(12));
        assert_eq!(event.attr("wind.dir.label"), &Value::String("NW".to_string()));
        assert!(!event.attrs.contains_key("wind"));
    }

    #[test]
    fn test_event_requires_entities() {
        let json = r#"{"event_type": "weather", "event_time": "2021-01-01", "entities": {}}"#;
        let err = Event::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("at least one entity"));
    }

    #[test]
    fn test_event_rejects_bad_time() {
        let json = r#"{"event_type": "weather", "event_time": "yesterday", "entities": {"city": "x"}}"#;
        assert!(Event::from_json_str(json).is_err());
    }

    #[test]
    fn test_event_integer_entity_id() {
        let json = r#"{"event_type": "order", "event_time": "2021-01-01", "entities": {"customer": 42}}"#;
        let event = Event::from_json_str(json).unwrap();
        assert_eq!(event.entity("customer"), Some(&"42".to_string()));
    }

    #[test]
    fn test_event_visibility_by_experiment() {
        let time = parse_datetime("2021-01-01").unwrap();
        let entities = Entities::from([("city".to_string(), "Sydney".to_string())]);
        let base = Event::new("weather", time, entities).unwrap();
        let tagged = base.clone().with_experiment_id("exp-a");

        assert!(base.visible_in(None));
        assert!(base.visible_in(Some("exp-a")));
        assert!(tagged.visible_in(Some("exp-a")));
        assert!(!tagged.visible_in(Some("exp-b")));
        assert!(!tagged.visible_in(None));
    }

    #[test]
    fn test_event_serialize_roundtrip() {
        let time = parse_datetime("2021-01-01 12:00").unwrap();
        let entities = Entities::from([("city".to_string(), "Sydney".to_string())]);
        let event = Event::new("weather", time, entities)
            .unwrap()
            .with_event_id("e1")
            .with_attr("MaxTemp", 21.5);
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
