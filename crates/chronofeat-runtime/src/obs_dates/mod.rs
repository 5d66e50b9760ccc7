//! Observation dates
//!
//! An observation point is an (entity, instant) pair at which every feature
//! of a query is evaluated once. Points are produced from one of several
//! configuration variants by [`ObservationDateGenerator`].

mod generator;

pub use generator::ObservationDateGenerator;

use chronofeat_core::ast::TimeUnit;
use chronofeat_core::types::time::{serde_datetime, serde_datetime_list};
use chronofeat_core::{Entities, EntityId, EntityType, EventId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One evaluation point
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObservationPoint {
    pub entity_type: EntityType,
    pub entity_id: EntityId,
    #[serde(with = "serde_datetime")]
    pub instant: NaiveDateTime,
    /// Event the point was taken from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    /// Entity map for `@entities.<type>` and related-entity scope; always
    /// contains the point's own entity
    pub context: Entities,
}

impl ObservationPoint {
    pub fn new(
        entity_type: impl Into<EntityType>,
        entity_id: impl Into<EntityId>,
        instant: NaiveDateTime,
    ) -> Self {
        let entity_type = entity_type.into();
        let entity_id = entity_id.into();
        let context = Entities::from([(entity_type.clone(), entity_id.clone())]);
        Self {
            entity_type,
            entity_id,
            instant,
            event_id: None,
            context,
        }
    }

    pub fn with_event_id(mut self, event_id: Option<EventId>) -> Self {
        self.event_id = event_id;
        self
    }

    /// Add entities to the context; the point's own entity is kept
    pub fn with_context<'a>(
        mut self,
        entities: impl IntoIterator<Item = (&'a EntityType, &'a EntityId)>,
    ) -> Self {
        for (entity_type, entity_id) in entities {
            if *entity_type != self.entity_type {
                self.context.insert(entity_type.clone(), entity_id.clone());
            }
        }
        self
    }
}

/// Step granularity of [`Interval`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatePart {
    /// One point per entity at the end of its history
    #[serde(alias = "all")]
    All,
    #[serde(alias = "millisecond")]
    Millisecond,
    #[serde(alias = "second")]
    Second,
    #[serde(alias = "minute")]
    Minute,
    #[serde(alias = "hour")]
    Hour,
    #[serde(alias = "day")]
    Day,
    #[serde(alias = "week")]
    Week,
}

impl DatePart {
    pub fn unit(&self) -> Option<TimeUnit> {
        match self {
            DatePart::All => None,
            DatePart::Millisecond => Some(TimeUnit::Millisecond),
            DatePart::Second => Some(TimeUnit::Second),
            DatePart::Minute => Some(TimeUnit::Minute),
            DatePart::Hour => Some(TimeUnit::Hour),
            DatePart::Day => Some(TimeUnit::Day),
            DatePart::Week => Some(TimeUnit::Week),
        }
    }
}

fn default_nth() -> i64 {
    1
}

/// Regular points across each entity's observed event range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub entity_types: Vec<EntityType>,
    pub date_part: DatePart,
    #[serde(default = "default_nth")]
    pub nth: i64,
}

/// The same dates for every entity of the listed types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixed {
    pub entity_types: Vec<EntityType>,
    #[serde(with = "serde_datetime_list")]
    pub dates: Vec<NaiveDateTime>,
    /// Restrict to these ids instead of every known entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_ids: Option<Vec<EntityId>>,
}

/// An instant with an optional source event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationTime {
    #[serde(with = "serde_datetime")]
    pub datetime: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
}

/// Explicit instants for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDates {
    pub entity_type: EntityType,
    pub entity_id: EntityId,
    pub dates: Vec<ObservationTime>,
}

/// Points taken from events matching a predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalEvents {
    pub condition: String,
    pub entity_types: Vec<EntityType>,
}

/// An instant with explicit related entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedObservation {
    #[serde(with = "serde_datetime")]
    pub datetime: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    /// (entity_type, entity_id) pairs joining the point's context
    #[serde(default)]
    pub scope: Vec<(EntityType, EntityId)>,
}

/// Explicit instants per entity id, each with its own scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitiesEventSpecific {
    pub entity_type: EntityType,
    pub observations: BTreeMap<EntityId, Vec<ScopedObservation>>,
}

/// Observation date configuration, one variant per mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObservationDatesConfig {
    #[serde(alias = "interval")]
    Interval(Interval),
    #[serde(alias = "fixed")]
    Fixed(Fixed),
    #[serde(alias = "entity_specific")]
    EntitySpecific(Vec<EntityDates>),
    /// One point per event, own entity is the event's first entity
    #[serde(alias = "all_events")]
    AllEvents,
    /// One point per event and listed entity type present on it
    #[serde(alias = "all_events_by_entity")]
    AllEventsByEntity(Vec<EntityType>),
    #[serde(alias = "conditional_events")]
    ConditionalEvents(ConditionalEvents),
    #[serde(alias = "entities_event_specific")]
    EntitiesEventSpecific(EntitiesEventSpecific),
}

impl ObservationDatesConfig {
    /// Whether points come out sorted rather than in configuration order
    pub fn is_generated(&self) -> bool {
        !matches!(
            self,
            ObservationDatesConfig::EntitySpecific(_)
                | ObservationDatesConfig::EntitiesEventSpecific(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronofeat_core::types::parse_datetime;

    #[test]
    fn test_own_entity_survives_context() {
        let own = ObservationPoint::new("team", "A", parse_datetime("2020-01-01").unwrap());
        let other = Entities::from([
            ("team".to_string(), "B".to_string()),
            ("venue".to_string(), "X".to_string()),
        ]);
        let point = own.with_context(&other);
        assert_eq!(point.context.get("team").map(String::as_str), Some("A"));
        assert_eq!(point.context.get("venue").map(String::as_str), Some("X"));
    }

    #[test]
    fn test_config_shapes() {
        let interval: ObservationDatesConfig = serde_json::from_str(
            r#"{"Interval": {"entity_types": ["city"], "date_part": "Day", "nth": 7}}"#,
        )
        .unwrap();
        assert_eq!(
            interval,
            ObservationDatesConfig::Interval(Interval {
                entity_types: vec!["city".to_string()],
                date_part: DatePart::Day,
                nth: 7,
            })
        );

        let all: ObservationDatesConfig = serde_json::from_str(r#""AllEvents""#).unwrap();
        assert_eq!(all, ObservationDatesConfig::AllEvents);

        let fixed: ObservationDatesConfig = serde_yaml::from_str(
            "fixed:\n  entity_types: [city]\n  dates: ['2020-01-01', '2020-02-01 12:00']\n",
        )
        .unwrap();
        match fixed {
            ObservationDatesConfig::Fixed(f) => assert_eq!(f.dates.len(), 2),
            other => panic!("Expected Fixed, got {:?}", other),
        }
    }

    #[test]
    fn test_entities_event_specific_shape() {
        let config: ObservationDatesConfig = serde_json::from_str(
            r#"{"EntitiesEventSpecific": {
                "entity_type": "team",
                "observations": {
                    "A": [{"datetime": "2020-01-01", "event_id": "m1", "scope": [["match", "m1"]]}]
                }
            }}"#,
        )
        .unwrap();
        assert!(!config.is_generated());
    }
}
