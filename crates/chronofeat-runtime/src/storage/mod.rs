//! In-memory event index
//!
//! Events live in an append-only arena. Every secondary index stores
//! [`EventRef`] slots ordered by `(event_time, slot)`, so events with equal
//! timestamps keep their insertion order. Out-of-order ingestion is
//! accepted and placed by sorted insert.

mod range;

pub use range::{EventRange, EventRef};

use crate::error::Result;
use chronofeat_core::ast::WindowBounds;
use chronofeat_core::types::ValueKind;
use chronofeat_core::{CoreError, EntityId, EntityType, Event, EventId, SchemaRegistry};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Events of one entity, overall and per event type
#[derive(Debug, Default)]
struct EntitySeries {
    all: Vec<EventRef>,
    by_type: HashMap<String, Vec<EventRef>>,
}

/// Event index
#[derive(Debug)]
pub struct EventIndex {
    arena: Vec<Event>,
    series: HashMap<EntityType, HashMap<EntityId, EntitySeries>>,
    timeline: Vec<EventRef>,
    by_id: HashMap<EventId, EventRef>,
    entities: BTreeMap<EntityType, BTreeSet<EntityId>>,
    schema: SchemaRegistry,
    validate_schema: bool,
}

impl Default for EventIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl EventIndex {
    /// Create an empty index that rejects schema conflicts
    pub fn new() -> Self {
        Self {
            arena: Vec::new(),
            series: HashMap::new(),
            timeline: Vec::new(),
            by_id: HashMap::new(),
            entities: BTreeMap::new(),
            schema: SchemaRegistry::new(),
            validate_schema: true,
        }
    }

    /// When disabled, conflicting attribute kinds are logged and the event
    /// is indexed anyway; the first recorded kind stays in the schema.
    pub fn with_schema_validation(mut self, validate: bool) -> Self {
        self.validate_schema = validate;
        self
    }

    /// Declare an attribute kind before any event of the type arrives
    pub fn declare_attribute(&mut self, event_type: &str, attribute: &str, kind: ValueKind) {
        self.schema.declare(event_type, attribute, kind);
    }

    /// Insert one event.
    ///
    /// The event is rejected as a whole on a schema conflict or a duplicate
    /// `event_id`; nothing is indexed in that case.
    pub fn insert(&mut self, event: Event) -> Result<EventRef> {
        if let Some(id) = &event.event_id {
            if self.by_id.contains_key(id) {
                return Err(CoreError::InvalidEvent(format!("duplicate event_id '{}'", id)).into());
            }
        }

        if let Err(err) = self.schema.observe(&event) {
            if self.validate_schema {
                return Err(err.into());
            }
            tracing::warn!("Indexing event despite schema conflict: {}", err);
        }

        let slot = EventRef(self.arena.len());
        self.arena.push(event);
        let arena = &self.arena;
        let event = &arena[slot.0];

        for (entity_type, entity_id) in &event.entities {
            let series = self
                .series
                .entry(entity_type.clone())
                .or_default()
                .entry(entity_id.clone())
                .or_default();
            sorted_insert(arena, &mut series.all, slot);
            sorted_insert(
                arena,
                series.by_type.entry(event.event_type.clone()).or_default(),
                slot,
            );
            self.entities
                .entry(entity_type.clone())
                .or_default()
                .insert(entity_id.clone());
        }

        if !sorted_insert(arena, &mut self.timeline, slot) {
            tracing::debug!(
                "Event at {} arrived out of time order; placed by sorted insert",
                event.event_time
            );
        }
        if let Some(id) = &event.event_id {
            self.by_id.insert(id.clone(), slot);
        }

        Ok(slot)
    }

    /// Insert events in order, stopping at the first rejected one
    pub fn insert_many(&mut self, events: impl IntoIterator<Item = Event>) -> Result<usize> {
        let mut inserted = 0;
        for event in events {
            self.insert(event)?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Events of one entity within `bounds`, optionally of one event type
    pub fn range_query(
        &self,
        entity_type: &str,
        entity_id: &str,
        event_type: Option<&str>,
        bounds: &WindowBounds,
    ) -> EventRange<'_> {
        let Some(series) = self.series.get(entity_type).and_then(|ids| ids.get(entity_id)) else {
            return EventRange::empty(&self.arena);
        };
        let refs = match event_type {
            Some(event_type) => match series.by_type.get(event_type) {
                Some(refs) => refs.as_slice(),
                None => return EventRange::empty(&self.arena),
            },
            None => series.all.as_slice(),
        };
        EventRange::new(&self.arena, self.slice_by_bounds(refs, bounds))
    }

    /// Every event of one entity
    pub fn entity_events(&self, entity_type: &str, entity_id: &str) -> EventRange<'_> {
        self.range_query(entity_type, entity_id, None, &WindowBounds::unbounded())
    }

    /// Every event in the index, time-ordered
    pub fn timeline(&self) -> EventRange<'_> {
        EventRange::new(&self.arena, &self.timeline)
    }

    pub fn get(&self, event_ref: EventRef) -> &Event {
        &self.arena[event_ref.0]
    }

    pub fn get_by_id(&self, event_id: &str) -> Option<&Event> {
        self.by_id.get(event_id).map(|r| &self.arena[r.0])
    }

    /// Known ids of one entity type
    pub fn entity_ids(&self, entity_type: &str) -> Option<&BTreeSet<EntityId>> {
        self.entities.get(entity_type)
    }

    pub fn has_entity_type(&self, entity_type: &str) -> bool {
        self.entities.contains_key(entity_type)
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    fn slice_by_bounds<'a>(&self, refs: &'a [EventRef], bounds: &WindowBounds) -> &'a [EventRef] {
        let start = refs.partition_point(|r| bounds.is_before(&self.arena[r.0].event_time));
        let end = refs.partition_point(|r| bounds.reaches(&self.arena[r.0].event_time));
        if start >= end {
            &[]
        } else {
            &refs[start..end]
        }
    }
}

/// Insert `slot` after every event with an earlier or equal time.
///
/// Returns whether the slot landed at the end.
fn sorted_insert(arena: &[Event], refs: &mut Vec<EventRef>, slot: EventRef) -> bool {
    let time = arena[slot.0].event_time;
    let position = refs.partition_point(|r| arena[r.0].event_time <= time);
    let appended = position == refs.len();
    refs.insert(position, slot);
    appended
}
