//! Event scope resolution

use crate::config::EventScopeConfig;
use crate::error::{Result, RuntimeError};
use crate::obs_dates::ObservationPoint;
use crate::storage::EventIndex;
use chrono::NaiveDateTime;
use chronofeat_core::ast::WindowBounds;
use chronofeat_core::Event;
use std::ops::Range;

/// Reject scope configurations naming entity types the index has never seen
pub(crate) fn validate_scope(index: &EventIndex, scope: &EventScopeConfig) -> Result<()> {
    if let EventScopeConfig::RelatedEntitiesEvents(types) = scope {
        for entity_type in types {
            if !index.has_entity_type(entity_type) {
                return Err(RuntimeError::ConfigError(format!(
                    "Unknown related entity type '{}' in event scope",
                    entity_type
                )));
            }
        }
    }
    Ok(())
}

/// Events eligible for aggregation at the points of one group, ordered by
/// (event_time, ingestion slot)
pub(crate) struct Candidates<'a> {
    events: Vec<&'a Event>,
    times: Vec<NaiveDateTime>,
}

impl<'a> Candidates<'a> {
    /// Own entity's events plus those of related entities in the point's
    /// context, or the whole timeline for [`EventScopeConfig::AllEvents`]
    pub(crate) fn collect(
        index: &'a EventIndex,
        scope: &EventScopeConfig,
        point: &ObservationPoint,
        experiment_id: Option<&str>,
    ) -> Self {
        let refs = match scope {
            EventScopeConfig::AllEvents => index.timeline().refs().to_vec(),
            EventScopeConfig::RelatedEntitiesEvents(related) => {
                let mut refs = index
                    .entity_events(&point.entity_type, &point.entity_id)
                    .refs()
                    .to_vec();
                for (entity_type, entity_id) in &point.context {
                    if *entity_type != point.entity_type && related.contains(entity_type) {
                        refs.extend_from_slice(index.entity_events(entity_type, entity_id).refs());
                    }
                }
                // an event shared by several scoped entities counts once
                refs.sort_by_key(|r| (index.get(*r).event_time, r.slot()));
                refs.dedup();
                refs
            }
        };

        let events: Vec<&Event> = refs
            .iter()
            .map(|r| index.get(*r))
            .filter(|e| e.visible_in(experiment_id))
            .collect();
        let times = events.iter().map(|e| e.event_time).collect();
        Self { events, times }
    }

    pub(crate) fn events(&self) -> &[&'a Event] {
        &self.events
    }

    pub(crate) fn get(&self, i: usize) -> &'a Event {
        self.events[i]
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    /// Index range of the candidates inside `bounds`
    pub(crate) fn window(&self, bounds: &WindowBounds) -> Range<usize> {
        let start = self.times.partition_point(|t| bounds.is_before(t));
        let end = self.times.partition_point(|t| bounds.reaches(t));
        start..end.max(start)
    }
}
