//! Observation point generation

use super::{
    ConditionalEvents, EntitiesEventSpecific, EntityDates, Fixed, Interval, ObservationDatesConfig,
    ObservationPoint,
};
use crate::engine::{EvalContext, ExpressionEvaluator};
use crate::error::{Result, RuntimeError};
use crate::storage::EventIndex;
use chronofeat_compiler::{Compiler, SchemaBinder};
use chronofeat_core::{EntityType, Event};
use chrono::Duration;
use std::collections::HashSet;

/// Produces observation points from an [`ObservationDatesConfig`] and the
/// events currently indexed
pub struct ObservationDateGenerator<'a> {
    index: &'a EventIndex,
    experiment_id: Option<&'a str>,
}

impl<'a> ObservationDateGenerator<'a> {
    pub fn new(index: &'a EventIndex) -> Self {
        Self {
            index,
            experiment_id: None,
        }
    }

    /// Only events visible to this experiment produce points
    pub fn with_experiment_id(mut self, experiment_id: Option<&'a str>) -> Self {
        self.experiment_id = experiment_id;
        self
    }

    /// Generate points.
    ///
    /// Generated variants come out sorted by (entity, instant); explicit
    /// variants keep configuration order. Duplicates are dropped, first
    /// occurrence wins.
    pub fn generate(&self, config: &ObservationDatesConfig) -> Result<Vec<ObservationPoint>> {
        self.validate(config)?;

        let mut points = match config {
            ObservationDatesConfig::Interval(interval) => self.interval(interval)?,
            ObservationDatesConfig::Fixed(fixed) => self.fixed(fixed),
            ObservationDatesConfig::EntitySpecific(entities) => self.entity_specific(entities),
            ObservationDatesConfig::AllEvents => self.all_events(),
            ObservationDatesConfig::AllEventsByEntity(types) => self.all_events_by_entity(types),
            ObservationDatesConfig::ConditionalEvents(conditional) => self.conditional(conditional)?,
            ObservationDatesConfig::EntitiesEventSpecific(specific) => {
                self.entities_event_specific(specific)
            }
        };

        if config.is_generated() {
            points.sort();
        }
        let mut seen = HashSet::with_capacity(points.len());
        points.retain(|p| seen.insert(p.clone()));

        tracing::debug!("Generated {} observation points", points.len());
        Ok(points)
    }

    fn validate(&self, config: &ObservationDatesConfig) -> Result<()> {
        let named: Vec<&EntityType> = match config {
            ObservationDatesConfig::Interval(interval) => {
                if interval.nth < 1 {
                    return Err(RuntimeError::ConfigError(format!(
                        "Interval step must be at least 1, got {}",
                        interval.nth
                    )));
                }
                interval.entity_types.iter().collect()
            }
            ObservationDatesConfig::Fixed(fixed) => fixed.entity_types.iter().collect(),
            ObservationDatesConfig::EntitySpecific(entities) => {
                entities.iter().map(|e| &e.entity_type).collect()
            }
            ObservationDatesConfig::AllEvents => Vec::new(),
            ObservationDatesConfig::AllEventsByEntity(types) => types.iter().collect(),
            ObservationDatesConfig::ConditionalEvents(conditional) => {
                conditional.entity_types.iter().collect()
            }
            ObservationDatesConfig::EntitiesEventSpecific(specific) => vec![&specific.entity_type],
        };

        for entity_type in named {
            if !self.index.has_entity_type(entity_type) {
                return Err(RuntimeError::ConfigError(format!(
                    "Unknown entity type '{}'",
                    entity_type
                )));
            }
        }
        Ok(())
    }

    fn visible(&self, event: &Event) -> bool {
        event.visible_in(self.experiment_id)
    }

    fn interval(&self, interval: &Interval) -> Result<Vec<ObservationPoint>> {
        let step = match interval.date_part.unit() {
            Some(unit) => Some(unit.duration(interval.nth).ok_or_else(|| {
                RuntimeError::ConfigError(format!(
                    "Interval of {} {}s overflows",
                    interval.nth,
                    unit.name()
                ))
            })?),
            None => None,
        };
        let margin = Duration::milliseconds(1);

        let mut points = Vec::new();
        for entity_type in &interval.entity_types {
            let Some(ids) = self.index.entity_ids(entity_type) else {
                continue;
            };
            for entity_id in ids {
                let mut events = self
                    .index
                    .entity_events(entity_type, entity_id)
                    .filter(|e| self.visible(e));
                let Some(first) = events.next() else {
                    continue;
                };
                let last = events.last().unwrap_or(first);

                // one millisecond either side so the boundary events fall inside,
                // clamped at the representable range
                let start = first
                    .event_time
                    .checked_sub_signed(margin)
                    .unwrap_or(first.event_time);
                let end = last
                    .event_time
                    .checked_add_signed(margin)
                    .unwrap_or(last.event_time);

                if let Some(step) = step {
                    let mut dt = start;
                    while dt < end {
                        points.push(ObservationPoint::new(entity_type.clone(), entity_id.clone(), dt));
                        match dt.checked_add_signed(step) {
                            Some(next) => dt = next,
                            None => break,
                        }
                    }
                }
                points.push(ObservationPoint::new(entity_type.clone(), entity_id.clone(), end));
            }
        }
        Ok(points)
    }

    fn fixed(&self, fixed: &Fixed) -> Vec<ObservationPoint> {
        let mut points = Vec::new();
        for entity_type in &fixed.entity_types {
            let Some(ids) = self.index.entity_ids(entity_type) else {
                continue;
            };
            for entity_id in ids {
                if let Some(wanted) = &fixed.entity_ids {
                    if !wanted.contains(entity_id) {
                        continue;
                    }
                }
                for date in &fixed.dates {
                    points.push(ObservationPoint::new(entity_type.clone(), entity_id.clone(), *date));
                }
            }
        }
        points
    }

    fn entity_specific(&self, entities: &[EntityDates]) -> Vec<ObservationPoint> {
        let mut points = Vec::new();
        for entity in entities {
            for date in &entity.dates {
                let point = ObservationPoint::new(
                    entity.entity_type.clone(),
                    entity.entity_id.clone(),
                    date.datetime,
                )
                .with_event_id(date.event_id.clone());
                points.push(self.with_source_context(point));
            }
        }
        points
    }

    fn entities_event_specific(&self, specific: &EntitiesEventSpecific) -> Vec<ObservationPoint> {
        let mut points = Vec::new();
        for (entity_id, observations) in &specific.observations {
            for observation in observations {
                let point = ObservationPoint::new(
                    specific.entity_type.clone(),
                    entity_id.clone(),
                    observation.datetime,
                )
                .with_event_id(observation.event_id.clone());
                let scope = observation.scope.iter().map(|(t, id)| (t, id));
                points.push(self.with_source_context(point).with_context(scope));
            }
        }
        points
    }

    /// Entities of the referenced event join the context when it is indexed
    fn with_source_context(&self, point: ObservationPoint) -> ObservationPoint {
        let source = point
            .event_id
            .as_deref()
            .and_then(|id| self.index.get_by_id(id))
            .filter(|e| self.visible(e));
        match source {
            Some(event) => point.with_context(&event.entities),
            None => point,
        }
    }

    fn all_events(&self) -> Vec<ObservationPoint> {
        self.index
            .timeline()
            .filter(|e| self.visible(e))
            .filter_map(|event| {
                let (entity_type, _) = event.entities.iter().next()?;
                Some(from_event(event, entity_type))
            })
            .collect()
    }

    fn all_events_by_entity(&self, types: &[EntityType]) -> Vec<ObservationPoint> {
        let mut points = Vec::new();
        for event in self.index.timeline().filter(|e| self.visible(e)) {
            for entity_type in types {
                if event.entities.contains_key(entity_type) {
                    points.push(from_event(event, entity_type));
                }
            }
        }
        points
    }

    fn conditional(&self, conditional: &ConditionalEvents) -> Result<Vec<ObservationPoint>> {
        let predicate = Compiler::new()
            .compile_predicate(&conditional.condition)
            .map_err(|e| RuntimeError::ConfigError(format!("Invalid condition: {}", e)))?;
        let mut binder = SchemaBinder::new(self.index.schema());

        let mut points = Vec::new();
        for event in self.index.timeline().filter(|e| self.visible(e)) {
            if !conditional
                .entity_types
                .iter()
                .any(|t| event.entities.contains_key(t))
            {
                continue;
            }
            let applies = binder
                .bind_predicate(&predicate, &event.event_type)
                .map_err(|e| RuntimeError::ConfigError(format!("Invalid condition: {}", e)))?;
            if !applies {
                continue;
            }

            match ExpressionEvaluator::evaluate_predicate(&predicate.expr, &EvalContext::for_event(event)) {
                Ok(true) => {
                    for entity_type in &conditional.entity_types {
                        if event.entities.contains_key(entity_type) {
                            points.push(from_event(event, entity_type));
                        }
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        "Condition '{}' failed on event {:?}: {}, skipping",
                        predicate.raw,
                        event.event_id,
                        e
                    );
                }
            }
        }
        Ok(points)
    }
}

/// Point at an event's time for one of its entities, with the event's
/// entities as context
fn from_event(event: &Event, entity_type: &EntityType) -> ObservationPoint {
    let entity_id = event.entities.get(entity_type).cloned().unwrap_or_default();
    ObservationPoint::new(entity_type.clone(), entity_id, event.event_time)
        .with_event_id(event.event_id.clone())
        .with_context(&event.entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obs_dates::{DatePart, ObservationTime, ScopedObservation};
    use chronofeat_core::types::parse_datetime;
    use chronofeat_core::Entities;
    use std::collections::BTreeMap;

    fn dt(s: &str) -> chrono::NaiveDateTime {
        parse_datetime(s).unwrap()
    }

    fn event(id: &str, event_type: &str, time: &str, entities: &[(&str, &str)]) -> Event {
        let entities: Entities = entities
            .iter()
            .map(|(t, e)| (t.to_string(), e.to_string()))
            .collect();
        Event::new(event_type, dt(time), entities)
            .unwrap()
            .with_event_id(id)
    }

    fn index() -> EventIndex {
        let mut index = EventIndex::new();
        index
            .insert_many(vec![
                event("w1", "weather", "2020-01-01", &[("city", "Sydney")]).with_attr("Rain", 0.0),
                event("w2", "weather", "2020-01-03", &[("city", "Sydney")]).with_attr("Rain", 4.0),
                event("w3", "weather", "2020-01-02", &[("city", "Perth")]).with_attr("Rain", 1.0),
                event("m1", "match", "2020-01-02 18:00", &[("home", "A"), ("away", "B")]),
            ])
            .unwrap();
        index
    }

    #[test]
    fn test_interval_covers_history() {
        let index = index();
        let config = ObservationDatesConfig::Interval(Interval {
            entity_types: vec!["city".to_string()],
            date_part: DatePart::Day,
            nth: 1,
        });
        let points = ObservationDateGenerator::new(&index).generate(&config).unwrap();

        let sydney: Vec<_> = points.iter().filter(|p| p.entity_id == "Sydney").collect();
        // three daily steps from just before the first event, then the end
        assert_eq!(sydney.len(), 4);
        assert_eq!(sydney[0].instant, dt("2020-01-01") - Duration::milliseconds(1));
        assert_eq!(sydney[3].instant, dt("2020-01-03") + Duration::milliseconds(1));
        assert!(points.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_interval_at_datetime_limits() {
        let city = |id: &str| Entities::from([("city".to_string(), id.to_string())]);
        let mut index = EventIndex::new();
        index
            .insert_many(vec![
                Event::new("weather", chrono::NaiveDateTime::MIN, city("Old")).unwrap(),
                Event::new("weather", chrono::NaiveDateTime::MAX, city("New")).unwrap(),
            ])
            .unwrap();
        let config = ObservationDatesConfig::Interval(Interval {
            entity_types: vec!["city".to_string()],
            date_part: DatePart::Day,
            nth: 1,
        });
        let points = ObservationDateGenerator::new(&index).generate(&config).unwrap();

        let old: Vec<_> = points.iter().filter(|p| p.entity_id == "Old").collect();
        assert_eq!(old[0].instant, chrono::NaiveDateTime::MIN);
        let new: Vec<_> = points.iter().filter(|p| p.entity_id == "New").collect();
        assert_eq!(new.last().map(|p| p.instant), Some(chrono::NaiveDateTime::MAX));
    }

    #[test]
    fn test_interval_all_is_end_only() {
        let index = index();
        let config = ObservationDatesConfig::Interval(Interval {
            entity_types: vec!["city".to_string()],
            date_part: DatePart::All,
            nth: 1,
        });
        let points = ObservationDateGenerator::new(&index).generate(&config).unwrap();
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn test_interval_rejects_bad_step() {
        let index = index();
        let config = ObservationDatesConfig::Interval(Interval {
            entity_types: vec!["city".to_string()],
            date_part: DatePart::Day,
            nth: 0,
        });
        let err = ObservationDateGenerator::new(&index).generate(&config).unwrap_err();
        assert!(matches!(err, RuntimeError::ConfigError(_)));
    }

    #[test]
    fn test_unknown_entity_type() {
        let index = index();
        let config = ObservationDatesConfig::AllEventsByEntity(vec!["planet".to_string()]);
        let err = ObservationDateGenerator::new(&index).generate(&config).unwrap_err();
        assert!(matches!(err, RuntimeError::ConfigError(_)));
    }

    #[test]
    fn test_fixed_with_entity_filter() {
        let index = index();
        let config = ObservationDatesConfig::Fixed(Fixed {
            entity_types: vec!["city".to_string()],
            dates: vec![dt("2020-02-01"), dt("2020-01-15")],
            entity_ids: Some(vec!["Perth".to_string()]),
        });
        let points = ObservationDateGenerator::new(&index).generate(&config).unwrap();
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.entity_id == "Perth"));
        assert_eq!(points[0].instant, dt("2020-01-15"));
    }

    #[test]
    fn test_all_events_by_entity_carries_context() {
        let index = index();
        let config =
            ObservationDatesConfig::AllEventsByEntity(vec!["home".to_string(), "away".to_string()]);
        let points = ObservationDateGenerator::new(&index).generate(&config).unwrap();
        assert_eq!(points.len(), 2);
        for point in &points {
            assert_eq!(point.event_id.as_deref(), Some("m1"));
            assert_eq!(point.context.len(), 2);
        }
    }

    #[test]
    fn test_all_events_uses_first_entity() {
        let index = index();
        let points = ObservationDateGenerator::new(&index)
            .generate(&ObservationDatesConfig::AllEvents)
            .unwrap();
        assert_eq!(points.len(), 4);
        let from_match = points.iter().find(|p| p.event_id.as_deref() == Some("m1")).unwrap();
        assert_eq!(from_match.entity_type, "away");
    }

    #[test]
    fn test_conditional_events() {
        let index = index();
        let config = ObservationDatesConfig::ConditionalEvents(ConditionalEvents {
            condition: "event_type == 'weather' and Rain > 0.5".to_string(),
            entity_types: vec!["city".to_string()],
        });
        let points = ObservationDateGenerator::new(&index).generate(&config).unwrap();
        let ids: Vec<_> = points.iter().filter_map(|p| p.event_id.as_deref()).collect();
        assert_eq!(ids, vec!["w3", "w2"]);
    }

    #[test]
    fn test_conditional_events_bad_condition() {
        let index = index();
        let config = ObservationDatesConfig::ConditionalEvents(ConditionalEvents {
            condition: "Rain >".to_string(),
            entity_types: vec!["city".to_string()],
        });
        let err = ObservationDateGenerator::new(&index).generate(&config).unwrap_err();
        assert!(matches!(err, RuntimeError::ConfigError(_)));
    }

    #[test]
    fn test_explicit_points_keep_order_and_dedup() {
        let index = index();
        let config = ObservationDatesConfig::EntitySpecific(vec![EntityDates {
            entity_type: "city".to_string(),
            entity_id: "Sydney".to_string(),
            dates: vec![
                ObservationTime {
                    datetime: dt("2020-03-01"),
                    event_id: None,
                },
                ObservationTime {
                    datetime: dt("2020-01-01"),
                    event_id: None,
                },
                ObservationTime {
                    datetime: dt("2020-03-01"),
                    event_id: None,
                },
            ],
        }]);
        let points = ObservationDateGenerator::new(&index).generate(&config).unwrap();
        let instants: Vec<_> = points.iter().map(|p| p.instant).collect();
        assert_eq!(instants, vec![dt("2020-03-01"), dt("2020-01-01")]);
    }

    #[test]
    fn test_entities_event_specific_scope() {
        let index = index();
        let mut observations = BTreeMap::new();
        observations.insert(
            "A".to_string(),
            vec![ScopedObservation {
                datetime: dt("2020-01-02 18:00"),
                event_id: Some("m1".to_string()),
                scope: vec![("venue".to_string(), "MCG".to_string())],
            }],
        );
        let config = ObservationDatesConfig::EntitiesEventSpecific(EntitiesEventSpecific {
            entity_type: "home".to_string(),
            observations,
        });
        let points = ObservationDateGenerator::new(&index).generate(&config).unwrap();
        assert_eq!(points.len(), 1);
        let context = &points[0].context;
        assert_eq!(context.get("home").map(String::as_str), Some("A"));
        assert_eq!(context.get("away").map(String::as_str), Some("B"));
        assert_eq!(context.get("venue").map(String::as_str), Some("MCG"));
    }

    #[test]
    fn test_experiment_events_hidden() {
        let mut index = index();
        index
            .insert(event("x1", "weather", "2020-01-05", &[("city", "Perth")]).with_experiment_id("exp"))
            .unwrap();
        let config = ObservationDatesConfig::AllEventsByEntity(vec!["city".to_string()]);

        let base = ObservationDateGenerator::new(&index).generate(&config).unwrap();
        let with_exp = ObservationDateGenerator::new(&index)
            .with_experiment_id(Some("exp"))
            .generate(&config)
            .unwrap();
        assert_eq!(base.len() + 1, with_exp.len());
    }
}
