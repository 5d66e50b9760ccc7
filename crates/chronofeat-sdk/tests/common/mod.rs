//! Common test utilities for SDK integration tests

#![allow(dead_code)]

use chrono::NaiveDateTime;
use chronofeat_core::types::parse_datetime;
use chronofeat_sdk::{
    EngineConfig, Entities, Event, FeatureEngine, FeatureEngineBuilder, ObservationDatesConfig,
    QueryResult, Value,
};

pub fn dt(s: &str) -> NaiveDateTime {
    parse_datetime(s).unwrap()
}

pub fn entities(pairs: &[(&str, &str)]) -> Entities {
    pairs
        .iter()
        .map(|(t, id)| (t.to_string(), id.to_string()))
        .collect()
}

pub fn weather(city: &str, time: &str, max_temp: f64) -> Event {
    Event::new("weather", dt(time), entities(&[("city", city)]))
        .unwrap()
        .with_attr("MaxTemp", max_temp)
}

pub fn weather_events() -> Vec<Event> {
    vec![
        weather("Sydney", "2020-01-01", 20.0),
        weather("Sydney", "2020-01-02", 25.0),
        weather("Perth", "2020-01-01", 30.0),
    ]
}

pub fn match_event(id: &str, time: &str, home: &str, away: &str, home_goals: i64) -> Event {
    Event::new("match", dt(time), entities(&[("home", home), ("away", away)]))
        .unwrap()
        .with_event_id(id)
        .with_attr("home_goals", home_goals)
}

pub fn league_events() -> Vec<Event> {
    vec![
        match_event("m1", "2020-01-01", "A", "B", 2),
        match_event("m2", "2020-01-08", "B", "A", 1),
        match_event("m3", "2020-01-15", "A", "C", 3),
        match_event("m4", "2020-01-22", "C", "A", 0),
    ]
}

/// Fixed observation dates from string timestamps
pub fn fixed(entity_type: &str, dates: &[&str]) -> ObservationDatesConfig {
    ObservationDatesConfig::Fixed(chronofeat_runtime::obs_dates::Fixed {
        entity_types: vec![entity_type.to_string()],
        dates: dates.iter().map(|d| dt(d)).collect(),
        entity_ids: None,
    })
}

/// Build an engine with the given configuration and events
pub async fn engine_with(config: EngineConfig, events: Vec<Event>) -> FeatureEngine {
    FeatureEngineBuilder::new()
        .with_config(config)
        .add_events(events)
        .build()
        .await
        .expect("Failed to build feature engine")
}

/// Lookup helpers over query results
pub trait ResultAssertions {
    fn row_for(&self, entity_id: &str) -> &[Value];
    fn row_at_event(&self, event_id: &str) -> &[Value];
}

impl ResultAssertions for QueryResult {
    fn row_for(&self, entity_id: &str) -> &[Value] {
        let pos = self
            .points
            .iter()
            .position(|p| p.entity_id == entity_id)
            .unwrap_or_else(|| panic!("No row for entity {}", entity_id));
        &self.rows[pos]
    }

    fn row_at_event(&self, event_id: &str) -> &[Value] {
        let pos = self
            .points
            .iter()
            .position(|p| p.event_id.as_deref() == Some(event_id))
            .unwrap_or_else(|| panic!("No row at event {}", event_id));
        &self.rows[pos]
    }
}
