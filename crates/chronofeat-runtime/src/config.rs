//! Query configuration
//!
//! Shapes accepted from callers as JSON or YAML. Variant names follow the
//! externally tagged serde layout, snake_case with PascalCase aliases:
//!
//! ```yaml
//! event_scope:
//!   related_entities_events: [city]
//! query_config:
//!   include_events_on_obs_date: false
//!   parallel: true
//! ```

use serde::{Deserialize, Serialize};

/// Per-query execution options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Whether an event stamped exactly at the observation instant falls on
    /// the past side of the window
    pub include_events_on_obs_date: bool,
    /// Evaluate observation points on the worker pool
    pub parallel: bool,
    /// Only events of this experiment (plus events without one) are visible
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,
}

impl QueryConfig {
    pub fn with_include_events_on_obs_date(mut self, include: bool) -> Self {
        self.include_events_on_obs_date = include;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_experiment_id(mut self, experiment_id: impl Into<String>) -> Self {
        self.experiment_id = Some(experiment_id.into());
        self
    }
}

/// Which events are eligible for aggregation at an observation point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventScopeConfig {
    /// The point's own entity plus the listed related entity types of its context
    #[serde(alias = "RelatedEntitiesEvents")]
    RelatedEntitiesEvents(Vec<String>),
    /// Every event in the index
    #[serde(alias = "AllEvents")]
    AllEvents,
}

impl Default for EventScopeConfig {
    fn default() -> Self {
        EventScopeConfig::RelatedEntitiesEvents(Vec::new())
    }
}

impl EventScopeConfig {
    pub fn related(entity_types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        EventScopeConfig::RelatedEntitiesEvents(entity_types.into_iter().map(Into::into).collect())
    }
}
