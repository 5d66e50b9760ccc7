//! Builder pattern for FeatureEngine

use crate::config::EngineConfig;
use crate::engine::FeatureEngine;
use crate::error::Result;
use chronofeat_core::{Event, ValueKind};
use chronofeat_runtime::{EventScopeConfig, QueryConfig};
use std::path::Path;

/// Builder for FeatureEngine
///
/// # Example
///
/// ```rust,ignore
/// use chronofeat_sdk::FeatureEngineBuilder;
///
/// let engine = FeatureEngineBuilder::new()
///     .with_config_file("engine.yaml")?
///     .declare_attribute("weather", "MaxTemp", ValueKind::Float)
///     .add_events_json(events_json)?
///     .build()
///     .await?;
/// ```
pub struct FeatureEngineBuilder {
    config: EngineConfig,
    events: Vec<Event>,
}

impl FeatureEngineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: EngineConfig::new(),
            events: Vec::new(),
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a JSON or YAML file
    pub fn with_config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.config = EngineConfig::from_file(path)?;
        Ok(self)
    }

    pub fn with_query_config(mut self, query: QueryConfig) -> Self {
        self.config.query = query;
        self
    }

    pub fn with_event_scope(mut self, scope: EventScopeConfig) -> Self {
        self.config.event_scope = scope;
        self
    }

    pub fn with_schema_validation(mut self, validate: bool) -> Self {
        self.config.validate_schema = validate;
        self
    }

    pub fn enable_type_checking(mut self, enable: bool) -> Self {
        self.config.enable_type_checking = enable;
        self
    }

    /// Declare an attribute kind ahead of ingestion
    pub fn declare_attribute(
        mut self,
        event_type: impl Into<String>,
        attribute: impl Into<String>,
        kind: ValueKind,
    ) -> Self {
        self.config = self.config.declare_attribute(event_type, attribute, kind);
        self
    }

    // ========== Initial events ==========

    pub fn add_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    pub fn add_events(mut self, events: impl IntoIterator<Item = Event>) -> Self {
        self.events.extend(events);
        self
    }

    /// Add events from a JSON array of event objects
    pub fn add_events_json(mut self, json: &str) -> Result<Self> {
        let events: Vec<Event> = serde_json::from_str(json)?;
        self.events.extend(events);
        Ok(self)
    }

    /// Build the engine and ingest the queued events.
    ///
    /// Fails on the first event rejected by the index.
    pub async fn build(self) -> Result<FeatureEngine> {
        let engine = FeatureEngine::new(self.config);
        if !self.events.is_empty() {
            let count = engine.ingest_many(self.events).await?;
            tracing::info!("Feature engine built with {} events", count);
        }
        Ok(engine)
    }
}

impl Default for FeatureEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
