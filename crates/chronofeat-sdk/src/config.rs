//! Configuration types for FeatureEngine

use crate::error::{Result, SdkError};
use chronofeat_core::ValueKind;
use chronofeat_runtime::{EventScopeConfig, QueryConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

fn default_true() -> bool {
    true
}

/// Main engine configuration
///
/// ```yaml
/// validate_schema: true
/// query:
///   include_events_on_obs_date: false
///   parallel: true
/// event_scope:
///   related_entities_events: [away]
/// schema:
///   match:
///     home_goals: int
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default query options, overridable per request
    #[serde(default)]
    pub query: QueryConfig,

    /// Default event scope, overridable per request
    #[serde(default)]
    pub event_scope: EventScopeConfig,

    /// Reject events whose attribute kinds conflict with the schema
    #[serde(default = "default_true")]
    pub validate_schema: bool,

    /// Attribute kinds declared ahead of ingestion, per event type
    #[serde(default)]
    pub schema: BTreeMap<String, BTreeMap<String, ValueKind>>,

    /// Run the schema-independent type check at compile time
    #[serde(default = "default_true")]
    pub enable_type_checking: bool,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            query: QueryConfig::default(),
            event_scope: EventScopeConfig::default(),
            validate_schema: true,
            schema: BTreeMap::new(),
            enable_type_checking: true,
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            other => Err(SdkError::ConfigError(format!(
                "Unsupported config file extension {:?} for {}",
                other,
                path.display()
            ))),
        }
    }

    pub fn with_query_config(mut self, query: QueryConfig) -> Self {
        self.query = query;
        self
    }

    pub fn with_event_scope(mut self, scope: EventScopeConfig) -> Self {
        self.event_scope = scope;
        self
    }

    pub fn with_schema_validation(mut self, validate: bool) -> Self {
        self.validate_schema = validate;
        self
    }

    /// Declare an attribute kind
    pub fn declare_attribute(
        mut self,
        event_type: impl Into<String>,
        attribute: impl Into<String>,
        kind: ValueKind,
    ) -> Self {
        self.schema
            .entry(event_type.into())
            .or_default()
            .insert(attribute.into(), kind);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
