//! Request type for FeatureEngine queries

use crate::error::Result;
use chronofeat_runtime::{EventScopeConfig, ObservationDatesConfig, QueryConfig};
use serde::{Deserialize, Serialize};

/// One feature query.
///
/// Scope and query options fall back to the engine configuration when
/// left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub observation_dates: ObservationDatesConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_scope: Option<EventScopeConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_config: Option<QueryConfig>,

    /// Feature expressions, one column each
    pub features: Vec<String>,
}

impl QueryRequest {
    pub fn new(
        observation_dates: ObservationDatesConfig,
        features: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            observation_dates,
            event_scope: None,
            query_config: None,
            features: features.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_event_scope(mut self, scope: EventScopeConfig) -> Self {
        self.event_scope = Some(scope);
        self
    }

    pub fn with_query_config(mut self, config: QueryConfig) -> Self {
        self.query_config = Some(config);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_json() {
        let request = QueryRequest::from_json_str(
            r#"{
                "observation_dates": {"Fixed": {"entity_types": ["city"], "dates": ["2020-01-03"]}},
                "query_config": {"include_events_on_obs_date": true},
                "features": ["avg(MaxTemp) over past as avg_temp"]
            }"#,
        )
        .unwrap();
        assert_eq!(request.features.len(), 1);
        assert!(request.event_scope.is_none());
        assert_eq!(
            request.query_config.map(|c| c.include_events_on_obs_date),
            Some(true)
        );
    }

    #[test]
    fn test_request_from_yaml() {
        let request = QueryRequest::from_yaml_str(
            r#"
observation_dates: AllEvents
event_scope:
  related_entities_events: [away]
features:
  - count(*) over past
"#,
        )
        .unwrap();
        assert_eq!(request.observation_dates, ObservationDatesConfig::AllEvents);
        assert!(request.event_scope.is_some());
    }
}
