//! FeatureEngine - async facade over the event index and query runtime
//!
//! Ingestion takes the index write lock; queries take an owned read lock and
//! run on the blocking pool, so long feature computations never stall the
//! async executor and concurrent queries share the index.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::request::QueryRequest;
use chronofeat_compiler::{CompiledQuery, Compiler, CompilerOptions};
use chronofeat_core::{Event, ValueKind};
use chronofeat_runtime::{
    query_compiled, EventIndex, EventScopeConfig, ObservationDateGenerator, ObservationDatesConfig,
    ObservationPoint, QueryConfig, QueryResult,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Feature engine
pub struct FeatureEngine {
    index: Arc<RwLock<EventIndex>>,
    config: EngineConfig,
    compiler: Compiler,
}

impl FeatureEngine {
    /// Create an empty engine from a configuration
    pub fn new(config: EngineConfig) -> Self {
        let mut index = EventIndex::new().with_schema_validation(config.validate_schema);
        for (event_type, attributes) in &config.schema {
            for (attribute, kind) in attributes {
                index.declare_attribute(event_type, attribute, *kind);
            }
        }
        let compiler = Compiler::with_options(CompilerOptions {
            enable_type_checking: config.enable_type_checking,
        });
        Self {
            index: Arc::new(RwLock::new(index)),
            config,
            compiler,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========== Ingestion ==========

    pub async fn ingest(&self, event: Event) -> Result<()> {
        let mut index = self.index.write().await;
        index.insert(event)?;
        Ok(())
    }

    /// Insert events in order, stopping at the first rejected one.
    ///
    /// Events before the failure stay indexed.
    pub async fn ingest_many(&self, events: impl IntoIterator<Item = Event>) -> Result<usize> {
        let mut index = self.index.write().await;
        let count = index.insert_many(events)?;
        tracing::debug!("Ingested {} events ({} total)", count, index.len());
        Ok(count)
    }

    /// Ingest a single JSON event object or an array of them
    pub async fn ingest_json(&self, json: &str) -> Result<usize> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let events: Vec<Event> = match value {
            serde_json::Value::Array(_) => serde_json::from_value(value)?,
            other => vec![serde_json::from_value(other)?],
        };
        self.ingest_many(events).await
    }

    pub async fn event_count(&self) -> usize {
        self.index.read().await.len()
    }

    /// Attribute kinds recorded so far, per event type
    pub async fn schema(&self) -> BTreeMap<String, BTreeMap<String, ValueKind>> {
        self.index.read().await.schema().snapshot()
    }

    // ========== Queries ==========

    pub fn compile<S: AsRef<str>>(&self, features: &[S]) -> Result<CompiledQuery> {
        Ok(self.compiler.compile(features)?)
    }

    /// Run a query request, falling back to the engine's scope and options
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResult> {
        let scope = request
            .event_scope
            .unwrap_or_else(|| self.config.event_scope.clone());
        let config = request
            .query_config
            .unwrap_or_else(|| self.config.query.clone());
        let compiled = self.compile(request.features.as_slice())?;
        self.execute(request.observation_dates, scope, config, compiled)
            .await
    }

    /// Run features with explicit scope and options
    pub async fn query_with<S: AsRef<str>>(
        &self,
        observation_dates: ObservationDatesConfig,
        scope: EventScopeConfig,
        config: QueryConfig,
        features: &[S],
    ) -> Result<QueryResult> {
        let compiled = self.compile(features)?;
        self.execute(observation_dates, scope, config, compiled).await
    }

    /// Observation points a configuration resolves to, without computing features
    pub async fn observation_points(
        &self,
        observation_dates: &ObservationDatesConfig,
        experiment_id: Option<&str>,
    ) -> Result<Vec<ObservationPoint>> {
        let index = self.index.read().await;
        let points = ObservationDateGenerator::new(&index)
            .with_experiment_id(experiment_id)
            .generate(observation_dates)?;
        Ok(points)
    }

    async fn execute(
        &self,
        observation_dates: ObservationDatesConfig,
        scope: EventScopeConfig,
        config: QueryConfig,
        compiled: CompiledQuery,
    ) -> Result<QueryResult> {
        let index = Arc::clone(&self.index).read_owned().await;
        let result = tokio::task::spawn_blocking(move || {
            query_compiled(&index, &observation_dates, &scope, &config, &compiled)
        })
        .await??;
        if !result.dropped.is_empty() {
            tracing::warn!(
                "{} rows dropped after filter evaluation failures",
                result.dropped.len()
            );
        }
        Ok(result)
    }
}

impl Clone for FeatureEngine {
    fn clone(&self) -> Self {
        Self {
            index: Arc::clone(&self.index),
            config: self.config.clone(),
            compiler: self.compiler.clone(),
        }
    }
}
