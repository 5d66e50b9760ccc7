//! One-call query entry points

use crate::config::{EventScopeConfig, QueryConfig};
use crate::error::Result;
use crate::executor::{QueryExecutor, QueryResult};
use crate::obs_dates::{ObservationDateGenerator, ObservationDatesConfig};
use crate::storage::EventIndex;
use chronofeat_compiler::{CompiledQuery, Compiler};

/// Compile `features`, generate observation points and execute.
///
/// Compile, binding and configuration errors all surface before any row
/// is computed.
pub fn query<S: AsRef<str>>(
    index: &EventIndex,
    obs_dates: &ObservationDatesConfig,
    scope: &EventScopeConfig,
    config: &QueryConfig,
    features: &[S],
) -> Result<QueryResult> {
    let compiled = Compiler::new().compile(features)?;
    query_compiled(index, obs_dates, scope, config, &compiled)
}

/// [`query`] for an already compiled feature set
pub fn query_compiled(
    index: &EventIndex,
    obs_dates: &ObservationDatesConfig,
    scope: &EventScopeConfig,
    config: &QueryConfig,
    compiled: &CompiledQuery,
) -> Result<QueryResult> {
    let points = ObservationDateGenerator::new(index)
        .with_experiment_id(config.experiment_id.as_deref())
        .generate(obs_dates)?;
    tracing::info!(
        "Executing {} features at {} observation points (parallel: {})",
        compiled.len(),
        points.len(),
        config.parallel
    );
    QueryExecutor::new(index, scope, config).execute(compiled, &points)
}
