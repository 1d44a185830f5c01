//! Percentage calculator services

pub mod audit_recorder;
pub mod calculation_engine;
pub mod http_source;
pub mod metrics;
pub mod orchestrator;
pub mod percentage_cache;
pub mod percentage_resolver;
pub mod percentage_source;
pub mod source_guard;

pub use audit_recorder::{AsyncAuditRecorder, AuditRecorder, CallRecordFactory};
pub use calculation_engine::CalculationEngine;
pub use http_source::HttpPercentageSource;
pub use metrics::{CalculationMetrics, CounterMetrics, MetricsSnapshot};
pub use orchestrator::CalculationOrchestrator;
pub use percentage_cache::{MokaPercentageCache, PercentageCache};
pub use percentage_resolver::{PercentageOrigin, PercentageResolver, ResolvedPercentage};
pub use percentage_source::{MockPercentageSource, PercentageSource};
pub use source_guard::{CircuitBreaker, GuardedSource, RetryPolicy};

use pcs_common::config::{PercentageSourceConfig, SourceMode};
use std::sync::Arc;
use std::time::Duration;

use crate::error::CalcError;

/// Build the configured percentage source wrapped in retry and circuit breaking
pub fn build_percentage_source(
    config: &PercentageSourceConfig,
) -> Result<Arc<dyn PercentageSource>, CalcError> {
    let retry = RetryPolicy::from(&config.retry);
    let breaker = CircuitBreaker::from(&config.circuit_breaker);

    let source: Arc<dyn PercentageSource> = match config.mode {
        SourceMode::Mock => {
            tracing::info!(
                failure_rate = config.mock.failure_rate,
                "Using simulated percentage source"
            );
            Arc::new(GuardedSource::new(
                MockPercentageSource::new(&config.mock),
                retry,
                breaker,
            ))
        }
        SourceMode::Http => {
            let url = config
                .url
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| CalcError::invalid_input("percentage_source.url is required"))?;
            tracing::info!(url = %url, "Using HTTP percentage source");
            Arc::new(GuardedSource::new(
                HttpPercentageSource::new(url, Duration::from_millis(config.timeout_ms))?,
                retry,
                breaker,
            ))
        }
    };

    Ok(source)
}
