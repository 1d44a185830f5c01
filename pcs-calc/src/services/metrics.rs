//! Calculation outcome counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sink notified once per orchestrated calculation
pub trait CalculationMetrics: Send + Sync {
    fn record_success(&self);
    fn record_failure(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub success_count: u64,
    pub failure_count: u64,
}

#[derive(Debug, Default)]
pub struct CounterMetrics {
    success: AtomicU64,
    failure: AtomicU64,
}

impl CounterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            success_count: self.success.load(Ordering::Relaxed),
            failure_count: self.failure.load(Ordering::Relaxed),
        }
    }
}

impl CalculationMetrics for CounterMetrics {
    fn record_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failure.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = CounterMetrics::new();
        metrics.record_success();
        metrics.record_success();
        metrics.record_failure();
        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                success_count: 2,
                failure_count: 1
            }
        );
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let json = serde_json::to_value(CounterMetrics::new().snapshot()).unwrap();
        assert_eq!(json, serde_json::json!({"successCount": 0, "failureCount": 0}));
    }
}
