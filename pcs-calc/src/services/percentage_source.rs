//! Percentage source abstraction and the simulated provider
//!
//! The simulated provider stands in for the external percentage service:
//! it sleeps for a random latency, fails at a configured rate and otherwise
//! returns the default percentage with up to five points of jitter.

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::CalcError;
use crate::models::Percentage;
use pcs_common::config::MockSourceConfig;

/// Maximum distance from the default percentage the simulated provider returns
const JITTER_POINTS: f64 = 5.0;

/// Provider of the current percentage
///
/// Implementations may be slow or fail; callers treat every error as a soft
/// failure.
#[async_trait]
pub trait PercentageSource: Send + Sync {
    async fn fetch(&self) -> Result<Percentage, CalcError>;
}

/// Simulated external percentage service
pub struct MockPercentageSource {
    default_percentage: f64,
    failure_rate: f64,
    min_latency: Duration,
    max_latency: Duration,
}

impl MockPercentageSource {
    pub fn new(config: &MockSourceConfig) -> Self {
        let failure_rate = if config.failure_rate.is_finite() {
            config.failure_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let min_latency = Duration::from_millis(config.min_latency_ms);
        let max_latency = Duration::from_millis(config.max_latency_ms).max(min_latency);

        Self {
            default_percentage: config.default_percentage,
            failure_rate,
            min_latency,
            max_latency,
        }
    }

    /// Decide latency, outcome and value up front; the RNG handle is not `Send`
    fn roll(&self) -> (Duration, Option<f64>) {
        let mut rng = rand::thread_rng();
        let latency = rng.gen_range(self.min_latency..=self.max_latency);
        if rng.gen_bool(self.failure_rate) {
            return (latency, None);
        }
        let jitter = rng.gen_range(-JITTER_POINTS..=JITTER_POINTS);
        (latency, Some((self.default_percentage + jitter).clamp(0.0, 100.0)))
    }
}

#[async_trait]
impl PercentageSource for MockPercentageSource {
    async fn fetch(&self) -> Result<Percentage, CalcError> {
        debug!("Calling simulated percentage service");

        let (latency, value) = self.roll();
        tokio::time::sleep(latency).await;

        let Some(value) = value else {
            warn!("Simulated percentage service failure");
            return Err(CalcError::external("Simulated service failure"));
        };

        let value = Decimal::from_f64(value)
            .map(|d| d.round_dp(2))
            .ok_or_else(|| CalcError::external("Simulated service produced an invalid value"))?;
        let percentage = Percentage::new(value)
            .map_err(|e| CalcError::external(format!("Simulated service produced {}", e)))?;

        info!(percentage = %percentage, "Simulated percentage service responded");
        Ok(percentage)
    }
}
