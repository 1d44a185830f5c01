//! Retry and circuit-breaker policy around a percentage source
//!
//! # Breaker states
//! ```text
//! Closed → Open:      failure_threshold consecutive failed attempts
//! Open → Half-Open:   after open_duration
//! Half-Open → Closed: probe attempt succeeds
//! Half-Open → Open:   probe attempt fails or is abandoned
//! ```
//!
//! Retry is the outer loop. Every attempt asks the breaker for admission;
//! once the breaker refuses, the remaining attempts are abandoned.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::PercentageSource;
use crate::error::CalcError;
use crate::models::Percentage;
use pcs_common::config::{CircuitBreakerConfig, RetryConfig};

pub const BREAKER_OPEN_MESSAGE: &str = "Circuit breaker is open";

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

/// Observable breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerStatus {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
enum BreakerState {
    Closed { failures: u32 },
    Open { until: Instant },
    /// A single probe is in flight
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    open_duration: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, open_duration: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            open_duration,
            state: Mutex::new(BreakerState::Closed { failures: 0 }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Ask to let one attempt through
    ///
    /// The attempt's outcome is reported through the returned permit. A
    /// permit dropped without an outcome (cancelled fetch) reopens a
    /// half-open breaker so a later probe can be admitted.
    pub fn try_acquire(&self) -> Option<BreakerPermit<'_>> {
        let mut state = self.lock();
        match *state {
            BreakerState::Closed { .. } => {}
            BreakerState::Open { until } if Instant::now() >= until => {
                debug!("Circuit breaker half-open, admitting probe");
                *state = BreakerState::HalfOpen;
            }
            BreakerState::Open { .. } | BreakerState::HalfOpen => return None,
        }

        Some(BreakerPermit {
            breaker: self,
            settled: false,
        })
    }

    fn on_success(&self) {
        let mut state = self.lock();
        if matches!(*state, BreakerState::HalfOpen) {
            debug!("Circuit breaker closed after successful probe");
        }
        *state = BreakerState::Closed { failures: 0 };
    }

    fn on_failure(&self) {
        let mut state = self.lock();
        let next = match *state {
            BreakerState::Closed { failures } if failures + 1 < self.failure_threshold => {
                BreakerState::Closed {
                    failures: failures + 1,
                }
            }
            BreakerState::Closed { .. } | BreakerState::HalfOpen => {
                warn!(
                    open_for_secs = self.open_duration.as_secs(),
                    "Circuit breaker opened"
                );
                BreakerState::Open {
                    until: Instant::now() + self.open_duration,
                }
            }
            BreakerState::Open { until } => BreakerState::Open { until },
        };
        *state = next;
    }

    /// An admitted attempt ended without an outcome
    ///
    /// A closed breaker is left as is; an abandoned probe counts as failed.
    fn on_abandoned(&self) {
        let mut state = self.lock();
        if matches!(*state, BreakerState::HalfOpen) {
            warn!("Circuit breaker probe abandoned, reopening");
            *state = BreakerState::Open {
                until: Instant::now() + self.open_duration,
            };
        }
    }

    pub fn status(&self) -> BreakerStatus {
        match *self.lock() {
            BreakerState::Closed { .. } => BreakerStatus::Closed,
            BreakerState::Open { .. } => BreakerStatus::Open,
            BreakerState::HalfOpen => BreakerStatus::HalfOpen,
        }
    }
}

/// Admission for one attempt; settle it with [`success`](Self::success) or
/// [`failure`](Self::failure)
#[must_use = "dropping a permit abandons the attempt"]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl BreakerPermit<'_> {
    pub fn success(mut self) {
        self.settled = true;
        self.breaker.on_success();
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.on_failure();
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_abandoned();
        }
    }
}

impl From<&CircuitBreakerConfig> for CircuitBreaker {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self::new(
            config.failure_threshold,
            Duration::from_secs(config.open_duration_secs),
        )
    }
}

/// Percentage source wrapped in retry and circuit breaking
pub struct GuardedSource<S> {
    inner: S,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl<S: PercentageSource> GuardedSource<S> {
    pub fn new(inner: S, retry: RetryPolicy, breaker: CircuitBreaker) -> Self {
        Self {
            inner,
            retry,
            breaker,
        }
    }

    pub fn breaker_status(&self) -> BreakerStatus {
        self.breaker.status()
    }
}

#[async_trait]
impl<S: PercentageSource> PercentageSource for GuardedSource<S> {
    async fn fetch(&self) -> Result<Percentage, CalcError> {
        let mut last_error = CalcError::external(BREAKER_OPEN_MESSAGE);

        for attempt in 1..=self.retry.max_attempts {
            let Some(permit) = self.breaker.try_acquire() else {
                debug!(attempt, "Circuit breaker rejected percentage fetch");
                return Err(CalcError::external(BREAKER_OPEN_MESSAGE));
            };

            match self.inner.fetch().await {
                Ok(percentage) => {
                    permit.success();
                    return Ok(percentage);
                }
                Err(e) => {
                    permit.failure();
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %e,
                        "Percentage fetch attempt failed"
                    );
                    last_error = e;
                }
            }

            if attempt < self.retry.max_attempts && !self.retry.backoff.is_zero() {
                tokio::time::sleep(self.retry.backoff).await;
            }
        }

        Err(last_error)
    }
}
