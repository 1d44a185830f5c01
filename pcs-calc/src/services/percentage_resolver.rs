//! Live-or-cached percentage resolution
//!
//! ```text
//! ATTEMPT_LIVE → SUCCEED                 cache written, LIVE
//! ATTEMPT_LIVE → FAIL → ATTEMPT_CACHE → HIT   CACHED, cache untouched
//!                                     → MISS  ServiceUnavailable
//! ```
//! No retries happen at this layer; the source applies its own policy.

use std::sync::Arc;
use tracing::{info, warn};

use super::{PercentageCache, PercentageSource};
use crate::error::CalcError;
use crate::models::Percentage;

pub const UNAVAILABLE_MESSAGE: &str =
    "Percentage service is unavailable and no cached value exists";

/// Where a resolved percentage came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PercentageOrigin {
    Live,
    Cached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPercentage {
    pub percentage: Percentage,
    pub origin: PercentageOrigin,
}

impl ResolvedPercentage {
    pub fn is_cached(&self) -> bool {
        self.origin == PercentageOrigin::Cached
    }
}

pub struct PercentageResolver {
    source: Arc<dyn PercentageSource>,
    cache: Arc<dyn PercentageCache>,
}

impl PercentageResolver {
    pub fn new(source: Arc<dyn PercentageSource>, cache: Arc<dyn PercentageCache>) -> Self {
        Self { source, cache }
    }

    /// Resolve the percentage to apply
    ///
    /// Source errors are absorbed; the only failure is `ServiceUnavailable`
    /// when the source fails and the cache is empty.
    pub async fn resolve(&self) -> Result<ResolvedPercentage, CalcError> {
        match self.source.fetch().await {
            Ok(percentage) => {
                self.cache.put(percentage).await;
                Ok(ResolvedPercentage {
                    percentage,
                    origin: PercentageOrigin::Live,
                })
            }
            Err(source_error) => {
                warn!(error = %source_error, "Percentage source failed, falling back to cache");
                match self.cache.get().await {
                    Some(percentage) => {
                        info!(percentage = %percentage, "Using cached percentage");
                        Ok(ResolvedPercentage {
                            percentage,
                            origin: PercentageOrigin::Cached,
                        })
                    }
                    None => {
                        tracing::error!("No cached percentage available");
                        Err(CalcError::ServiceUnavailable(UNAVAILABLE_MESSAGE.to_string()))
                    }
                }
            }
        }
    }
}
