//! Single-slot percentage cache with time-based expiry

use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

use crate::models::Percentage;
use pcs_common::config::{CacheConfig, MAX_CACHE_EXPIRATION_MINUTES};

const CACHE_KEY: &str = "currentPercentage";

/// Last known good percentage
///
/// Operations never fail. `put` overwrites the value and restarts its
/// expiry clock.
#[async_trait]
pub trait PercentageCache: Send + Sync {
    async fn put(&self, percentage: Percentage);
    async fn get(&self) -> Option<Percentage>;
    async fn invalidate(&self);
}

/// In-memory cache backed by moka
pub struct MokaPercentageCache {
    cache: Cache<&'static str, Percentage>,
}

impl MokaPercentageCache {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    /// Expiry is capped at [`MAX_CACHE_EXPIRATION_MINUTES`]
    pub fn from_config(config: &CacheConfig) -> Self {
        let minutes = config.expiration_minutes.min(MAX_CACHE_EXPIRATION_MINUTES);
        Self::new(
            Duration::from_secs(minutes.saturating_mul(60)),
            config.maximum_size,
        )
    }
}

#[async_trait]
impl PercentageCache for MokaPercentageCache {
    async fn put(&self, percentage: Percentage) {
        tracing::debug!(percentage = %percentage, "Caching percentage");
        self.cache.insert(CACHE_KEY, percentage).await;
    }

    async fn get(&self) -> Option<Percentage> {
        let cached = self.cache.get(&CACHE_KEY).await;
        match &cached {
            Some(p) => tracing::debug!(percentage = %p, "Percentage cache hit"),
            None => tracing::debug!("Percentage cache miss"),
        }
        cached
    }

    async fn invalidate(&self) {
        self.cache.invalidate(&CACHE_KEY).await;
    }
}
