//! Shared fixtures for pcs-calc integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pcs_calc::db::{CallHistoryStore, SqliteCallHistoryStore};
use pcs_calc::error::CalcError;
use pcs_calc::models::Percentage;
use pcs_calc::services::{
    AsyncAuditRecorder, CalculationEngine, CalculationOrchestrator, CounterMetrics,
    MokaPercentageCache, PercentageCache, PercentageResolver, PercentageSource,
};
use pcs_calc::{build_router, AppState};

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn pct(s: &str) -> Percentage {
    Percentage::new(dec(s)).unwrap()
}

/// Percentage source whose outcome can be switched between calls
pub struct SwitchableSource {
    value: Mutex<Option<Percentage>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl SwitchableSource {
    pub fn returning(value: &str) -> Self {
        Self {
            value: Mutex::new(Some(pct(value))),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn failing() -> Self {
        Self {
            value: Mutex::new(None),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Answer every fetch only after `delay`
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set(&self, value: Option<&str>) {
        *self.value.lock().unwrap() = value.map(pct);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PercentageSource for SwitchableSource {
    async fn fetch(&self) -> Result<Percentage, CalcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let value = *self.value.lock().unwrap();
        value.ok_or_else(|| CalcError::external("Simulated service failure"))
    }
}

/// Fully wired service over an in-memory database
pub struct TestApp {
    pub router: axum::Router,
    pub source: Arc<SwitchableSource>,
    pub cache: Arc<MokaPercentageCache>,
    pub audit: Arc<AsyncAuditRecorder>,
    pub metrics: Arc<CounterMetrics>,
    pub history: Arc<dyn CallHistoryStore>,
}

impl TestApp {
    pub async fn new(source: SwitchableSource) -> Self {
        let pool = pcs_common::db::init_memory_database().await.unwrap();
        let history: Arc<dyn CallHistoryStore> = Arc::new(SqliteCallHistoryStore::new(pool));

        let source = Arc::new(source);
        let cache = Arc::new(MokaPercentageCache::new(
            std::time::Duration::from_secs(60),
            100,
        ));
        let resolver = PercentageResolver::new(source.clone(), cache.clone());
        let audit = Arc::new(AsyncAuditRecorder::start(history.clone(), 2, 100));
        let metrics = Arc::new(CounterMetrics::new());

        let orchestrator = Arc::new(CalculationOrchestrator::new(
            resolver,
            CalculationEngine::new(),
            audit.clone(),
            metrics.clone(),
        ));
        let router = build_router(AppState::new(orchestrator, history.clone(), metrics.clone()));

        Self {
            router,
            source,
            cache,
            audit,
            metrics,
            history,
        }
    }

    /// Wait for every queued audit record to be written
    pub async fn flush_audit(&self) {
        assert!(self.audit.shutdown(std::time::Duration::from_secs(5)).await);
    }

    pub async fn seed_cache(&self, value: &str) {
        self.cache.put(pct(value)).await;
    }

    pub async fn cache_invalidate(&self) {
        self.cache.invalidate().await;
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
