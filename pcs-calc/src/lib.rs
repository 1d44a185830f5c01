//! pcs-calc library - percentage calculator service
//!
//! Computes `(num1 + num2)` plus a percentage of that sum. The percentage
//! comes from an unreliable external source guarded by retry and circuit
//! breaking, with a cached fallback. Every calculation is audited
//! asynchronously into a queryable call history.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod pagination;
pub mod services;

use db::CallHistoryStore;
use services::{CalculationOrchestrator, CounterMetrics};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<CalculationOrchestrator>,
    pub history: Arc<dyn CallHistoryStore>,
    pub metrics: Arc<CounterMetrics>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<CalculationOrchestrator>,
        history: Arc<dyn CallHistoryStore>,
        metrics: Arc<CounterMetrics>,
    ) -> Self {
        Self {
            orchestrator,
            history,
            metrics,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/v1/calculate", post(api::calculate))
        .route("/api/v1/metrics", get(api::get_metrics))
        .merge(api::history_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
