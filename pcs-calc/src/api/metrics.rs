//! Calculation counters endpoint

use axum::{extract::State, Json};

use crate::services::MetricsSnapshot;
use crate::AppState;

/// GET /api/v1/metrics
pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
