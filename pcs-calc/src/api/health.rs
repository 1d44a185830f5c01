//! Health check endpoint

use axum::{routing::get, Router};

use crate::AppState;

/// GET /health, GET /api/v1/health
pub async fn health_check() -> &'static str {
    "OK"
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/health", get(health_check))
}
