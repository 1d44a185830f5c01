//! Calculation endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, Uri},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, CalcError};
use crate::models::{CalculationRequest, CallContext};
use crate::AppState;

/// Request body; both operands are required
#[derive(Debug, Deserialize)]
pub struct CalculateBody {
    pub num1: Option<Decimal>,
    pub num2: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateResponse {
    pub result: Decimal,
    pub original_sum: Decimal,
    pub applied_percentage: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// POST /api/v1/calculate
///
/// Invalid bodies are rejected before the orchestrator runs and are not audited.
/// Once accepted, the calculation runs to completion even if the client goes away.
pub async fn calculate(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Result<Json<CalculateBody>, JsonRejection>,
) -> Result<Json<CalculateResponse>, ApiError> {
    let path = uri.path();
    let Json(body) = body.map_err(|rejection| {
        tracing::warn!("Rejected calculation body: {}", rejection.body_text());
        ApiError::validation(rejection.body_text(), path)
    })?;

    let request = CalculationRequest::from_optional(body.num1, body.num2)
        .map_err(|e| ApiError::from_calc(&e, path))?;
    let context = CallContext::new(path, method.as_str());

    // Detached so a client disconnect cannot cancel the calculation before it is audited
    let orchestrator = Arc::clone(&state.orchestrator);
    let result = tokio::spawn(async move { orchestrator.execute(request, &context).await })
        .await
        .map_err(|e| {
            ApiError::from_calc(
                &CalcError::Unexpected(format!("Calculation task failed: {}", e)),
                path,
            )
        })?
        .map_err(|e| ApiError::from_calc(&e, path))?;

    Ok(Json(CalculateResponse {
        result: result.result(),
        original_sum: result.sum(),
        applied_percentage: result.applied_percentage().value(),
        timestamp: result.computed_at(),
    }))
}
