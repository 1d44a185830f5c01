//! Call-history query endpoints
//!
//! All listing endpoints share the paging parameters `page` (0-indexed),
//! `size` (1..=100), `sortBy` and `sortDirection`.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::Uri,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::CallRecord;
use crate::pagination::{PageRequest, PageResult, SortDirection, SortField, DEFAULT_PAGE_SIZE};
use crate::AppState;

/// Paging query parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
}

impl PageQuery {
    fn to_request(&self) -> pcs_common::Result<PageRequest> {
        let sort_by = match self.sort_by.as_deref() {
            Some(s) => SortField::parse(s)?,
            None => SortField::default(),
        };
        let direction = match self.sort_direction.as_deref() {
            Some(s) => SortDirection::parse(s)?,
            None => SortDirection::default(),
        };

        PageRequest::new(
            self.page.unwrap_or(0),
            self.size.unwrap_or(DEFAULT_PAGE_SIZE as i64),
            sort_by,
            direction,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct EndpointQuery {
    pub endpoint: String,
}

/// Call-history item as exposed over HTTP
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallHistoryItem {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub method: String,
    pub request_params: Option<Value>,
    pub response: Option<Value>,
    pub error_message: Option<String>,
    pub success: bool,
}

/// Stored payloads are JSON text; embed them as JSON, or as a string if not parseable
fn embed(text: Option<String>) -> Option<Value> {
    text.map(|t| serde_json::from_str(&t).unwrap_or(Value::String(t)))
}

impl From<CallRecord> for CallHistoryItem {
    fn from(record: CallRecord) -> Self {
        Self {
            id: record.id,
            timestamp: record.timestamp,
            endpoint: record.endpoint,
            method: record.method,
            request_params: embed(record.request_params),
            response: embed(record.response),
            error_message: record.error_message,
            success: record.success,
        }
    }
}

type PageResponse = Result<Json<PageResult<CallHistoryItem>>, ApiError>;

fn page_request(
    query: Result<Query<PageQuery>, QueryRejection>,
    path: &str,
) -> Result<PageRequest, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::validation(e.body_text(), path))?;
    query.to_request().map_err(|e| ApiError::from_common(e, path))
}

fn to_response(page: PageResult<CallRecord>) -> Json<PageResult<CallHistoryItem>> {
    Json(page.map(CallHistoryItem::from))
}

/// GET /api/v1/history
pub async fn get_history(
    State(state): State<AppState>,
    uri: Uri,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> PageResponse {
    let path = uri.path();
    let page = page_request(query, path)?;
    tracing::info!(page = page.page, size = page.size, "Retrieving call history");

    let result = state
        .history
        .find_all(&page)
        .await
        .map_err(|e| ApiError::from_common(e, path))?;

    tracing::info!("Retrieved {} history records", result.total_elements);
    Ok(to_response(result))
}

/// GET /api/v1/history/:id
pub async fn get_call_by_id(
    State(state): State<AppState>,
    uri: Uri,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<CallHistoryItem>, ApiError> {
    let path = uri.path();
    let Path(id) = id.map_err(|e| ApiError::validation(e.body_text(), path))?;
    let id = pcs_common::uuid_utils::parse(&id).map_err(|e| ApiError::from_common(e, path))?;

    let record = state
        .history
        .find_by_id(id)
        .await
        .map_err(|e| ApiError::from_common(e, path))?
        .ok_or_else(|| {
            ApiError::from_common(
                pcs_common::Error::NotFound(format!("Call history not found with id: {}", id)),
                path,
            )
        })?;

    Ok(Json(record.into()))
}

/// GET /api/v1/history/date-range?from&to
pub async fn get_history_by_date_range(
    State(state): State<AppState>,
    uri: Uri,
    range: Result<Query<DateRangeQuery>, QueryRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> PageResponse {
    let path = uri.path();
    let Query(range) = range.map_err(|e| ApiError::validation(e.body_text(), path))?;
    let page = page_request(query, path)?;

    let from = pcs_common::time::parse_datetime(&range.from)
        .map_err(|e| ApiError::from_common(e, path))?;
    let to = pcs_common::time::parse_datetime(&range.to)
        .map_err(|e| ApiError::from_common(e, path))?;

    let result = state
        .history
        .find_by_date_range(from, to, &page)
        .await
        .map_err(|e| ApiError::from_common(e, path))?;

    Ok(to_response(result))
}

/// GET /api/v1/history/by-endpoint?endpoint
pub async fn get_history_by_endpoint(
    State(state): State<AppState>,
    uri: Uri,
    filter: Result<Query<EndpointQuery>, QueryRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> PageResponse {
    let path = uri.path();
    let Query(filter) = filter.map_err(|e| ApiError::validation(e.body_text(), path))?;
    let page = page_request(query, path)?;
    tracing::info!(endpoint = %filter.endpoint, "Retrieving call history by endpoint");

    let result = state
        .history
        .find_by_endpoint(&filter.endpoint, &page)
        .await
        .map_err(|e| ApiError::from_common(e, path))?;

    Ok(to_response(result))
}

/// GET /api/v1/history/successful
pub async fn get_successful_history(
    State(state): State<AppState>,
    uri: Uri,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> PageResponse {
    let path = uri.path();
    let page = page_request(query, path)?;

    let result = state
        .history
        .find_successful(&page)
        .await
        .map_err(|e| ApiError::from_common(e, path))?;

    Ok(to_response(result))
}

/// GET /api/v1/history/failed
pub async fn get_failed_history(
    State(state): State<AppState>,
    uri: Uri,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> PageResponse {
    let path = uri.path();
    let page = page_request(query, path)?;

    let result = state
        .history
        .find_failed(&page)
        .await
        .map_err(|e| ApiError::from_common(e, path))?;

    Ok(to_response(result))
}

/// GET /api/v1/history/count
pub async fn count_calls(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Json<Value>, ApiError> {
    let total = state
        .history
        .count()
        .await
        .map_err(|e| ApiError::from_common(e, uri.path()))?;

    tracing::info!("Total calls in history: {}", total);
    Ok(Json(json!({ "totalCalls": total })))
}

/// Build call-history routes
///
/// Fixed segments are registered alongside `:id`; axum prefers static matches.
pub fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/history", get(get_history))
        .route("/api/v1/history/date-range", get(get_history_by_date_range))
        .route("/api/v1/history/by-endpoint", get(get_history_by_endpoint))
        .route("/api/v1/history/successful", get(get_successful_history))
        .route("/api/v1/history/failed", get(get_failed_history))
        .route("/api/v1/history/count", get(count_calls))
        .route("/api/v1/history/:id", get(get_call_by_id))
}
