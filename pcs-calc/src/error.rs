//! Error types for pcs-calc
//!
//! `CalcError` is the domain taxonomy produced by the calculation pipeline.
//! `ApiError` is its HTTP rendering: every error body carries message,
//! details, numeric status, timestamp and request path.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Calculation pipeline error
///
/// The `Display` text is the bare message; it is what gets recorded in the
/// call history for failed calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CalcError {
    /// Malformed or missing request values (400)
    #[error("{0}")]
    InvalidInput(String),

    /// Arithmetic failure or result invariant violation (400)
    #[error("{0}")]
    Calculation(String),

    /// The percentage source call failed; absorbed by the resolver
    #[error("{0}")]
    ExternalService(String),

    /// Source failed and no cached percentage exists (503)
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Anything unclassified (500)
    #[error("{0}")]
    Unexpected(String),
}

impl CalcError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        CalcError::InvalidInput(msg.into())
    }

    pub fn calculation(msg: impl Into<String>) -> Self {
        CalcError::Calculation(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        CalcError::ExternalService(msg.into())
    }

    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidInput(_) => "INVALID_INPUT",
            CalcError::Calculation(_) => "CALCULATION_ERROR",
            CalcError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            CalcError::ServiceUnavailable(_) => "PERCENTAGE_SERVICE_UNAVAILABLE",
            CalcError::Unexpected(_) => "UNEXPECTED_ERROR",
        }
    }

    /// HTTP status the error maps to (also stored in the call history)
    pub fn status_code(&self) -> u16 {
        match self {
            CalcError::InvalidInput(_) | CalcError::Calculation(_) => 400,
            CalcError::ServiceUnavailable(_) => 503,
            CalcError::ExternalService(_) | CalcError::Unexpected(_) => 500,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub details: String,
    pub status: u16,
    pub timestamp: DateTime<Utc>,
    pub path: String,
}

/// HTTP error with the request path it occurred on
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
    details: String,
    path: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: &'static str, details: impl Into<String>, path: &str) -> Self {
        Self {
            status,
            message,
            details: details.into(),
            path: path.to_string(),
        }
    }

    /// Request body or query string could not be parsed (400)
    pub fn validation(details: impl Into<String>, path: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Validation failed", details, path)
    }

    pub fn from_calc(err: &CalcError, path: &str) -> Self {
        match err {
            CalcError::InvalidInput(msg) => {
                tracing::warn!("Invalid input: {}", msg);
                Self::new(StatusCode::BAD_REQUEST, "Invalid input", msg.clone(), path)
            }
            CalcError::Calculation(msg) => {
                tracing::warn!("Calculation error: {}", msg);
                Self::new(StatusCode::BAD_REQUEST, "Calculation error", msg.clone(), path)
            }
            CalcError::ServiceUnavailable(msg) => {
                tracing::error!("Service unavailable: {}", msg);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable",
                    msg.clone(),
                    path,
                )
            }
            CalcError::ExternalService(msg) | CalcError::Unexpected(msg) => {
                tracing::error!("Unexpected error: {}", msg);
                Self::internal(path)
            }
        }
    }

    pub fn from_common(err: pcs_common::Error, path: &str) -> Self {
        match err {
            pcs_common::Error::NotFound(msg) => {
                Self::new(StatusCode::NOT_FOUND, "Not found", msg, path)
            }
            pcs_common::Error::InvalidInput(msg) => {
                tracing::warn!("Invalid request parameters: {}", msg);
                Self::new(StatusCode::BAD_REQUEST, "Invalid request parameters", msg, path)
            }
            other => {
                tracing::error!("Unexpected error: {}", other);
                Self::internal(path)
            }
        }
    }

    fn internal(path: &str) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            "An unexpected error occurred",
            path,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.message.to_string(),
            details: self.details,
            status: self.status.as_u16(),
            timestamp: pcs_common::time::now(),
            path: self.path,
        };

        (self.status, Json(body)).into_response()
    }
}
