//! Call history record and the call context it is built from

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::CalcError;

/// Endpoint and method of the inbound call, supplied by the transport layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub endpoint: String,
    pub method: String,
}

impl CallContext {
    pub fn new(endpoint: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
        }
    }
}

/// One audited inbound call, immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub id: Uuid,
    pub endpoint: String,
    pub method: String,
    pub request_params: Option<String>,
    pub response: Option<String>,
    pub error_message: Option<String>,
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

impl CallRecord {
    /// Create a record with a fresh id; `success` follows the status code
    pub fn new(
        context: &CallContext,
        status_code: u16,
        request_params: Option<String>,
        response: Option<String>,
        error_message: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, CalcError> {
        Self::from_parts(
            pcs_common::uuid_utils::generate(),
            context.endpoint.clone(),
            context.method.clone(),
            request_params,
            response,
            error_message,
            status_code,
            timestamp,
        )
    }

    /// Rebuild a record with a known id (storage round-trip)
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: Uuid,
        endpoint: String,
        method: String,
        request_params: Option<String>,
        response: Option<String>,
        error_message: Option<String>,
        status_code: u16,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, CalcError> {
        if endpoint.trim().is_empty() {
            return Err(CalcError::invalid_input("Endpoint cannot be blank"));
        }
        if method.trim().is_empty() {
            return Err(CalcError::invalid_input("HTTP method cannot be blank"));
        }
        if !(100..=599).contains(&status_code) {
            return Err(CalcError::invalid_input(format!(
                "Invalid HTTP status code: {}",
                status_code
            )));
        }

        Ok(Self {
            id,
            endpoint,
            method,
            request_params,
            response,
            error_message,
            status_code,
            timestamp,
            success: (200..300).contains(&status_code),
        })
    }

    pub fn has_error(&self) -> bool {
        self.error_message.is_some() || self.status_code >= 400
    }
}
