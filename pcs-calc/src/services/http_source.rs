//! HTTP percentage provider
//!
//! Expects `GET <url>` to answer with a JSON object carrying a `percentage`
//! field (number or decimal string).

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use super::PercentageSource;
use crate::error::CalcError;
use crate::models::Percentage;

const USER_AGENT: &str = concat!("pcs-calc/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct PercentageResponse {
    percentage: Option<Decimal>,
}

/// Percentage source backed by a remote HTTP endpoint
pub struct HttpPercentageSource {
    http_client: reqwest::Client,
    url: String,
}

impl HttpPercentageSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, CalcError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| CalcError::external(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PercentageSource for HttpPercentageSource {
    async fn fetch(&self) -> Result<Percentage, CalcError> {
        tracing::debug!(url = %self.url, "Querying percentage service");

        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| CalcError::external(format!("Percentage service request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CalcError::external(format!(
                "Percentage service returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: PercentageResponse = response
            .json()
            .await
            .map_err(|e| CalcError::external(format!("Malformed percentage response: {}", e)))?;

        let percentage = Percentage::from_optional(body.percentage)
            .map_err(|e| CalcError::external(format!("Percentage service returned {}", e)))?;

        tracing::info!(percentage = %percentage, "Percentage service responded");
        Ok(percentage)
    }
}
