//! Calculation use case
//!
//! Resolves the percentage, computes and validates the result, then hands
//! the outcome to the audit recorder and the metrics sink. Every call ends
//! in exactly one audit record and exactly one metrics update.

use std::sync::Arc;
use tracing::{info, warn};

use super::{AuditRecorder, CalculationEngine, CalculationMetrics, PercentageResolver};
use crate::error::CalcError;
use crate::models::{CalculationRequest, CalculationResult, CallContext};

pub struct CalculationOrchestrator {
    resolver: PercentageResolver,
    engine: CalculationEngine,
    audit: Arc<dyn AuditRecorder>,
    metrics: Arc<dyn CalculationMetrics>,
}

impl CalculationOrchestrator {
    pub fn new(
        resolver: PercentageResolver,
        engine: CalculationEngine,
        audit: Arc<dyn AuditRecorder>,
        metrics: Arc<dyn CalculationMetrics>,
    ) -> Self {
        Self {
            resolver,
            engine,
            audit,
            metrics,
        }
    }

    /// Run one calculation on the caller's task
    ///
    /// Errors are returned unchanged after being audited.
    pub async fn execute(
        &self,
        request: CalculationRequest,
        context: &CallContext,
    ) -> Result<CalculationResult, CalcError> {
        info!(
            num1 = %request.num1(),
            num2 = %request.num2(),
            endpoint = %context.endpoint,
            "Processing calculation"
        );

        match self.run(&request).await.map_err(classify) {
            Ok(result) => {
                self.audit.record_success(&request, &result, context);
                self.metrics.record_success();
                info!(
                    result = %result.result(),
                    cached = result.used_cached_percentage(),
                    "Calculation completed"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(code = e.error_code(), "Calculation failed: {}", e);
                self.audit.record_failure(&request, &e, context);
                self.metrics.record_failure();
                Err(e)
            }
        }
    }

    async fn run(&self, request: &CalculationRequest) -> Result<CalculationResult, CalcError> {
        let resolved = self.resolver.resolve().await?;
        let result = self
            .engine
            .calculate(request, resolved.percentage, resolved.is_cached())?;
        self.engine.validate_result(&result)?;
        Ok(result)
    }
}

/// Source errors are absorbed by the resolver; one reaching this point is unexpected
fn classify(error: CalcError) -> CalcError {
    match error {
        CalcError::ExternalService(msg) => {
            CalcError::Unexpected(format!("Unexpected error during calculation: {}", msg))
        }
        other => other,
    }
}
