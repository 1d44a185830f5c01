//! Numeric calculation pipeline
//!
//! `percentage_amount` is rounded to two decimals before it is added to the
//! sum, and `result` is checked against that rounded amount.

use rust_decimal::Decimal;

use crate::error::CalcError;
use crate::models::{round_money, CalculationRequest, CalculationResult, Percentage};

const OVERFLOW_MESSAGE: &str =
    "Error performing calculation: arithmetic overflow or precision issue";

#[derive(Debug, Clone, Copy, Default)]
pub struct CalculationEngine;

impl CalculationEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate(
        &self,
        request: &CalculationRequest,
        percentage: Percentage,
        used_cache: bool,
    ) -> Result<CalculationResult, CalcError> {
        let sum = request
            .sum()
            .map_err(|_| CalcError::calculation(OVERFLOW_MESSAGE))?;
        let percentage_amount = round_money(percentage.apply_to(sum)?);
        let result = sum
            .checked_add(percentage_amount)
            .map(round_money)
            .ok_or_else(|| CalcError::calculation(OVERFLOW_MESSAGE))?;

        Ok(CalculationResult::new(
            round_money(sum),
            percentage,
            percentage_amount,
            result,
            used_cache,
            pcs_common::time::now(),
        ))
    }

    /// Re-check the result invariants; never modifies the result
    pub fn validate_result(&self, result: &CalculationResult) -> Result<(), CalcError> {
        if result.result() < Decimal::ZERO {
            return Err(CalcError::calculation("Final result cannot be negative"));
        }

        let expected = result
            .sum()
            .checked_add(result.percentage_amount())
            .map(round_money)
            .ok_or_else(|| CalcError::calculation(OVERFLOW_MESSAGE))?;

        if result.result() != expected {
            return Err(CalcError::calculation(format!(
                "Result inconsistency: expected {} but got {}",
                expected,
                result.result()
            )));
        }

        Ok(())
    }
}
