//! Calculation request and result value objects

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use super::Percentage;
use crate::error::CalcError;

/// Validated pair of operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalculationRequest {
    num1: Decimal,
    num2: Decimal,
}

impl CalculationRequest {
    /// Fails with `InvalidInput` when the sum is not representable
    pub fn new(num1: Decimal, num2: Decimal) -> Result<Self, CalcError> {
        if num1.checked_add(num2).is_none() {
            return Err(CalcError::invalid_input("Invalid numbers for addition"));
        }
        Ok(Self { num1, num2 })
    }

    /// Both operands are required
    pub fn from_optional(num1: Option<Decimal>, num2: Option<Decimal>) -> Result<Self, CalcError> {
        let num1 = num1.ok_or_else(|| CalcError::invalid_input("num1 is required"))?;
        let num2 = num2.ok_or_else(|| CalcError::invalid_input("num2 is required"))?;
        Self::new(num1, num2)
    }

    pub fn num1(&self) -> Decimal {
        self.num1
    }

    pub fn num2(&self) -> Decimal {
        self.num2
    }

    /// Exact sum; representability was checked at construction
    pub fn sum(&self) -> Result<Decimal, CalcError> {
        self.num1
            .checked_add(self.num2)
            .ok_or_else(|| CalcError::invalid_input("Invalid numbers for addition"))
    }
}

impl fmt::Display for CalculationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CalculationRequest(num1={}, num2={})", self.num1, self.num2)
    }
}

/// Outcome of a calculation
///
/// `sum`, `percentage_amount` and `result` carry exactly two fractional digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    sum: Decimal,
    applied_percentage: Percentage,
    percentage_amount: Decimal,
    result: Decimal,
    used_cached_percentage: bool,
    computed_at: DateTime<Utc>,
}

impl CalculationResult {
    pub fn new(
        sum: Decimal,
        applied_percentage: Percentage,
        percentage_amount: Decimal,
        result: Decimal,
        used_cached_percentage: bool,
        computed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sum,
            applied_percentage,
            percentage_amount,
            result,
            used_cached_percentage,
            computed_at,
        }
    }

    pub fn sum(&self) -> Decimal {
        self.sum
    }

    pub fn applied_percentage(&self) -> Percentage {
        self.applied_percentage
    }

    pub fn percentage_amount(&self) -> Decimal {
        self.percentage_amount
    }

    pub fn result(&self) -> Decimal {
        self.result
    }

    pub fn used_cached_percentage(&self) -> bool {
        self.used_cached_percentage
    }

    pub fn computed_at(&self) -> DateTime<Utc> {
        self.computed_at
    }
}

impl fmt::Display for CalculationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalculationResult(sum={}, appliedPercentage={}, percentageAmount={}, result={}, usedCachedPercentage={}, computedAt={})",
            self.sum,
            self.applied_percentage,
            self.percentage_amount,
            self.result,
            self.used_cached_percentage,
            self.computed_at.to_rfc3339()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_request_requires_both_operands() {
        assert_eq!(
            CalculationRequest::from_optional(None, Some(dec("1"))),
            Err(CalcError::invalid_input("num1 is required"))
        );
        assert_eq!(
            CalculationRequest::from_optional(Some(dec("1")), None),
            Err(CalcError::invalid_input("num2 is required"))
        );
    }

    #[test]
    fn test_request_rejects_unrepresentable_sum() {
        assert_eq!(
            CalculationRequest::new(Decimal::MAX, Decimal::ONE),
            Err(CalcError::invalid_input("Invalid numbers for addition"))
        );
    }

    #[test]
    fn test_request_sum_is_exact() {
        let request = CalculationRequest::new(dec("15.75"), dec("24.25")).unwrap();
        assert_eq!(request.sum().unwrap(), dec("40.00"));

        let request = CalculationRequest::new(dec("0.001"), dec("0.002")).unwrap();
        assert_eq!(request.sum().unwrap(), dec("0.003"));
    }

    #[test]
    fn test_request_serializes_operands() {
        let request = CalculationRequest::new(dec("10"), dec("20.5")).unwrap();
        let json = serde_json::to_value(request).unwrap();
        assert_eq!(json["num1"], "10");
        assert_eq!(json["num2"], "20.5");
        assert_eq!(request.to_string(), "CalculationRequest(num1=10, num2=20.5)");
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = CalculationResult::new(
            dec("30.00"),
            Percentage::new(dec("15")).unwrap(),
            dec("4.50"),
            dec("34.50"),
            true,
            Utc::now(),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["sum"], "30.00");
        assert_eq!(json["appliedPercentage"], "15");
        assert_eq!(json["percentageAmount"], "4.50");
        assert_eq!(json["result"], "34.50");
        assert_eq!(json["usedCachedPercentage"], true);
        assert!(json["computedAt"].is_string());
    }
}
