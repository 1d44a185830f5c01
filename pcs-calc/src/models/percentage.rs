//! Percentage value object

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;

use crate::error::CalcError;

/// Fractional digits kept by [`Percentage::as_fraction`]
const FRACTION_SCALE: u32 = 10;

/// Percentage in the closed range [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Percentage(Decimal);

impl Percentage {
    pub fn new(value: Decimal) -> Result<Self, CalcError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(CalcError::invalid_input("Percentage cannot be negative"));
        }
        if value > Decimal::ONE_HUNDRED {
            return Err(CalcError::invalid_input("Percentage cannot exceed 100%"));
        }
        Ok(Self(value))
    }

    /// Build from an optional value; `None` is rejected like an out-of-range value
    pub fn from_optional(value: Option<Decimal>) -> Result<Self, CalcError> {
        value
            .ok_or_else(|| CalcError::invalid_input("Percentage value cannot be null"))
            .and_then(Self::new)
    }

    /// Build from a float (config values, mock source); NaN and infinities are rejected
    pub fn from_f64(value: f64) -> Result<Self, CalcError> {
        Self::from_optional(Decimal::from_f64(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// `value / 100` with 10 fractional digits, rounded half-up
    pub fn as_fraction(&self) -> Decimal {
        (self.0 / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(FRACTION_SCALE, RoundingStrategy::MidpointAwayFromZero)
    }

    /// `amount × fraction`, unrounded
    pub fn apply_to(&self, amount: Decimal) -> Result<Decimal, CalcError> {
        amount.checked_mul(self.as_fraction()).ok_or_else(|| {
            CalcError::calculation(
                "Error performing calculation: arithmetic overflow or precision issue",
            )
        })
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
