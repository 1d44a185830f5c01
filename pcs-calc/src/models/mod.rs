//! Domain value objects

pub mod calculation;
pub mod call_record;
pub mod percentage;

pub use calculation::{CalculationRequest, CalculationResult};
pub use call_record::{CallContext, CallRecord};
pub use percentage::Percentage;

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits of monetary amounts
pub const MONEY_SCALE: u32 = 2;

/// Round half-up to two decimals, always carrying exactly two fractional digits
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}
