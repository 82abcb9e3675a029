//! Money calculation utilities using rust_decimal for precision
//!
//! Amounts are stored as integer currency units (i64). Ratio math (percentage
//! discounts, refund proration) goes through `Decimal` and is rounded back to
//! whole units with half-away-from-zero rounding.

use rust_decimal::prelude::*;

/// Round a decimal amount back to whole currency units
pub fn round_units(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// `amount * numerator / denominator`, rounded to whole units.
/// Returns 0 when the denominator is zero.
pub fn prorate(amount: i64, numerator: i64, denominator: i64) -> i64 {
    if denominator == 0 {
        return 0;
    }
    let value = Decimal::from(amount) * Decimal::from(numerator) / Decimal::from(denominator);
    round_units(value)
}

/// `amount * ratio`, rounded to whole units
pub fn apply_ratio(amount: i64, ratio: Decimal) -> i64 {
    round_units(Decimal::from(amount) * ratio)
}
