//! Decimal helpers for monetary amounts.
//!
//! Amounts are stored as `NUMERIC(10,2)` and computed with
//! [`rust_decimal::Decimal`]. Rounding is always half away from zero.

use rust_decimal::{Decimal, RoundingStrategy};

/// Largest value a `NUMERIC(10,2)` column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Total digits of every amount column.
const AMOUNT_PRECISION: u32 = 10;

/// Round to two decimal places, half away from zero.
#[must_use]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to three decimal places (weights are stored as `NUMERIC(10,3)`).
#[must_use]
pub fn round3(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
}

/// Format as a fixed two-decimal string, the way `NUMERIC(10,2)` columns
/// come back from the database (`1299.9` becomes `"1299.90"`).
#[must_use]
pub fn to_cents_string(value: Decimal) -> String {
    format!("{:.2}", round2(value))
}

/// Returns true when `value` has no more than `places` significant decimals.
///
/// Trailing zeros do not count, so `12.50` has one decimal place.
#[must_use]
pub fn has_max_decimals(value: Decimal, places: u32) -> bool {
    value.normalize().scale() <= places
}

/// Largest value a `NUMERIC(10, places)` column holds (`99999999.99` for two
/// places, `9999999.999` for three).
#[must_use]
pub fn column_max(places: u32) -> Decimal {
    let mantissa = 10_i128.pow(AMOUNT_PRECISION) - 1;
    Decimal::from_i128_with_scale(mantissa, places)
}

/// Returns true when `value` fits a `NUMERIC(10,2)` column.
#[must_use]
pub fn fits_amount(value: Decimal) -> bool {
    value.abs() <= MAX_AMOUNT
}
