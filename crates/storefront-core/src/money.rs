//! Minor-unit conversion for payment gateway amounts.
//!
//! Prices are carried as [`Decimal`] in major units (pounds, dollars) through
//! the pipeline and converted to integer minor units (pence, cents) exactly
//! once, at the gateway boundary.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Convert a major-unit amount to integer minor units (two decimal places).
///
/// Rounds half-up to the nearest minor unit, matching gateway behavior for
/// sub-penny amounts produced by percentage discounts.
///
/// Returns `None` if the amount does not fit in `i64` minor units.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    let scaled = (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
    scaled.to_i64()
}
