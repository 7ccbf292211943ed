//! Decimal helpers for ledger amounts.
//!
//! Never use floating-point for money. Amounts are `rust_decimal::Decimal`
//! and are quantized only when handed to the ledger.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places every ledger amount carries.
pub const CURRENCY_PRECISION: u32 = 2;

/// Quantize to [`CURRENCY_PRECISION`] places, rounding half away from zero
/// (half-up for the non-negative amounts a ledger holds).
pub fn quantize(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(CURRENCY_PRECISION, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_PRECISION);
    rounded
}

/// Exact sum of an iterator of amounts.
pub fn sum<I>(amounts: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().fold(Decimal::ZERO, |acc, a| acc + a)
}
