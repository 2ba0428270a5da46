//! Monetary types for price and stake representation.

use rust_decimal::Decimal;

/// Decimal odds.
pub type Price = Decimal;

/// Stake or liability.
pub type Size = Decimal;

/// Round a monetary amount to two decimal places.
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp(2)
}
