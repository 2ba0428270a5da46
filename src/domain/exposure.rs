//! Exposure arithmetic for a single strategy selection.
//!
//! Profits are signed: a negative value is money at risk. Every figure is
//! re-derived from the order set on demand and rounded to two decimals.

use rust_decimal::Decimal;
use serde::Serialize;

use super::money::{round_money, Price, Size};

/// Profit if the selection wins and if it loses from matched bets.
///
/// Returns `(profit_if_win, profit_if_lose)`.
#[must_use]
pub fn calculate_matched_exposure(
    backs: &[(Price, Size)],
    lays: &[(Price, Size)],
) -> (Decimal, Decimal) {
    if backs.is_empty() && lays.is_empty() {
        return (Decimal::ZERO, Decimal::ZERO);
    }
    let back_win: Decimal = backs.iter().map(|&(p, s)| (p - Decimal::ONE) * s).sum();
    let back_lose: Decimal = backs.iter().map(|&(_, s)| -s).sum();
    let lay_win: Decimal = lays.iter().map(|&(p, s)| -((p - Decimal::ONE) * s)).sum();
    let lay_lose: Decimal = lays.iter().map(|&(_, s)| s).sum();
    (round_money(back_win + lay_win), round_money(back_lose + lay_lose))
}

/// Worst-case profit from unmatched bets.
///
/// Assumes every unmatched lay is matched when the selection wins and every
/// unmatched back is matched when it loses.
///
/// Returns `(profit_if_win, profit_if_lose)`.
#[must_use]
pub fn calculate_unmatched_exposure(
    backs: &[(Price, Size)],
    lays: &[(Price, Size)],
) -> (Decimal, Decimal) {
    if backs.is_empty() && lays.is_empty() {
        return (Decimal::ZERO, Decimal::ZERO);
    }
    let lay_exposure: Decimal = lays.iter().map(|&(p, s)| (p - Decimal::ONE) * -s).sum();
    let back_exposure: Decimal = backs.iter().map(|&(_, s)| -s).sum();
    (round_money(lay_exposure), round_money(back_exposure))
}

/// Exposure summary for one strategy on one selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Exposures {
    pub matched_profit_if_win: Decimal,
    pub matched_profit_if_lose: Decimal,
    pub worst_potential_unmatched_profit_if_win: Decimal,
    pub worst_potential_unmatched_profit_if_lose: Decimal,
    pub worst_possible_profit_on_win: Decimal,
    pub worst_possible_profit_on_lose: Decimal,
}

impl Exposures {
    /// Combine matched, unmatched and SP liabilities.
    #[must_use]
    pub fn new(
        matched: (Decimal, Decimal),
        unmatched: (Decimal, Decimal),
        sp_win_liability: Decimal,
        sp_lose_liability: Decimal,
    ) -> Self {
        Self {
            matched_profit_if_win: matched.0,
            matched_profit_if_lose: matched.1,
            worst_potential_unmatched_profit_if_win: unmatched.0,
            worst_potential_unmatched_profit_if_lose: unmatched.1,
            worst_possible_profit_on_win: matched.0 + unmatched.0 + sp_win_liability,
            worst_possible_profit_on_lose: matched.1 + unmatched.1 + sp_lose_liability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn matched_exposure_empty() {
        assert_eq!(
            calculate_matched_exposure(&[], &[]),
            (Decimal::ZERO, Decimal::ZERO)
        );
    }

    #[test]
    fn matched_exposure_back_and_lay() {
        let backs = [(dec!(5.6), dec!(2)), (dec!(5.8), dec!(2))];
        let lays = [(dec!(5.0), dec!(4))];
        let (win, lose) = calculate_matched_exposure(&backs, &lays);
        // 4.6*2 + 4.8*2 - 4*4 = 2.8 ; -2 - 2 + 4 = 0
        assert_eq!(win, dec!(2.80));
        assert_eq!(lose, dec!(0));
    }

    #[test]
    fn matched_exposure_rounds_to_two_places() {
        let backs = [(dec!(1.333), dec!(3))];
        let (win, _) = calculate_matched_exposure(&backs, &[]);
        assert_eq!(win, dec!(1.00));
    }

    #[test]
    fn unmatched_exposure_worst_case() {
        let backs = [(dec!(2.0), dec!(9.0))];
        let lays = [(dec!(3.0), dec!(5.0))];
        let (win, lose) = calculate_unmatched_exposure(&backs, &lays);
        assert_eq!(win, dec!(-10.00));
        assert_eq!(lose, dec!(-9.00));
    }

    #[test]
    fn exposures_combine_sp_liability() {
        let exposures = Exposures::new(
            (dec!(2), dec!(-1)),
            (dec!(-3), dec!(-4)),
            dec!(-5),
            dec!(-6),
        );
        assert_eq!(exposures.worst_possible_profit_on_win, dec!(-6));
        assert_eq!(exposures.worst_possible_profit_on_lose, dec!(-11));
    }
}
