//! Reduces normalized bets into bankroll-level statistics.

use crate::domain::decimal::fixed2;
use crate::domain::{Decimal, VerificationStatus, Visibility};
use crate::engine::NormalizedBet;
use serde::Serialize;
use tracing::warn;

/// Aggregate figures for one bankroll. Amounts and percentages serialize as
/// two-digit strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankrollStats {
    #[serde(serialize_with = "fixed2::serialize")]
    pub total_stakes: Decimal,
    #[serde(serialize_with = "fixed2::serialize")]
    pub total_profit: Decimal,
    #[serde(serialize_with = "fixed2::serialize")]
    pub roi: Decimal,
    #[serde(serialize_with = "fixed2::serialize")]
    pub progression: Decimal,
    pub pending_bets_count: usize,
    pub is_verified: bool,
}

/// `numerator / denominator × 100`, or 0 unless the denominator is positive.
///
/// Results beyond the representable range are clamped.
pub fn percentage(numerator: Decimal, denominator: Decimal) -> Decimal {
    if !denominator.is_positive() {
        return Decimal::zero();
    }

    numerator
        .checked_div(denominator)
        .and_then(|ratio| ratio.checked_mul(Decimal::hundred()))
        .unwrap_or_else(|| {
            warn!(
                numerator = %numerator,
                denominator = %denominator,
                "Percentage out of range, clamping"
            );
            numerator
                .saturating_div(denominator)
                .saturating_mul(Decimal::hundred())
        })
}

/// Bets still awaiting (or refused) moderation, counted over the full list.
fn pending_bets_count(all: &[NormalizedBet]) -> usize {
    all.iter()
        .filter(|n| n.bet.verification_status != VerificationStatus::Accepted)
        .count()
}

/// Compute statistics from the counted subset, with the moderation backlog
/// taken from `all`.
pub fn aggregate(
    visibility: Visibility,
    starting_capital: Decimal,
    all: &[NormalizedBet],
    counted: &[&NormalizedBet],
) -> BankrollStats {
    let total_stakes: Decimal = counted.iter().map(|n| n.bet.stake).sum();
    let total_profit: Decimal = counted.iter().map(|n| n.profit).sum();
    let pending = pending_bets_count(all);

    BankrollStats {
        total_stakes,
        total_profit,
        roi: percentage(total_profit, total_stakes),
        progression: percentage(total_profit, starting_capital),
        pending_bets_count: pending,
        is_verified: visibility == Visibility::Public && pending == 0 && !counted.is_empty(),
    }
}
