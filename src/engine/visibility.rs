//! Selects which bets count toward a bankroll's aggregate statistics.

use crate::domain::{Bet, Visibility};
use crate::engine::NormalizedBet;

/// Private bankrolls count every bet. Public bankrolls count a bet only when
/// it is both `Accepted` and flagged verified.
pub fn counts_toward_stats(visibility: Visibility, bet: &Bet) -> bool {
    match visibility {
        Visibility::Private => true,
        Visibility::Public => bet.is_accepted_and_verified(),
    }
}

/// Subset of `bets` used for aggregation. Display always uses the full list.
pub fn filter_for_stats(visibility: Visibility, bets: &[NormalizedBet]) -> Vec<&NormalizedBet> {
    bets.iter()
        .filter(|n| counts_toward_stats(visibility, &n.bet))
        .collect()
}
