//! Pure computation over bet histories.
//!
//! Statistics run Normalizer → Visibility filter → Aggregator on every call.
//! Nothing here performs I/O or keeps state between calls.

use crate::domain::{Bankroll, Bet};
use serde::Serialize;

pub mod aggregator;
pub mod leaderboard;
pub mod normalizer;
pub mod visibility;

pub use aggregator::{aggregate, percentage, BankrollStats};
pub use leaderboard::{quarter_containing, rank_bankrolls, LeaderboardCandidate, RankedBankroll};
pub use normalizer::{bet_outcome, normalize_bets, BetOutcome, NormalizedBet};
pub use visibility::{counts_toward_stats, filter_for_stats};

/// Every bet of the bankroll with its outcome, plus aggregate statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankrollReport {
    pub bets: Vec<NormalizedBet>,
    pub stats: BankrollStats,
}

/// Derive the full statistics report for a bankroll from its bet history.
pub fn calculate_bankroll_stats(bankroll: &Bankroll, bets: &[Bet]) -> BankrollReport {
    let normalized = normalize_bets(bets);
    let counted = filter_for_stats(bankroll.visibility, &normalized);
    let stats = aggregate(
        bankroll.visibility,
        bankroll.starting_capital,
        &normalized,
        &counted,
    );

    BankrollReport {
        bets: normalized,
        stats,
    }
}
