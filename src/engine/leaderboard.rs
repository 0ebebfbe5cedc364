//! Quarterly ranking of public bankrolls.

use crate::domain::decimal::fixed2;
use crate::domain::{Bankroll, Bet, Decimal};
use crate::engine::{bet_outcome, counts_toward_stats, percentage};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::Serialize;

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuarterWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl QuarterWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

fn start_of_month(year: i32, month: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Calendar quarter (UTC) that contains `now`.
pub fn quarter_containing(now: DateTime<Utc>) -> QuarterWindow {
    let first_month = ((now.month() - 1) / 3) * 3 + 1;
    let (next_year, next_month) = if first_month == 10 {
        (now.year() + 1, 1)
    } else {
        (now.year(), first_month + 3)
    };

    QuarterWindow {
        start: start_of_month(now.year(), first_month).unwrap_or(now),
        end: start_of_month(next_year, next_month).unwrap_or(DateTime::<Utc>::MAX_UTC),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardStats {
    #[serde(serialize_with = "fixed2::serialize")]
    pub total_stakes: Decimal,
    #[serde(serialize_with = "fixed2::serialize")]
    pub total_profit: Decimal,
    #[serde(serialize_with = "fixed2::serialize")]
    pub profit_percentage: Decimal,
}

/// A bankroll competing for a leaderboard slot, with the bets on record.
#[derive(Debug, Clone)]
pub struct LeaderboardCandidate {
    pub bankroll: Bankroll,
    pub owner: String,
    pub bets: Vec<Bet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedBankroll {
    pub rank: usize,
    #[serde(flatten)]
    pub bankroll: Bankroll,
    pub owner: String,
    pub stats: LeaderboardStats,
}

/// Stakes and profit of the bets dated inside `window` that pass the
/// bankroll's visibility filter.
pub fn leaderboard_stats(bankroll: &Bankroll, bets: &[Bet], window: QuarterWindow) -> LeaderboardStats {
    let counted = bets
        .iter()
        .filter(|bet| window.contains(bet.date))
        .filter(|bet| counts_toward_stats(bankroll.visibility, bet));

    let (total_stakes, total_profit) = counted.fold(
        (Decimal::zero(), Decimal::zero()),
        |(stakes, profit), bet| {
            (
                stakes.saturating_add(bet.stake),
                profit.saturating_add(bet_outcome(bet).profit),
            )
        },
    );

    LeaderboardStats {
        total_stakes,
        total_profit,
        profit_percentage: percentage(total_profit, total_stakes),
    }
}

/// Rank candidates by profit percentage, then total profit, then bankroll id,
/// keeping at most `limit` entries.
pub fn rank_bankrolls(
    candidates: Vec<LeaderboardCandidate>,
    window: QuarterWindow,
    limit: usize,
) -> Vec<RankedBankroll> {
    let mut scored: Vec<(LeaderboardCandidate, LeaderboardStats)> = candidates
        .into_iter()
        .map(|c| {
            let stats = leaderboard_stats(&c.bankroll, &c.bets, window);
            (c, stats)
        })
        .collect();

    scored.sort_by(|(a, a_stats), (b, b_stats)| {
        b_stats
            .profit_percentage
            .cmp(&a_stats.profit_percentage)
            .then_with(|| b_stats.total_profit.cmp(&a_stats.total_profit))
            .then_with(|| a.bankroll.id.cmp(&b.bankroll.id))
    });

    scored
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(idx, (candidate, stats))| RankedBankroll {
            rank: idx + 1,
            bankroll: candidate.bankroll,
            owner: candidate.owner,
            stats,
        })
        .collect()
}
