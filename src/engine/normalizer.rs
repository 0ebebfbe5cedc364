//! Per-bet gain/profit derivation.

use crate::domain::decimal::fixed2;
use crate::domain::{Bet, BetStatus, Decimal};
use serde::Serialize;
use tracing::warn;

/// Money returned by a bet and the net result against its stake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BetOutcome {
    pub gain: Decimal,
    pub profit: Decimal,
}

/// A bet with its derived outcome attached. Serializes as the original bet
/// fields plus `gain` and `profit` as two-digit strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedBet {
    #[serde(flatten)]
    pub bet: Bet,
    #[serde(serialize_with = "fixed2::serialize")]
    pub gain: Decimal,
    #[serde(serialize_with = "fixed2::serialize")]
    pub profit: Decimal,
}

/// Derive gain and profit from a bet's status.
///
/// | status    | gain                    | profit                          |
/// |-----------|-------------------------|---------------------------------|
/// | Won       | stake × odds            | gain − stake                    |
/// | Loss      | 0                       | −stake                          |
/// | Cashout   | stake × odds − cashout  | (stake × odds − stake) − cashout |
/// | otherwise | 0                       | 0                               |
pub fn bet_outcome(bet: &Bet) -> BetOutcome {
    match &bet.status {
        BetStatus::Won => {
            let gain = payout(bet);
            BetOutcome {
                gain,
                profit: gain.saturating_sub(bet.stake),
            }
        }
        BetStatus::Loss => BetOutcome {
            gain: Decimal::zero(),
            profit: -bet.stake,
        },
        BetStatus::Cashout => {
            let payout = payout(bet);
            let cashout = bet.cashout_amount.unwrap_or_default();
            BetOutcome {
                gain: payout.saturating_sub(cashout),
                profit: payout.saturating_sub(bet.stake).saturating_sub(cashout),
            }
        }
        BetStatus::Pending | BetStatus::Void | BetStatus::Unrecognized(_) => {
            BetOutcome::default()
        }
    }
}

/// `stake × odds`, clamped to the representable range.
fn payout(bet: &Bet) -> Decimal {
    bet.stake.checked_mul(bet.odds).unwrap_or_else(|| {
        warn!(
            bet_id = %bet.id,
            stake = %bet.stake,
            odds = %bet.odds,
            "Bet payout out of range, clamping"
        );
        bet.stake.saturating_mul(bet.odds)
    })
}

/// Attach outcomes to every bet, keeping input length and order.
pub fn normalize_bets(bets: &[Bet]) -> Vec<NormalizedBet> {
    bets.iter()
        .map(|bet| {
            let BetOutcome { gain, profit } = bet_outcome(bet);
            NormalizedBet {
                bet: bet.clone(),
                gain,
                profit,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{bet, d};

    #[test]
    fn won_pays_stake_times_odds() {
        let outcome = bet_outcome(&bet(BetStatus::Won, "100", "2.0"));
        assert_eq!(outcome.gain.to_fixed_2(), "200.00");
        assert_eq!(outcome.profit.to_fixed_2(), "100.00");
    }

    #[test]
    fn won_with_fractional_odds_rounds_at_output_only() {
        let outcome = bet_outcome(&bet(BetStatus::Won, "10", "1.855"));
        assert_eq!(outcome.gain, d("18.550"));
        assert_eq!(outcome.gain.to_fixed_2(), "18.55");
        assert_eq!(outcome.profit.to_fixed_2(), "8.55");
    }

    #[test]
    fn loss_forfeits_stake() {
        let outcome = bet_outcome(&bet(BetStatus::Loss, "40", "3.5"));
        assert!(outcome.gain.is_zero());
        assert_eq!(outcome.profit, d("-40"));
    }

    #[test]
    fn cashout_subtracts_amount_from_gain_and_profit() {
        let mut b = bet(BetStatus::Cashout, "100", "2.0");
        b.cashout_amount = Some(d("30"));
        let outcome = bet_outcome(&b);
        assert_eq!(outcome.gain.to_fixed_2(), "170.00");
        assert_eq!(outcome.profit.to_fixed_2(), "70.00");
    }

    #[test]
    fn cashout_without_amount_behaves_like_won() {
        let outcome = bet_outcome(&bet(BetStatus::Cashout, "100", "2.0"));
        assert_eq!(outcome.gain, d("200"));
        assert_eq!(outcome.profit, d("100"));
    }

    #[test]
    fn unsettled_and_unknown_statuses_yield_zero() {
        for status in [
            BetStatus::Pending,
            BetStatus::Void,
            BetStatus::Unrecognized("HalfWon".to_string()),
        ] {
            let mut b = bet(status, "75", "1.9");
            b.cashout_amount = Some(d("10"));
            assert_eq!(bet_outcome(&b), BetOutcome::default());
        }
    }

    #[test]
    fn oversized_payout_clamps_instead_of_panicking() {
        let outcome = bet_outcome(&bet(BetStatus::Won, "100000000000000000000", "10000000000"));
        assert_eq!(outcome.gain, Decimal::MAX);
        assert_eq!(outcome.profit, Decimal::MAX.saturating_sub(d("100000000000000000000")));

        let mut cashout = bet(BetStatus::Cashout, "-100000000000000000000", "10000000000");
        cashout.cashout_amount = Some(Decimal::MAX);
        let outcome = bet_outcome(&cashout);
        assert_eq!(outcome.gain, Decimal::MIN);
        assert_eq!(outcome.profit, Decimal::MIN);
    }

    #[test]
    fn normalize_keeps_length_and_order() {
        let bets = vec![
            bet(BetStatus::Loss, "1", "2"),
            bet(BetStatus::Won, "2", "2"),
            bet(BetStatus::Pending, "3", "2"),
        ];
        let normalized = normalize_bets(&bets);

        assert_eq!(normalized.len(), bets.len());
        for (n, original) in normalized.iter().zip(&bets) {
            assert_eq!(&n.bet, original);
        }
        assert_eq!(normalized[1].gain, d("4"));
    }

    #[test]
    fn normalized_bet_serializes_original_fields_plus_outcome() {
        let mut b = bet(BetStatus::Won, "100", "2.0");
        b.sport = "Tennis".to_string();
        let json = serde_json::to_value(&normalize_bets(&[b])[0]).unwrap();

        assert_eq!(json["sport"], "Tennis");
        assert_eq!(json["status"], "Won");
        assert_eq!(json["verificationStatus"], "Pending");
        assert_eq!(json["isVerified"], false);
        assert_eq!(json["gain"], "200.00");
        assert_eq!(json["profit"], "100.00");
    }
}
