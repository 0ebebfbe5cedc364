//! Bet record and its two independent state fields: outcome and verification.

use crate::domain::{BankrollId, BetId, Decimal, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Outcome state of a bet.
///
/// Values outside the known set are preserved verbatim in `Unrecognized`
/// so they can be stored and displayed; they never contribute gain or profit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BetStatus {
    #[default]
    Pending,
    Won,
    Loss,
    Cashout,
    Void,
    Unrecognized(String),
}

impl BetStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BetStatus::Pending => "Pending",
            BetStatus::Won => "Won",
            BetStatus::Loss => "Loss",
            BetStatus::Cashout => "Cashout",
            BetStatus::Void => "Void",
            BetStatus::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for BetStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Pending" => BetStatus::Pending,
            "Won" => BetStatus::Won,
            "Loss" => BetStatus::Loss,
            "Cashout" => BetStatus::Cashout,
            "Void" => BetStatus::Void,
            _ => BetStatus::Unrecognized(value),
        }
    }
}

impl From<BetStatus> for String {
    fn from(value: BetStatus) -> Self {
        match value {
            BetStatus::Unrecognized(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for BetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moderator decision on the proof attached to a bet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "Pending",
            VerificationStatus::Accepted => "Accepted",
            VerificationStatus::Rejected => "Rejected",
        }
    }
}

impl FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(VerificationStatus::Pending),
            "Accepted" => Ok(VerificationStatus::Accepted),
            "Rejected" => Ok(VerificationStatus::Rejected),
            other => Err(format!("unknown verification status: {}", other)),
        }
    }
}

/// A single wager recorded against a bankroll.
///
/// `is_verified` and `verification_status` are stored separately and are
/// not reconciled here; consumers must check both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: BetId,
    pub user_id: UserId,
    pub bankroll_id: BankrollId,
    pub date: DateTime<Utc>,
    pub sport: String,
    pub label: String,
    pub stake: Decimal,
    pub odds: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cashout_amount: Option<Decimal>,
    pub verification_code: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub status: BetStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bet {
    /// True when both verification fields agree the bet was accepted.
    pub fn is_accepted_and_verified(&self) -> bool {
        self.verification_status == VerificationStatus::Accepted && self.is_verified
    }
}
