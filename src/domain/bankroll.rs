//! Bankroll: a capital pool that bets are recorded against.

use crate::domain::{BankrollId, Decimal, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Who may see a bankroll, and which bets count toward its statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "Public",
            Visibility::Private => "Private",
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Public" => Ok(Visibility::Public),
            "Private" => Ok(Visibility::Private),
            other => Err(format!("unknown visibility: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub label: String,
    pub symbol: String,
}

impl Currency {
    /// All three fields must be non-blank.
    pub fn is_complete(&self) -> bool {
        !self.code.trim().is_empty()
            && !self.label.trim().is_empty()
            && !self.symbol.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bankroll {
    pub id: BankrollId,
    pub user_id: UserId,
    pub name: String,
    pub starting_capital: Decimal,
    pub visibility: Visibility,
    pub currency: Currency,
    pub is_shareable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shareable_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
