use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::auth::CurrentUser;
use crate::api::bankrolls::{validate_amount, MessageResponse};
use crate::api::AppState;
use crate::domain::{BankrollId, Bet, BetId, BetStatus, Decimal, VerificationStatus};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBetRequest {
    pub bankroll_id: BankrollId,
    pub date: Option<DateTime<Utc>>,
    pub sport: String,
    pub label: String,
    pub stake: Decimal,
    pub odds: Decimal,
    pub cashout_amount: Option<Decimal>,
    pub verification_code: String,
    pub status: Option<BetStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBetRequest {
    pub date: Option<DateTime<Utc>>,
    pub sport: Option<String>,
    pub label: Option<String>,
    pub stake: Option<Decimal>,
    pub odds: Option<Decimal>,
    pub cashout_amount: Option<Decimal>,
    pub verification_code: Option<String>,
    pub status: Option<BetStatus>,
}

#[derive(Debug, Serialize)]
pub struct BetMutationResponse {
    pub message: String,
    pub bet: Bet,
}

fn require_text(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

impl UpdateBetRequest {
    /// Apply the provided fields. Returns true when the verification code changed.
    fn apply(self, bet: &mut Bet) -> Result<bool, AppError> {
        if let Some(date) = self.date {
            bet.date = date;
        }
        if let Some(sport) = self.sport {
            bet.sport = require_text(&sport, "Sport")?;
        }
        if let Some(label) = self.label {
            bet.label = require_text(&label, "Label")?;
        }
        if let Some(stake) = self.stake {
            validate_amount(stake, "Stake")?;
            bet.stake = stake;
        }
        if let Some(odds) = self.odds {
            validate_amount(odds, "Odds")?;
            bet.odds = odds;
        }
        if let Some(cashout) = self.cashout_amount {
            validate_amount(cashout, "Cashout amount")?;
            bet.cashout_amount = Some(cashout);
        }
        if let Some(status) = self.status {
            bet.status = status;
        }

        let mut code_changed = false;
        if let Some(code) = self.verification_code {
            let code = require_text(&code, "Verification code")?;
            if code != bet.verification_code {
                bet.verification_code = code;
                bet.verification_status = VerificationStatus::Pending;
                code_changed = true;
            }
        }
        Ok(code_changed)
    }
}

/// Bets of one of the caller's bankrolls, without derived values.
pub async fn list_bets(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(bankroll_id): Path<BankrollId>,
) -> Result<Json<Vec<Bet>>, AppError> {
    state
        .repo
        .get_owned_bankroll(bankroll_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Bankroll not found".to_string()))?;

    let bets = state
        .repo
        .list_owned_bets_for_bankroll(bankroll_id, user.id)
        .await?;
    Ok(Json(bets))
}

pub async fn create_bet(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateBetRequest>,
) -> Result<(StatusCode, Json<BetMutationResponse>), AppError> {
    let sport = require_text(&req.sport, "Sport")?;
    let label = require_text(&req.label, "Label")?;
    let verification_code = require_text(&req.verification_code, "Verification code")?;
    validate_amount(req.stake, "Stake")?;
    validate_amount(req.odds, "Odds")?;
    if let Some(cashout) = req.cashout_amount {
        validate_amount(cashout, "Cashout amount")?;
    }

    state
        .repo
        .get_owned_bankroll(req.bankroll_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Bankroll not found".to_string()))?;

    let now = Utc::now();
    let bet = Bet {
        id: BetId::generate(),
        user_id: user.id,
        bankroll_id: req.bankroll_id,
        date: req.date.unwrap_or(now),
        sport,
        label,
        stake: req.stake,
        odds: req.odds,
        cashout_amount: req.cashout_amount,
        verification_code,
        is_verified: false,
        verification_status: VerificationStatus::Pending,
        status: req.status.unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };
    state.repo.insert_bet(&bet).await?;

    tracing::info!(
        bet_id = %bet.id,
        bankroll_id = %bet.bankroll_id,
        status = %bet.status,
        "Bet created"
    );

    Ok((
        StatusCode::CREATED,
        Json(BetMutationResponse {
            message: "Bet created successfully".to_string(),
            bet,
        }),
    ))
}

pub async fn update_bet(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<BetId>,
    Json(req): Json<UpdateBetRequest>,
) -> Result<Json<BetMutationResponse>, AppError> {
    let mut bet = state
        .repo
        .get_owned_bet(id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Bet not found".to_string()))?;

    let code_changed = req.apply(&mut bet)?;
    bet.updated_at = Utc::now();

    if !state.repo.update_bet(&bet).await? {
        return Err(AppError::NotFound("Bet not found".to_string()));
    }

    tracing::info!(bet_id = %bet.id, code_changed, "Bet updated");

    Ok(Json(BetMutationResponse {
        message: "Bet updated successfully".to_string(),
        bet,
    }))
}

pub async fn delete_bet(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<BetId>,
) -> Result<Json<MessageResponse>, AppError> {
    if !state.repo.delete_bet(id, user.id).await? {
        return Err(AppError::NotFound("Bet not found".to_string()));
    }

    tracing::info!(bet_id = %id, user_id = %user.id, "Bet deleted");

    Ok(Json(MessageResponse {
        message: "Bet deleted successfully".to_string(),
    }))
}
