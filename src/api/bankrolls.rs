use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::auth::CurrentUser;
use crate::api::AppState;
use crate::domain::{Bankroll, BankrollId, Currency, Decimal, UserId, Visibility};
use crate::engine::{calculate_bankroll_stats, BankrollStats, NormalizedBet};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBankrollRequest {
    pub name: String,
    pub starting_capital: Decimal,
    #[serde(default)]
    pub visibility: Visibility,
    pub currency: Currency,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBankrollRequest {
    pub name: Option<String>,
    pub starting_capital: Option<Decimal>,
    pub visibility: Option<Visibility>,
    pub currency: Option<Currency>,
    pub is_shareable: Option<bool>,
}

/// A bankroll as served: its own fields, every bet with outcome, and stats.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankrollWithStats {
    #[serde(flatten)]
    pub bankroll: Bankroll,
    pub bets: Vec<NormalizedBet>,
    pub stats: BankrollStats,
}

#[derive(Debug, Serialize)]
pub struct BankrollMutationResponse {
    pub message: String,
    pub bankroll: BankrollWithStats,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("Bankroll name is required".to_string()));
    }
    Ok(())
}

/// Upper bound accepted for any submitted amount or odds.
pub(crate) const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Amounts and odds must lie in `[0, MAX_AMOUNT]`.
pub(crate) fn validate_amount(value: Decimal, field: &str) -> Result<(), AppError> {
    if value.is_negative() {
        return Err(AppError::BadRequest(format!("{} must not be negative", field)));
    }
    if value > Decimal::from(MAX_AMOUNT) {
        return Err(AppError::BadRequest(format!(
            "{} must not exceed {}",
            field, MAX_AMOUNT
        )));
    }
    Ok(())
}

fn validate_currency(currency: &Currency) -> Result<(), AppError> {
    if !currency.is_complete() {
        return Err(AppError::BadRequest("Invalid currency data".to_string()));
    }
    Ok(())
}

/// A user may hold at most one public bankroll.
async fn ensure_no_other_public(
    state: &AppState,
    owner: UserId,
    excluding: Option<BankrollId>,
) -> Result<(), AppError> {
    if state.repo.find_public_bankroll(owner, excluding).await?.is_some() {
        return Err(AppError::BadRequest(
            "You can only have one public bankroll at a time.".to_string(),
        ));
    }
    Ok(())
}

fn new_shareable_link() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Load the bankroll's bets and compute its statistics.
pub(crate) async fn with_stats(
    state: &AppState,
    bankroll: Bankroll,
) -> Result<BankrollWithStats, AppError> {
    let bets = state.repo.list_bets_for_bankroll(bankroll.id).await?;
    let report = calculate_bankroll_stats(&bankroll, &bets);

    Ok(BankrollWithStats {
        bankroll,
        bets: report.bets,
        stats: report.stats,
    })
}

pub async fn list_bankrolls(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<BankrollWithStats>>, AppError> {
    let bankrolls = state.repo.list_bankrolls_for_user(user.id).await?;
    let reports = try_join_all(bankrolls.into_iter().map(|b| with_stats(&state, b))).await?;
    Ok(Json(reports))
}

pub async fn create_bankroll(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateBankrollRequest>,
) -> Result<(StatusCode, Json<BankrollMutationResponse>), AppError> {
    validate_name(&req.name)?;
    validate_amount(req.starting_capital, "Starting capital")?;
    validate_currency(&req.currency)?;

    if req.visibility == Visibility::Public {
        ensure_no_other_public(&state, user.id, None).await?;
    }

    let now = chrono::Utc::now();
    let bankroll = Bankroll {
        id: BankrollId::generate(),
        user_id: user.id,
        name: req.name.trim().to_string(),
        starting_capital: req.starting_capital,
        visibility: req.visibility,
        currency: req.currency,
        is_shareable: false,
        shareable_link: None,
        created_at: now,
        updated_at: now,
    };
    state.repo.insert_bankroll(&bankroll).await?;

    tracing::info!(
        bankroll_id = %bankroll.id,
        user_id = %user.id,
        visibility = bankroll.visibility.as_str(),
        "Bankroll created"
    );

    let bankroll = with_stats(&state, bankroll).await?;
    Ok((
        StatusCode::CREATED,
        Json(BankrollMutationResponse {
            message: "Bankroll created successfully".to_string(),
            bankroll,
        }),
    ))
}

pub async fn get_bankroll(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<BankrollId>,
) -> Result<Json<BankrollWithStats>, AppError> {
    let bankroll = state
        .repo
        .get_owned_bankroll(id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Bankroll not found".to_string()))?;

    Ok(Json(with_stats(&state, bankroll).await?))
}

pub async fn update_bankroll(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<BankrollId>,
    Json(req): Json<UpdateBankrollRequest>,
) -> Result<Json<BankrollMutationResponse>, AppError> {
    let mut bankroll = state
        .repo
        .get_owned_bankroll(id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Bankroll not found".to_string()))?;

    if req.visibility == Some(Visibility::Public) {
        ensure_no_other_public(&state, user.id, Some(id)).await?;
    }

    if let Some(name) = req.name {
        validate_name(&name)?;
        bankroll.name = name.trim().to_string();
    }
    if let Some(capital) = req.starting_capital {
        validate_amount(capital, "Starting capital")?;
        bankroll.starting_capital = capital;
    }
    if let Some(currency) = req.currency {
        validate_currency(&currency)
            .map_err(|_| AppError::BadRequest("Incomplete currency data for update".to_string()))?;
        bankroll.currency = currency;
    }
    if let Some(visibility) = req.visibility {
        bankroll.visibility = visibility;
    }
    if let Some(shareable) = req.is_shareable {
        bankroll.is_shareable = shareable;
        if shareable && bankroll.shareable_link.is_none() {
            bankroll.shareable_link = Some(new_shareable_link());
        }
    }
    bankroll.updated_at = chrono::Utc::now();

    if !state.repo.update_bankroll(&bankroll).await? {
        return Err(AppError::NotFound("Bankroll not found".to_string()));
    }

    tracing::info!(bankroll_id = %bankroll.id, user_id = %user.id, "Bankroll updated");

    let bankroll = with_stats(&state, bankroll).await?;
    Ok(Json(BankrollMutationResponse {
        message: "Bankroll updated successfully".to_string(),
        bankroll,
    }))
}

pub async fn delete_bankroll(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<BankrollId>,
) -> Result<Json<MessageResponse>, AppError> {
    if !state.repo.delete_bankroll(id, user.id).await? {
        return Err(AppError::NotFound("Bankroll not found".to_string()));
    }

    tracing::info!(bankroll_id = %id, user_id = %user.id, "Bankroll deleted with its bets");

    Ok(Json(MessageResponse {
        message: "Bankroll and associated bets deleted successfully".to_string(),
    }))
}

/// Read-only view of a bankroll whose owner enabled sharing. No caller identity needed.
pub async fn get_shared_bankroll(
    State(state): State<AppState>,
    Path(link): Path<String>,
) -> Result<Json<BankrollWithStats>, AppError> {
    let bankroll = state
        .repo
        .get_shared_bankroll(link.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("Bankroll not found".to_string()))?;

    Ok(Json(with_stats(&state, bankroll).await?))
}
