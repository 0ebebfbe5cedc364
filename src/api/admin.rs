//! Moderation queue and user management. Every handler requires [`AdminUser`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::auth::AdminUser;
use crate::api::bankrolls::MessageResponse;
use crate::api::AppState;
use crate::db::{AdminBetRow, AdminUserRow, PageQuery};
use crate::domain::{Bet, BetId, Role, Subscription, User, UserId, VerificationStatus};
use crate::error::AppError;

/// Largest page an admin listing will serve.
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct AdminListQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBetsResponse {
    pub bets: Vec<AdminBetRow>,
    pub total_bets: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUsersResponse {
    pub users: Vec<AdminUserRow>,
    pub total_users: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

#[derive(Debug, Serialize)]
pub struct ModerationResponse {
    pub message: String,
    pub bet: Bet,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct UserMutationResponse {
    pub message: String,
    pub user: User,
}

fn total_pages(total: i64, limit: i64) -> i64 {
    if total <= 0 || limit <= 0 {
        0
    } else {
        total / limit + i64::from(total % limit != 0)
    }
}

impl AdminListQuery {
    /// Validate against 1-based pages. Oversized limits are clamped to [`MAX_PAGE_SIZE`].
    fn into_search(self, default_limit: i64) -> Result<PageQuery, AppError> {
        let limit = self.limit.unwrap_or(default_limit);
        let page = self.page.unwrap_or(1);
        if limit < 1 {
            return Err(AppError::BadRequest("limit must be at least 1".to_string()));
        }
        if page < 1 {
            return Err(AppError::BadRequest("page must be at least 1".to_string()));
        }
        let query = PageQuery {
            search: self.search,
            limit: limit.min(MAX_PAGE_SIZE),
            page,
        };
        if query.offset().is_none() {
            return Err(AppError::BadRequest("page is out of range".to_string()));
        }
        Ok(query)
    }
}

pub async fn list_bets(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<AdminBetsResponse>, AppError> {
    let search = query.into_search(state.config.admin_page_size)?;
    let (bets, total_bets) = state.repo.search_bets(&search).await?;

    Ok(Json(AdminBetsResponse {
        bets,
        total_bets,
        total_pages: total_pages(total_bets, search.limit),
        current_page: search.page,
    }))
}

async fn moderate_bet(
    state: &AppState,
    admin: &User,
    id: BetId,
    status: VerificationStatus,
) -> Result<Bet, AppError> {
    let is_verified = status == VerificationStatus::Accepted;
    let bet = state
        .repo
        .set_bet_verification(id, is_verified, status)
        .await?
        .ok_or_else(|| AppError::NotFound("Bet not found".to_string()))?;

    tracing::info!(
        bet_id = %id,
        admin_id = %admin.id,
        verification_status = status.as_str(),
        "Bet moderated"
    );
    Ok(bet)
}

pub async fn approve_bet(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<BetId>,
) -> Result<Json<ModerationResponse>, AppError> {
    let bet = moderate_bet(&state, &admin, id, VerificationStatus::Accepted).await?;
    Ok(Json(ModerationResponse {
        message: "Bet approved successfully".to_string(),
        bet,
    }))
}

pub async fn reject_bet(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<BetId>,
) -> Result<Json<ModerationResponse>, AppError> {
    let bet = moderate_bet(&state, &admin, id, VerificationStatus::Rejected).await?;
    Ok(Json(ModerationResponse {
        message: "Bet rejected successfully".to_string(),
        bet,
    }))
}

pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<AdminUsersResponse>, AppError> {
    let search = query.into_search(state.config.admin_page_size)?;
    let (users, total_users) = state.repo.search_users(&search).await?;

    Ok(Json(AdminUsersResponse {
        users,
        total_users,
        total_pages: total_pages(total_users, search.limit),
        current_page: search.page,
    }))
}

pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserMutationResponse>), AppError> {
    let username = req.username.trim();
    let email = req.email.trim().to_lowercase();
    if username.is_empty() {
        return Err(AppError::BadRequest("Username is required".to_string()));
    }
    if !is_plausible_email(&email) {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    if state.repo.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::BadRequest("Email already in use".to_string()));
    }

    let user = User {
        id: UserId::generate(),
        username: username.to_string(),
        email,
        role: req.role,
        subscription: Subscription::default(),
        created_at: chrono::Utc::now(),
    };
    state.repo.insert_user(&user).await.map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::BadRequest("Username already in use".to_string())
        }
        other => other.into(),
    })?;

    tracing::info!(user_id = %user.id, admin_id = %admin.id, role = user.role.as_str(), "User created");

    Ok((
        StatusCode::CREATED,
        Json(UserMutationResponse {
            message: "User created successfully".to_string(),
            user,
        }),
    ))
}

pub async fn update_user_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<UserId>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<UserMutationResponse>, AppError> {
    if !state.repo.update_user_role(id, req.role).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %id, admin_id = %admin.id, role = req.role.as_str(), "User role updated");

    Ok(Json(UserMutationResponse {
        message: "User role updated successfully".to_string(),
        user,
    }))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<UserId>,
) -> Result<Json<MessageResponse>, AppError> {
    if id == admin.id {
        return Err(AppError::BadRequest(
            "Admins cannot delete their own account".to_string(),
        ));
    }
    if !state.repo.delete_user(id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %id, admin_id = %admin.id, "User deleted with bankrolls and bets");

    Ok(Json(MessageResponse {
        message: "User deleted successfully".to_string(),
    }))
}

pub(crate) fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}
