//! Caller identity.
//!
//! Credentials are checked upstream; the gateway forwards the authenticated
//! user id in [`USER_ID_HEADER`]. These extractors resolve it to a stored user.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::str::FromStr;

use crate::api::AppState;
use crate::domain::{User, UserId};
use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// The authenticated caller, required to hold the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        let user_id = UserId::from_str(raw)
            .map_err(|_| AppError::Unauthorized("Invalid user id".to_string()))?;

        let user = state
            .repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))?;

        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, "Non-admin attempted an admin action");
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}
