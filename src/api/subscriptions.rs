//! Caller profile and the billing state kept in sync by provider webhooks.
//!
//! The provider posts signed events to `/api/stripe/webhook`; only the subset
//! that moves a user's subscription status is acted on. Payloads are matched
//! to users by customer id.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;

use crate::api::admin::{is_plausible_email, UserMutationResponse};
use crate::api::auth::CurrentUser;
use crate::api::webhook_signature::{self, SIGNATURE_HEADER};
use crate::api::AppState;
use crate::domain::{Subscription, SubscriptionStatus, User};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub is_active: bool,
}

pub async fn get_profile(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

impl UpdateProfileRequest {
    /// Trimmed username and lowercased email that differ from the current ones.
    /// Blank fields count as absent.
    fn changes(&self, user: &User) -> Result<(Option<String>, Option<String>), AppError> {
        let username = self
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty() && *u != user.username)
            .map(str::to_string);
        let email = self
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty() && *e != user.email);

        if let Some(email) = &email {
            if !is_plausible_email(email) {
                return Err(AppError::BadRequest("A valid email is required".to_string()));
            }
        }
        Ok((username, email))
    }
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(mut user): CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserMutationResponse>, AppError> {
    let (username, email) = req.changes(&user)?;

    if let Some(username) = username {
        if state.repo.find_user_by_username(&username).await?.is_some() {
            return Err(AppError::BadRequest("Username already in use".to_string()));
        }
        user.username = username;
    }
    if let Some(email) = email {
        if state.repo.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::BadRequest("Email already in use".to_string()));
        }
        user.email = email;
    }

    let updated = state
        .repo
        .update_user_profile(user.id, &user.username, &user.email)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::BadRequest("Username or email already in use".to_string())
            }
            other => other.into(),
        })?;
    if !updated {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(Json(UserMutationResponse {
        message: "Profile updated successfully".to_string(),
        user,
    }))
}

pub async fn get_subscription(
    CurrentUser(user): CurrentUser,
) -> Result<Json<SubscriptionResponse>, AppError> {
    if user.subscription.subscription_id.is_none() {
        return Err(AppError::NotFound("No subscription found".to_string()));
    }

    let is_active = user.subscription.is_active();
    Ok(Json(SubscriptionResponse {
        subscription: user.subscription,
        is_active,
    }))
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: WebhookObject,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebhookObject {
    id: Option<String>,
    customer: Option<String>,
    subscription: Option<String>,
    status: Option<String>,
    period_end: Option<i64>,
    current_period_end: Option<i64>,
    plan: Option<WebhookPlan>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebhookPlan {
    id: Option<String>,
}

/// Subscription change an event asks for, before it is applied to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SubscriptionChange {
    PaymentSucceeded {
        subscription_id: Option<String>,
        period_end: Option<DateTime<Utc>>,
    },
    Updated {
        subscription_id: Option<String>,
        status: SubscriptionStatus,
        plan_id: Option<String>,
        period_end: Option<DateTime<Utc>>,
    },
    Deleted,
}

fn datetime_from_secs(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

impl SubscriptionChange {
    /// Interpret an event. `Ok(None)` means the event is not one we act on.
    fn from_event(event_type: &str, object: WebhookObject) -> Result<Option<Self>, String> {
        let change = match event_type {
            "invoice.payment_succeeded" => SubscriptionChange::PaymentSucceeded {
                subscription_id: object.subscription,
                period_end: object.period_end.and_then(datetime_from_secs),
            },
            "customer.subscription.updated" => {
                let raw = object.status.unwrap_or_default();
                SubscriptionChange::Updated {
                    subscription_id: object.id,
                    status: SubscriptionStatus::from_str(&raw)?,
                    plan_id: object.plan.and_then(|p| p.id),
                    period_end: object.current_period_end.and_then(datetime_from_secs),
                }
            }
            "customer.subscription.deleted" => SubscriptionChange::Deleted,
            _ => return Ok(None),
        };
        Ok(Some(change))
    }

    fn apply(self, subscription: &mut Subscription) {
        match self {
            SubscriptionChange::PaymentSucceeded {
                subscription_id,
                period_end,
            } => {
                subscription.status = SubscriptionStatus::Active;
                if subscription_id.is_some() {
                    subscription.subscription_id = subscription_id;
                }
                if period_end.is_some() {
                    subscription.current_period_end = period_end;
                }
            }
            SubscriptionChange::Updated {
                subscription_id,
                status,
                plan_id,
                period_end,
            } => {
                subscription.status = status;
                if subscription_id.is_some() {
                    subscription.subscription_id = subscription_id;
                }
                if plan_id.is_some() {
                    subscription.plan_id = plan_id;
                }
                subscription.current_period_end = period_end;
            }
            SubscriptionChange::Deleted => {
                subscription.status = SubscriptionStatus::Canceled;
                subscription.current_period_end = None;
            }
        }
    }
}

/// Billing provider webhook.
///
/// Unsigned, forged and malformed payloads are rejected with 400; anything
/// else is acknowledged, including events for unknown customers.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    webhook_signature::verify(
        &body,
        signature,
        state.config.stripe_webhook_secret.as_deref(),
        Utc::now().timestamp(),
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "Rejected webhook signature");
        AppError::BadRequest(format!("Webhook Error: {}", e))
    })?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Webhook Error: {}", e)))?;
    let received = Json(json!({"received": true}));

    let customer_id = event.data.object.customer.clone();
    let change = match SubscriptionChange::from_event(&event.event_type, event.data.object) {
        Ok(Some(change)) => change,
        Ok(None) => {
            tracing::info!(event_type = %event.event_type, "Ignoring unhandled webhook event");
            return Ok(received);
        }
        Err(e) => {
            tracing::warn!(event_type = %event.event_type, error = %e, "Ignoring webhook event");
            return Ok(received);
        }
    };

    let Some(customer_id) = customer_id else {
        tracing::warn!(event_type = %event.event_type, "Webhook event without customer id");
        return Ok(received);
    };

    let Some(mut user) = state.repo.find_user_by_customer_id(&customer_id).await? else {
        tracing::warn!(
            event_type = %event.event_type,
            customer_id = %customer_id,
            "No user for webhook customer"
        );
        return Ok(received);
    };

    change.apply(&mut user.subscription);
    state
        .repo
        .update_subscription(user.id, &user.subscription)
        .await?;

    tracing::info!(
        event_type = %event.event_type,
        user_id = %user.id,
        status = user.subscription.status.as_str(),
        "Subscription updated from webhook"
    );

    Ok(received)
}
