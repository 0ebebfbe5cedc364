pub mod admin;
pub mod auth;
pub mod bankrolls;
pub mod bets;
pub mod health;
pub mod leaderboard;
pub mod subscriptions;
pub mod webhook_signature;

use crate::config::Config;
use crate::db::Repository;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, config: Config) -> Self {
        Self { repo, config }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/api/bankrolls",
            get(bankrolls::list_bankrolls).post(bankrolls::create_bankroll),
        )
        .route(
            "/api/bankrolls/:id",
            get(bankrolls::get_bankroll)
                .put(bankrolls::update_bankroll)
                .delete(bankrolls::delete_bankroll),
        )
        .route("/api/shared/:link", get(bankrolls::get_shared_bankroll))
        .route("/api/bets", post(bets::create_bet))
        .route("/api/bets/bankroll/:bankroll_id", get(bets::list_bets))
        .route(
            "/api/bets/:id",
            put(bets::update_bet).delete(bets::delete_bet),
        )
        .route("/api/admin/bets", get(admin::list_bets))
        .route("/api/admin/bets/:id/approve", put(admin::approve_bet))
        .route("/api/admin/bets/:id/reject", put(admin::reject_bet))
        .route(
            "/api/admin/users",
            get(admin::list_users).post(admin::create_user),
        )
        .route("/api/admin/users/:id", delete(admin::delete_user))
        .route("/api/admin/users/:id/role", put(admin::update_user_role))
        .route("/api/leaderboard/bankrolls", get(leaderboard::get_top_bankrolls))
        .route(
            "/api/users/me",
            get(subscriptions::get_profile).put(subscriptions::update_profile),
        )
        .route("/api/subscriptions/me", get(subscriptions::get_subscription))
        .route("/api/stripe/webhook", post(subscriptions::handle_webhook))
        .layer(cors)
        .with_state(state)
}
