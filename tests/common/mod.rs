#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bankroll_tracker::api::auth::USER_ID_HEADER;
use bankroll_tracker::api::webhook_signature::{self, SIGNATURE_HEADER};
use bankroll_tracker::api::{self, AppState};
use bankroll_tracker::config::Config;
use bankroll_tracker::db::init_db;
use bankroll_tracker::domain::{Role, Subscription, User, UserId};
use bankroll_tracker::Repository;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

pub struct TestApp {
    pub app: axum::Router,
    pub state: AppState,
    _temp: TempDir,
}

pub fn test_config(db_path: String) -> Config {
    Config {
        port: 0,
        database_path: db_path,
        leaderboard_size: 10,
        admin_page_size: 10,
        bootstrap_admin: None,
        stripe_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

pub async fn setup_test_app_with(tweak: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");

    let repo = Arc::new(Repository::new(pool));
    let mut config = test_config(db_path);
    tweak(&mut config);

    let state = AppState::new(repo, config);
    let app = api::create_router(state.clone());

    TestApp {
        app,
        state,
        _temp: temp_dir,
    }
}

impl TestApp {
    pub async fn seed_user(&self, username: &str, role: Role) -> User {
        let user = User {
            id: UserId::generate(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            role,
            subscription: Subscription::default(),
            created_at: chrono::Utc::now(),
        };
        self.state
            .repo
            .insert_user(&user)
            .await
            .expect("insert_user failed");
        user
    }

    /// Send a request as `caller` (or anonymously) and decode the JSON body.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        caller: Option<&User>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = caller {
            builder = builder.header(USER_ID_HEADER, user.id.to_string());
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.dispatch(request).await
    }

    /// Post a raw webhook body with the given signature header, if any.
    pub async fn post_webhook_raw(&self, body: &str, signature: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/stripe/webhook")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        self.dispatch(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Post a webhook event signed with [`WEBHOOK_SECRET`].
    pub async fn post_webhook(&self, event: Value) -> (StatusCode, Value) {
        let body = event.to_string();
        let signature = webhook_signature::sign(
            body.as_bytes(),
            WEBHOOK_SECRET,
            chrono::Utc::now().timestamp(),
        )
        .unwrap();
        self.post_webhook_raw(&body, Some(&signature)).await
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn create_bankroll(
        &self,
        owner: &User,
        name: &str,
        visibility: &str,
        starting_capital: i64,
    ) -> Value {
        let (status, body) = self
            .send(
                "POST",
                "/api/bankrolls",
                Some(owner),
                Some(json!({
                    "name": name,
                    "startingCapital": starting_capital,
                    "visibility": visibility,
                    "currency": {"code": "EUR", "label": "Euro", "symbol": "€"},
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create bankroll failed: {}", body);
        body["bankroll"].clone()
    }

    pub async fn create_bet(&self, owner: &User, bankroll_id: &str, fields: Value) -> Value {
        let mut payload = json!({
            "bankrollId": bankroll_id,
            "sport": "Football",
            "label": "Match",
            "verificationCode": "CODE",
        });
        if let (Some(target), Some(extra)) = (payload.as_object_mut(), fields.as_object()) {
            for (k, v) in extra {
                target.insert(k.clone(), v.clone());
            }
        }

        let (status, body) = self
            .send("POST", "/api/bets", Some(owner), Some(payload))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create bet failed: {}", body);
        body["bet"].clone()
    }

    pub async fn moderate(&self, admin: &User, bet_id: &str, action: &str) -> Value {
        let (status, body) = self
            .send(
                "PUT",
                &format!("/api/admin/bets/{}/{}", bet_id, action),
                Some(admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{} failed: {}", action, body);
        body["bet"].clone()
    }

    pub async fn bankroll_stats(&self, owner: &User, bankroll_id: &str) -> Value {
        let (status, body) = self
            .send(
                "GET",
                &format!("/api/bankrolls/{}", bankroll_id),
                Some(owner),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "get bankroll failed: {}", body);
        body
    }
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("id missing").to_string()
}
