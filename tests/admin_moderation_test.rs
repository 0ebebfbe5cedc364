mod common;

use axum::http::StatusCode;
use bankroll_tracker::domain::Role;
use common::{id_of, setup_test_app, setup_test_app_with};
use serde_json::json;

#[tokio::test]
async fn test_admin_routes_reject_regular_users() {
    let app = setup_test_app().await;
    let alice = app.seed_user("alice", Role::User).await;

    let (status, body) = app.send("GET", "/api/admin/bets", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let (status, _) = app.send("GET", "/api/admin/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_moderation_drives_public_stats() {
    let app = setup_test_app().await;
    let admin = app.seed_user("root", Role::Admin).await;
    let alice = app.seed_user("alice", Role::User).await;
    let bankroll = app.create_bankroll(&alice, "Public", "Public", 1000).await;
    let id = id_of(&bankroll);

    let won = app
        .create_bet(&alice, &id, json!({"stake": 100, "odds": 2, "status": "Won"}))
        .await;
    let lost = app
        .create_bet(&alice, &id, json!({"stake": 50, "odds": 3, "status": "Loss"}))
        .await;

    let approved = app.moderate(&admin, &id_of(&won), "approve").await;
    assert_eq!(approved["verificationStatus"], "Accepted");
    assert_eq!(approved["isVerified"], true);

    let stats = app.bankroll_stats(&alice, &id).await["stats"].clone();
    assert_eq!(stats["totalStakes"], "100.00");
    assert_eq!(stats["totalProfit"], "100.00");
    assert_eq!(stats["roi"], "100.00");
    assert_eq!(stats["pendingBetsCount"], 1);
    assert_eq!(stats["isVerified"], false);

    app.moderate(&admin, &id_of(&lost), "approve").await;
    let stats = app.bankroll_stats(&alice, &id).await["stats"].clone();
    assert_eq!(stats["totalStakes"], "150.00");
    assert_eq!(stats["totalProfit"], "50.00");
    assert_eq!(stats["roi"], "33.33");
    assert_eq!(stats["progression"], "5.00");
    assert_eq!(stats["pendingBetsCount"], 0);
    assert_eq!(stats["isVerified"], true);

    let rejected = app.moderate(&admin, &id_of(&lost), "reject").await;
    assert_eq!(rejected["verificationStatus"], "Rejected");
    assert_eq!(rejected["isVerified"], false);

    let body = app.bankroll_stats(&alice, &id).await;
    assert_eq!(body["stats"]["totalStakes"], "100.00");
    assert_eq!(body["stats"]["pendingBetsCount"], 1);
    assert_eq!(body["stats"]["isVerified"], false);
    // Rejected bets are still listed with their outcome.
    assert_eq!(body["bets"].as_array().unwrap().len(), 2);
    assert_eq!(body["bets"][1]["profit"], "-50.00");
}

#[tokio::test]
async fn test_moderating_unknown_bet_is_not_found() {
    let app = setup_test_app().await;
    let admin = app.seed_user("root", Role::Admin).await;

    let (status, _) = app
        .send(
            "PUT",
            "/api/admin/bets/6f1c2a0e-8a8b-4b7e-9a43-0d7f0b7f9c11/approve",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_and_pagination() {
    let app = setup_test_app_with(|config| config.admin_page_size = 2).await;
    let admin = app.seed_user("root", Role::Admin).await;
    let alice = app.seed_user("alice", Role::User).await;
    let bankroll = app.create_bankroll(&alice, "Main", "Private", 1000).await;
    let id = id_of(&bankroll);

    app.create_bet(&alice, &id, json!({"sport": "Tennis", "label": "Final", "stake": 1, "odds": 2}))
        .await;
    app.create_bet(&alice, &id, json!({"sport": "Football", "label": "Tennis ball cup", "stake": 1, "odds": 2}))
        .await;
    app.create_bet(&alice, &id, json!({"sport": "Basketball", "label": "Derby", "stake": 1, "odds": 2}))
        .await;

    let (status, body) = app.send("GET", "/api/admin/bets", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalBets"], 3);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["currentPage"], 1);
    assert_eq!(body["bets"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .send("GET", "/api/admin/bets?search=TENNIS&limit=1&page=2", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalBets"], 2);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["currentPage"], 2);
    let rows = body["bets"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["ownerUsername"], "alice");
    assert_eq!(rows[0]["ownerEmail"], "alice@example.com");
    assert_eq!(rows[0]["bankrollName"], "Main");

    let (status, body) = app
        .send("GET", "/api/admin/bets?search=%25", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalBets"], 0);

    let (status, _) = app
        .send("GET", "/api/admin/bets?page=0", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send("GET", "/api/admin/bets?limit=9223372036854775807", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalPages"], 1);
    assert_eq!(body["bets"].as_array().unwrap().len(), 3);

    let (status, _) = app
        .send("GET", "/api/admin/bets?page=9223372036854775807", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_user_search_with_footprint() {
    let app = setup_test_app().await;
    let admin = app.seed_user("root", Role::Admin).await;
    let alice = app.seed_user("alice", Role::User).await;
    app.seed_user("alicia", Role::User).await;
    app.seed_user("bob", Role::User).await;

    let bankroll = app.create_bankroll(&alice, "Main", "Private", 1000).await;
    app.create_bet(&alice, &id_of(&bankroll), json!({"stake": 5, "odds": 2}))
        .await;
    app.create_bet(&alice, &id_of(&bankroll), json!({"stake": 5, "odds": 3}))
        .await;

    let (status, body) = app
        .send("GET", "/api/admin/users?search=ALI&limit=1", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalUsers"], 2);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["currentPage"], 1);
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "alice");
    assert_eq!(users[0]["email"], "alice@example.com");
    assert_eq!(users[0]["bankrollCount"], 1);
    assert_eq!(users[0]["betCount"], 2);

    let (_, body) = app
        .send("GET", "/api/admin/users?search=ali&limit=1&page=2", Some(&admin), None)
        .await;
    assert_eq!(body["users"][0]["username"], "alicia");
    assert_eq!(body["users"][0]["betCount"], 0);

    let (_, body) = app
        .send("GET", "/api/admin/users?search=bob%40example", Some(&admin), None)
        .await;
    assert_eq!(body["totalUsers"], 1);

    let (_, body) = app.send("GET", "/api/admin/users", Some(&admin), None).await;
    assert_eq!(body["totalUsers"], 4);
    assert_eq!(body["totalPages"], 1);

    let (status, _) = app
        .send("GET", "/api/admin/users?limit=0", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_user_management() {
    let app = setup_test_app().await;
    let admin = app.seed_user("root", Role::Admin).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/admin/users",
            Some(&admin),
            Some(json!({"username": "carol", "email": "Carol@Example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "carol@example.com");
    assert_eq!(body["user"]["role"], "user");
    let carol_id = body["user"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            "POST",
            "/api/admin/users",
            Some(&admin),
            Some(json!({"username": "carol2", "email": "carol@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            "/api/admin/users",
            Some(&admin),
            Some(json!({"username": "carol", "email": "other@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/admin/users/{}/role", carol_id),
            Some(&admin),
            Some(json!({"role": "admin"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "admin");

    let (status, body) = app.send("GET", "/api/admin/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalUsers"], 2);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .send("DELETE", &format!("/api/admin/users/{}", admin.id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send("DELETE", &format!("/api/admin/users/{}", carol_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send("DELETE", &format!("/api/admin/users/{}", carol_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
