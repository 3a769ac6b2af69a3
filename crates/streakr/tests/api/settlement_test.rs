use axum::http::{Method, StatusCode};
use serde_json::json;
use sqlx::SqlitePool;
use time::Duration;

use crate::helpers::{as_str, question_id, TestApp};

#[sqlx::test(migrations = "./migrations")]
async fn test_settlement_lifecycle(pool: SqlitePool) {
    let test_app = TestApp::new(pool);
    let round = test_app.create_round(1, false).await;
    let game = test_app.create_game(&round["id"], Duration::hours(2), 1).await;
    let question = question_id(&game, 0);

    let (status, locked) = test_app.settle(question, "lock", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(locked["status"], "pending");
    assert_eq!(locked["outcome"], json!(null));

    // legacy spelling with the outcome in the action name
    let (status, settled) = test_app.settle(question, "final_yes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settled["status"], "final");
    assert_eq!(settled["outcome"], "yes");
    assert_eq!(settled["changed"], true);

    let (status, repeat) = test_app.settle(question, "settle", Some("YES")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(repeat["changed"], false);
    assert_eq!(repeat["version"], settled["version"]);

    let (status, conflict) = test_app.settle(question, "final_no", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(conflict["error"], "invalid_transition");

    let (status, reopened) = test_app.settle(question, "reopen", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reopened["status"], "open");
    assert_eq!(reopened["outcome"], json!(null));

    let (status, voided) = test_app.settle(question, "voided", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(voided["status"], "void");
    assert_eq!(voided["outcome"], "void");

    let (status, again) = test_app.settle(question, "void", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["changed"], false);

    let (status, body) = test_app.settle(question, "settle", Some("no")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_bad_settlement_requests(pool: SqlitePool) {
    let test_app = TestApp::new(pool);
    let round = test_app.create_round(1, false).await;
    let game = test_app.create_game(&round["id"], Duration::hours(2), 1).await;
    let question = question_id(&game, 0);

    let (status, body) = test_app.settle(question, "explode", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = test_app.settle(question, "settle", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = test_app.settle(question, "lock", Some("yes")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = json!(uuid::Uuid::now_v7().to_string());
    let (status, body) = test_app.settle(&missing, "lock", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_settlement_updates_streaks(pool: SqlitePool) {
    let test_app = TestApp::new(pool);
    let round = test_app.create_round(1, false).await;
    let first = test_app.create_game(&round["id"], Duration::hours(2), 2).await;
    let second = test_app.create_game(&round["id"], Duration::days(1), 1).await;
    test_app.register("alice").await;

    test_app.pick("alice", question_id(&first, 0), Some("yes")).await;
    test_app.pick("alice", question_id(&first, 1), Some("no")).await;
    test_app.pick("alice", question_id(&second, 0), Some("yes")).await;

    test_app.settle(question_id(&first, 0), "final_yes", None).await;
    let streak = test_app.streak("alice").await;
    assert_eq!(streak["current"], 0);
    assert_eq!(streak["pending_game_id"], first["id"]);

    test_app.settle(question_id(&first, 1), "final_no", None).await;
    let streak = test_app.streak("alice").await;
    assert_eq!(streak["current"], 2);
    assert_eq!(streak["pending_game_id"], second["id"]);

    test_app.settle(question_id(&second, 0), "final_no", None).await;
    let streak = test_app.streak("alice").await;
    assert_eq!(streak["current"], 0);
    assert_eq!(streak["longest"], 2);
    assert_eq!(streak["games"].as_array().unwrap().len(), 2);
    assert_eq!(streak["games"][1]["verdict"], "broken");

    // a global void removes the only wrong pick, the second game is neutral
    test_app.settle(question_id(&second, 0), "void", None).await;
    let streak = test_app.streak("alice").await;
    assert_eq!(streak["current"], 2);

    let (status, body) = test_app
        .request(Method::GET, "/api/v1/players/nobody/streak", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_game_lock(pool: SqlitePool) {
    let test_app = TestApp::new(pool);
    let round = test_app.create_round(3, false).await;
    let game = test_app.create_game(&round["id"], Duration::hours(2), 1).await;

    let (status, body) = test_app
        .request(
            Method::PUT,
            &format!("/api/v1/admin/games/{}/lock", as_str(&game["id"])),
            Some(json!({ "is_unlocked_for_picks": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_unlocked_for_picks"], false);

    let (status, games) = test_app
        .request(
            Method::GET,
            &format!("/api/v1/rounds/{}/games", as_str(&round["id"])),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(games[0]["is_locked"], true);
}
