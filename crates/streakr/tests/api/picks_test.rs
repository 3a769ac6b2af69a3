use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use time::Duration;

use crate::helpers::{as_str, question_id, TestApp};

#[sqlx::test(migrations = "./migrations")]
async fn test_pick_replace_and_clear(pool: SqlitePool) {
    let test_app = TestApp::new(pool);
    let round = test_app.create_round(1, false).await;
    let game = test_app.create_game(&round["id"], Duration::hours(2), 1).await;
    let question = question_id(&game, 0);
    test_app.register("alice").await;

    let (status, pick) = test_app.pick("alice", question, Some("yes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pick["outcome"], "yes");

    let (status, pick) = test_app.pick("alice", question, Some("No")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pick["outcome"], "no");

    let (status, body) = test_app.pick("alice", question, Some("maybe")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, body) = test_app.pick("alice", question, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    // clearing twice is fine
    let (status, _) = test_app.pick("alice", question, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = test_app.pick("nobody", question, Some("yes")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_picks_close_at_start_time(pool: SqlitePool) {
    let test_app = TestApp::new(pool);
    let round = test_app.create_round(1, false).await;
    let game = test_app.create_game(&round["id"], Duration::hours(2), 2).await;
    test_app.register("alice").await;

    let (status, _) = test_app.pick("alice", question_id(&game, 0), Some("yes")).await;
    assert_eq!(status, StatusCode::OK);

    test_app.clock.advance(Duration::hours(2));

    let (status, body) = test_app.pick("alice", question_id(&game, 1), Some("yes")).await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["error"], "pick_rejected");

    let (status, _) = test_app.pick("alice", question_id(&game, 0), Some("no")).await;
    assert_eq!(status, StatusCode::LOCKED);

    let (status, _) = test_app.pick("alice", question_id(&game, 0), None).await;
    assert_eq!(status, StatusCode::LOCKED);

    // no pick to clear, still locked
    let (status, body) = test_app.pick("alice", question_id(&game, 1), None).await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["error"], "pick_rejected");

    let (_, games) = test_app
        .request(
            Method::GET,
            &format!(
                "/api/v1/rounds/{}/games?player_id=alice",
                as_str(&round["id"])
            ),
            None,
        )
        .await;
    assert_eq!(games[0]["is_locked"], true);
    assert_eq!(games[0]["questions"][0]["player_pick"], "yes");
    assert_eq!(games[0]["questions"][1]["player_pick"], json!(null));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_pending_question_rejects_picks(pool: SqlitePool) {
    let test_app = TestApp::new(pool);
    let round = test_app.create_round(1, false).await;
    let game = test_app.create_game(&round["id"], Duration::hours(2), 1).await;
    let question = question_id(&game, 0);
    test_app.register("alice").await;

    test_app.settle(question, "locked", None).await;

    let (status, body) = test_app.pick("alice", question, Some("yes")).await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["error"], "pick_rejected");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_panic_void_once_per_round(pool: SqlitePool) {
    let test_app = TestApp::new(pool);
    let round = test_app.create_round(1, false).await;
    let game = test_app.create_game(&round["id"], Duration::hours(2), 3).await;
    test_app.register("alice").await;
    for index in 0..2 {
        test_app.pick("alice", question_id(&game, index), Some("yes")).await;
    }
    let panic_voids = "/api/v1/players/alice/panic_voids";

    let (status, body) = test_app
        .request(
            Method::POST,
            panic_voids,
            Some(json!({ "question_id": question_id(&game, 2) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "no pick held: {}", body);

    let (status, personal_void) = test_app
        .request(
            Method::POST,
            panic_voids,
            Some(json!({ "question_id": question_id(&game, 0) })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(personal_void["round_id"], round["id"]);

    let (status, repeat) = test_app
        .request(
            Method::POST,
            panic_voids,
            Some(json!({ "question_id": question_id(&game, 0) })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(repeat["question_id"], personal_void["question_id"]);

    let (status, body) = test_app
        .request(
            Method::POST,
            panic_voids,
            Some(json!({ "question_id": question_id(&game, 1) })),
        )
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "quota_exceeded");

    // the voided wrong pick does not break alice's game
    test_app.settle(question_id(&game, 0), "final_no", None).await;
    test_app.settle(question_id(&game, 1), "final_yes", None).await;
    test_app.settle(question_id(&game, 2), "final_yes", None).await;
    let streak = test_app.streak("alice").await;
    assert_eq!(streak["current"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_free_kick_covers_broken_game(pool: SqlitePool) {
    let test_app = TestApp::new(pool);
    let round = test_app.create_round(1, false).await;
    let first = test_app.create_game(&round["id"], Duration::hours(2), 1).await;
    let second = test_app.create_game(&round["id"], Duration::days(1), 1).await;
    test_app.register("alice").await;

    let (status, player) = test_app
        .request(
            Method::POST,
            "/api/v1/admin/players/alice/free_kicks",
            Some(json!({ "credits": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(player["free_kick_credits"], 1);

    test_app.pick("alice", question_id(&first, 0), Some("yes")).await;
    test_app.pick("alice", question_id(&second, 0), Some("yes")).await;
    test_app.settle(question_id(&first, 0), "final_yes", None).await;
    test_app.settle(question_id(&second, 0), "final_no", None).await;

    let streak = test_app.streak("alice").await;
    assert_eq!(streak["current"], 1);
    assert_eq!(streak["free_kick_credits"], 0);
    assert_eq!(streak["games"][1]["verdict"], "insured");

    // the second game was settled the wrong way, fixing it hands the credit back
    test_app.settle(question_id(&second, 0), "reopen", None).await;
    test_app.settle(question_id(&second, 0), "final_yes", None).await;
    let streak = test_app.streak("alice").await;
    assert_eq!(streak["current"], 2);
    assert_eq!(streak["free_kick_credits"], 1);

    let (status, _) = test_app
        .request(
            Method::POST,
            "/api/v1/admin/players/alice/free_kicks",
            Some(json!({ "credits": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
