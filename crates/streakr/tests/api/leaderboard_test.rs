use axum::http::{Method, StatusCode};
use maplit::hashmap;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use time::Duration;

use crate::helpers::{as_str, question_id, TestApp};

fn streaks(board: &Value) -> HashMap<String, u64> {
    board["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| {
            (
                entry["player_id"].as_str().unwrap().to_string(),
                entry["streak"].as_u64().unwrap(),
            )
        })
        .collect()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_leaderboard_scopes(pool: SqlitePool) {
    let test_app = TestApp::new(pool);
    let round = test_app.create_round(1, false).await;
    let finals = test_app.create_round(25, true).await;
    let game = test_app.create_game(&round["id"], Duration::hours(2), 3).await;
    let grand_final = test_app.create_game(&finals["id"], Duration::days(60), 1).await;
    for player_id in ["alice", "bob", "carol", "dave"] {
        test_app.register(player_id).await;
    }

    let picks = [
        ("alice", 0, "yes"),
        ("alice", 1, "yes"),
        ("alice", 2, "yes"),
        ("bob", 0, "yes"),
        ("bob", 1, "yes"),
        ("carol", 0, "no"),
    ];
    for (player_id, index, outcome) in picks {
        test_app.pick(player_id, question_id(&game, index), Some(outcome)).await;
    }
    test_app.pick("carol", question_id(&grand_final, 0), Some("yes")).await;

    for index in 0..3 {
        test_app.settle(question_id(&game, index), "final_yes", None).await;
    }
    test_app.settle(question_id(&grand_final, 0), "final_yes", None).await;

    let (status, overall) = test_app
        .request(Method::GET, "/api/v1/leaderboard", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overall["scope"], "overall");
    // dave never picked and is left out
    assert_eq!(
        streaks(&overall),
        hashmap! {
            "alice".to_string() => 3,
            "bob".to_string() => 2,
            "carol".to_string() => 1,
        }
    );
    assert_eq!(overall["entries"][0]["display_name"], "ALICE");
    assert_eq!(overall["entries"][2]["rank"], 3);

    let (_, limited) = test_app
        .request(
            Method::GET,
            "/api/v1/leaderboard?scope=overall&limit=1&player_id=carol",
            None,
        )
        .await;
    assert_eq!(limited["entries"].as_array().unwrap().len(), 1);
    assert_eq!(limited["player_entry"]["player_id"], "carol");
    assert_eq!(limited["player_entry"]["rank"], 3);

    let (_, round_board) = test_app
        .request(
            Method::GET,
            &format!("/api/v1/leaderboard?scope=round:{}", as_str(&round["id"])),
            None,
        )
        .await;
    assert_eq!(
        streaks(&round_board),
        hashmap! {
            "alice".to_string() => 3,
            "bob".to_string() => 2,
            "carol".to_string() => 0,
        }
    );

    let (_, finals_board) = test_app
        .request(Method::GET, "/api/v1/leaderboard?scope=finals", None)
        .await;
    assert_eq!(
        streaks(&finals_board),
        hashmap! { "carol".to_string() => 1 }
    );

    let (status, body) = test_app
        .request(Method::GET, "/api/v1/leaderboard?scope=round:nope", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_tied_players_share_a_rank(pool: SqlitePool) {
    let test_app = TestApp::new(pool);
    let round = test_app.create_round(2, false).await;
    let game = test_app.create_game(&round["id"], Duration::hours(2), 1).await;
    for player_id in ["zoe", "amy", "kim"] {
        test_app.register(player_id).await;
    }
    test_app.pick("zoe", question_id(&game, 0), Some("yes")).await;
    test_app.pick("amy", question_id(&game, 0), Some("yes")).await;
    test_app.pick("kim", question_id(&game, 0), Some("no")).await;
    test_app.settle(question_id(&game, 0), "final_yes", None).await;

    let (_, board) = test_app
        .request(Method::GET, "/api/v1/leaderboard", None)
        .await;
    let ranked: Vec<(&str, u64)> = board["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| {
            (
                entry["player_id"].as_str().unwrap(),
                entry["rank"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(ranked, vec![("amy", 1), ("zoe", 1), ("kim", 2)]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_health_check(pool: SqlitePool) {
    let test_app = TestApp::new(pool);
    let (status, _) = test_app
        .request(Method::GET, "/api/v1/health_check", None)
        .await;
    assert_eq!(status, StatusCode::OK);
}
