use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::{collections::HashMap, sync::Arc};
use streakr::{app, AppState, Clock, Commissioner, DBConnection, GameSettings, ManualClock};
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};
use tower::ServiceExt;

pub struct TestApp {
    router: Router,
    pub clock: ManualClock,
}

impl TestApp {
    pub fn new(pool: SqlitePool) -> Self {
        let db = DBConnection::from_pools(
            "test".to_string(),
            ":memory:".to_string(),
            pool.clone(),
            pool,
        );
        let clock = ManualClock::new(OffsetDateTime::now_utc());
        let commissioner = Commissioner::new(db, Arc::new(clock.clone()), GameSettings::default());
        let state = AppState {
            commissioner: Arc::new(commissioner),
            background_threads: Arc::new(HashMap::new()),
        };

        Self {
            router: app(state, vec![String::from("http://localhost:3000")]),
            clock,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn create_round(&self, number: u32, is_finals: bool) -> Value {
        let (status, round) = self
            .request(
                Method::POST,
                "/api/v1/admin/rounds",
                Some(json!({
                    "number": number,
                    "label": format!("Round {}", number),
                    "is_finals": is_finals,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", round);
        round
    }

    /// Game starting `starts_in` from the test clock, one question per quarter.
    pub async fn create_game(&self, round_id: &Value, starts_in: Duration, quarters: u8) -> Value {
        let start_time = (self.clock.now() + starts_in).format(&Rfc3339).unwrap();
        let questions: Vec<Value> = (1..=quarters)
            .map(|quarter| {
                json!({
                    "quarter": quarter,
                    "text": format!("Will the home side win quarter {}?", quarter),
                })
            })
            .collect();

        let (status, game) = self
            .request(
                Method::POST,
                "/api/v1/admin/games",
                Some(json!({
                    "round_id": round_id,
                    "label": "Richmond v Carlton",
                    "venue": "MCG",
                    "start_time": start_time,
                    "questions": questions,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", game);
        game
    }

    pub async fn register(&self, player_id: &str) {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/players",
                Some(json!({ "id": player_id, "display_name": player_id.to_uppercase() })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    pub async fn pick(&self, player_id: &str, question_id: &Value, outcome: Option<&str>) -> (StatusCode, Value) {
        self.request(
            Method::PUT,
            &format!("/api/v1/players/{}/picks/{}", player_id, as_str(question_id)),
            Some(json!({ "outcome": outcome })),
        )
        .await
    }

    pub async fn settle(&self, question_id: &Value, action: &str, outcome: Option<&str>) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            &format!("/api/v1/admin/questions/{}/settlement", as_str(question_id)),
            Some(json!({ "action": action, "outcome": outcome })),
        )
        .await
    }

    pub async fn streak(&self, player_id: &str) -> Value {
        let (status, body) = self
            .request(Method::GET, &format!("/api/v1/players/{}/streak", player_id), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body
    }
}

pub fn as_str(value: &Value) -> &str {
    value.as_str().expect("expected a string id")
}

/// Id of the `index`th question of a created game.
pub fn question_id(game: &Value, index: usize) -> &Value {
    &game["questions"][index]["id"]
}
