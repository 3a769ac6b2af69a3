//! Seed data shared by the store and service tests.

use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    domain::{
        GameStore, GameWithQuestions, NewGame, NewQuestion, NewRound, PlayerStore, RegisterPlayer,
        Round,
    },
    infra::db::DBConnection,
};

pub fn db(pool: SqlitePool) -> DBConnection {
    DBConnection::from_pools(
        "test".to_string(),
        ":memory:".to_string(),
        pool.clone(),
        pool,
    )
}

pub async fn round(store: &GameStore, number: u32, is_finals: bool) -> Round {
    store
        .add_round(NewRound {
            season: Some(2025),
            number,
            label: format!("Round {}", number),
            is_finals,
        })
        .await
        .unwrap()
}

/// A game with `questions` quarter questions starting `starts_in` from `now`.
pub async fn game(
    store: &GameStore,
    round_id: Uuid,
    now: OffsetDateTime,
    starts_in: Duration,
    questions: u8,
) -> GameWithQuestions {
    store
        .add_game(NewGame {
            round_id,
            label: "Collingwood v Brisbane".into(),
            venue: "MCG".into(),
            start_time: now + starts_in,
            is_unlocked_for_picks: true,
            questions: (1..=questions)
                .map(|quarter| NewQuestion {
                    quarter,
                    text: format!("Will Collingwood win quarter {}?", quarter),
                    is_sponsor_question: false,
                    sponsor_name: None,
                })
                .collect(),
        })
        .await
        .unwrap()
}

pub async fn player(store: &PlayerStore, id: &str) {
    store
        .register_player(RegisterPlayer {
            id: id.to_string(),
            display_name: format!("Player {}", id),
        })
        .await
        .unwrap();
}
