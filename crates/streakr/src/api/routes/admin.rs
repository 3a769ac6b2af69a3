//! Admin endpoints. These are served on the private network only, so no
//! auth extractor sits in front of them.

use axum::{
    extract::{Path, State},
    response::ErrorResponse,
    Json,
};
use log::error;
use std::sync::Arc;
use streakr_core::{GameLockCommand, SettlementCommand, SettlementResult};
use uuid::Uuid;

use crate::{
    domain::{Game, GameWithQuestions, GrantFreeKicks, NewGame, NewRound, Player, Round},
    startup::AppState,
};

pub async fn create_round(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewRound>,
) -> Result<Json<Round>, ErrorResponse> {
    state
        .commissioner
        .add_round(body)
        .await
        .map(Json)
        .map_err(|e| {
            error!("error creating round: {:?}", e);
            e.into()
        })
}

pub async fn create_game(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewGame>,
) -> Result<Json<GameWithQuestions>, ErrorResponse> {
    state
        .commissioner
        .add_game(body)
        .await
        .map(Json)
        .map_err(|e| {
            error!("error creating game: {:?}", e);
            e.into()
        })
}

pub async fn set_game_lock(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<Uuid>,
    Json(body): Json<GameLockCommand>,
) -> Result<Json<Game>, ErrorResponse> {
    state
        .commissioner
        .set_game_lock(game_id, body)
        .await
        .map(Json)
        .map_err(|e| {
            error!("error setting lock on game {}: {:?}", game_id, e);
            e.into()
        })
}

/// Lock, settle, void or reopen a question. The response is what the store
/// holds after the call; on any error the caller should refetch.
pub async fn settle_question(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<Uuid>,
    Json(body): Json<SettlementCommand>,
) -> Result<Json<SettlementResult>, ErrorResponse> {
    state
        .commissioner
        .settle_question(question_id, &body)
        .await
        .map(Json)
        .map_err(|e| {
            error!("error settling question {}: {:?}", question_id, e);
            e.into()
        })
}

pub async fn grant_free_kicks(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
    Json(body): Json<GrantFreeKicks>,
) -> Result<Json<Player>, ErrorResponse> {
    state
        .commissioner
        .grant_free_kicks(&player_id, body.credits)
        .await
        .map(Json)
        .map_err(|e| {
            error!("error granting free kicks to {}: {:?}", player_id, e);
            e.into()
        })
}
