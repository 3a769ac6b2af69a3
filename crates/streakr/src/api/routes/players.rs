use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{ErrorResponse, IntoResponse, Response},
    Json,
};
use log::{debug, error};
use std::sync::Arc;
use streakr_core::{PanicVoidCommand, PickCommand};
use uuid::Uuid;

use crate::{
    domain::{PersonalVoid, Player, PlayerStreak, RegisterPlayer},
    startup::AppState,
};

pub async fn register_player(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterPlayer>,
) -> Result<Json<Player>, ErrorResponse> {
    state
        .commissioner
        .register_player(body)
        .await
        .map(Json)
        .map_err(|e| {
            error!("error registering player: {:?}", e);
            e.into()
        })
}

/// Sets or replaces a pick; a null outcome clears it and answers 204.
pub async fn put_pick(
    State(state): State<Arc<AppState>>,
    Path((player_id, question_id)): Path<(String, Uuid)>,
    Json(body): Json<PickCommand>,
) -> Result<Response, ErrorResponse> {
    let pick = state
        .commissioner
        .submit_pick(&player_id, question_id, &body)
        .await
        .map_err(|e| {
            debug!(
                "pick by {} on {} not accepted: {:?}",
                player_id, question_id, e
            );
            e
        })?;

    Ok(match pick {
        Some(pick) => Json(pick).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

pub async fn create_panic_void(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
    Json(body): Json<PanicVoidCommand>,
) -> Result<Json<PersonalVoid>, ErrorResponse> {
    state
        .commissioner
        .panic_void(&player_id, body)
        .await
        .map(Json)
        .map_err(|e| {
            debug!("panic void by {} not accepted: {:?}", player_id, e);
            e.into()
        })
}

pub async fn get_player_streak(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> Result<Json<PlayerStreak>, ErrorResponse> {
    state
        .commissioner
        .player_streak(&player_id)
        .await
        .map(Json)
        .map_err(|e| {
            error!("error getting streak for {}: {:?}", player_id, e);
            e.into()
        })
}
