use axum::{
    extract::{Path, Query, State},
    response::ErrorResponse,
    Json,
};
use log::error;
use serde::Deserialize;
use std::sync::Arc;
use streakr_core::{LeaderboardResponse, LeaderboardScope};
use uuid::Uuid;

use crate::{
    domain::{Error, GameView},
    startup::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct RoundGamesQuery {
    pub player_id: Option<String>,
}

pub async fn get_round_games(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<Uuid>,
    Query(query): Query<RoundGamesQuery>,
) -> Result<Json<Vec<GameView>>, ErrorResponse> {
    state
        .commissioner
        .round_games(round_id, query.player_id.as_deref())
        .await
        .map(Json)
        .map_err(|e| {
            error!("error getting games of round {}: {:?}", round_id, e);
            e.into()
        })
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    /// `overall` (default), `finals` or `round:<uuid>`
    pub scope: Option<String>,
    pub limit: Option<usize>,
    pub player_id: Option<String>,
}

pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ErrorResponse> {
    let scope = match query.scope.as_deref() {
        Some(scope) => scope
            .parse::<LeaderboardScope>()
            .map_err(Error::from)?,
        None => LeaderboardScope::default(),
    };

    state
        .commissioner
        .leaderboard(scope, query.limit, query.player_id.as_deref())
        .await
        .map(Json)
        .map_err(|e| {
            error!("error building {} leaderboard: {:?}", scope, e);
            e.into()
        })
}
