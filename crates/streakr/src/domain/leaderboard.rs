//! Leaderboards are computed on read from the same streak walk used for
//! players, restricted to the games in scope.
//!
//! Ordering is streak descending, then player id ascending. Ranks are dense:
//! tied players share a rank and the next streak value takes the next rank.

use log::debug;
use std::{collections::HashMap, sync::Arc};
use streakr_core::{LeaderboardEntry, LeaderboardResponse, LeaderboardScope};

use super::{calculate_streak, Error, PlayerStore, StreakStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerScore {
    pub player_id: String,
    pub display_name: String,
    pub streak: u32,
}

pub fn rank_entries(mut scores: Vec<PlayerScore>) -> Vec<LeaderboardEntry> {
    scores.sort_by(|a, b| {
        b.streak
            .cmp(&a.streak)
            .then_with(|| a.player_id.cmp(&b.player_id))
    });

    let mut rank = 0;
    let mut previous = None;
    scores
        .into_iter()
        .map(|score| {
            if previous != Some(score.streak) {
                rank += 1;
                previous = Some(score.streak);
            }
            LeaderboardEntry {
                player_id: score.player_id,
                display_name: score.display_name,
                rank,
                streak: score.streak,
            }
        })
        .collect()
}

/// First `limit` entries, plus the requesting player's entry when it is
/// further down.
pub fn top_with_player(
    ranked: Vec<LeaderboardEntry>,
    limit: usize,
    player_id: Option<&str>,
) -> (Vec<LeaderboardEntry>, Option<LeaderboardEntry>) {
    let player_entry = player_id.and_then(|player_id| {
        ranked
            .iter()
            .skip(limit)
            .find(|entry| entry.player_id == player_id)
            .cloned()
    });

    let mut top = ranked;
    top.truncate(limit);
    (top, player_entry)
}

pub struct LeaderboardAggregator {
    streak_store: Arc<StreakStore>,
    player_store: Arc<PlayerStore>,
}

impl LeaderboardAggregator {
    pub fn new(streak_store: Arc<StreakStore>, player_store: Arc<PlayerStore>) -> Self {
        Self {
            streak_store,
            player_store,
        }
    }

    /// Ranks every player with a pick in `scope`. Only Free Kicks already on
    /// record count, reading a leaderboard never spends a credit.
    pub async fn leaderboard(
        &self,
        scope: LeaderboardScope,
        limit: usize,
        player_id: Option<&str>,
    ) -> Result<LeaderboardResponse, Error> {
        let histories = self.streak_store.get_scope_histories(scope).await?;
        let display_names: HashMap<String, String> = self
            .player_store
            .get_players()
            .await?
            .into_iter()
            .map(|player| (player.id, player.display_name))
            .collect();

        let scores = histories
            .into_iter()
            .map(|(player_id, games)| {
                let streak = calculate_streak(games, 0).current;
                let display_name = display_names
                    .get(&player_id)
                    .cloned()
                    .unwrap_or_else(|| player_id.clone());
                PlayerScore {
                    player_id,
                    display_name,
                    streak,
                }
            })
            .collect();

        let ranked = rank_entries(scores);
        debug!("leaderboard {} has {} players", scope, ranked.len());
        let (entries, player_entry) = top_with_player(ranked, limit, player_id);

        Ok(LeaderboardResponse {
            scope: scope.to_string(),
            entries,
            player_entry,
        })
    }
}
