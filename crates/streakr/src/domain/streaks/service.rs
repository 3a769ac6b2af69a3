use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{Error, InsuranceStore, PlayerStore},
    infra::clock::Clock,
};

use super::{calculate_streak, GameResult, StreakOutcome, StreakStore};

/// A player's streak as shown to them, with the per game breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStreak {
    pub player_id: String,
    pub current: u32,
    pub longest: u32,
    pub pending_game_id: Option<Uuid>,
    pub free_kick_credits: u32,
    pub games: Vec<GameResult>,
}

/// Re-derives streaks from scratch and keeps the cache rows current.
pub struct StreakService {
    streak_store: Arc<StreakStore>,
    insurance_store: Arc<InsuranceStore>,
    player_store: Arc<PlayerStore>,
    clock: Arc<dyn Clock>,
}

impl StreakService {
    pub fn new(
        streak_store: Arc<StreakStore>,
        insurance_store: Arc<InsuranceStore>,
        player_store: Arc<PlayerStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            streak_store,
            insurance_store,
            player_store,
            clock,
        }
    }

    /// Full recomputation for one player. Spends Free Kick credits where a
    /// newly broken game needs one and records the resets nothing covered,
    /// then writes the cache row.
    pub async fn recompute(&self, player_id: &str) -> Result<PlayerStreak, Error> {
        let player = self.player_store.get_player(player_id).await?;
        let history = self.streak_store.get_player_history(player_id).await?;
        let mut outcome = calculate_streak(history, player.free_kick_credits);

        if !outcome.new_free_kicks.is_empty() && !self.persist_free_kicks(player_id, &outcome).await? {
            // balance moved under us, settle for what is already recorded
            let history = self.streak_store.get_player_history(player_id).await?;
            outcome = calculate_streak(history, 0);
        }
        self.insurance_store
            .record_resets(player_id, &outcome.new_resets, self.clock.now())
            .await?;

        let record = self
            .streak_store
            .save_streak(player_id, &outcome, self.clock.now())
            .await?;
        let player = self.player_store.get_player(player_id).await?;

        info!(
            "Recomputed streak for {}: current {} longest {}",
            player_id, record.current_streak, record.longest_streak
        );

        Ok(PlayerStreak {
            player_id: player.id,
            current: record.current_streak,
            longest: record.longest_streak,
            pending_game_id: record.pending_game_id,
            free_kick_credits: player.free_kick_credits,
            games: outcome.games,
        })
    }

    /// Returns false if a credit the calculator counted on was gone.
    async fn persist_free_kicks(
        &self,
        player_id: &str,
        outcome: &StreakOutcome,
    ) -> Result<bool, Error> {
        for game_id in &outcome.new_free_kicks {
            match self
                .insurance_store
                .spend_free_kick(player_id, *game_id, self.clock.now())
                .await
            {
                Ok(true) => {}
                Ok(false) => debug!("free kick for {} on {} already recorded", player_id, game_id),
                Err(Error::InsufficientCredit(_)) => {
                    warn!(
                        "Player {} ran out of free kicks while insuring game {}",
                        player_id, game_id
                    );
                    return Ok(false);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }

    /// Recomputes everyone who picked on a question that just changed.
    /// Keeps going past a failed player and returns the ids that failed.
    pub async fn recompute_players(&self, player_ids: &[String]) -> Vec<String> {
        let mut failed = Vec::new();
        for player_id in player_ids {
            if let Err(e) = self.recompute(player_id).await {
                error!("Failed to recompute streak for {}: {}", player_id, e);
                failed.push(player_id.clone());
            }
        }
        failed
    }

    /// Read only view: recorded Free Kicks apply, nothing new is spent.
    pub async fn get_player_streak(&self, player_id: &str) -> Result<PlayerStreak, Error> {
        let player = self.player_store.get_player(player_id).await?;
        let history = self.streak_store.get_player_history(player_id).await?;
        let outcome = calculate_streak(history, 0);
        let cached = self.streak_store.get_streak(player_id).await?;

        Ok(PlayerStreak {
            player_id: player.id,
            current: outcome.current,
            longest: cached
                .map(|record| record.longest_streak)
                .unwrap_or_default()
                .max(outcome.longest),
            pending_game_id: outcome.pending_game_id,
            free_kick_credits: player.free_kick_credits,
            games: outcome.games,
        })
    }
}
