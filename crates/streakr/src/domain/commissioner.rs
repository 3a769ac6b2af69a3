use itertools::Itertools;
use log::{debug, info, warn};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use streakr_core::{
    GameLockCommand, LeaderboardResponse, LeaderboardScope, PanicVoidCommand, PickChoice,
    PickCommand, SettlementAction, SettlementCommand, SettlementResult,
};
use uuid::Uuid;

use crate::{
    config::GameSettings,
    infra::{clock::Clock, db::DBConnection},
};

use super::{
    sentiment, Error, Game, GameStore, GameView, GameWithQuestions, InsuranceStore,
    LeaderboardAggregator, NewGame, NewRound, PersonalVoid, Pick, PickLedger, PickStore, Player,
    PlayerStore, PlayerStreak, QuestionView, RegisterPlayer, Round, SettlementEngine,
    StreakService, StreakStore,
};

/// Entry point for every API operation. Owns the stores and the services
/// built on them, and decides which follow-up work a write triggers.
pub struct Commissioner {
    game_store: Arc<GameStore>,
    player_store: Arc<PlayerStore>,
    pick_store: Arc<PickStore>,
    insurance_store: Arc<InsuranceStore>,
    settlement: SettlementEngine,
    ledger: PickLedger,
    streaks: StreakService,
    leaderboards: LeaderboardAggregator,
    clock: Arc<dyn Clock>,
    settings: GameSettings,
}

impl Commissioner {
    pub fn new(db_connection: DBConnection, clock: Arc<dyn Clock>, settings: GameSettings) -> Self {
        let game_store = Arc::new(GameStore::new(db_connection.clone()));
        let player_store = Arc::new(PlayerStore::new(db_connection.clone()));
        let pick_store = Arc::new(PickStore::new(db_connection.clone()));
        let insurance_store = Arc::new(InsuranceStore::new(db_connection.clone()));
        let streak_store = Arc::new(StreakStore::new(db_connection));

        Self {
            settlement: SettlementEngine::new(game_store.clone()),
            ledger: PickLedger::new(pick_store.clone(), clock.clone()),
            streaks: StreakService::new(
                streak_store.clone(),
                insurance_store.clone(),
                player_store.clone(),
                clock.clone(),
            ),
            leaderboards: LeaderboardAggregator::new(streak_store, player_store.clone()),
            game_store,
            player_store,
            pick_store,
            insurance_store,
            clock,
            settings,
        }
    }

    pub fn game_store(&self) -> Arc<GameStore> {
        self.game_store.clone()
    }

    pub async fn ping(&self) -> Result<(), Error> {
        self.game_store.ping().await.map_err(Error::DbError)
    }

    pub async fn add_round(&self, mut new_round: NewRound) -> Result<Round, Error> {
        if new_round.season.is_none() {
            new_round.season = Some(self.settings.season);
        }
        self.game_store.add_round(new_round).await
    }

    pub async fn add_game(&self, new_game: NewGame) -> Result<GameWithQuestions, Error> {
        self.game_store.add_game(new_game).await
    }

    pub async fn set_game_lock(
        &self,
        game_id: Uuid,
        command: GameLockCommand,
    ) -> Result<Game, Error> {
        self.game_store
            .set_game_unlocked(game_id, command.is_unlocked_for_picks)
            .await
    }

    /// Applies an admin settlement action. Every action but lock changes
    /// what the question contributes to streaks, so the streak of each
    /// player holding a pick on it is re-derived before returning. A reopen
    /// first hands back Free Kicks spent on the question's game.
    pub async fn settle_question(
        &self,
        question_id: Uuid,
        command: &SettlementCommand,
    ) -> Result<SettlementResult, Error> {
        let action = command.normalize()?;
        let result = self.settlement.apply(question_id, action).await?;

        if action == SettlementAction::Reopen && result.changed {
            if let Err(e) = self.insurance_store.release_question_game(question_id).await {
                warn!(
                    "Could not release free kicks after question {} reopened: {}",
                    question_id, e
                );
            }
        }

        if action != SettlementAction::Lock {
            self.recompute_holders(question_id).await;
        }

        Ok(result)
    }

    /// The transition is already stored at this point, a failed
    /// recomputation is only logged and picked up by the next one.
    async fn recompute_holders(&self, question_id: Uuid) {
        let player_ids = match self.pick_store.get_question_player_ids(question_id).await {
            Ok(player_ids) => player_ids,
            Err(e) => {
                warn!(
                    "Could not load pick holders of question {}, streaks not recomputed: {}",
                    question_id, e
                );
                return;
            }
        };

        let failed = self.streaks.recompute_players(&player_ids).await;
        if failed.is_empty() {
            debug!(
                "Recomputed {} streaks after question {} changed",
                player_ids.len(),
                question_id
            );
        } else {
            warn!(
                "{} of {} streak recomputations failed after question {} changed",
                failed.len(),
                player_ids.len(),
                question_id
            );
        }
    }

    pub async fn register_player(&self, player: RegisterPlayer) -> Result<Player, Error> {
        self.player_store.register_player(player).await
    }

    pub async fn grant_free_kicks(&self, player_id: &str, credits: u32) -> Result<Player, Error> {
        let player = self.player_store.grant_free_kicks(player_id, credits).await?;
        info!(
            "Granted {} free kicks to {}, balance {}",
            credits, player_id, player.free_kick_credits
        );
        Ok(player)
    }

    pub async fn submit_pick(
        &self,
        player_id: &str,
        question_id: Uuid,
        command: &PickCommand,
    ) -> Result<Option<Pick>, Error> {
        self.ledger.submit(player_id, question_id, command).await
    }

    pub async fn panic_void(
        &self,
        player_id: &str,
        command: PanicVoidCommand,
    ) -> Result<PersonalVoid, Error> {
        self.player_store.get_player(player_id).await?;
        let personal_void = self
            .insurance_store
            .add_personal_void(player_id, command.question_id, self.clock.now())
            .await?;
        info!(
            "Player {} used their panic void on question {}",
            player_id, personal_void.question_id
        );
        Ok(personal_void)
    }

    pub async fn player_streak(&self, player_id: &str) -> Result<PlayerStreak, Error> {
        self.streaks.get_player_streak(player_id).await
    }

    /// Every game of a round with its questions, crowd sentiment and, when a
    /// player is given, that player's picks and panic void.
    pub async fn round_games(
        &self,
        round_id: Uuid,
        player_id: Option<&str>,
    ) -> Result<Vec<GameView>, Error> {
        self.game_store.get_round(round_id).await?;

        let games = self.game_store.get_round_games(round_id).await?;
        let mut questions = self
            .game_store
            .get_round_questions(round_id)
            .await?
            .into_iter()
            .into_group_map_by(|question| question.game_id);
        let counts = self.pick_store.get_round_pick_counts(round_id).await?;

        let (picks, voided): (HashMap<Uuid, PickChoice>, HashSet<Uuid>) = match player_id {
            Some(player_id) => {
                self.player_store.get_player(player_id).await?;
                let picks = self
                    .pick_store
                    .get_player_round_picks(player_id, round_id)
                    .await?
                    .into_iter()
                    .map(|pick| (pick.question_id, pick.outcome))
                    .collect();
                let voided = self
                    .insurance_store
                    .get_player_voids(player_id)
                    .await?
                    .into_iter()
                    .filter(|personal_void| personal_void.round_id == round_id)
                    .map(|personal_void| personal_void.question_id)
                    .collect();
                (picks, voided)
            }
            None => (HashMap::new(), HashSet::new()),
        };

        let now = self.clock.now();
        let views = games
            .into_iter()
            .map(|game| {
                let questions = questions
                    .remove(&game.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|question| {
                        let tally = counts.get(&question.id).copied().unwrap_or_default();
                        let (yes_percent, no_percent) = sentiment(tally.yes, tally.no);
                        QuestionView {
                            player_pick: picks.get(&question.id).copied(),
                            personally_voided: voided.contains(&question.id),
                            yes_percent,
                            no_percent,
                            total_picks: tally.yes + tally.no,
                            question,
                        }
                    })
                    .collect();
                GameView {
                    is_locked: game.is_locked(now),
                    game,
                    questions,
                }
            })
            .collect();

        Ok(views)
    }

    pub async fn leaderboard(
        &self,
        scope: LeaderboardScope,
        limit: Option<usize>,
        player_id: Option<&str>,
    ) -> Result<LeaderboardResponse, Error> {
        let limit = limit
            .filter(|limit| *limit > 0)
            .unwrap_or(self.settings.leaderboard_limit);
        self.leaderboards.leaderboard(scope, limit, player_id).await
    }
}
