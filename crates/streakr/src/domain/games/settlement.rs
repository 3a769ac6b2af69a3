use log::{info, warn};
use std::sync::Arc;
use streakr_core::{PickChoice, SettlementAction, SettlementResult};
use uuid::Uuid;

use crate::domain::Error;

use super::{
    states::{QuestionState, Transition},
    GameStore, Question,
};

/// Applies admin settlement actions to questions.
///
/// Every write is a compare-and-set on `(status, version)`. Two admins racing
/// on the same question end with one winner; the loser either finds the
/// question already where it wanted it (success, nothing written) or gets
/// `ConflictingTransition` and has to refetch.
#[derive(Debug, Clone)]
pub struct SettlementEngine {
    game_store: Arc<GameStore>,
}

impl SettlementEngine {
    pub fn new(game_store: Arc<GameStore>) -> Self {
        Self { game_store }
    }

    pub async fn lock(&self, question_id: Uuid) -> Result<SettlementResult, Error> {
        self.apply(question_id, SettlementAction::Lock).await
    }

    pub async fn settle(
        &self,
        question_id: Uuid,
        result: PickChoice,
    ) -> Result<SettlementResult, Error> {
        self.apply(question_id, SettlementAction::Settle(result))
            .await
    }

    pub async fn void(&self, question_id: Uuid) -> Result<SettlementResult, Error> {
        self.apply(question_id, SettlementAction::Void).await
    }

    pub async fn reopen(&self, question_id: Uuid) -> Result<SettlementResult, Error> {
        self.apply(question_id, SettlementAction::Reopen).await
    }

    pub async fn apply(
        &self,
        question_id: Uuid,
        action: SettlementAction,
    ) -> Result<SettlementResult, Error> {
        let snapshot = self.game_store.get_question(question_id).await?;
        self.apply_from(snapshot, action).await
    }

    /// Runs `action` against a question as it was last read.
    pub(crate) async fn apply_from(
        &self,
        snapshot: Question,
        action: SettlementAction,
    ) -> Result<SettlementResult, Error> {
        let question_id = snapshot.id;
        let expected_status = snapshot.status;
        let expected_version = snapshot.version;

        let next = match QuestionState::from(snapshot).apply(action)? {
            Transition::Unchanged(state) => {
                info!(
                    "Question {} already {}, {} is a no-op",
                    question_id, state, action
                );
                return Ok(to_result(state.question(), false));
            }
            Transition::Changed(state) => state.into_question(),
        };

        if self
            .game_store
            .compare_and_set_question(&next, expected_status, expected_version)
            .await?
        {
            info!(
                "Question {} {} -> {} (version {})",
                question_id, expected_status, next.status, next.version
            );
            return Ok(to_result(&next, true));
        }

        let stored = QuestionState::from(self.game_store.get_question(question_id).await?);
        if stored.satisfies(action) {
            info!(
                "Question {} was moved to {} by a concurrent request",
                question_id, stored
            );
            return Ok(to_result(stored.question(), false));
        }

        warn!(
            "Lost settlement race on question {}: wanted {} from {} v{}, found {} v{}",
            question_id,
            action,
            expected_status,
            expected_version,
            stored,
            stored.question().version
        );
        Err(Error::ConflictingTransition(question_id))
    }
}

fn to_result(question: &Question, changed: bool) -> SettlementResult {
    SettlementResult {
        question_id: question.id,
        status: question.status,
        outcome: question.outcome,
        version: question.version,
        changed,
    }
}

#[cfg(test)]
mod tests {
    use futures::future::join_all;
    use sqlx::SqlitePool;
    use streakr_core::{Outcome, QuestionStatusKind};
    use time::{Duration, OffsetDateTime};

    use super::*;
    use crate::{
        domain::{NewGame, NewQuestion, NewRound},
        infra::db::DBConnection,
    };

    async fn setup(pool: SqlitePool) -> (SettlementEngine, Arc<GameStore>, Question) {
        let db = DBConnection::from_pools(
            "test".to_string(),
            ":memory:".to_string(),
            pool.clone(),
            pool,
        );
        let store = Arc::new(GameStore::new(db));
        let round = store
            .add_round(NewRound {
                season: Some(2025),
                number: 3,
                label: "Round 3".into(),
                is_finals: false,
            })
            .await
            .unwrap();
        let created = store
            .add_game(NewGame {
                round_id: round.id,
                label: "Geelong v Sydney".into(),
                venue: "GMHBA Stadium".into(),
                start_time: OffsetDateTime::now_utc() + Duration::hours(1),
                is_unlocked_for_picks: true,
                questions: vec![NewQuestion {
                    quarter: 1,
                    text: "Will Geelong lead at quarter time?".into(),
                    is_sponsor_question: false,
                    sponsor_name: None,
                }],
            })
            .await
            .unwrap();

        let question = created.questions[0].clone();
        (SettlementEngine::new(store.clone()), store, question)
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_settle_twice_same_outcome_is_idempotent(pool: SqlitePool) {
        let (engine, store, question) = setup(pool).await;

        let first = engine.settle(question.id, PickChoice::Yes).await.unwrap();
        assert!(first.changed);
        assert_eq!(first.status, QuestionStatusKind::Final);
        assert_eq!(first.outcome, Some(Outcome::Yes));

        let second = engine.settle(question.id, PickChoice::Yes).await.unwrap();
        assert!(!second.changed);
        assert_eq!(second.version, first.version);

        let stored = store.get_question(question.id).await.unwrap();
        assert_eq!(stored.version, first.version);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_resettle_with_other_outcome_needs_reopen(pool: SqlitePool) {
        let (engine, _store, question) = setup(pool).await;

        engine.settle(question.id, PickChoice::Yes).await.unwrap();
        let err = engine
            .settle(question.id, PickChoice::No)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        let reopened = engine.reopen(question.id).await.unwrap();
        assert_eq!(reopened.status, QuestionStatusKind::Open);
        assert_eq!(reopened.outcome, None);

        let settled = engine.settle(question.id, PickChoice::No).await.unwrap();
        assert_eq!(settled.outcome, Some(Outcome::No));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_lost_race_reports_conflict(pool: SqlitePool) {
        let (engine, _store, question) = setup(pool).await;
        let stale = question.clone();

        engine.settle(question.id, PickChoice::Yes).await.unwrap();

        let err = engine
            .apply_from(stale.clone(), SettlementAction::Settle(PickChoice::No))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingTransition(id) if id == question.id));

        // the winner already did what this request wanted
        let same = engine
            .apply_from(stale, SettlementAction::Settle(PickChoice::Yes))
            .await
            .unwrap();
        assert!(!same.changed);
        assert_eq!(same.outcome, Some(Outcome::Yes));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_concurrent_settles_have_one_winner(pool: SqlitePool) {
        let (engine, store, question) = setup(pool).await;

        let results = join_all(vec![
            engine.settle(question.id, PickChoice::Yes),
            engine.settle(question.id, PickChoice::No),
        ])
        .await;

        let winners: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
        assert_eq!(winners.len(), 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(Error::ConflictingTransition(_)) | Err(Error::InvalidTransition { .. })
        )));

        let stored = store.get_question(question.id).await.unwrap();
        assert_eq!(stored.status, QuestionStatusKind::Final);
        assert_eq!(stored.outcome, winners[0].as_ref().unwrap().outcome);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_void_then_void_again(pool: SqlitePool) {
        let (engine, _store, question) = setup(pool).await;

        engine.lock(question.id).await.unwrap();
        let voided = engine.void(question.id).await.unwrap();
        assert_eq!(voided.outcome, Some(Outcome::Void));

        let again = engine.void(question.id).await.unwrap();
        assert!(!again.changed);

        let err = engine.lock(question.id).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                status: QuestionStatusKind::Void,
                ..
            }
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_unknown_question(pool: SqlitePool) {
        let (engine, _store, _question) = setup(pool).await;
        let result = engine.lock(Uuid::now_v7()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
