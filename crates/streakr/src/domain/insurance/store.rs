use log::{info, warn};
use streakr_core::QuestionStatusKind;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    domain::Error,
    infra::db::{format_datetime, DBConnection},
};

use super::{FreeKickUse, PersonalVoid};

#[derive(Debug, Clone)]
pub struct InsuranceStore {
    db_connection: DBConnection,
}

impl InsuranceStore {
    pub fn new(db_connection: DBConnection) -> Self {
        Self { db_connection }
    }

    /// Records a Panic void of `question_id` for the player's round.
    ///
    /// The insert only happens while the player holds a pick on the question
    /// and the question still takes picks. First write per round wins;
    /// repeating the same request returns the stored void.
    pub async fn add_personal_void(
        &self,
        player_id: &str,
        question_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<PersonalVoid, Error> {
        let created_at = format_datetime(now)?;

        let inserted = sqlx::query_as::<_, PersonalVoid>(
            "INSERT INTO personal_voids (player_id, round_id, question_id, created_at)
             SELECT pk.player_id, g.round_id, q.id, ?
             FROM picks pk
             JOIN questions q ON q.id = pk.question_id
             JOIN games g ON g.id = q.game_id
             WHERE pk.player_id = ?
               AND pk.question_id = ?
               AND q.status = 'open'
               AND g.is_unlocked_for_picks = 1
               AND g.start_time > ?
             ON CONFLICT (player_id, round_id) DO NOTHING
             RETURNING player_id, round_id, question_id, created_at",
        )
        .bind(created_at)
        .bind(player_id)
        .bind(question_id.to_string())
        .bind(now.unix_timestamp())
        .fetch_optional(self.db_connection.write())
        .await?;

        if let Some(personal_void) = inserted {
            info!(
                "Player {} panic voided question {} in round {}",
                player_id, question_id, personal_void.round_id
            );
            return Ok(personal_void);
        }

        self.explain_void_rejection(player_id, question_id, now)
            .await
    }

    async fn explain_void_rejection(
        &self,
        player_id: &str,
        question_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<PersonalVoid, Error> {
        let question = sqlx::query_as::<_, (String, String, i64, bool)>(
            "SELECT g.round_id, q.status, g.start_time, g.is_unlocked_for_picks
             FROM questions q
             JOIN games g ON g.id = q.game_id
             WHERE q.id = ?",
        )
        .bind(question_id.to_string())
        .fetch_optional(self.db_connection.read())
        .await?;

        let Some((round_id, status, start_time, is_unlocked_for_picks)) = question else {
            return Err(Error::NotFound(format!("question {} not found", question_id)));
        };

        let existing = sqlx::query_as::<_, PersonalVoid>(
            "SELECT player_id, round_id, question_id, created_at
             FROM personal_voids
             WHERE player_id = ? AND round_id = ?",
        )
        .bind(player_id)
        .bind(&round_id)
        .fetch_optional(self.db_connection.read())
        .await?;

        if let Some(existing) = existing {
            if existing.question_id == question_id {
                return Ok(existing);
            }
            warn!(
                "Player {} tried a second panic void in round {}",
                player_id, round_id
            );
            return Err(Error::QuotaExceeded {
                player_id: player_id.to_string(),
                round_id: existing.round_id,
            });
        }

        let holds_pick: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM picks WHERE player_id = ? AND question_id = ?)",
        )
        .bind(player_id)
        .bind(question_id.to_string())
        .fetch_one(self.db_connection.read())
        .await?;

        let takes_picks = status == QuestionStatusKind::Open.as_str()
            && is_unlocked_for_picks
            && start_time > now.unix_timestamp();
        if !takes_picks {
            return Err(Error::PickRejected(question_id));
        }
        if !holds_pick {
            return Err(Error::BadRequest(format!(
                "player {} has no pick on question {} to void",
                player_id, question_id
            )));
        }

        // the guard held a moment ago but the insert found nothing, a lock raced us
        Err(Error::PickRejected(question_id))
    }

    pub async fn get_player_voids(&self, player_id: &str) -> Result<Vec<PersonalVoid>, Error> {
        let voids = sqlx::query_as::<_, PersonalVoid>(
            "SELECT player_id, round_id, question_id, created_at
             FROM personal_voids
             WHERE player_id = ?
             ORDER BY created_at",
        )
        .bind(player_id)
        .fetch_all(self.db_connection.read())
        .await?;

        Ok(voids)
    }

    /// Spends one Free Kick credit to insure `game_id`.
    ///
    /// Returns false when a use for this game is already recorded, so a
    /// retried recomputation never spends twice. A credit decrement that
    /// finds the balance at zero rolls the use back.
    pub async fn spend_free_kick(
        &self,
        player_id: &str,
        game_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<bool, Error> {
        let used_at = format_datetime(now)?;
        let mut tx = self.db_connection.write().begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO free_kick_uses (player_id, game_id, used_at)
             VALUES (?, ?, ?)
             ON CONFLICT (player_id, game_id) DO NOTHING",
        )
        .bind(player_id)
        .bind(game_id.to_string())
        .bind(used_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let debited = sqlx::query(
            "UPDATE players
             SET free_kick_credits = free_kick_credits - 1
             WHERE id = ? AND free_kick_credits > 0",
        )
        .bind(player_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if debited == 0 {
            tx.rollback().await?;
            return Err(Error::InsufficientCredit(player_id.to_string()));
        }

        tx.commit().await?;
        info!("Player {} used a free kick on game {}", player_id, game_id);
        Ok(true)
    }

    /// Marks games as broken for `player_id`. A credit granted afterwards
    /// is never spent on them.
    pub async fn record_resets(
        &self,
        player_id: &str,
        game_ids: &[Uuid],
        now: OffsetDateTime,
    ) -> Result<(), Error> {
        if game_ids.is_empty() {
            return Ok(());
        }
        let recorded_at = format_datetime(now)?;
        let mut tx = self.db_connection.write().begin().await?;

        for game_id in game_ids {
            sqlx::query(
                "INSERT INTO streak_resets (player_id, game_id, recorded_at)
                 VALUES (?, ?, ?)
                 ON CONFLICT (player_id, game_id) DO NOTHING",
            )
            .bind(player_id)
            .bind(game_id.to_string())
            .bind(&recorded_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Undoes what a reopened question's game contributed to insurance for
    /// every player holding a pick on it: Free Kick uses on the game are
    /// refunded and recorded resets are dropped, so the next recomputation
    /// judges the game afresh. Returns how many credits were refunded.
    pub async fn release_question_game(&self, question_id: Uuid) -> Result<u64, Error> {
        let question_id = question_id.to_string();
        let mut tx = self.db_connection.write().begin().await?;

        let refunded = sqlx::query(
            "UPDATE players
             SET free_kick_credits = free_kick_credits + 1
             WHERE id IN (
                 SELECT fk.player_id
                 FROM free_kick_uses fk
                 JOIN questions q ON q.game_id = fk.game_id
                 JOIN picks pk ON pk.question_id = q.id AND pk.player_id = fk.player_id
                 WHERE q.id = ?
             )",
        )
        .bind(&question_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            "DELETE FROM free_kick_uses
             WHERE game_id = (SELECT game_id FROM questions WHERE id = ?)
               AND player_id IN (SELECT player_id FROM picks WHERE question_id = ?)",
        )
        .bind(&question_id)
        .bind(&question_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM streak_resets
             WHERE game_id = (SELECT game_id FROM questions WHERE id = ?)
               AND player_id IN (SELECT player_id FROM picks WHERE question_id = ?)",
        )
        .bind(&question_id)
        .bind(&question_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        if refunded > 0 {
            info!(
                "Refunded {} free kicks after question {} reopened",
                refunded, question_id
            );
        }
        Ok(refunded)
    }

    pub async fn get_player_free_kicks(&self, player_id: &str) -> Result<Vec<FreeKickUse>, Error> {
        let uses = sqlx::query_as::<_, FreeKickUse>(
            "SELECT player_id, game_id, used_at
             FROM free_kick_uses
             WHERE player_id = ?
             ORDER BY used_at",
        )
        .bind(player_id)
        .fetch_all(self.db_connection.read())
        .await?;

        Ok(uses)
    }
}
