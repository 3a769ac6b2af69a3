use log::debug;
use sqlx::Row;
use std::collections::HashMap;
use streakr_core::PickChoice;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    domain::Error,
    infra::db::{format_datetime, parse_required_uuid, DBConnection},
};

use super::{Pick, PickCounts};

#[derive(Debug, Clone)]
pub struct PickStore {
    db_connection: DBConnection,
}

impl PickStore {
    pub fn new(db_connection: DBConnection) -> Self {
        Self { db_connection }
    }

    /// Creates or replaces a pick in one statement. The SELECT only yields a
    /// row while the question is open and its game is unlocked and not yet
    /// started, so a pick can never slip in behind a lock.
    pub async fn upsert_pick(
        &self,
        player_id: &str,
        question_id: Uuid,
        choice: PickChoice,
        now: OffsetDateTime,
    ) -> Result<Pick, Error> {
        let timestamp = format_datetime(now)?;

        let pick = sqlx::query_as::<_, Pick>(
            "INSERT INTO picks (player_id, question_id, outcome, created_at, updated_at)
             SELECT p.id, q.id, ?, ?, ?
             FROM questions q
             JOIN games g ON g.id = q.game_id
             JOIN players p ON p.id = ?
             WHERE q.id = ?
               AND q.status = 'open'
               AND g.is_unlocked_for_picks = 1
               AND g.start_time > ?
             ON CONFLICT (player_id, question_id) DO UPDATE
             SET outcome = excluded.outcome,
                 updated_at = excluded.updated_at
             RETURNING player_id, question_id, outcome, created_at, updated_at",
        )
        .bind(choice.as_str())
        .bind(&timestamp)
        .bind(&timestamp)
        .bind(player_id)
        .bind(question_id.to_string())
        .bind(now.unix_timestamp())
        .fetch_optional(self.db_connection.write())
        .await?;

        match pick {
            Some(pick) => Ok(pick),
            None => Err(self.explain_rejection(player_id, question_id).await?),
        }
    }

    /// Removes a pick under the same lock rules as writing one. Clearing a
    /// pick that does not exist succeeds only while picks are still open.
    pub async fn delete_pick(
        &self,
        player_id: &str,
        question_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            "DELETE FROM picks
             WHERE player_id = ?
               AND question_id = ?
               AND question_id IN (
                   SELECT q.id
                   FROM questions q
                   JOIN games g ON g.id = q.game_id
                   WHERE q.status = 'open'
                     AND g.is_unlocked_for_picks = 1
                     AND g.start_time > ?
               )",
        )
        .bind(player_id)
        .bind(question_id.to_string())
        .bind(now.unix_timestamp())
        .execute(self.db_connection.write())
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // nothing deleted: either the lock guard stopped it or there was no pick
        if self.get_pick(player_id, question_id).await?.is_none()
            && self.is_open_for_picks(question_id, now).await?
        {
            return Ok(false);
        }
        Err(self.explain_rejection(player_id, question_id).await?)
    }

    async fn is_open_for_picks(
        &self,
        question_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<bool, Error> {
        let open: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1
                 FROM questions q
                 JOIN games g ON g.id = q.game_id
                 WHERE q.id = ?
                   AND q.status = 'open'
                   AND g.is_unlocked_for_picks = 1
                   AND g.start_time > ?
             )",
        )
        .bind(question_id.to_string())
        .bind(now.unix_timestamp())
        .fetch_one(self.db_connection.read())
        .await?;

        Ok(open)
    }

    /// Works out why a guarded pick write touched no rows.
    async fn explain_rejection(&self, player_id: &str, question_id: Uuid) -> Result<Error, Error> {
        let player_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM players WHERE id = ?)")
                .bind(player_id)
                .fetch_one(self.db_connection.read())
                .await?;
        if !player_exists {
            return Ok(Error::NotFound(format!("player {} not found", player_id)));
        }

        let question_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM questions WHERE id = ?)")
                .bind(question_id.to_string())
                .fetch_one(self.db_connection.read())
                .await?;
        if !question_exists {
            return Ok(Error::NotFound(format!("question {} not found", question_id)));
        }

        debug!("pick by {} on {} rejected by lock guard", player_id, question_id);
        Ok(Error::PickRejected(question_id))
    }

    pub async fn get_pick(
        &self,
        player_id: &str,
        question_id: Uuid,
    ) -> Result<Option<Pick>, Error> {
        let pick = sqlx::query_as::<_, Pick>(
            "SELECT player_id, question_id, outcome, created_at, updated_at
             FROM picks
             WHERE player_id = ? AND question_id = ?",
        )
        .bind(player_id)
        .bind(question_id.to_string())
        .fetch_optional(self.db_connection.read())
        .await?;

        Ok(pick)
    }

    pub async fn get_player_round_picks(
        &self,
        player_id: &str,
        round_id: Uuid,
    ) -> Result<Vec<Pick>, Error> {
        let picks = sqlx::query_as::<_, Pick>(
            "SELECT p.player_id, p.question_id, p.outcome, p.created_at, p.updated_at
             FROM picks p
             JOIN questions q ON q.id = p.question_id
             JOIN games g ON g.id = q.game_id
             WHERE p.player_id = ? AND g.round_id = ?",
        )
        .bind(player_id)
        .bind(round_id.to_string())
        .fetch_all(self.db_connection.read())
        .await?;

        Ok(picks)
    }

    /// Players whose streak depends on the question.
    pub async fn get_question_player_ids(&self, question_id: Uuid) -> Result<Vec<String>, Error> {
        let player_ids = sqlx::query_scalar::<_, String>(
            "SELECT player_id FROM picks WHERE question_id = ? ORDER BY player_id",
        )
        .bind(question_id.to_string())
        .fetch_all(self.db_connection.read())
        .await?;

        Ok(player_ids)
    }

    pub async fn get_round_pick_counts(
        &self,
        round_id: Uuid,
    ) -> Result<HashMap<Uuid, PickCounts>, Error> {
        let rows = sqlx::query(
            "SELECT p.question_id,
                    SUM(CASE WHEN p.outcome = 'yes' THEN 1 ELSE 0 END) AS yes_count,
                    SUM(CASE WHEN p.outcome = 'no' THEN 1 ELSE 0 END) AS no_count
             FROM picks p
             JOIN questions q ON q.id = p.question_id
             JOIN games g ON g.id = q.game_id
             WHERE g.round_id = ?
             GROUP BY p.question_id",
        )
        .bind(round_id.to_string())
        .fetch_all(self.db_connection.read())
        .await?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let question_id = parse_required_uuid(&row, "question_id")?;
            counts.insert(
                question_id,
                PickCounts {
                    yes: row.try_get::<i64, _>("yes_count")?.max(0) as u32,
                    no: row.try_get::<i64, _>("no_count")?.max(0) as u32,
                },
            );
        }

        Ok(counts)
    }
}
