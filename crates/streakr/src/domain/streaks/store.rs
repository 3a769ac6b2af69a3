use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row};
use std::collections::BTreeMap;
use streakr_core::{LeaderboardScope, Outcome};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    domain::Error,
    infra::db::{
        format_datetime, parse_optional_uuid, parse_required_datetime, parse_required_uuid,
        parse_text_enum, parse_unix_datetime, DBConnection,
    },
};

use super::{GameHistory, PickedQuestion, StreakOutcome};

/// Cached result of the last recomputation. Never read as the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub player_id: String,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub pending_game_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl FromRow<'_, SqliteRow> for StreakRecord {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(StreakRecord {
            player_id: row.try_get("player_id")?,
            current_streak: row.try_get::<i64, _>("current_streak")?.max(0) as u32,
            longest_streak: row.try_get::<i64, _>("longest_streak")?.max(0) as u32,
            pending_game_id: parse_optional_uuid(row, "pending_game_id")?,
            updated_at: parse_required_datetime(row, "updated_at")?,
        })
    }
}

/// One picked question joined with its game, its settlement state and the
/// player's insurance records.
struct HistoryRow {
    player_id: String,
    game_id: Uuid,
    round_id: Uuid,
    start_time: OffsetDateTime,
    picked: PickedQuestion,
    free_kick_used: bool,
    reset_recorded: bool,
}

impl FromRow<'_, SqliteRow> for HistoryRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let outcome = row
            .try_get::<Option<String>, _>("outcome")?
            .map(|raw| raw.parse::<Outcome>())
            .transpose()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "outcome".to_string(),
                source: Box::new(e),
            })?;

        Ok(HistoryRow {
            player_id: row.try_get("player_id")?,
            game_id: parse_required_uuid(row, "game_id")?,
            round_id: parse_required_uuid(row, "round_id")?,
            start_time: parse_unix_datetime(row, "start_time")?,
            picked: PickedQuestion {
                question_id: parse_required_uuid(row, "question_id")?,
                status: parse_text_enum(row, "status")?,
                outcome,
                pick: parse_text_enum(row, "pick")?,
                personally_voided: row.try_get("personally_voided")?,
            },
            free_kick_used: row.try_get("free_kick_used")?,
            reset_recorded: row.try_get("reset_recorded")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct StreakStore {
    db_connection: DBConnection,
}

impl StreakStore {
    pub fn new(db_connection: DBConnection) -> Self {
        Self { db_connection }
    }

    /// All games `player_id` picked in, oldest first.
    pub async fn get_player_history(&self, player_id: &str) -> Result<Vec<GameHistory>, Error> {
        let mut histories = self
            .load_histories(Some(player_id), LeaderboardScope::Overall)
            .await?;
        Ok(histories.remove(player_id).unwrap_or_default())
    }

    /// Game histories of every player with at least one pick inside `scope`.
    pub async fn get_scope_histories(
        &self,
        scope: LeaderboardScope,
    ) -> Result<BTreeMap<String, Vec<GameHistory>>, Error> {
        self.load_histories(None, scope).await
    }

    async fn load_histories(
        &self,
        player_id: Option<&str>,
        scope: LeaderboardScope,
    ) -> Result<BTreeMap<String, Vec<GameHistory>>, Error> {
        let round_id = match scope {
            LeaderboardScope::Round(round_id) => Some(round_id.to_string()),
            _ => None,
        };
        let finals_only = matches!(scope, LeaderboardScope::Finals);

        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT pk.player_id,
                    g.id AS game_id,
                    g.round_id,
                    g.start_time,
                    q.id AS question_id,
                    q.status,
                    q.outcome,
                    pk.outcome AS pick,
                    EXISTS(
                        SELECT 1 FROM personal_voids pv
                        WHERE pv.player_id = pk.player_id AND pv.question_id = q.id
                    ) AS personally_voided,
                    EXISTS(
                        SELECT 1 FROM free_kick_uses fk
                        WHERE fk.player_id = pk.player_id AND fk.game_id = g.id
                    ) AS free_kick_used,
                    EXISTS(
                        SELECT 1 FROM streak_resets sr
                        WHERE sr.player_id = pk.player_id AND sr.game_id = g.id
                    ) AS reset_recorded
             FROM picks pk
             JOIN questions q ON q.id = pk.question_id
             JOIN games g ON g.id = q.game_id
             JOIN rounds r ON r.id = g.round_id
             WHERE (? IS NULL OR pk.player_id = ?)
               AND (? IS NULL OR g.round_id = ?)
               AND (? = 0 OR r.is_finals = 1)
             ORDER BY pk.player_id, g.start_time, g.id, q.quarter, q.rowid",
        )
        .bind(player_id)
        .bind(player_id)
        .bind(&round_id)
        .bind(&round_id)
        .bind(finals_only)
        .fetch_all(self.db_connection.read())
        .await?;

        let mut histories: BTreeMap<String, Vec<GameHistory>> = BTreeMap::new();
        for row in rows {
            let games = histories.entry(row.player_id).or_default();
            match games.last_mut() {
                Some(game) if game.game_id == row.game_id => game.picks.push(row.picked),
                _ => games.push(GameHistory {
                    game_id: row.game_id,
                    round_id: row.round_id,
                    start_time: row.start_time,
                    picks: vec![row.picked],
                    free_kick_used: row.free_kick_used,
                    reset_recorded: row.reset_recorded,
                }),
            }
        }

        Ok(histories)
    }

    /// Writes the cache row. `longest_streak` only ever goes up.
    pub async fn save_streak(
        &self,
        player_id: &str,
        outcome: &StreakOutcome,
        now: OffsetDateTime,
    ) -> Result<StreakRecord, Error> {
        let record = sqlx::query_as::<_, StreakRecord>(
            "INSERT INTO player_streaks (player_id, current_streak, longest_streak, pending_game_id, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (player_id) DO UPDATE
             SET current_streak = excluded.current_streak,
                 longest_streak = MAX(player_streaks.longest_streak, excluded.longest_streak),
                 pending_game_id = excluded.pending_game_id,
                 updated_at = excluded.updated_at
             RETURNING player_id, current_streak, longest_streak, pending_game_id, updated_at",
        )
        .bind(player_id)
        .bind(outcome.current as i64)
        .bind(outcome.longest as i64)
        .bind(outcome.pending_game_id.map(|id| id.to_string()))
        .bind(format_datetime(now)?)
        .fetch_one(self.db_connection.write())
        .await?;

        Ok(record)
    }

    pub async fn get_streak(&self, player_id: &str) -> Result<Option<StreakRecord>, Error> {
        let record = sqlx::query_as::<_, StreakRecord>(
            "SELECT player_id, current_streak, longest_streak, pending_game_id, updated_at
             FROM player_streaks
             WHERE player_id = ?",
        )
        .bind(player_id)
        .fetch_optional(self.db_connection.read())
        .await?;

        Ok(record)
    }
}
