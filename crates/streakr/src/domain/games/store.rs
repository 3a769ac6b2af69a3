use log::{debug, info};
use sqlx::Row;
use streakr_core::QuestionStatusKind;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    domain::Error,
    infra::db::{format_datetime, DBConnection},
};

use super::{Game, GameWithQuestions, NewGame, NewRound, Question, Round};

#[derive(Debug, Clone)]
pub struct GameStore {
    db_connection: DBConnection,
}

impl GameStore {
    pub fn new(db_connection: DBConnection) -> Self {
        Self { db_connection }
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        self.db_connection.ping().await
    }

    pub async fn add_round(&self, new_round: NewRound) -> Result<Round, Error> {
        let season = new_round
            .season
            .ok_or_else(|| Error::BadRequest("round season is required".into()))?;
        if new_round.label.trim().is_empty() {
            return Err(Error::BadRequest("round label cannot be empty".into()));
        }
        let now = format_datetime(OffsetDateTime::now_utc())?;

        let round = sqlx::query_as::<_, Round>(
            "INSERT INTO rounds (id, season, number, label, is_finals, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id, season, number, label, is_finals, created_at",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(season)
        .bind(new_round.number as i64)
        .bind(&new_round.label)
        .bind(new_round.is_finals)
        .bind(now)
        .fetch_one(self.db_connection.write())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Error::BadRequest(format!(
                    "round {} of season {} already exists",
                    new_round.number, season
                ))
            }
            e => Error::DbError(e),
        })?;

        info!("Added round {} ({})", round.id, round.label);
        Ok(round)
    }

    pub async fn get_round(&self, round_id: Uuid) -> Result<Round, Error> {
        let round = sqlx::query_as::<_, Round>(
            "SELECT id, season, number, label, is_finals, created_at
             FROM rounds
             WHERE id = ?",
        )
        .bind(round_id.to_string())
        .fetch_optional(self.db_connection.read())
        .await?;

        round.ok_or_else(|| Error::NotFound(format!("round {} not found", round_id)))
    }

    /// Creates a game and all of its questions in one transaction.
    pub async fn add_game(&self, new_game: NewGame) -> Result<GameWithQuestions, Error> {
        new_game.validate()?;
        self.get_round(new_game.round_id).await?;

        let now = format_datetime(OffsetDateTime::now_utc())?;
        let game_id = Uuid::now_v7();

        let mut tx = self.db_connection.write().begin().await?;

        sqlx::query(
            "INSERT INTO games (id, round_id, label, venue, start_time, is_unlocked_for_picks, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(game_id.to_string())
        .bind(new_game.round_id.to_string())
        .bind(&new_game.label)
        .bind(&new_game.venue)
        .bind(new_game.start_time.unix_timestamp())
        .bind(new_game.is_unlocked_for_picks)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        for question in &new_game.questions {
            sqlx::query(
                "INSERT INTO questions (
                    id,
                    game_id,
                    quarter,
                    text,
                    status,
                    is_sponsor_question,
                    sponsor_name,
                    created_at,
                    updated_at
                ) VALUES (?, ?, ?, ?, 'open', ?, ?, ?, ?)",
            )
            .bind(Uuid::now_v7().to_string())
            .bind(game_id.to_string())
            .bind(question.quarter as i64)
            .bind(question.text.trim())
            .bind(question.is_sponsor_question)
            .bind(&question.sponsor_name)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            "Added game {} ({}) with {} questions",
            game_id,
            new_game.label,
            new_game.questions.len()
        );

        let game = self.get_game(game_id).await?;
        let questions = self.get_game_questions(game_id).await?;
        Ok(GameWithQuestions { game, questions })
    }

    pub async fn get_game(&self, game_id: Uuid) -> Result<Game, Error> {
        let game = sqlx::query_as::<_, Game>(
            "SELECT id, round_id, label, venue, start_time, is_unlocked_for_picks, created_at
             FROM games
             WHERE id = ?",
        )
        .bind(game_id.to_string())
        .fetch_optional(self.db_connection.read())
        .await?;

        game.ok_or_else(|| Error::NotFound(format!("game {} not found", game_id)))
    }

    /// Games of a round in the order they are played.
    pub async fn get_round_games(&self, round_id: Uuid) -> Result<Vec<Game>, Error> {
        let games = sqlx::query_as::<_, Game>(
            "SELECT id, round_id, label, venue, start_time, is_unlocked_for_picks, created_at
             FROM games
             WHERE round_id = ?
             ORDER BY start_time, id",
        )
        .bind(round_id.to_string())
        .fetch_all(self.db_connection.read())
        .await?;

        Ok(games)
    }

    pub async fn get_game_questions(&self, game_id: Uuid) -> Result<Vec<Question>, Error> {
        let questions = sqlx::query_as::<_, Question>(
            "SELECT id, game_id, quarter, text, status, outcome, is_sponsor_question,
                    sponsor_name, comment_count, version, created_at, updated_at
             FROM questions
             WHERE game_id = ?
             ORDER BY quarter, created_at, rowid",
        )
        .bind(game_id.to_string())
        .fetch_all(self.db_connection.read())
        .await?;

        Ok(questions)
    }

    /// Every question of a round, grouped by game and in display order within a game.
    pub async fn get_round_questions(&self, round_id: Uuid) -> Result<Vec<Question>, Error> {
        let questions = sqlx::query_as::<_, Question>(
            "SELECT q.id, q.game_id, q.quarter, q.text, q.status, q.outcome, q.is_sponsor_question,
                    q.sponsor_name, q.comment_count, q.version, q.created_at, q.updated_at
             FROM questions q
             JOIN games g ON g.id = q.game_id
             WHERE g.round_id = ?
             ORDER BY g.start_time, g.id, q.quarter, q.created_at, q.rowid",
        )
        .bind(round_id.to_string())
        .fetch_all(self.db_connection.read())
        .await?;

        Ok(questions)
    }

    pub async fn get_question(&self, question_id: Uuid) -> Result<Question, Error> {
        let question = sqlx::query_as::<_, Question>(
            "SELECT id, game_id, quarter, text, status, outcome, is_sponsor_question,
                    sponsor_name, comment_count, version, created_at, updated_at
             FROM questions
             WHERE id = ?",
        )
        .bind(question_id.to_string())
        .fetch_optional(self.db_connection.read())
        .await?;

        question.ok_or_else(|| Error::NotFound(format!("question {} not found", question_id)))
    }

    /// Round a question belongs to, needed to enforce the per-round panic void quota.
    pub async fn get_question_round_id(&self, question_id: Uuid) -> Result<Uuid, Error> {
        let row = sqlx::query(
            "SELECT g.round_id
             FROM questions q
             JOIN games g ON g.id = q.game_id
             WHERE q.id = ?",
        )
        .bind(question_id.to_string())
        .fetch_optional(self.db_connection.read())
        .await?
        .ok_or_else(|| Error::NotFound(format!("question {} not found", question_id)))?;

        let raw: String = row.try_get("round_id")?;
        Uuid::parse_str(&raw).map_err(|e| {
            Error::DbError(sqlx::Error::ColumnDecode {
                index: "round_id".to_string(),
                source: Box::new(e),
            })
        })
    }

    /// Writes `next` only if the stored row is still at `(expected_status, expected_version)`.
    /// Returns false when another writer got there first.
    pub async fn compare_and_set_question(
        &self,
        next: &Question,
        expected_status: QuestionStatusKind,
        expected_version: i64,
    ) -> Result<bool, Error> {
        let updated_at = format_datetime(next.updated_at)?;

        let result = sqlx::query(
            "UPDATE questions
             SET status = ?,
                 outcome = ?,
                 version = ?,
                 updated_at = ?
             WHERE id = ?
               AND status = ?
               AND version = ?",
        )
        .bind(next.status.as_str())
        .bind(next.outcome.map(|outcome| outcome.as_str()))
        .bind(next.version)
        .bind(updated_at)
        .bind(next.id.to_string())
        .bind(expected_status.as_str())
        .bind(expected_version)
        .execute(self.db_connection.write())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn set_game_unlocked(
        &self,
        game_id: Uuid,
        is_unlocked_for_picks: bool,
    ) -> Result<Game, Error> {
        let game = sqlx::query_as::<_, Game>(
            "UPDATE games
             SET is_unlocked_for_picks = ?
             WHERE id = ?
             RETURNING id, round_id, label, venue, start_time, is_unlocked_for_picks, created_at",
        )
        .bind(is_unlocked_for_picks)
        .bind(game_id.to_string())
        .fetch_optional(self.db_connection.write())
        .await?;

        let game = game.ok_or_else(|| Error::NotFound(format!("game {} not found", game_id)))?;
        info!(
            "Game {} is now {} for picks",
            game.id,
            if is_unlocked_for_picks { "unlocked" } else { "locked" }
        );
        Ok(game)
    }

    /// Moves every open question of a game that has started to pending.
    pub async fn lock_started_games(&self, now: OffsetDateTime) -> Result<u64, Error> {
        let updated_at = format_datetime(now)?;

        let result = sqlx::query(
            "UPDATE questions
             SET status = 'pending',
                 version = version + 1,
                 updated_at = ?
             WHERE status = 'open'
               AND game_id IN (SELECT id FROM games WHERE start_time <= ?)",
        )
        .bind(updated_at)
        .bind(now.unix_timestamp())
        .execute(self.db_connection.write())
        .await?;

        debug!("auto-lock moved {} questions to pending", result.rows_affected());
        Ok(result.rows_affected())
    }
}
