mod lock_watcher;
mod settlement;
pub mod states;
mod store;

pub use lock_watcher::*;
pub use settlement::*;
pub use store::*;

use crate::infra::db::{
    parse_required_datetime, parse_required_uuid, parse_text_enum, parse_unix_datetime,
};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row};
use streakr_core::{
    validate_question_text, validate_quarter, CoreError, Outcome, PickChoice, QuestionStatusKind,
};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: Uuid,
    pub season: i32,
    pub number: u32,
    pub label: String,
    /// Finals rounds make up the "finals" leaderboard
    pub is_finals: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl FromRow<'_, SqliteRow> for Round {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Round {
            id: parse_required_uuid(row, "id")?,
            season: row.try_get("season")?,
            number: row.try_get::<i64, _>("number")? as u32,
            label: row.try_get("label")?,
            is_finals: row.try_get("is_finals")?,
            created_at: parse_required_datetime(row, "created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRound {
    /// Falls back to the configured season when left out
    #[serde(default)]
    pub season: Option<i32>,
    pub number: u32,
    pub label: String,
    #[serde(default)]
    pub is_finals: bool,
}

/// A single AFL match. Called a game everywhere in code since `match` is taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: Uuid,
    pub round_id: Uuid,
    /// Teams, e.g. "Carlton v Collingwood"
    pub label: String,
    pub venue: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    /// Admin override, a game with this unset is locked no matter the time
    pub is_unlocked_for_picks: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Game {
    pub fn is_locked(&self, now: OffsetDateTime) -> bool {
        now >= self.start_time || !self.is_unlocked_for_picks
    }
}

impl FromRow<'_, SqliteRow> for Game {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Game {
            id: parse_required_uuid(row, "id")?,
            round_id: parse_required_uuid(row, "round_id")?,
            label: row.try_get("label")?,
            venue: row.try_get("venue")?,
            start_time: parse_unix_datetime(row, "start_time")?,
            is_unlocked_for_picks: row.try_get("is_unlocked_for_picks")?,
            created_at: parse_required_datetime(row, "created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGame {
    pub round_id: Uuid,
    pub label: String,
    pub venue: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(default = "default_unlocked")]
    pub is_unlocked_for_picks: bool,
    pub questions: Vec<NewQuestion>,
}

fn default_unlocked() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
    /// 0 for a full game question, otherwise 1-4
    pub quarter: u8,
    pub text: String,
    #[serde(default)]
    pub is_sponsor_question: bool,
    #[serde(default)]
    pub sponsor_name: Option<String>,
}

impl NewGame {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.label.trim().is_empty() {
            return Err(CoreError::Validation("game label cannot be empty".into()));
        }
        if self.questions.is_empty() {
            return Err(CoreError::Validation(
                "a game needs at least one question".into(),
            ));
        }
        for question in &self.questions {
            validate_quarter(question.quarter)?;
            validate_question_text(&question.text)?;
            if !question.is_sponsor_question && question.sponsor_name.is_some() {
                return Err(CoreError::Validation(
                    "sponsor_name is only allowed on sponsor questions".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub game_id: Uuid,
    pub quarter: u8,
    pub text: String,
    pub status: QuestionStatusKind,
    /// Present exactly when status is final or void
    pub outcome: Option<Outcome>,
    pub is_sponsor_question: bool,
    pub sponsor_name: Option<String>,
    pub comment_count: u32,
    /// Bumped on every status change, the compare-and-set token for settlement
    pub version: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl FromRow<'_, SqliteRow> for Question {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let status: QuestionStatusKind = parse_text_enum(row, "status")?;
        let outcome = row
            .try_get::<Option<String>, _>("outcome")?
            .map(|raw| raw.parse::<Outcome>())
            .transpose()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "outcome".to_string(),
                source: Box::new(e),
            })?;

        if status.has_outcome() != outcome.is_some() {
            return Err(sqlx::Error::ColumnDecode {
                index: "outcome".to_string(),
                source: format!("question in status {} has outcome {:?}", status, outcome).into(),
            });
        }

        Ok(Question {
            id: parse_required_uuid(row, "id")?,
            game_id: parse_required_uuid(row, "game_id")?,
            quarter: row.try_get::<i64, _>("quarter")? as u8,
            text: row.try_get("text")?,
            status,
            outcome,
            is_sponsor_question: row.try_get("is_sponsor_question")?,
            sponsor_name: row.try_get("sponsor_name")?,
            comment_count: row.try_get::<i64, _>("comment_count")?.max(0) as u32,
            version: row.try_get("version")?,
            created_at: parse_required_datetime(row, "created_at")?,
            updated_at: parse_required_datetime(row, "updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameWithQuestions {
    #[serde(flatten)]
    pub game: Game,
    pub questions: Vec<Question>,
}

/// Read model for the picks screen: one game, its questions and how the
/// requesting player (if any) stands on each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameView {
    #[serde(flatten)]
    pub game: Game,
    pub is_locked: bool,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    #[serde(flatten)]
    pub question: Question,
    pub player_pick: Option<PickChoice>,
    pub personally_voided: bool,
    pub yes_percent: u8,
    pub no_percent: u8,
    pub total_picks: u32,
}

/// Split of yes/no picks on a question as whole percentages that add up to 100.
pub fn sentiment(yes_picks: u32, no_picks: u32) -> (u8, u8) {
    let total = yes_picks + no_picks;
    if total == 0 {
        return (0, 0);
    }
    let yes = ((yes_picks as f64 / total as f64) * 100.0).round() as u8;
    (yes, 100 - yes)
}
