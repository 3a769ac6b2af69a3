mod ledger;
mod store;

pub use ledger::*;
pub use store::*;

use crate::infra::db::{parse_required_datetime, parse_required_uuid, parse_text_enum};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row};
use streakr_core::PickChoice;
use time::OffsetDateTime;
use uuid::Uuid;

/// A player's yes/no call on one question. Settlement never rewrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    pub player_id: String,
    pub question_id: Uuid,
    pub outcome: PickChoice,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl FromRow<'_, SqliteRow> for Pick {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Pick {
            player_id: row.try_get("player_id")?,
            question_id: parse_required_uuid(row, "question_id")?,
            outcome: parse_text_enum(row, "outcome")?,
            created_at: parse_required_datetime(row, "created_at")?,
            updated_at: parse_required_datetime(row, "updated_at")?,
        })
    }
}

/// Yes/no pick totals on a question, the basis of the sentiment split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PickCounts {
    pub yes: u32,
    pub no: u32,
}
