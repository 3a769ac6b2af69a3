//! Free Kick credits and Panic (personal) voids.
//!
//! Both are server side records the streak calculator reads. A personal void
//! takes one question out of a player's clean sweep check, at most once per
//! round. A Free Kick use stops one broken game from resetting the streak.

mod store;

pub use store::*;

use crate::infra::db::{parse_required_datetime, parse_required_uuid};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalVoid {
    pub player_id: String,
    pub round_id: Uuid,
    pub question_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl FromRow<'_, SqliteRow> for PersonalVoid {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(PersonalVoid {
            player_id: row.try_get("player_id")?,
            round_id: parse_required_uuid(row, "round_id")?,
            question_id: parse_required_uuid(row, "question_id")?,
            created_at: parse_required_datetime(row, "created_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeKickUse {
    pub player_id: String,
    pub game_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub used_at: OffsetDateTime,
}

impl FromRow<'_, SqliteRow> for FreeKickUse {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(FreeKickUse {
            player_id: row.try_get("player_id")?,
            game_id: parse_required_uuid(row, "game_id")?,
            used_at: parse_required_datetime(row, "used_at")?,
        })
    }
}
