mod store;

pub use store::*;

use crate::infra::db::parse_required_datetime;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row};
use streakr_core::{validate_display_name, CoreError};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub display_name: String,
    /// Season scoped Free Kick balance, granted from outside the engine
    pub free_kick_credits: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl FromRow<'_, SqliteRow> for Player {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Player {
            id: row.try_get("id")?,
            display_name: row.try_get("display_name")?,
            free_kick_credits: row.try_get::<i64, _>("free_kick_credits")?.max(0) as u32,
            created_at: parse_required_datetime(row, "created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPlayer {
    pub id: String,
    pub display_name: String,
}

impl RegisterPlayer {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.trim().is_empty() {
            return Err(CoreError::Validation("player id cannot be empty".into()));
        }
        validate_display_name(&self.display_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantFreeKicks {
    pub credits: u32,
}
