use log::info;
use time::OffsetDateTime;

use crate::{
    domain::Error,
    infra::db::{format_datetime, DBConnection},
};

use super::{Player, RegisterPlayer};

#[derive(Debug, Clone)]
pub struct PlayerStore {
    db_connection: DBConnection,
}

impl PlayerStore {
    pub fn new(db_connection: DBConnection) -> Self {
        Self { db_connection }
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        self.db_connection.ping().await
    }

    pub async fn register_player(&self, player: RegisterPlayer) -> Result<Player, Error> {
        player.validate()?;
        let now = format_datetime(OffsetDateTime::now_utc())?;
        let player_id = player.id.trim().to_string();

        let registered = sqlx::query_as::<_, Player>(
            "INSERT INTO players (id, display_name, free_kick_credits, created_at)
             VALUES (?, ?, 0, ?)
             RETURNING id, display_name, free_kick_credits, created_at",
        )
        .bind(&player_id)
        .bind(player.display_name.trim())
        .bind(now)
        .fetch_one(self.db_connection.write())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Error::BadRequest(format!("player {} is already registered", player_id))
            }
            e => Error::DbError(e),
        })?;

        info!("Registered player {}", registered.id);
        Ok(registered)
    }

    pub async fn get_player(&self, player_id: &str) -> Result<Player, Error> {
        let player = sqlx::query_as::<_, Player>(
            "SELECT id, display_name, free_kick_credits, created_at
             FROM players
             WHERE id = ?",
        )
        .bind(player_id)
        .fetch_optional(self.db_connection.read())
        .await?;

        player.ok_or_else(|| Error::NotFound(format!("player {} not found", player_id)))
    }

    pub async fn get_players(&self) -> Result<Vec<Player>, Error> {
        let players = sqlx::query_as::<_, Player>(
            "SELECT id, display_name, free_kick_credits, created_at
             FROM players
             ORDER BY id",
        )
        .fetch_all(self.db_connection.read())
        .await?;

        Ok(players)
    }

    /// Adds Free Kick credits to a player's balance.
    pub async fn grant_free_kicks(&self, player_id: &str, credits: u32) -> Result<Player, Error> {
        if credits == 0 {
            return Err(Error::BadRequest("credits must be greater than 0".into()));
        }

        let player = sqlx::query_as::<_, Player>(
            "UPDATE players
             SET free_kick_credits = free_kick_credits + ?
             WHERE id = ?
             RETURNING id, display_name, free_kick_credits, created_at",
        )
        .bind(credits as i64)
        .bind(player_id)
        .fetch_optional(self.db_connection.write())
        .await?;

        let player =
            player.ok_or_else(|| Error::NotFound(format!("player {} not found", player_id)))?;
        info!(
            "Granted {} free kicks to {}, balance {}",
            credits, player.id, player.free_kick_credits
        );
        Ok(player)
    }
}
