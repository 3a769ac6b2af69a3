use log::info;
use std::sync::Arc;
use streakr_core::{PickChoice, PickCommand};
use uuid::Uuid;

use crate::{domain::Error, infra::clock::Clock};

use super::{Pick, PickStore};

/// Player facing pick writes, checked against the lock at the time of the request.
pub struct PickLedger {
    pick_store: Arc<PickStore>,
    clock: Arc<dyn Clock>,
}

impl PickLedger {
    pub fn new(pick_store: Arc<PickStore>, clock: Arc<dyn Clock>) -> Self {
        Self { pick_store, clock }
    }

    /// Applies a pick request; a request without an outcome clears the pick.
    pub async fn submit(
        &self,
        player_id: &str,
        question_id: Uuid,
        command: &PickCommand,
    ) -> Result<Option<Pick>, Error> {
        match command.choice()? {
            Some(choice) => self.make_pick(player_id, question_id, choice).await.map(Some),
            None => {
                self.clear_pick(player_id, question_id).await?;
                Ok(None)
            }
        }
    }

    pub async fn make_pick(
        &self,
        player_id: &str,
        question_id: Uuid,
        choice: PickChoice,
    ) -> Result<Pick, Error> {
        let pick = self
            .pick_store
            .upsert_pick(player_id, question_id, choice, self.clock.now())
            .await?;
        info!("Player {} picked {} on {}", player_id, choice, question_id);
        Ok(pick)
    }

    pub async fn clear_pick(&self, player_id: &str, question_id: Uuid) -> Result<(), Error> {
        if self
            .pick_store
            .delete_pick(player_id, question_id, self.clock.now())
            .await?
        {
            info!("Player {} cleared their pick on {}", player_id, question_id);
        }
        Ok(())
    }

    pub async fn get_pick(
        &self,
        player_id: &str,
        question_id: Uuid,
    ) -> Result<Option<Pick>, Error> {
        self.pick_store.get_pick(player_id, question_id).await
    }
}
