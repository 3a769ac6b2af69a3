use log::{error, info};
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::infra::clock::Clock;

use super::GameStore;

/// Keeps stored question status in line with the time based lock: once a
/// game has started, its open questions are moved to pending.
pub struct AutoLockWatcher {
    game_store: Arc<GameStore>,
    clock: Arc<dyn Clock>,
    sync_interval: Duration,
    cancel_token: CancellationToken,
}

impl AutoLockWatcher {
    pub fn new(
        game_store: Arc<GameStore>,
        clock: Arc<dyn Clock>,
        cancel_token: CancellationToken,
        sync_interval: Duration,
    ) -> Self {
        Self {
            game_store,
            clock,
            sync_interval,
            cancel_token,
        }
    }

    pub async fn watch(&self) -> Result<(), anyhow::Error> {
        info!("Starting auto-lock watcher");

        loop {
            if self.cancel_token.is_cancelled() {
                info!("Auto-lock watcher received cancellation");
                break;
            }

            match self.game_store.lock_started_games(self.clock.now()).await {
                Ok(0) => {}
                Ok(locked) => info!("Auto-locked {} questions of started games", locked),
                Err(e) => error!("Auto-lock error: {}", e),
            }

            tokio::select! {
                _ = sleep(self.sync_interval) => continue,
                _ = self.cancel_token.cancelled() => {
                    info!("Auto-lock watcher cancelled during sleep");
                    break;
                }
            }
        }

        Ok(())
    }
}
