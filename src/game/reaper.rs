//! Periodic eviction of finished games

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::store::SessionStore;

/// Removes finished games from the store.
///
/// The only component allowed to delete games. It sends nothing, the
/// transition that finished a game already notified its players.
pub struct SessionReaper {
    store: Arc<dyn SessionStore>,
    period: Duration,
}

impl SessionReaper {
    pub fn new(store: Arc<dyn SessionStore>, period: Duration) -> Self {
        Self { store, period }
    }

    /// Tick until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Session reaper stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.run_tick();
                }
            }
        }
    }

    /// Remove every finished game, returns how many were removed
    pub fn run_tick(&self) -> usize {
        let mut removed = 0;
        for game in self.store.games() {
            if game.is_over() {
                self.store.remove_game(&game.id());
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, remaining = self.store.game_count(), "Reaped finished games");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameSession;
    use crate::store::InMemoryStore;
    use uuid::Uuid;

    fn add_game(store: &InMemoryStore) -> Arc<GameSession> {
        let game = Arc::new(GameSession::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()));
        store.add_game(game.clone());
        game
    }

    #[test]
    fn removes_only_finished_games() {
        let store = Arc::new(InMemoryStore::new());
        let live = add_game(&store);
        let finished = add_game(&store);
        finished.terminate();

        let reaper = SessionReaper::new(store.clone(), Duration::from_secs(1));
        assert_eq!(reaper.run_tick(), 1);
        assert!(store.game(&live.id()).is_some());
        assert!(store.game(&finished.id()).is_none());

        assert_eq!(reaper.run_tick(), 0);
        assert_eq!(store.game_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_reaps_and_stops_on_shutdown() {
        let store = Arc::new(InMemoryStore::new());
        add_game(&store).terminate();

        let shutdown = CancellationToken::new();
        let reaper = SessionReaper::new(store.clone(), Duration::from_millis(10));
        let handle = tokio::spawn(reaper.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(store.game_count(), 0);

        shutdown.cancel();
        tokio_test::assert_ok!(handle.await);
    }
}
