//! Matchmaking service - drains the search queue into games

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::{notify, GameSession};
use crate::store::{SessionStore, User};
use crate::ws::protocol::ServerMsg;

/// Matchmaking service
pub struct MatchmakingService {
    store: Arc<dyn SessionStore>,
    period: Duration,
}

impl MatchmakingService {
    pub fn new(store: Arc<dyn SessionStore>, period: Duration) -> Self {
        Self { store, period }
    }

    /// Run the matchmaking service (periodic queue processing)
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Matchmaking service stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.run_tick();
                }
            }
        }
    }

    /// Pair the queue front to back. The earlier-queued user of each pair
    /// plays CROSS; an odd user out waits for the next tick.
    pub fn run_tick(&self) -> Vec<Arc<GameSession>> {
        let queued = self.store.searching_users();
        let mut created = Vec::with_capacity(queued.len() / 2);

        for pair in queued.chunks_exact(2) {
            if let Some(game) = self.create_game(pair[0], pair[1]) {
                created.push(game);
            }
        }

        if !created.is_empty() {
            info!(
                games = created.len(),
                still_queued = self.store.search_queue_len(),
                "Matchmaking tick created games"
            );
        }
        created
    }

    fn create_game(&self, first: Uuid, second: Uuid) -> Option<Arc<GameSession>> {
        let (Some(cross), Some(zero)) = (self.store.user(&first), self.store.user(&second)) else {
            // Disconnect cleanup is about to dequeue them; stale ids go now
            for id in [first, second] {
                if self.store.user(&id).is_none() {
                    self.store.remove_searching_user(&id);
                }
            }
            return None;
        };

        // A late GameSearchOn can re-queue a user who was matched meanwhile
        let busy: Vec<Uuid> = [&cross, &zero]
            .iter()
            .filter(|user| user.current_game().is_some())
            .map(|user| user.id())
            .collect();
        if !busy.is_empty() {
            for id in &busy {
                debug!(user_id = %id, "Already playing, dropped from queue");
                self.store.remove_searching_user(id);
            }
            return None;
        }

        // Both leave the queue together or the pair is skipped
        if !self.store.claim_search_pair(&first, &second) {
            debug!(%first, %second, "Pair changed since snapshot, skipping");
            return None;
        }

        // Registered before anyone points at it
        let game = Arc::new(GameSession::new(Uuid::new_v4(), first, second));
        self.store.add_game(game.clone());

        if !cross.join_game(game.id()) {
            self.abandon(&game, &[&zero]);
            return None;
        }
        if !zero.join_game(game.id()) {
            cross.clear_current_game(game.id());
            self.abandon(&game, &[&cross]);
            return None;
        }

        info!(
            game_id = %game.id(),
            cross_user_id = %game.cross_user(),
            zero_user_id = %game.zero_user(),
            "Game created"
        );

        let start = ServerMsg::GameSearchStart {
            game_id: game.id(),
            cross_user_id: game.cross_user(),
            zero_user_id: game.zero_user(),
        };
        notify::broadcast(self.store.as_ref(), &game, &ServerMsg::GameSearchOff);
        notify::broadcast(self.store.as_ref(), &game, &start);

        // A participant may have disconnected before seeing its game id
        for user_id in game.participants() {
            if self.store.user(&user_id).is_none() {
                warn!(game_id = %game.id(), user_id = %user_id, "Participant left during matchmaking");
                notify::forfeit(self.store.as_ref(), &game, user_id);
            }
        }

        Some(game)
    }

    /// Drop a game nobody was told about; free users go back in the queue
    fn abandon(&self, game: &GameSession, free: &[&Arc<User>]) {
        warn!(game_id = %game.id(), "Participant joined another game, abandoning");
        game.terminate();
        for user in free {
            self.store.add_searching_user(user.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Mark;
    use crate::store::{InMemoryStore, OutboundRx};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn login(store: &InMemoryStore) -> (Arc<User>, OutboundRx) {
        let (user, rx) = User::new();
        let user = Arc::new(user);
        store.add_user(user.clone());
        (user, rx)
    }

    fn service(store: &Arc<InMemoryStore>) -> MatchmakingService {
        MatchmakingService::new(store.clone(), Duration::from_secs(1))
    }

    #[test]
    fn pairs_in_queue_order_and_leaves_odd_user() {
        let store = Arc::new(InMemoryStore::new());
        let users: Vec<_> = (0..5).map(|_| login(&store)).collect();
        for (user, _) in &users {
            store.add_searching_user(user.id());
        }

        let games = service(&store).run_tick();

        assert_eq!(games.len(), 2);
        assert_eq!(games[0].cross_user(), users[0].0.id());
        assert_eq!(games[0].zero_user(), users[1].0.id());
        assert_eq!(games[1].cross_user(), users[2].0.id());
        assert_eq!(games[1].zero_user(), users[3].0.id());
        assert_eq!(store.searching_users(), vec![users[4].0.id()]);
        assert_eq!(store.game_count(), 2);
    }

    #[test]
    fn new_game_is_empty_with_cross_to_move() {
        let store = Arc::new(InMemoryStore::new());
        let (a, _rx_a) = login(&store);
        let (b, _rx_b) = login(&store);
        store.add_searching_user(a.id());
        store.add_searching_user(b.id());

        let game = service(&store).run_tick().pop().unwrap();

        assert_eq!(game.current_move(), Mark::Cross);
        assert!(!game.is_over());
        assert_eq!(a.current_game(), Some(game.id()));
        assert_eq!(b.current_game(), Some(game.id()));
    }

    #[test]
    fn both_players_get_search_off_then_start() {
        let store = Arc::new(InMemoryStore::new());
        let (a, mut rx_a) = login(&store);
        let (b, mut rx_b) = login(&store);
        store.add_searching_user(a.id());
        store.add_searching_user(b.id());

        let game = service(&store).run_tick().pop().unwrap();
        let start = ServerMsg::GameSearchStart {
            game_id: game.id(),
            cross_user_id: a.id(),
            zero_user_id: b.id(),
        };

        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(rx.try_recv().unwrap(), ServerMsg::GameSearchOff);
            assert_eq!(rx.try_recv().unwrap(), start);
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn unregistered_ids_are_dropped_from_queue() {
        let store = Arc::new(InMemoryStore::new());
        let (a, _rx) = login(&store);
        let ghost = Uuid::new_v4();
        store.add_searching_user(a.id());
        store.add_searching_user(ghost);

        assert!(service(&store).run_tick().is_empty());
        assert_eq!(store.searching_users(), vec![a.id()]);
    }

    #[test]
    fn empty_and_single_queues_create_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let matchmaking = service(&store);
        assert!(matchmaking.run_tick().is_empty());

        let (a, _rx) = login(&store);
        store.add_searching_user(a.id());
        assert!(matchmaking.run_tick().is_empty());
        assert_eq!(store.search_queue_len(), 1);
    }

    #[test]
    fn requeued_player_is_not_matched_twice() {
        let store = Arc::new(InMemoryStore::new());
        let (a, _rx_a) = login(&store);
        let (b, _rx_b) = login(&store);
        let (c, mut rx_c) = login(&store);
        store.add_searching_user(a.id());
        store.add_searching_user(b.id());
        let matchmaking = service(&store);
        let first = matchmaking.run_tick().pop().unwrap();

        // Late GameSearchOn slipped in after the pairing
        store.add_searching_user(a.id());
        store.add_searching_user(c.id());

        assert!(matchmaking.run_tick().is_empty());
        assert_eq!(store.game_count(), 1);
        assert_eq!(a.current_game(), Some(first.id()));
        assert!(!store.is_searching(&a.id()));
        assert_eq!(store.searching_users(), vec![c.id()]);
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn game_joined_elsewhere_is_abandoned_and_partner_requeued() {
        let store = Arc::new(InMemoryStore::new());
        let (a, _rx_a) = login(&store);
        let (b, mut rx_b) = login(&store);
        let matchmaking = service(&store);

        // Passes the queue check, loses the join
        let other = Uuid::new_v4();
        store.add_searching_user(a.id());
        store.add_searching_user(b.id());
        let game = Arc::new(GameSession::new(Uuid::new_v4(), a.id(), b.id()));
        store.add_game(game.clone());
        assert!(store.claim_search_pair(&a.id(), &b.id()));
        assert!(a.join_game(other));
        matchmaking.abandon(&game, &[&b]);

        assert!(game.is_over());
        assert_eq!(store.searching_users(), vec![b.id()]);
        assert_eq!(a.current_game(), Some(other));
        assert_eq!(b.current_game(), None);
        assert!(rx_b.try_recv().is_err());
    }

    /// In-memory store where `leaver` vanishes the moment its pair is claimed
    struct LeavingStore {
        inner: InMemoryStore,
        leaver: Uuid,
        claimed: AtomicBool,
    }

    impl SessionStore for LeavingStore {
        fn user(&self, id: &Uuid) -> Option<Arc<User>> {
            if *id == self.leaver && self.claimed.load(Ordering::SeqCst) {
                return None;
            }
            self.inner.user(id)
        }
        fn users(&self) -> Vec<Arc<User>> {
            self.inner.users()
        }
        fn add_user(&self, user: Arc<User>) {
            self.inner.add_user(user)
        }
        fn remove_user(&self, id: &Uuid) {
            self.inner.remove_user(id)
        }
        fn searching_users(&self) -> Vec<Uuid> {
            self.inner.searching_users()
        }
        fn is_searching(&self, id: &Uuid) -> bool {
            self.inner.is_searching(id)
        }
        fn add_searching_user(&self, id: Uuid) {
            self.inner.add_searching_user(id)
        }
        fn remove_searching_user(&self, id: &Uuid) {
            self.inner.remove_searching_user(id)
        }
        fn claim_search_pair(&self, first: &Uuid, second: &Uuid) -> bool {
            let claimed = self.inner.claim_search_pair(first, second);
            self.claimed.store(claimed, Ordering::SeqCst);
            claimed
        }
        fn game(&self, id: &Uuid) -> Option<Arc<GameSession>> {
            self.inner.game(id)
        }
        fn games(&self) -> Vec<Arc<GameSession>> {
            self.inner.games()
        }
        fn add_game(&self, game: Arc<GameSession>) {
            self.inner.add_game(game)
        }
        fn remove_game(&self, id: &Uuid) {
            self.inner.remove_game(id)
        }
        fn user_count(&self) -> usize {
            self.inner.user_count()
        }
        fn search_queue_len(&self) -> usize {
            self.inner.search_queue_len()
        }
        fn game_count(&self) -> usize {
            self.inner.game_count()
        }
    }

    #[test]
    fn participant_leaving_during_pairing_forfeits_the_game() {
        let inner = InMemoryStore::new();
        let (a, _rx_a) = login(&inner);
        let (b, mut rx_b) = login(&inner);
        inner.add_searching_user(a.id());
        inner.add_searching_user(b.id());
        let store = Arc::new(LeavingStore {
            inner,
            leaver: a.id(),
            claimed: AtomicBool::new(false),
        });

        let game = MatchmakingService::new(store.clone(), Duration::from_secs(1))
            .run_tick()
            .pop()
            .unwrap();

        assert_eq!(rx_b.try_recv().unwrap(), ServerMsg::GameSearchOff);
        assert!(matches!(rx_b.try_recv().unwrap(), ServerMsg::GameSearchStart { .. }));
        assert_eq!(rx_b.try_recv().unwrap(), ServerMsg::GameOver);
        assert!(rx_b.try_recv().is_err());
        assert!(game.is_over());
        assert_eq!(b.current_game(), None);
        assert_eq!(store.game_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_matches_until_shutdown() {
        let store = Arc::new(InMemoryStore::new());
        let (a, _rx_a) = login(&store);
        let (b, _rx_b) = login(&store);
        store.add_searching_user(a.id());
        store.add_searching_user(b.id());

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            MatchmakingService::new(store.clone(), Duration::from_millis(10)).run(shutdown.clone()),
        );

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(store.game_count(), 1);

        shutdown.cancel();
        tokio_test::assert_ok!(handle.await);
    }
}
