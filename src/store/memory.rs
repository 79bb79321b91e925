//! In-process store, nothing survives a restart

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

use crate::game::GameSession;

use super::queue::SearchQueue;
use super::user::User;
use super::SessionStore;

/// Store backed by concurrent maps; each collection has its own lock
pub struct InMemoryStore {
    users: DashMap<Uuid, Arc<User>>,
    search_queue: RwLock<SearchQueue>,
    games: DashMap<Uuid, Arc<GameSession>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            search_queue: RwLock::new(SearchQueue::new()),
            games: DashMap::new(),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemoryStore {
    fn user(&self, id: &Uuid) -> Option<Arc<User>> {
        self.users.get(id).map(|u| u.value().clone())
    }

    fn users(&self) -> Vec<Arc<User>> {
        self.users.iter().map(|u| u.value().clone()).collect()
    }

    fn add_user(&self, user: Arc<User>) {
        self.users.entry(user.id()).or_insert(user);
    }

    fn remove_user(&self, id: &Uuid) {
        self.users.remove(id);
    }

    fn searching_users(&self) -> Vec<Uuid> {
        self.search_queue.read().ids()
    }

    fn is_searching(&self, id: &Uuid) -> bool {
        self.search_queue.read().contains(id)
    }

    fn add_searching_user(&self, id: Uuid) {
        self.search_queue.write().enqueue(id);
    }

    fn remove_searching_user(&self, id: &Uuid) {
        self.search_queue.write().dequeue(id);
    }

    fn claim_search_pair(&self, first: &Uuid, second: &Uuid) -> bool {
        self.search_queue.write().take_pair(first, second)
    }

    fn game(&self, id: &Uuid) -> Option<Arc<GameSession>> {
        self.games.get(id).map(|g| g.value().clone())
    }

    fn games(&self) -> Vec<Arc<GameSession>> {
        self.games.iter().map(|g| g.value().clone()).collect()
    }

    fn add_game(&self, game: Arc<GameSession>) {
        self.games.entry(game.id()).or_insert(game);
    }

    fn remove_game(&self, id: &Uuid) {
        self.games.remove(id);
    }

    fn user_count(&self) -> usize {
        self.users.len()
    }

    fn search_queue_len(&self) -> usize {
        self.search_queue.read().len()
    }

    fn game_count(&self) -> usize {
        self.games.len()
    }
}
