//! Shared session state: users, the search queue and games

pub mod memory;
pub mod queue;
pub mod user;

pub use memory::InMemoryStore;
pub use user::{OutboundRx, User};

use std::sync::Arc;
use uuid::Uuid;

use crate::game::GameSession;

/// Repository shared by the dispatcher, the scheduler and the reaper.
///
/// Every operation is atomic on its own collection. Adds of present entries
/// and removes of absent ones are no-ops, and listings are snapshots.
pub trait SessionStore: Send + Sync {
    fn user(&self, id: &Uuid) -> Option<Arc<User>>;
    fn users(&self) -> Vec<Arc<User>>;
    fn add_user(&self, user: Arc<User>);
    fn remove_user(&self, id: &Uuid);

    /// Queued ids in insertion order
    fn searching_users(&self) -> Vec<Uuid>;
    fn is_searching(&self, id: &Uuid) -> bool;
    fn add_searching_user(&self, id: Uuid);
    fn remove_searching_user(&self, id: &Uuid);
    /// Dequeue both users in one step; `false` leaves the queue untouched
    fn claim_search_pair(&self, first: &Uuid, second: &Uuid) -> bool;

    fn game(&self, id: &Uuid) -> Option<Arc<GameSession>>;
    fn games(&self) -> Vec<Arc<GameSession>>;
    fn add_game(&self, game: Arc<GameSession>);
    fn remove_game(&self, id: &Uuid);

    fn user_count(&self) -> usize;
    fn search_queue_len(&self) -> usize;
    fn game_count(&self) -> usize;
}
