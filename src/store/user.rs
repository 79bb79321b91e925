//! Connected user and its outbound queue

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

/// Display name before Login
pub const ANONYMOUS_NAME: &str = "<empty>";

/// Sending half of a user's outbound queue
pub type OutboundTx = mpsc::UnboundedSender<ServerMsg>;
/// Receiving half, owned by the connection's writer task
pub type OutboundRx = mpsc::UnboundedReceiver<ServerMsg>;

/// One connected participant.
///
/// The current game is held by id only; the game itself lives in the store.
#[derive(Debug)]
pub struct User {
    id: Uuid,
    username: RwLock<String>,
    current_game: RwLock<Option<Uuid>>,
    outbound: OutboundTx,
}

impl User {
    /// Create a user with a fresh id and its outbound queue
    pub fn new() -> (Self, OutboundRx) {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> (Self, OutboundRx) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let user = Self {
            id,
            username: RwLock::new(ANONYMOUS_NAME.to_string()),
            current_game: RwLock::new(None),
            outbound,
        };
        (user, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> String {
        self.username.read().clone()
    }

    pub fn set_username(&self, username: impl Into<String>) {
        *self.username.write() = username.into();
    }

    pub fn current_game(&self) -> Option<Uuid> {
        *self.current_game.read()
    }

    /// Attach the user to `game_id` unless already in a game
    pub fn join_game(&self, game_id: Uuid) -> bool {
        let mut current = self.current_game.write();
        if current.is_some() {
            return false;
        }
        *current = Some(game_id);
        true
    }

    /// Clear the current game, but only if it still points at `game_id`
    pub fn clear_current_game(&self, game_id: Uuid) {
        let mut current = self.current_game.write();
        if *current == Some(game_id) {
            *current = None;
        }
    }

    /// Queue a message for delivery. A closed queue means the writer task
    /// is gone and disconnect cleanup is already underway.
    pub fn send(&self, msg: ServerMsg) {
        if self.outbound.send(msg).is_err() {
            debug!(user_id = %self.id, "Outbound queue closed, dropping message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_queue_is_fifo() {
        let (user, mut rx) = User::new();
        user.send(ServerMsg::GameSearchOff);
        user.send(ServerMsg::GameDraw);
        assert_eq!(rx.try_recv().unwrap(), ServerMsg::GameSearchOff);
        assert_eq!(rx.try_recv().unwrap(), ServerMsg::GameDraw);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn clearing_a_stale_game_keeps_the_new_one() {
        let (user, _rx) = User::new();
        let old_game = Uuid::new_v4();
        let new_game = Uuid::new_v4();

        assert!(user.join_game(new_game));
        user.clear_current_game(old_game);
        assert_eq!(user.current_game(), Some(new_game));

        user.clear_current_game(new_game);
        assert_eq!(user.current_game(), None);
    }

    #[test]
    fn joining_a_second_game_is_refused() {
        let (user, _rx) = User::new();
        let first = Uuid::new_v4();
        assert!(user.join_game(first));
        assert!(!user.join_game(Uuid::new_v4()));
        assert_eq!(user.current_game(), Some(first));
    }

    #[test]
    fn send_after_receiver_dropped_is_silent() {
        let (user, rx) = User::new();
        drop(rx);
        user.send(ServerMsg::GameOver);
        assert_eq!(user.username(), ANONYMOUS_NAME);
    }
}
