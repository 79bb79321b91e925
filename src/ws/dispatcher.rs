//! Applies decoded client messages to the store and games

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::game::{notify, MoveOutcome, Position};
use crate::store::{SessionStore, User};
use crate::ws::protocol::{escape_text, ClientMsg, ServerMsg};

/// Protocol state machine for one connection.
///
/// Replies go into outbound queues only; nothing here touches the socket.
pub struct Dispatcher {
    store: Arc<dyn SessionStore>,
    user: Arc<User>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn SessionStore>, user: Arc<User>) -> Self {
        Self { store, user }
    }

    pub fn user(&self) -> &Arc<User> {
        &self.user
    }

    /// Handle one inbound message
    pub fn handle(&self, msg: ClientMsg) {
        match msg {
            ClientMsg::Login { username } => self.login(username),
            ClientMsg::GameSearchOn => self.search_on(),
            ClientMsg::GameSearchOff => {
                self.store.remove_searching_user(&self.user.id());
            }
            ClientMsg::GameOver => self.leave_game(),
            ClientMsg::GameMove { position } => self.game_move(position),
            ClientMsg::MessageSend { text } => self.chat(&text),
        }
    }

    /// Connection closed: forget the user and end any running game
    pub fn disconnect(&self) {
        let user_id = self.user.id();
        self.store.remove_searching_user(&user_id);
        self.store.remove_user(&user_id);
        self.leave_game();
        info!(user_id = %user_id, "User disconnected");
    }

    fn login(&self, username: String) {
        self.user.set_username(username);
        self.store.add_user(self.user.clone());
        info!(user_id = %self.user.id(), username = %self.user.username(), "User logged in");

        self.user.send(ServerMsg::LoginSuccess {
            user_id: self.user.id(),
            username: self.user.username(),
        });
    }

    fn search_on(&self) {
        let user_id = self.user.id();
        if self.store.user(&user_id).is_none() {
            debug!(user_id = %user_id, "Search before login ignored");
            return;
        }
        if self.user.current_game().is_some() {
            debug!(user_id = %user_id, "Search while in a game ignored");
            return;
        }
        self.store.add_searching_user(user_id);
        // Matched between the check and the enqueue
        if self.user.current_game().is_some() {
            self.store.remove_searching_user(&user_id);
            return;
        }
        debug!(user_id = %user_id, queued = self.store.search_queue_len(), "User searching");
    }

    fn leave_game(&self) {
        let Some(game_id) = self.user.current_game() else {
            return;
        };
        self.user.clear_current_game(game_id);
        match self.store.game(&game_id) {
            Some(game) => {
                notify::forfeit(self.store.as_ref(), &game, self.user.id());
            }
            None => warn!(user_id = %self.user.id(), %game_id, "Left a game missing from the store"),
        }
    }

    fn game_move(&self, position: Position) {
        let Some(game_id) = self.user.current_game() else {
            debug!(user_id = %self.user.id(), "Move without an active game");
            return;
        };
        let Some(game) = self.store.game(&game_id) else {
            // Only reachable if the game was evicted before the finish released us
            warn!(user_id = %self.user.id(), %game_id, "Current game missing from the store");
            self.user.clear_current_game(game_id);
            return;
        };

        let store = self.store.as_ref();
        match game.apply_move(self.user.id(), position) {
            MoveOutcome::Rejected => {}
            MoveOutcome::Moved { board } => {
                notify::broadcast(store, &game, &ServerMsg::GameMoved { board });
            }
            MoveOutcome::Won { board, winner } => {
                notify::broadcast(store, &game, &ServerMsg::GameMoved { board });
                notify::broadcast(store, &game, &ServerMsg::GameWinner { winner });
                notify::release_participants(store, &game);
                info!(game_id = %game.id(), %winner, "Game won");
            }
            MoveOutcome::Draw { board } => {
                notify::broadcast(store, &game, &ServerMsg::GameMoved { board });
                notify::broadcast(store, &game, &ServerMsg::GameDraw);
                notify::release_participants(store, &game);
                info!(game_id = %game.id(), "Game drawn");
            }
        }
    }

    fn chat(&self, text: &str) {
        let msg = ServerMsg::MessageNew {
            text: escape_text(text),
        };
        for user in self.store.users() {
            if user.id() != self.user.id() {
                user.send(msg.clone());
            }
        }
    }
}
