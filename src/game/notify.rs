//! Delivering game events to participants through the store

use tracing::{debug, info};
use uuid::Uuid;

use crate::store::SessionStore;
use crate::ws::protocol::ServerMsg;

use super::GameSession;

/// Queue `msg` for both participants, in cross-then-zero order.
/// Participants that already disconnected are skipped.
pub fn broadcast(store: &dyn SessionStore, game: &GameSession, msg: &ServerMsg) {
    for user_id in game.participants() {
        send_to(store, game, user_id, msg.clone());
    }
}

/// Detach both participants from a finished game
pub fn release_participants(store: &dyn SessionStore, game: &GameSession) {
    for user_id in game.participants() {
        if let Some(user) = store.user(&user_id) {
            user.clear_current_game(game.id());
        }
    }
}

/// Finish `game` because `leaver` disconnected or gave up.
///
/// Only the call that actually finishes the game notifies the opponent, so
/// racing disconnect paths produce a single GameOver.
pub fn forfeit(store: &dyn SessionStore, game: &GameSession, leaver: Uuid) -> bool {
    if !game.terminate() {
        return false;
    }
    info!(game_id = %game.id(), user_id = %leaver, "Game forfeited");

    if let Some(opponent) = game.opponent_of(leaver) {
        send_to(store, game, opponent, ServerMsg::GameOver);
    }
    release_participants(store, game);
    true
}

fn send_to(store: &dyn SessionStore, game: &GameSession, user_id: Uuid, msg: ServerMsg) {
    match store.user(&user_id) {
        Some(user) => user.send(msg),
        None => debug!(game_id = %game.id(), user_id = %user_id, "Participant gone, message dropped"),
    }
}
