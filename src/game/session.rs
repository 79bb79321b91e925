//! A single match between two users

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::board::{Board, Mark, Position};

/// Result of a move attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Ignored: finished game, bad cell, wrong turn or not a participant
    Rejected,
    /// Accepted, game goes on
    Moved { board: Board },
    /// Accepted and completed a line
    Won { board: Board, winner: Mark },
    /// Accepted and filled the last cell
    Draw { board: Board },
}

/// Mutable part of a game, always accessed under one lock
#[derive(Debug)]
struct GameState {
    board: Board,
    current_move: Mark,
    is_over: bool,
}

/// Game session shared between the store and both participants' dispatchers
#[derive(Debug)]
pub struct GameSession {
    id: Uuid,
    cross_user: Uuid,
    zero_user: Uuid,
    state: Mutex<GameState>,
}

impl GameSession {
    /// New game with an empty board, CROSS to move
    pub fn new(id: Uuid, cross_user: Uuid, zero_user: Uuid) -> Self {
        debug_assert_ne!(cross_user, zero_user);
        Self {
            id,
            cross_user,
            zero_user,
            state: Mutex::new(GameState {
                board: Board::new(),
                current_move: Mark::Cross,
                is_over: false,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cross_user(&self) -> Uuid {
        self.cross_user
    }

    pub fn zero_user(&self) -> Uuid {
        self.zero_user
    }

    pub fn participants(&self) -> [Uuid; 2] {
        [self.cross_user, self.zero_user]
    }

    /// The other participant, or `None` if `user_id` does not play here
    pub fn opponent_of(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.cross_user {
            Some(self.zero_user)
        } else if user_id == self.zero_user {
            Some(self.cross_user)
        } else {
            None
        }
    }

    fn mark_of(&self, user_id: Uuid) -> Option<Mark> {
        if user_id == self.cross_user {
            Some(Mark::Cross)
        } else if user_id == self.zero_user {
            Some(Mark::Zero)
        } else {
            None
        }
    }

    pub fn is_over(&self) -> bool {
        self.state.lock().is_over
    }

    pub fn board(&self) -> Board {
        self.state.lock().board
    }

    pub fn current_move(&self) -> Mark {
        self.state.lock().current_move
    }

    /// Validate and apply a move by `user_id`.
    ///
    /// Checks and mutation happen under a single lock acquisition, so two
    /// concurrent moves on the same game can never both pass validation.
    pub fn apply_move(&self, user_id: Uuid, position: Position) -> MoveOutcome {
        let mut state = self.state.lock();

        if state.is_over {
            debug!(game_id = %self.id, user_id = %user_id, "Move on finished game");
            return MoveOutcome::Rejected;
        }
        if !state.board.is_empty_at(position) {
            debug!(game_id = %self.id, position = position.get(), "Cell already taken");
            return MoveOutcome::Rejected;
        }
        if self.mark_of(user_id) != Some(state.current_move) {
            debug!(game_id = %self.id, user_id = %user_id, "Move out of turn");
            return MoveOutcome::Rejected;
        }

        let mark = state.current_move;
        state.board.set(position, mark);
        state.current_move = mark.opponent();
        debug!(game_id = %self.id, %mark, position = position.get(), "Move applied");

        let board = state.board;
        if let Some(winner) = board.winner() {
            state.is_over = true;
            MoveOutcome::Won { board, winner }
        } else if board.is_full() {
            state.is_over = true;
            MoveOutcome::Draw { board }
        } else {
            MoveOutcome::Moved { board }
        }
    }

    /// Force the game into its finished state.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn terminate(&self) -> bool {
        let mut state = self.state.lock();
        if state.is_over {
            return false;
        }
        state.is_over = true;
        true
    }
}
