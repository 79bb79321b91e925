//! Tic-tac-toe game modules

pub mod board;
pub mod notify;
pub mod reaper;
pub mod session;

pub use board::{Board, Mark, Position};
pub use reaper::SessionReaper;
pub use session::{GameSession, MoveOutcome};
