//! Pairing queued users into games

pub mod service;

pub use service::MatchmakingService;
