//! WebSocket transport, protocol and per-connection dispatch

pub mod dispatcher;
pub mod handler;
pub mod protocol;
