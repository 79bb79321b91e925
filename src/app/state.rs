//! Application state shared across routes

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::store::{InMemoryStore, SessionStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn SessionStore>,
    /// Cancelled once on process shutdown; connections use child tokens
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_store(config, Arc::new(InMemoryStore::new()))
    }

    pub fn with_store(config: Config, store: Arc<dyn SessionStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            shutdown: CancellationToken::new(),
        }
    }
}
