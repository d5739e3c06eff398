//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{Coordinator, Session, SessionHandle, SpawnAllocator};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: SessionHandle,
}

impl AppState {
    /// Build the state and the session task that backs it; the caller spawns
    /// the returned [`Coordinator`].
    pub fn new(config: Config) -> (Self, Coordinator) {
        let config = Arc::new(config);

        // One shared arena per process
        let seed = config.spawn_seed.unwrap_or_else(rand::random);
        let session = Session::new(config.round.clone(), SpawnAllocator::arena(seed));
        let (coordinator, session) = Coordinator::new(session, config.round.clone());

        (Self { config, session }, coordinator)
    }
}
