use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::{Config, ConfigError};
use crate::db::RoomDirectory;
use crate::ws::{ConnectionManager, RoomStore};

/// Shared handles every route needs
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ConnectionManager>,
    pub directory: Arc<dyn RoomDirectory>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Build the room store and connection manager on top of `directory`.
    pub fn new(config: &Config, directory: Arc<dyn RoomDirectory>) -> Result<Self, ConfigError> {
        let store = Arc::new(RoomStore::new(
            config.retention_policy()?,
            config.room_mailbox_capacity,
        ));
        let manager = Arc::new(ConnectionManager::new(
            store,
            directory.clone(),
            config.peer_outbox_capacity,
        ));
        Ok(Self {
            manager,
            directory,
            started_at: Utc::now(),
        })
    }
}
