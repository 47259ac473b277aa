use std::sync::Arc;

use crate::config::Settings;
use crate::connection_manager::ConnectionManager;
use crate::postgres::PostgresPool;
use crate::relay::ActivityRelay;
use crate::store::{create_activity_store, ActivityStore};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn ActivityStore>,
    pub connections: Arc<ConnectionManager>,
    pub relay: Arc<ActivityRelay>,
}

impl AppState {
    /// Wire the store, connection registry and relay from settings.
    /// The relay is constructed but not started.
    pub fn new(settings: Settings, postgres_pool: Option<&PostgresPool>) -> Self {
        let store = create_activity_store(&settings.store, postgres_pool);
        Self::with_store(settings, store)
    }

    pub fn with_store(settings: Settings, store: Arc<dyn ActivityStore>) -> Self {
        let connections = Arc::new(ConnectionManager::new(settings.websocket.send_buffer));
        let relay = Arc::new(ActivityRelay::new(
            settings.relay.clone(),
            store.clone(),
            connections.clone(),
        ));

        Self {
            settings: Arc::new(settings),
            store,
            connections,
            relay,
        }
    }
}
