//! Activity store factory

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::postgres::PostgresPool;

use super::backend::ActivityStore;
use super::memory_backend::MemoryActivityStore;
use super::postgres_backend::PostgresActivityStore;

/// Create an activity store based on configuration.
///
/// - `"postgres"` (default): a `PostgresActivityStore` if a pool is provided
/// - `"memory"`: a `MemoryActivityStore`
///
/// A `postgres` request without a pool falls back to memory with a warning.
pub fn create_activity_store(
    settings: &StoreConfig,
    postgres_pool: Option<&PostgresPool>,
) -> Arc<dyn ActivityStore> {
    match settings.backend.as_str() {
        "postgres" => {
            if let Some(pool) = postgres_pool {
                tracing::info!(
                    backend = "postgres",
                    url = %pool.database_url_masked(),
                    "Creating PostgreSQL activity store"
                );
                Arc::new(PostgresActivityStore::new(pool.pool().clone()))
            } else {
                tracing::warn!(
                    "PostgreSQL store requested but no pool provided, falling back to memory \
                     (not durable, grows without bound)"
                );
                Arc::new(MemoryActivityStore::new())
            }
        }
        "memory" => {
            tracing::info!(backend = "memory", "Creating memory activity store");
            Arc::new(MemoryActivityStore::new())
        }
        other => {
            tracing::warn!(backend = %other, "Unknown store backend, using memory");
            Arc::new(MemoryActivityStore::new())
        }
    }
}
