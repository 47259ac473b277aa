//! Activity storage backends.
//!
//! - `postgres`: the `activities` table, shared with the rest of the CRM
//! - `memory`: process-local, for development and tests

mod backend;
mod factory;
mod memory_backend;
mod postgres_backend;

pub use backend::{ActivityStore, StoreError};
pub use factory::create_activity_store;
pub use memory_backend::MemoryActivityStore;
pub use postgres_backend::PostgresActivityStore;
