//! PostgreSQL persistence module.
//!
//! Provides connection pooling and schema bootstrap for the activity store.

pub mod pool;

pub use pool::{PostgresPool, PostgresPoolError};
