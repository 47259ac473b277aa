//! Storage trait for activity records.

use async_trait::async_trait;
use thiserror::Error;

use crate::activity::{Activity, NewActivity, PollCursor};

/// Errors from an activity store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistent home of activity records.
///
/// The relay only reads through [`fetch_after`](ActivityStore::fetch_after); writes come
/// from the REST layer.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Short backend name for logs and health output
    fn backend_name(&self) -> &'static str;

    /// Persist a validated activity and return it with `id` and `created_at` assigned
    async fn insert(&self, activity: NewActivity) -> Result<Activity, StoreError>;

    /// Rows admitted by `cursor`, ordered by `(created_at, id)` ascending
    async fn fetch_after(
        &self,
        cursor: &PollCursor,
        limit: Option<usize>,
    ) -> Result<Vec<Activity>, StoreError>;

    /// Latest activities, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<Activity>, StoreError>;

    /// Latest activities for one customer, newest first
    async fn for_customer(&self, customer_id: i64, limit: usize)
        -> Result<Vec<Activity>, StoreError>;

    /// Cheap liveness probe
    async fn ping(&self) -> Result<(), StoreError>;

    /// Whether rows survive a restart
    fn is_durable(&self) -> bool {
        true
    }

    /// Rows held in process memory, for stores that keep them there
    async fn retained_rows(&self) -> Option<usize> {
        None
    }
}
