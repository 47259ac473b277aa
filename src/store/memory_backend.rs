//! In-memory activity store for development and tests.
//!
//! Rows are never evicted and are lost on restart. `/health` reports the row count and
//! `durable: false` so a production process that fell back to this store is visible.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::activity::{Activity, NewActivity, PollCursor};

use super::backend::{ActivityStore, StoreError};

struct Inner {
    rows: Vec<Activity>,
    next_id: i64,
}

/// Keeps activities in insertion order in a `Vec`.
pub struct MemoryActivityStore {
    inner: RwLock<Inner>,
}

impl MemoryActivityStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                rows: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Insert with an explicit creation time. Used to seed fixtures.
    pub async fn insert_at(&self, activity: NewActivity, created_at: DateTime<Utc>) -> Activity {
        let mut inner = self.inner.write().await;
        let record = Activity {
            id: inner.next_id,
            customer_id: activity.customer_id,
            activity_type: activity.activity_type,
            description: activity.description,
            outcome: activity.outcome,
            next_steps: activity.next_steps,
            contact_method: activity.contact_method,
            contacted_by: activity.contacted_by,
            created_at,
        };
        inner.next_id += 1;
        inner.rows.push(record.clone());
        record
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryActivityStore {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first(mut rows: Vec<Activity>, limit: usize) -> Vec<Activity> {
    rows.sort_by(|a, b| b.cursor_key().cmp(&a.cursor_key()));
    rows.truncate(limit);
    rows
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn is_durable(&self) -> bool {
        false
    }

    async fn retained_rows(&self) -> Option<usize> {
        Some(self.len().await)
    }

    async fn insert(&self, activity: NewActivity) -> Result<Activity, StoreError> {
        Ok(self.insert_at(activity, Utc::now()).await)
    }

    async fn fetch_after(
        &self,
        cursor: &PollCursor,
        limit: Option<usize>,
    ) -> Result<Vec<Activity>, StoreError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<Activity> = inner
            .rows
            .iter()
            .filter(|a| cursor.admits(a))
            .cloned()
            .collect();
        rows.sort_by_key(Activity::cursor_key);
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Activity>, StoreError> {
        let rows = self.inner.read().await.rows.clone();
        Ok(newest_first(rows, limit))
    }

    async fn for_customer(
        &self,
        customer_id: i64,
        limit: usize,
    ) -> Result<Vec<Activity>, StoreError> {
        let rows: Vec<Activity> = self
            .inner
            .read()
            .await
            .rows
            .iter()
            .filter(|a| a.customer_id == customer_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, limit))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
