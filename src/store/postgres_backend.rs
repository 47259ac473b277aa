//! PostgreSQL-backed activity store.
//!
//! Reads and writes the `activities` table. The poll query walks the
//! `(created_at, id)` index so the relay cursor stays cheap as the table grows.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::activity::{Activity, NewActivity, PollCursor};

use super::backend::{ActivityStore, StoreError};

const ACTIVITY_COLUMNS: &str = "id, customer_id, type, description, outcome, next_steps, \
                                contact_method, contacted_by, created_at";

/// PostgreSQL activity store
pub struct PostgresActivityStore {
    pool: PgPool,
}

/// `LIMIT` is a BIGINT; saturate instead of wrapping negative
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl PostgresActivityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityStore for PostgresActivityStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, activity: NewActivity) -> Result<Activity, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO activities
                (customer_id, type, description, outcome, next_steps, contact_method, contacted_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            ACTIVITY_COLUMNS
        );

        let record = sqlx::query_as::<_, Activity>(&sql)
            .bind(activity.customer_id)
            .bind(&activity.activity_type)
            .bind(&activity.description)
            .bind(&activity.outcome)
            .bind(&activity.next_steps)
            .bind(&activity.contact_method)
            .bind(&activity.contacted_by)
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!(
            activity_id = record.id,
            customer_id = record.customer_id,
            "Activity inserted"
        );

        Ok(record)
    }

    async fn fetch_after(
        &self,
        cursor: &PollCursor,
        limit: Option<usize>,
    ) -> Result<Vec<Activity>, StoreError> {
        // NULL limit means no limit in PostgreSQL
        let limit = limit.map(sql_limit);

        let rows = match cursor.last_id {
            None => {
                let sql = format!(
                    r#"
                    SELECT {}
                    FROM activities
                    WHERE created_at > $1
                    ORDER BY created_at ASC, id ASC
                    LIMIT $2
                    "#,
                    ACTIVITY_COLUMNS
                );
                sqlx::query_as::<_, Activity>(&sql)
                    .bind(cursor.checked_at)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            Some(last_id) => {
                let sql = format!(
                    r#"
                    SELECT {}
                    FROM activities
                    WHERE (created_at, id) > ($1, $2)
                    ORDER BY created_at ASC, id ASC
                    LIMIT $3
                    "#,
                    ACTIVITY_COLUMNS
                );
                sqlx::query_as::<_, Activity>(&sql)
                    .bind(cursor.checked_at)
                    .bind(last_id)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Activity>, StoreError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM activities
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
            ACTIVITY_COLUMNS
        );

        let rows = sqlx::query_as::<_, Activity>(&sql)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn for_customer(
        &self,
        customer_id: i64,
        limit: usize,
    ) -> Result<Vec<Activity>, StoreError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM activities
            WHERE customer_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
            ACTIVITY_COLUMNS
        );

        let rows = sqlx::query_as::<_, Activity>(&sql)
            .bind(customer_id)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_limit_saturates() {
        assert_eq!(sql_limit(0), 0);
        assert_eq!(sql_limit(500), 500);
        assert_eq!(sql_limit(usize::MAX), i64::MAX);
    }
}
