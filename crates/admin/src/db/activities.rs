//! Order activity log repository.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use zeytin_core::{AdminUserId, OrderActivityId, OrderId};

use super::RepositoryError;
use crate::models::{ActivityKind, OrderActivity};

#[derive(Debug, sqlx::FromRow)]
struct OrderActivityRow {
    id: Uuid,
    order_id: Uuid,
    actor_id: Option<Uuid>,
    actor_username: Option<String>,
    event_type: String,
    message: String,
    meta: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl From<OrderActivityRow> for OrderActivity {
    fn from(row: OrderActivityRow) -> Self {
        Self {
            id: OrderActivityId::new(row.id),
            order_id: OrderId::new(row.order_id),
            actor_id: row.actor_id.map(AdminUserId::new),
            actor_username: row.actor_username,
            event_type: row.event_type,
            message: row.message,
            meta: row.meta,
            created_at: row.created_at,
        }
    }
}

/// An activity waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub kind: ActivityKind,
    pub message: String,
    pub meta: serde_json::Value,
}

impl NewActivity {
    /// An activity with empty metadata.
    #[must_use]
    pub fn new(kind: ActivityKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            meta: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = meta;
        self
    }
}

/// Who performed an action. System actions (website checkout) have no actor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Actor<'a> {
    pub id: Option<AdminUserId>,
    pub username: Option<&'a str>,
}

/// Repository for the order audit trail.
pub struct ActivityRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ActivityRepository<'a> {
    /// Create a new activity repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Activities for an order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<OrderActivity>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderActivityRow>(
            r"
            SELECT id, order_id, actor_id, actor_username, event_type, message,
                   meta, created_at
            FROM order_activities
            WHERE order_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Append activities inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails.
    pub async fn insert_all(
        conn: &mut PgConnection,
        order_id: OrderId,
        actor: Actor<'_>,
        activities: &[NewActivity],
    ) -> Result<(), RepositoryError> {
        for activity in activities {
            sqlx::query(
                r"
                INSERT INTO order_activities
                    (order_id, actor_id, actor_username, event_type, message, meta)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(order_id)
            .bind(actor.id)
            .bind(actor.username)
            .bind(activity.kind.as_str())
            .bind(&activity.message)
            .bind(&activity.meta)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_activity_defaults_to_empty_meta() {
        let activity = NewActivity::new(ActivityKind::AdminNoteUpdated, "Admin note updated");
        assert_eq!(activity.meta, serde_json::json!({}));

        let activity = activity.with_meta(serde_json::json!({"source": "WEBSITE"}));
        assert_eq!(activity.meta["source"], "WEBSITE");
    }
}
