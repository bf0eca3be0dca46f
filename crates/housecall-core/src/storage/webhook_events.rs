//! Repository for the webhook audit log.
//!
//! Append-only. Rows are written before any processing so the raw
//! payload survives downstream failures, and nothing here ever updates
//! or deletes.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::{WebhookEvent, WebhookEventId},
};

/// Repository for webhook audit-log operations.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Returns a reference to the database pool.
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Appends one delivery to the audit log.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails.
    pub async fn append(
        &self,
        provider: &str,
        event_type: &str,
        provider_event_id: Option<&str>,
        payload: &serde_json::Value,
    ) -> Result<WebhookEventId> {
        let id: uuid::Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO webhook_events (id, provider, event_type, provider_event_id, payload)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(WebhookEventId::new())
        .bind(provider)
        .bind(event_type)
        .bind(provider_event_id)
        .bind(payload)
        .fetch_one(&*self.pool)
        .await?;

        Ok(WebhookEventId(id))
    }

    /// Finds the most recent audit entries for a provider.
    ///
    /// Newest first. Used for operator inspection and tests.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_recent(&self, provider: &str, limit: i64) -> Result<Vec<WebhookEvent>> {
        let events = sqlx::query_as::<_, WebhookEvent>(
            r#"
            SELECT id, provider, event_type, provider_event_id, payload, received_at
            FROM webhook_events
            WHERE provider = $1
            ORDER BY received_at DESC
            LIMIT $2
            "#,
        )
        .bind(provider)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;

        Ok(events)
    }

    /// Counts audit entries for a provider and event type.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn count_by_type(&self, provider: &str, event_type: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM webhook_events
            WHERE provider = $1 AND event_type = $2
            "#,
        )
        .bind(provider)
        .bind(event_type)
        .fetch_one(&*self.pool)
        .await?;

        Ok(count.0)
    }
}
