//! Repository for lead follow-up actions.
//!
//! Actions are created by dashboard automations; this service only
//! completes them, typically after sending the SMS an action scheduled.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::Result,
    models::{LeadAction, LeadId},
};

/// Repository for lead action operations.
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

    /// Creates a pending action for a lead.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails.
    pub async fn create(&self, lead_id: LeadId, kind: &str) -> Result<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO lead_actions (id, lead_id, kind, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(lead_id)
        .bind(kind)
        .fetch_one(&*self.pool)
        .await?;

        Ok(id)
    }

    /// Marks an action completed, recording when.
    ///
    /// Returns whether a pending action was actually completed; an
    /// already-completed or unknown action returns `false`.
    ///
    /// # Errors
    ///
    /// Returns error if update fails.
    pub async fn mark_completed(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE lead_actions
            SET status = 'completed', completed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Finds an action by ID.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<LeadAction>> {
        let action = sqlx::query_as::<_, LeadAction>(
            r#"
            SELECT id, lead_id, kind, status, completed_at, created_at
            FROM lead_actions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repository_can_be_created() {
        let pool = sqlx::PgPool::connect_lazy("postgresql://test").unwrap();
        let _repo = Repository::new(Arc::new(pool));
    }
}
