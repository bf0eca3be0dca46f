//! Repository for downstream automation run records.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::Result,
    models::{ConversationId, LeadId, WorkflowRun},
};

/// Repository for automation run operations.
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

    /// Records a new automation run in `running` state.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails.
    pub async fn create(
        &self,
        name: &str,
        conversation_id: Option<ConversationId>,
        lead_id: Option<LeadId>,
        input: &serde_json::Value,
    ) -> Result<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO makecom_workflows (id, name, conversation_id, lead_id, input, status)
            VALUES ($1, $2, $3, $4, $5, 'running')
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(conversation_id)
        .bind(lead_id)
        .bind(input)
        .fetch_one(&*self.pool)
        .await?;

        Ok(id)
    }

    /// Finds runs triggered by a conversation, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<WorkflowRun>> {
        let runs = sqlx::query_as::<_, WorkflowRun>(
            r#"
            SELECT id, name, conversation_id, lead_id, input, status, created_at
            FROM makecom_workflows
            WHERE conversation_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&*self.pool)
        .await?;

        Ok(runs)
    }
}
