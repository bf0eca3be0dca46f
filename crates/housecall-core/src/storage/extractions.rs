//! Repository for conversation extraction shells.
//!
//! The pipeline only creates empty rows at call start; an external
//! process fills in `data` later. One shell per conversation.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::Result,
    models::{ConversationExtraction, ConversationId, LeadId},
};

/// Repository for conversation extraction operations.
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

    /// Creates an empty extraction shell for a conversation.
    ///
    /// Duplicate shells for the same conversation are ignored; the first
    /// one wins.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails.
    pub async fn create_shell(
        &self,
        conversation_id: ConversationId,
        lead_id: Option<LeadId>,
    ) -> Result<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO conversation_extractions (id, conversation_id, lead_id, data)
            VALUES ($1, $2, $3, '{}'::jsonb)
            ON CONFLICT (conversation_id) DO UPDATE SET updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(conversation_id)
        .bind(lead_id)
        .fetch_one(&*self.pool)
        .await?;

        Ok(id)
    }

    /// Finds the extraction shell for a conversation.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<ConversationExtraction>> {
        let extraction = sqlx::query_as::<_, ConversationExtraction>(
            r#"
            SELECT id, conversation_id, lead_id, data, created_at, updated_at
            FROM conversation_extractions
            WHERE conversation_id = $1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(extraction)
    }
}
