//! Repository for conversation (call) database operations.
//!
//! Conversations are addressed by the provider's call ID, which carries a
//! unique constraint. Creation rides on that constraint instead of a
//! read-then-write check, so re-delivered `call_started` events cannot
//! race their way into duplicate rows.
//!
//! Version-aware in the same way as the leads repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::{CoreError, Result},
    models::{Conversation, ConversationId, NewConversation, PipelineVersion},
};

const CONVERSATION_COLUMNS: &str =
    "id, lead_id, provider_call_id, provider, direction, status, started_at, ended_at, \
     duration_seconds, transcript, recording_url, sentiment_score, created_at, updated_at";

/// Repository for conversation database operations.
pub struct Repository {
    pool: Arc<PgPool>,
    table: &'static str,
}

impl Repository {
    /// Creates a new repository targeting the conversation table for
    /// `version`.
    pub fn new(pool: Arc<PgPool>, version: PipelineVersion) -> Self {
        Self { pool, table: version.conversations_table() }
    }

    /// Returns a reference to the database pool.
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Creates a conversation, or returns the existing one when the
    /// provider call ID was already recorded.
    ///
    /// `ON CONFLICT DO NOTHING` makes concurrent duplicate deliveries
    /// converge on a single row without advisory locks.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails for reasons other than the
    /// call-ID conflict.
    pub async fn create_if_absent(&self, conversation: &NewConversation) -> Result<Conversation> {
        let inserted = sqlx::query_as::<_, Conversation>(&format!(
            r#"
            INSERT INTO {table} (
                id, lead_id, provider_call_id, provider, direction, status, started_at
            ) VALUES (
                $1, $2, $3, $4, $5, 'active', $6
            )
            ON CONFLICT (provider_call_id) DO NOTHING
            RETURNING {columns}
            "#,
            table = self.table,
            columns = CONVERSATION_COLUMNS,
        ))
        .bind(ConversationId::new())
        .bind(conversation.lead_id)
        .bind(&conversation.provider_call_id)
        .bind(&conversation.provider)
        .bind(conversation.direction.to_string())
        .bind(conversation.started_at)
        .fetch_optional(&*self.pool)
        .await?;

        if let Some(created) = inserted {
            return Ok(created);
        }

        // Conflict path: someone else inserted this call ID first.
        self.find_by_call_id(&conversation.provider_call_id).await?.ok_or_else(|| {
            CoreError::Database(format!(
                "conversation {} conflicted on insert but cannot be read back",
                conversation.provider_call_id
            ))
        })
    }

    /// Finds a conversation by the provider's call ID.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_call_id(&self, provider_call_id: &str) -> Result<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            r#"
            SELECT {columns}
            FROM {table}
            WHERE provider_call_id = $1
            "#,
            table = self.table,
            columns = CONVERSATION_COLUMNS,
        ))
        .bind(provider_call_id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(conversation)
    }

    /// Finds a conversation by internal ID.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_id(&self, id: ConversationId) -> Result<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            r#"
            SELECT {columns}
            FROM {table}
            WHERE id = $1
            "#,
            table = self.table,
            columns = CONVERSATION_COLUMNS,
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(conversation)
    }

    /// Completes a conversation at call end.
    ///
    /// Sets the terminal status and end-of-call facts. Recording URL and
    /// transcript only overwrite when the event actually carried them.
    /// Returns `None` when no conversation has this call ID; the caller
    /// decides whether that is an error.
    ///
    /// # Errors
    ///
    /// Returns error if update fails.
    pub async fn complete(
        &self,
        provider_call_id: &str,
        ended_at: DateTime<Utc>,
        duration_seconds: Option<i32>,
        recording_url: Option<&str>,
        transcript: Option<&str>,
    ) -> Result<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            r#"
            UPDATE {table}
            SET status = 'completed',
                ended_at = $2,
                duration_seconds = $3,
                recording_url = COALESCE($4, recording_url),
                transcript = COALESCE($5, transcript),
                updated_at = NOW()
            WHERE provider_call_id = $1
            RETURNING {columns}
            "#,
            table = self.table,
            columns = CONVERSATION_COLUMNS,
        ))
        .bind(provider_call_id)
        .bind(ended_at)
        .bind(duration_seconds)
        .bind(recording_url)
        .bind(transcript)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(conversation)
    }

    /// Merges post-call analysis into a conversation.
    ///
    /// Absent fields keep their current value. Returns `None` on an
    /// unknown call ID.
    ///
    /// # Errors
    ///
    /// Returns error if update fails.
    pub async fn merge_analysis(
        &self,
        provider_call_id: &str,
        sentiment_score: Option<f64>,
        transcript: Option<&str>,
    ) -> Result<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            r#"
            UPDATE {table}
            SET sentiment_score = COALESCE($2, sentiment_score),
                transcript = COALESCE($3, transcript),
                updated_at = NOW()
            WHERE provider_call_id = $1
            RETURNING {columns}
            "#,
            table = self.table,
            columns = CONVERSATION_COLUMNS,
        ))
        .bind(provider_call_id)
        .bind(sentiment_score)
        .bind(transcript)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(conversation)
    }

    /// Replaces the transcript wholesale.
    ///
    /// Streaming transcript updates are cumulative snapshots, so the
    /// latest write wins; there is no merge. Returns `None` on an unknown
    /// call ID.
    ///
    /// # Errors
    ///
    /// Returns error if update fails.
    pub async fn set_transcript(
        &self,
        provider_call_id: &str,
        transcript: &str,
    ) -> Result<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            r#"
            UPDATE {table}
            SET transcript = $2, updated_at = NOW()
            WHERE provider_call_id = $1
            RETURNING {columns}
            "#,
            table = self.table,
            columns = CONVERSATION_COLUMNS,
        ))
        .bind(provider_call_id)
        .bind(transcript)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(conversation)
    }

    /// Counts all conversations in the active table.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}", table = self.table))
                .fetch_one(&*self.pool)
                .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repository_targets_version_table() {
        let pool = sqlx::PgPool::connect_lazy("postgresql://test").unwrap();
        let legacy = Repository::new(Arc::new(pool.clone()), PipelineVersion::Legacy);
        assert_eq!(legacy.table, "conversations");
        let v2 = Repository::new(Arc::new(pool), PipelineVersion::V2);
        assert_eq!(v2.table, "conversations_v2");
    }
}
