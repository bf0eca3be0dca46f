//! Conversation recording for call lifecycle events.
//!
//! One method per lifecycle stage. Creation is idempotent; every later
//! stage requires the conversation to already exist and fails loudly
//! when it does not, because a missing row there means a lost
//! `call_started`.

use std::sync::Arc;

use chrono::Utc;
use housecall_core::{models::NewConversation, Conversation, LeadId, Storage};
use tracing::{debug, warn};

use crate::{
    adapter::CallEvent,
    error::{IngestError, Result},
};

/// Applies call lifecycle events to conversation rows.
pub struct ConversationRecorder {
    storage: Arc<Storage>,
}

impl ConversationRecorder {
    /// Creates a recorder over the given storage.
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Records a call start.
    ///
    /// Idempotent on the provider call ID; a re-delivered `call_started`
    /// returns the existing conversation. Also seeds the extraction
    /// shell, best-effort: the call record is primary, the shell is a
    /// byproduct.
    ///
    /// # Errors
    ///
    /// Returns error if the conversation write fails.
    pub async fn start(
        &self,
        event: &CallEvent,
        provider: &str,
        lead_id: Option<LeadId>,
    ) -> Result<Conversation> {
        let conversation = self
            .storage
            .conversations
            .create_if_absent(&NewConversation {
                lead_id,
                provider_call_id: event.call_id.clone(),
                provider: provider.to_string(),
                direction: event.direction,
                started_at: event.started_at.unwrap_or_else(Utc::now),
            })
            .await?;

        debug!(
            conversation_id = %conversation.id,
            call_id = %event.call_id,
            "conversation recorded"
        );

        if let Err(error) =
            self.storage.extractions.create_shell(conversation.id, conversation.lead_id).await
        {
            warn!(
                conversation_id = %conversation.id,
                error = %error,
                "failed to create extraction shell, continuing"
            );
        }

        Ok(conversation)
    }

    /// Records a call end.
    ///
    /// Completes the conversation and touches the matched lead's last
    /// contact time. Both writes are primary; neither failure is
    /// swallowed.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::CallNotFound` when no conversation exists
    /// for this call ID, or a storage error if a write fails.
    pub async fn complete(&self, event: &CallEvent) -> Result<Conversation> {
        let ended_at = event.ended_at.unwrap_or_else(Utc::now);

        let conversation = self
            .storage
            .conversations
            .complete(
                &event.call_id,
                ended_at,
                event.duration_seconds,
                event.recording_url.as_deref(),
                event.transcript.as_deref(),
            )
            .await?
            .ok_or_else(|| IngestError::call_not_found(&event.call_id))?;

        if let Some(lead_id) = conversation.lead_id {
            self.storage.leads.touch_last_contact(lead_id, ended_at).await?;
        }

        Ok(conversation)
    }

    /// Records post-call analysis.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::CallNotFound` when no conversation exists
    /// for this call ID.
    pub async fn merge_analysis(&self, event: &CallEvent) -> Result<Conversation> {
        self.storage
            .conversations
            .merge_analysis(&event.call_id, event.sentiment_score, event.transcript.as_deref())
            .await?
            .ok_or_else(|| IngestError::call_not_found(&event.call_id))
    }

    /// Records a streaming transcript snapshot, replacing any earlier
    /// one.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::CallNotFound` when no conversation exists
    /// for this call ID.
    pub async fn update_transcript(&self, event: &CallEvent) -> Result<Conversation> {
        let transcript = event
            .transcript
            .as_deref()
            .ok_or_else(|| IngestError::validation("transcript_update missing transcript"))?;

        self.storage
            .conversations
            .set_transcript(&event.call_id, transcript)
            .await?
            .ok_or_else(|| IngestError::call_not_found(&event.call_id))
    }
}
