//! Best-effort triggers for downstream automations.
//!
//! Automation runs are recorded for an external system to pick up.
//! Nothing here may fail ingestion: the gate check and the insert are
//! both best-effort, and any problem ends up in the process log only.

use std::sync::Arc;

use housecall_core::{Conversation, Lead, Storage};
use serde_json::json;
use tracing::{debug, warn};

use crate::gate::FeatureGate;

/// Records automation runs when the automation flag is on.
pub struct WorkflowTrigger {
    storage: Arc<Storage>,
    gate: Arc<FeatureGate>,
}

impl WorkflowTrigger {
    /// Creates a trigger over the given storage and gate.
    pub fn new(storage: Arc<Storage>, gate: Arc<FeatureGate>) -> Self {
        Self { storage, gate }
    }

    /// Fires the call-completed automation for a finished conversation.
    pub async fn call_completed(&self, conversation: &Conversation) {
        if !self.automation_enabled().await {
            return;
        }

        let input = json!({
            "call_id": conversation.provider_call_id,
            "conversation_id": conversation.id,
            "lead_id": conversation.lead_id,
            "duration_seconds": conversation.duration_seconds,
            "sentiment_score": conversation.sentiment_score,
        });

        match self
            .storage
            .workflow_runs
            .create("call_completed", Some(conversation.id), conversation.lead_id, &input)
            .await
        {
            Ok(run_id) => {
                debug!(run_id = %run_id, conversation_id = %conversation.id, "run recorded");
            },
            Err(error) => {
                warn!(
                    conversation_id = %conversation.id,
                    error = %error,
                    "failed to record call-completed automation, continuing"
                );
            },
        }
    }

    /// Fires the lead-created automation for a newly created lead.
    pub async fn lead_created(&self, lead: &Lead) {
        if !self.automation_enabled().await {
            return;
        }

        let input = json!({
            "lead_id": lead.id,
            "phone": lead.phone,
            "source": lead.source,
            "status": lead.status,
        });

        match self.storage.workflow_runs.create("lead_created", None, Some(lead.id), &input).await {
            Ok(run_id) => {
                debug!(run_id = %run_id, lead_id = %lead.id, "automation run recorded");
            },
            Err(error) => {
                warn!(
                    lead_id = %lead.id,
                    error = %error,
                    "failed to record lead-created automation, continuing"
                );
            },
        }
    }

    async fn automation_enabled(&self) -> bool {
        match self.gate.is_enabled(crate::FLAG_AUTOMATION).await {
            Ok(enabled) => enabled,
            Err(error) => {
                warn!(error = %error, "automation flag unreadable, skipping trigger");
                false
            },
        }
    }
}
