//! The shared webhook processing pipeline.
//!
//! [`IngestPipeline::handle`] is the single entry point for every
//! provider. Stage order is load-bearing:
//!
//! - audit happens before the gate, so disabled-path deliveries still
//!   leave a trace
//! - the gate happens before parsing, so a disabled provider costs one
//!   cached flag read and nothing else
//! - automation triggers run last and cannot fail the request

use std::{sync::Arc, time::Duration};

use housecall_core::{Clock, ConversationId, LeadId, Storage};
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::{
    adapter::{CallEvent, CallEventKind, LeadEvent, ProviderAdapter, ProviderEvent},
    audit::EventLog,
    error::Result,
    gate::{FeatureGate, FlagStore},
    matcher::LeadMatcher,
    recorder::ConversationRecorder,
    workflow::WorkflowTrigger,
};

/// Longest raw-payload sample kept when a delivery cannot be parsed as
/// JSON.
const RAW_SAMPLE_LIMIT: usize = 4096;

/// What processing did with a delivery.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// The event was recognized and applied.
    Processed(ProcessedEvent),

    /// The event type is not one we process; acknowledged and dropped.
    Ignored {
        /// The unrecognized event type, for the response body.
        event_type: String,
    },

    /// The provider's feature flag is off; nothing ran.
    Disabled {
        /// The flag key that was off.
        feature: &'static str,
    },
}

/// Records touched by a processed event.
#[derive(Debug, Clone, Copy)]
pub struct ProcessedEvent {
    /// Conversation the event applied to, for call events.
    pub conversation_id: Option<ConversationId>,

    /// Lead the event matched or created.
    pub lead_id: Option<LeadId>,

    /// Whether this event created a lead.
    pub lead_created: bool,
}

/// Provider-agnostic webhook pipeline.
pub struct IngestPipeline {
    gate: Arc<FeatureGate>,
    matcher: LeadMatcher,
    recorder: ConversationRecorder,
    workflows: WorkflowTrigger,
    audit: EventLog,
}

impl IngestPipeline {
    /// Wires up a pipeline over the given storage.
    ///
    /// `flag_cache_ttl` bounds how stale a feature-flag read may be.
    pub fn new(storage: Arc<Storage>, clock: Arc<dyn Clock>, flag_cache_ttl: Duration) -> Self {
        let store: Arc<dyn FlagStore> = storage.feature_flags.clone();
        let gate = Arc::new(FeatureGate::new(store, clock, flag_cache_ttl));

        Self {
            matcher: LeadMatcher::new(storage.clone()),
            recorder: ConversationRecorder::new(storage.clone()),
            workflows: WorkflowTrigger::new(storage.clone(), gate.clone()),
            audit: EventLog::new(storage),
            gate,
        }
    }

    /// The feature gate, shared with anything else that checks flags.
    pub fn gate(&self) -> Arc<FeatureGate> {
        self.gate.clone()
    }

    /// Processes one parsed webhook delivery.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Validation` for malformed payloads of known
    /// event types, `IngestError::CallNotFound` when a lifecycle event
    /// references an unrecorded call, and `IngestError::Storage` when a
    /// primary write or the flag read fails.
    #[instrument(skip(self, adapter, payload), fields(provider = adapter.provider()))]
    pub async fn handle(
        &self,
        adapter: &dyn ProviderAdapter,
        payload: Value,
    ) -> Result<IngestOutcome> {
        let event_type = adapter.event_type(&payload).unwrap_or("unknown").to_string();
        let provider_event_id = adapter.event_id(&payload);

        self.audit
            .append(adapter.provider(), &event_type, provider_event_id.as_deref(), &payload)
            .await;

        let feature = adapter.feature_key();
        if !self.gate.is_enabled(feature).await? {
            info!(feature, event_type, "processing disabled by feature flag");
            return Ok(IngestOutcome::Disabled { feature });
        }

        match adapter.parse(&payload)? {
            ProviderEvent::Call(event) => self.handle_call(adapter.provider(), &event).await,
            ProviderEvent::Lead(event) => self.handle_lead(adapter.provider(), &event).await,
            ProviderEvent::Unknown { event_type } => {
                info!(event_type, "acknowledging unrecognized event type");
                Ok(IngestOutcome::Ignored { event_type })
            },
        }
    }

    /// Audits a delivery whose body was not valid JSON.
    ///
    /// Fail-open like all auditing; the caller still rejects the
    /// request.
    pub async fn record_unparseable(&self, provider: &str, raw: &str) {
        let sample: String = raw.chars().take(RAW_SAMPLE_LIMIT).collect();
        let payload = json!({ "raw": sample });
        self.audit.append(provider, "parse_error", None, &payload).await;
    }

    async fn handle_call(&self, provider: &str, event: &CallEvent) -> Result<IngestOutcome> {
        match event.kind {
            CallEventKind::Started => {
                let matched = self.matcher.resolve_or_create(&event.phones, provider).await?;
                let conversation =
                    self.recorder.start(event, provider, matched.map(|m| m.lead_id)).await?;

                Ok(IngestOutcome::Processed(ProcessedEvent {
                    conversation_id: Some(conversation.id),
                    lead_id: conversation.lead_id,
                    lead_created: matched.is_some_and(|m| m.created),
                }))
            },
            CallEventKind::Ended => {
                let conversation = self.recorder.complete(event).await?;
                self.workflows.call_completed(&conversation).await;

                Ok(IngestOutcome::Processed(ProcessedEvent {
                    conversation_id: Some(conversation.id),
                    lead_id: conversation.lead_id,
                    lead_created: false,
                }))
            },
            CallEventKind::Analyzed => {
                let conversation = self.recorder.merge_analysis(event).await?;

                Ok(IngestOutcome::Processed(ProcessedEvent {
                    conversation_id: Some(conversation.id),
                    lead_id: conversation.lead_id,
                    lead_created: false,
                }))
            },
            CallEventKind::TranscriptUpdate => {
                let conversation = self.recorder.update_transcript(event).await?;

                Ok(IngestOutcome::Processed(ProcessedEvent {
                    conversation_id: Some(conversation.id),
                    lead_id: conversation.lead_id,
                    lead_created: false,
                }))
            },
        }
    }

    async fn handle_lead(&self, provider: &str, event: &LeadEvent) -> Result<IngestOutcome> {
        let ingested = self.matcher.ingest_lead(event, provider).await?;

        if ingested.created {
            self.workflows.lead_created(&ingested.lead).await;
        }

        Ok(IngestOutcome::Processed(ProcessedEvent {
            conversation_id: None,
            lead_id: Some(ingested.lead.id),
            lead_created: ingested.created,
        }))
    }
}
