//! Webhook event pipeline for the Housecall ingestion service.
//!
//! Every inbound delivery, whatever the provider, moves through the same
//! stages:
//!
//! 1. **Audit** - the raw payload is appended to the event log before
//!    anything can fail
//! 2. **Gate** - the provider's feature flag decides whether processing
//!    runs at all
//! 3. **Parse** - the provider adapter turns the payload into a typed
//!    event
//! 4. **Record** - call events update conversations, lead events update
//!    leads
//! 5. **Automate** - downstream automations fire on a best-effort basis
//!
//! Providers differ only in their [`ProviderAdapter`] implementation; the
//! pipeline itself is provider-agnostic.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use housecall_core::{PipelineVersion, RealClock, Storage};
//! use housecall_ingest::{IngestPipeline, RetellAdapter};
//!
//! # async fn example(pool: sqlx::PgPool) -> Result<(), housecall_ingest::IngestError> {
//! let storage = Arc::new(Storage::new(pool, PipelineVersion::Legacy));
//! let pipeline = IngestPipeline::new(storage, Arc::new(RealClock), Duration::from_secs(30));
//!
//! let adapter = RetellAdapter::new();
//! let payload = serde_json::json!({"event": "call_started", "call": {"call_id": "c1"}});
//! let outcome = pipeline.handle(&adapter, payload).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod audit;
pub mod cinc;
pub mod error;
pub mod gate;
pub mod matcher;
pub mod pipeline;
pub mod recorder;
pub mod retell;
pub mod workflow;

pub use adapter::{CallEvent, CallEventKind, LeadEvent, ProviderAdapter, ProviderEvent};
pub use cinc::CincAdapter;
pub use error::{IngestError, Result};
pub use gate::{FeatureGate, FlagStore};
pub use pipeline::{IngestOutcome, IngestPipeline, ProcessedEvent};
pub use retell::RetellAdapter;

/// Flag key gating voice-call event processing.
pub const FLAG_RETELL_CALLS: &str = "retell_call_processing";

/// Flag key gating lead-source payload processing.
pub const FLAG_CINC_LEADS: &str = "cinc_lead_processing";

/// Flag key gating downstream automation triggers.
pub const FLAG_AUTOMATION: &str = "makecom_automation";
