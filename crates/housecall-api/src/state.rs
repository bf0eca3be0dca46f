//! Shared application state for HTTP handlers.

use std::sync::Arc;

use housecall_core::{Clock, RealClock, Storage};
use housecall_ingest::{CincAdapter, IngestPipeline, RetellAdapter};
use housecall_outbound::{CallProviderClient, SmsClient};
use sqlx::PgPool;

use crate::Config;

/// Everything a request handler needs, cloned cheaply per request.
///
/// Built once at startup from [`Config`] and the database pool. All
/// fields are shared handles; cloning the state clones pointers.
#[derive(Clone)]
pub struct AppState {
    /// Repository facade over the active pipeline's tables.
    pub storage: Arc<Storage>,
    /// Time source, swappable in tests.
    pub clock: Arc<dyn Clock>,
    /// Webhook processing pipeline shared by all providers.
    pub pipeline: Arc<IngestPipeline>,
    /// Adapter for voice call provider payloads.
    pub retell: RetellAdapter,
    /// Adapter for lead provider payloads.
    pub cinc: CincAdapter,
    /// Pass-through client for the voice call provider API.
    pub call_client: Arc<CallProviderClient>,
    /// Client for outbound SMS.
    pub sms_client: Arc<SmsClient>,
}

impl AppState {
    /// Builds application state from configuration and a connected pool.
    ///
    /// # Errors
    ///
    /// Fails when the configured pipeline version does not parse or an
    /// outbound HTTP client cannot be constructed.
    pub fn new(config: &Config, pool: PgPool) -> anyhow::Result<Self> {
        let version = config.pipeline_version()?;
        let storage = Arc::new(Storage::new(pool, version));
        let clock: Arc<dyn Clock> = Arc::new(RealClock::new());
        let pipeline =
            Arc::new(IngestPipeline::new(storage.clone(), clock.clone(), config.flag_cache_ttl()));
        let call_client = Arc::new(CallProviderClient::new(config.call_provider_config())?);
        let sms_client = Arc::new(SmsClient::new(config.sms_config())?);

        Ok(Self {
            storage,
            clock,
            pipeline,
            retell: RetellAdapter::new(),
            cinc: CincAdapter::new(),
            call_client,
            sms_client,
        })
    }
}
