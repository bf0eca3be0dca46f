//! Test infrastructure and utilities for the Housecall service.
//!
//! Provides isolated test databases with the full service schema,
//! provider payload builders, and a [`TestEnv`] that wires storage the
//! way the binary does. All of it requires a reachable PostgreSQL
//! instance; tests built on this crate are feature-gated behind
//! `docker` in the consuming crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use anyhow::{Context, Result};
use housecall_core::{
    models::NewLead, phone, Lead, LeadId, LeadStatus, PipelineVersion, Storage,
};
use serde_json::Value;
use sqlx::PgPool;

pub mod database;
pub mod fixtures;

pub use database::TestDatabase;
pub use fixtures::{CincLeadBuilder, RetellCallBuilder};

/// Test environment with an isolated database and storage wired the way
/// the service wires it.
pub struct TestEnv {
    database: TestDatabase,
    storage: Arc<Storage>,
}

impl TestEnv {
    /// Creates an environment targeting the legacy table set.
    pub async fn new() -> Result<Self> {
        Self::with_version(PipelineVersion::Legacy).await
    }

    /// Creates an environment targeting the given table set.
    pub async fn with_version(version: PipelineVersion) -> Result<Self> {
        init_test_tracing();

        let database = TestDatabase::new().await.context("failed to create test database")?;
        let storage = Arc::new(Storage::new(database.pool().clone(), version));

        Ok(Self { database, storage })
    }

    /// The environment's database pool.
    pub fn pool(&self) -> &PgPool {
        self.database.pool()
    }

    /// The storage facade, shareable with pipelines under test.
    pub fn storage(&self) -> Arc<Storage> {
        self.storage.clone()
    }

    /// Which table set this environment targets.
    pub fn version(&self) -> PipelineVersion {
        self.storage.version()
    }

    /// Turns a feature flag on.
    pub async fn enable_feature(&self, feature: &str) -> Result<()> {
        self.storage.feature_flags.upsert(feature, true, None).await?;
        Ok(())
    }

    /// Turns a feature flag off (distinct from the flag being absent,
    /// though both gate processing off).
    pub async fn disable_feature(&self, feature: &str) -> Result<()> {
        self.storage.feature_flags.upsert(feature, false, None).await?;
        Ok(())
    }

    /// Inserts a lead with the given name and phone, normalized the way
    /// the pipeline normalizes.
    pub async fn insert_lead(&self, first_name: &str, raw_phone: &str) -> Result<Lead> {
        let lead = self
            .storage
            .leads
            .create(&NewLead {
                first_name: first_name.to_string(),
                last_name: None,
                email: None,
                phone: phone::normalize(raw_phone),
                raw_phone: Some(raw_phone.to_string()),
                status: LeadStatus::New,
                source: "test".to_string(),
                external_id: None,
                notes: None,
            })
            .await?;
        Ok(lead)
    }

    /// Inserts a CRM-synced phone mapping row.
    ///
    /// The pipeline only ever reads this table; tests write it directly.
    pub async fn insert_mapping(
        &self,
        raw_phone: &str,
        lead_id: LeadId,
        first_name: Option<&str>,
        property_interests: &Value,
        buyer_timeline: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO phone_lead_mapping
                (phone, lead_id, first_name, property_interests, buyer_timeline)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (phone) DO UPDATE SET
                lead_id = EXCLUDED.lead_id,
                first_name = EXCLUDED.first_name,
                property_interests = EXCLUDED.property_interests,
                buyer_timeline = EXCLUDED.buyer_timeline,
                updated_at = NOW()
            ",
        )
        .bind(phone::normalize(raw_phone))
        .bind(lead_id)
        .bind(first_name)
        .bind(property_interests)
        .bind(buyer_timeline)
        .execute(self.database.pool())
        .await
        .context("failed to insert phone mapping")?;
        Ok(())
    }

    /// Number of audit rows for a provider and event type.
    pub async fn audit_count(&self, provider: &str, event_type: &str) -> Result<i64> {
        let count = self.storage.webhook_events.count_by_type(provider, event_type).await?;
        Ok(count)
    }
}

/// Installs a minimal test subscriber once per process.
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .with_test_writer()
        .try_init();
}
