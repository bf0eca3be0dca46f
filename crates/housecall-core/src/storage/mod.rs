//! Database access layer implementing the repository pattern.
//!
//! Repositories translate between domain models and the CRM schema. All
//! database operations MUST go through them; direct SQL outside this
//! module is forbidden to keep the pipeline-version table selection in
//! one place.
//!
//! The lead and conversation repositories are version-aware: the
//! [`PipelineVersion`] given at construction decides whether they target
//! the legacy tables or the `_v2` tables. Everything else is shared
//! between versions.

use std::sync::Arc;

use sqlx::PgPool;

pub mod conversations;
pub mod extractions;
pub mod feature_flags;
pub mod lead_actions;
pub mod leads;
pub mod phone_mappings;
pub mod schema;
pub mod webhook_events;
pub mod workflow_runs;

use crate::{error::Result, models::PipelineVersion};

/// Container for all repository instances providing unified database
/// access.
#[derive(Clone)]
pub struct Storage {
    /// Repository for lead records.
    pub leads: Arc<leads::Repository>,

    /// Repository for conversation (call) records.
    pub conversations: Arc<conversations::Repository>,

    /// Repository for conversation extraction shells.
    pub extractions: Arc<extractions::Repository>,

    /// Repository for the phone-to-lead mapping cache.
    pub phone_mappings: Arc<phone_mappings::Repository>,

    /// Repository for the webhook audit log.
    pub webhook_events: Arc<webhook_events::Repository>,

    /// Repository for feature flags.
    pub feature_flags: Arc<feature_flags::Repository>,

    /// Repository for automation run records.
    pub workflow_runs: Arc<workflow_runs::Repository>,

    /// Repository for lead follow-up actions.
    pub lead_actions: Arc<lead_actions::Repository>,

    version: PipelineVersion,
}

impl Storage {
    /// Creates a new storage instance with the given connection pool,
    /// targeting the table set for `version`.
    ///
    /// All repositories share the same pool.
    pub fn new(pool: PgPool, version: PipelineVersion) -> Self {
        let pool = Arc::new(pool);

        Self {
            leads: Arc::new(leads::Repository::new(pool.clone(), version)),
            conversations: Arc::new(conversations::Repository::new(pool.clone(), version)),
            extractions: Arc::new(extractions::Repository::new(pool.clone())),
            phone_mappings: Arc::new(phone_mappings::Repository::new(pool.clone())),
            webhook_events: Arc::new(webhook_events::Repository::new(pool.clone())),
            feature_flags: Arc::new(feature_flags::Repository::new(pool.clone())),
            workflow_runs: Arc::new(workflow_runs::Repository::new(pool.clone())),
            lead_actions: Arc::new(lead_actions::Repository::new(pool)),
            version,
        }
    }

    /// Which table set this storage instance targets.
    pub fn version(&self) -> PipelineVersion {
        self.version
    }

    /// Performs a health check on the database connection.
    ///
    /// Executes a trivial query to verify connectivity. Backs the
    /// `/health/ready` endpoint.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Database` if the connection is unhealthy or
    /// the query times out.
    pub async fn health_check(&self) -> Result<()> {
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&*self.webhook_events.pool()).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn storage_can_be_created() {
        // Instantiation only; real database coverage lives in the
        // integration tests.
        let pool = sqlx::PgPool::connect_lazy("postgresql://test").unwrap();
        let storage = Storage::new(pool, PipelineVersion::Legacy);
        assert_eq!(storage.version(), PipelineVersion::Legacy);
    }
}
