//! Repository for feature flags.
//!
//! Flags gate whole processing paths and are read on every webhook (via
//! the in-process cache). The pipeline treats an absent flag as
//! disabled, so `is_enabled` distinguishes "row says false" from "no row
//! at all" and leaves the decision to the caller.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{error::Result, models::FeatureFlag};

/// Repository for feature-flag operations.
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

    /// Reads a flag's enabled state.
    ///
    /// Returns `None` when the flag row does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn is_enabled(&self, feature: &str) -> Result<Option<bool>> {
        let enabled: Option<bool> = sqlx::query_scalar(
            r#"
            SELECT enabled FROM system_config
            WHERE feature = $1
            "#,
        )
        .bind(feature)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(enabled)
    }

    /// Creates or updates a flag.
    ///
    /// # Errors
    ///
    /// Returns error if upsert fails.
    pub async fn upsert(
        &self,
        feature: &str,
        enabled: bool,
        description: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO system_config (id, feature, enabled, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (feature) DO UPDATE
            SET enabled = EXCLUDED.enabled,
                description = COALESCE(EXCLUDED.description, system_config.description),
                updated_at = NOW()
            "#,
        )
        .bind(uuid::Uuid::new_v4())
        .bind(feature)
        .bind(enabled)
        .bind(description)
        .execute(&*self.pool)
        .await?;

        Ok(())
    }

    /// Lists all flags, for operator inspection.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn list(&self) -> Result<Vec<FeatureFlag>> {
        let flags = sqlx::query_as::<_, FeatureFlag>(
            r#"
            SELECT id, feature, enabled, description, created_at, updated_at
            FROM system_config
            ORDER BY feature ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repository_can_be_created() {
        let pool = sqlx::PgPool::connect_lazy("postgresql://test").unwrap();
        let _repo = Repository::new(Arc::new(pool));
    }
}
