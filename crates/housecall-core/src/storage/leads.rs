//! Repository for lead record database operations.
//!
//! Version-aware: the pipeline version chosen at startup decides whether
//! this repository targets `leads` or `leads_v2`. Table names come from
//! [`PipelineVersion`], never from input, so interpolating them into SQL
//! is safe.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres, Transaction};

use crate::{
    error::{CoreError, Result},
    models::{Lead, LeadId, NewLead, PipelineVersion},
};

const LEAD_COLUMNS: &str = "id, first_name, last_name, email, phone, raw_phone, status, source, \
                            external_id, notes, created_at, last_contact_at, updated_at";

/// Repository for lead database operations.
pub struct Repository {
    pool: Arc<PgPool>,
    table: &'static str,
}

impl Repository {
    /// Creates a new repository targeting the lead table for `version`.
    pub fn new(pool: Arc<PgPool>, version: PipelineVersion) -> Self {
        Self { pool, table: version.leads_table() }
    }

    /// Returns a reference to the database pool.
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Creates a new lead.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails or constraints are violated.
    pub async fn create(&self, lead: &NewLead) -> Result<Lead> {
        self.create_impl(&*self.pool, lead).await
    }

    /// Creates a lead within a transaction.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails.
    pub async fn create_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        lead: &NewLead,
    ) -> Result<Lead> {
        self.create_impl(&mut **tx, lead).await
    }

    async fn create_impl<'e, E>(&self, executor: E, lead: &NewLead) -> Result<Lead>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, Lead>(&format!(
            r#"
            INSERT INTO {table} (
                id, first_name, last_name, email, phone, raw_phone,
                status, source, external_id, notes
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10
            )
            RETURNING {columns}
            "#,
            table = self.table,
            columns = LEAD_COLUMNS,
        ))
        .bind(LeadId::new())
        .bind(&lead.first_name)
        .bind(&lead.last_name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.raw_phone)
        .bind(lead.status.to_string())
        .bind(&lead.source)
        .bind(&lead.external_id)
        .bind(&lead.notes)
        .fetch_one(executor)
        .await?;

        Ok(created)
    }

    /// Finds a lead by ID.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_id(&self, lead_id: LeadId) -> Result<Option<Lead>> {
        let lead = sqlx::query_as::<_, Lead>(&format!(
            r#"
            SELECT {columns}
            FROM {table}
            WHERE id = $1
            "#,
            table = self.table,
            columns = LEAD_COLUMNS,
        ))
        .bind(lead_id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(lead)
    }

    /// Finds a lead by canonical phone.
    ///
    /// Several leads can share a phone (households, re-imports); the most
    /// recently created one wins, matching what the dashboard shows first.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<Lead>> {
        let lead = sqlx::query_as::<_, Lead>(&format!(
            r#"
            SELECT {columns}
            FROM {table}
            WHERE phone = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            table = self.table,
            columns = LEAD_COLUMNS,
        ))
        .bind(phone)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(lead)
    }

    /// Records a contact touch on a lead.
    ///
    /// Updates `last_contact_at`; timestamps only, the funnel status
    /// belongs to agents. This is a primary write for call completion, so
    /// a missing lead is surfaced as `NotFound` rather than swallowed.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the lead does not exist, or
    /// `CoreError::Database` if the update fails.
    pub async fn touch_last_contact(&self, lead_id: LeadId, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(&format!(
            r#"
            UPDATE {table}
            SET last_contact_at = $2, updated_at = NOW()
            WHERE id = $1
            "#,
            table = self.table,
        ))
        .bind(lead_id)
        .bind(at)
        .execute(&*self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("lead {lead_id} not found")));
        }

        Ok(())
    }

    /// Merges incoming contact fields into an existing lead.
    ///
    /// `None` fields keep their current value; only present fields
    /// overwrite. Used when a lead source re-sends a contact we already
    /// know, so agent edits in untouched fields survive.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the lead does not exist.
    pub async fn update_contact_fields(
        &self,
        lead_id: LeadId,
        first_name: Option<&str>,
        last_name: Option<&str>,
        email: Option<&str>,
        external_id: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Lead> {
        let lead = sqlx::query_as::<_, Lead>(&format!(
            r#"
            UPDATE {table}
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                external_id = COALESCE($5, external_id),
                notes = COALESCE($6, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {columns}
            "#,
            table = self.table,
            columns = LEAD_COLUMNS,
        ))
        .bind(lead_id)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(external_id)
        .bind(notes)
        .fetch_optional(&*self.pool)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("lead {lead_id} not found")))?;

        Ok(lead)
    }

    /// Counts all leads in the active table.
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
        assert_eq!(legacy.table, "leads");
        let v2 = Repository::new(Arc::new(pool), PipelineVersion::V2);
        assert_eq!(v2.table, "leads_v2");
    }
}
