//! Repository for the phone-to-lead mapping cache.
//!
//! The mapping table is populated and refreshed by the external CRM sync;
//! this service only reads it. Lookups expect the canonical phone form
//! from [`crate::phone::normalize`].

use std::sync::Arc;

use sqlx::PgPool;

use crate::{error::Result, models::PhoneLeadMapping};

/// Read-side repository for phone-to-lead mappings.
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

    /// Finds a mapping by canonical phone.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<PhoneLeadMapping>> {
        let mapping = sqlx::query_as::<_, PhoneLeadMapping>(
            r#"
            SELECT id, phone, lead_id, first_name, last_name,
                   property_interests, buyer_timeline, created_at, updated_at
            FROM phone_lead_mapping
            WHERE phone = $1
            "#,
        )
        .bind(phone)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(mapping)
    }
}
