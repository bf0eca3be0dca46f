//! Phone-based lead matching.
//!
//! Matching always goes through the canonical phone form. For call
//! events the denormalized mapping table is tried first (it is the fast
//! path the CRM sync keeps warm), then the live lead table. A caller
//! nobody recognizes gets a placeholder lead so the call is never
//! orphaned.

use std::sync::Arc;

use housecall_core::{
    models::NewLead, phone, CoreError, Lead, LeadId, LeadStatus, Storage,
};
use tracing::{debug, info};

use crate::adapter::LeadEvent;

/// Result of matching a caller to a lead.
#[derive(Debug, Clone, Copy)]
pub struct CallerMatch {
    /// The matched or newly created lead.
    pub lead_id: LeadId,
    /// Whether a placeholder lead was created for this call.
    pub created: bool,
}

/// Result of ingesting a lead-source payload.
#[derive(Debug, Clone)]
pub struct IngestedLead {
    /// The lead after the ingest, freshly created or merged.
    pub lead: Lead,
    /// Whether the lead was created by this ingest.
    pub created: bool,
}

/// Matches phone numbers to leads and creates them when nothing matches.
pub struct LeadMatcher {
    storage: Arc<Storage>,
}

impl LeadMatcher {
    /// Creates a matcher over the given storage.
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Finds the lead for any of the given phone numbers.
    ///
    /// Numbers are tried in order, mapping table before lead table, so
    /// the caller-side number should come first.
    ///
    /// # Errors
    ///
    /// Returns error if a lookup fails.
    pub async fn resolve(&self, phones: &[String]) -> Result<Option<LeadId>, CoreError> {
        for raw in phones {
            let canonical = phone::normalize(raw);

            if let Some(mapping) = self.storage.phone_mappings.find_by_phone(&canonical).await? {
                debug!(phone = %canonical, lead_id = %mapping.lead_id, "matched via mapping");
                return Ok(Some(mapping.lead_id));
            }

            if let Some(lead) = self.storage.leads.find_by_phone(&canonical).await? {
                debug!(phone = %canonical, lead_id = %lead.id, "caller matched via lead table");
                return Ok(Some(lead.id));
            }
        }

        Ok(None)
    }

    /// Finds the lead for a caller, creating a placeholder when nobody
    /// matches.
    ///
    /// The placeholder starts in `contacted` status, because the call
    /// itself is contact. Returns `None` only when the event carried no
    /// phone numbers at all; the call is then recorded without a lead.
    ///
    /// # Errors
    ///
    /// Returns error if a lookup or the create fails.
    pub async fn resolve_or_create(
        &self,
        phones: &[String],
        provider: &str,
    ) -> Result<Option<CallerMatch>, CoreError> {
        if let Some(lead_id) = self.resolve(phones).await? {
            return Ok(Some(CallerMatch { lead_id, created: false }));
        }

        let Some(raw) = phones.first() else {
            return Ok(None);
        };

        let lead = self
            .storage
            .leads
            .create(&NewLead {
                first_name: "Unknown".to_string(),
                last_name: Some("Caller".to_string()),
                email: None,
                phone: phone::normalize(raw),
                raw_phone: Some(raw.clone()),
                status: LeadStatus::Contacted,
                source: provider.to_string(),
                external_id: None,
                notes: None,
            })
            .await?;

        info!(lead_id = %lead.id, phone = %lead.phone, "created placeholder lead for caller");
        Ok(Some(CallerMatch { lead_id: lead.id, created: true }))
    }

    /// Ingests a lead-source payload, merging into an existing lead when
    /// its phone is already known.
    ///
    /// The live lead table is consulted before the mapping here; unlike
    /// the call path, a lead ingest is about the rows we own. A mapping
    /// that points at a lead row that no longer exists falls through to
    /// creation.
    ///
    /// # Errors
    ///
    /// Returns error if a lookup or write fails.
    pub async fn ingest_lead(
        &self,
        event: &LeadEvent,
        source: &str,
    ) -> Result<IngestedLead, CoreError> {
        let canonical = phone::normalize(&event.phone);

        let existing = match self.storage.leads.find_by_phone(&canonical).await? {
            Some(lead) => Some(lead),
            None => match self.storage.phone_mappings.find_by_phone(&canonical).await? {
                Some(mapping) => self.storage.leads.find_by_id(mapping.lead_id).await?,
                None => None,
            },
        };

        if let Some(lead) = existing {
            let updated = self
                .storage
                .leads
                .update_contact_fields(
                    lead.id,
                    event.first_name.as_deref(),
                    event.last_name.as_deref(),
                    event.email.as_deref(),
                    event.external_id.as_deref(),
                    event.notes.as_deref(),
                )
                .await?;
            debug!(lead_id = %updated.id, "merged lead payload into existing lead");
            return Ok(IngestedLead { lead: updated, created: false });
        }

        let lead = self
            .storage
            .leads
            .create(&NewLead {
                first_name: event.first_name.clone().unwrap_or_else(|| "Unknown".to_string()),
                last_name: event.last_name.clone(),
                email: event.email.clone(),
                phone: canonical,
                raw_phone: Some(event.phone.clone()),
                status: LeadStatus::New,
                source: source.to_string(),
                external_id: event.external_id.clone(),
                notes: event.notes.clone(),
            })
            .await?;

        info!(lead_id = %lead.id, source, "created lead from source payload");
        Ok(IngestedLead { lead, created: true })
    }
}
