//! Upsell lead service
//!
//! Leads are created only by the completion cascade. This surface lists them
//! and edits their status and notes.

use tracing::info;

use crate::error::{CycleError, CycleResult};
use crate::models::{LeadId, LeadStatus, UpsellLead};
use crate::storage::Storage;

/// Service for lead follow-up
pub struct LeadService<'a> {
    storage: &'a Storage,
}

impl<'a> LeadService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn list(&self, status: Option<LeadStatus>) -> CycleResult<Vec<UpsellLead>> {
        self.storage.leads.list(status)
    }

    /// Find a lead by full or short id
    pub fn find(&self, identifier: &str) -> CycleResult<Option<UpsellLead>> {
        if let Ok(id) = identifier.parse::<LeadId>() {
            return self.storage.leads.get(id);
        }
        let short = identifier.trim().trim_start_matches("led-");
        if short.is_empty() {
            return Ok(None);
        }
        Ok(self
            .storage
            .leads
            .list(None)?
            .into_iter()
            .find(|l| l.id.as_uuid().to_string().starts_with(short)))
    }

    /// Change a lead's status and/or notes
    pub fn update(
        &self,
        id: LeadId,
        status: Option<LeadStatus>,
        notes: Option<String>,
    ) -> CycleResult<UpsellLead> {
        if status.is_none() && notes.is_none() {
            return Err(CycleError::Validation(
                "Nothing to update: give a status or notes".into(),
            ));
        }
        let mut lead = self
            .storage
            .leads
            .get(id)?
            .ok_or_else(|| CycleError::lead_not_found(id.to_string()))?;

        if let Some(status) = status {
            lead.set_status(status);
        }
        if let Some(notes) = notes {
            lead.set_notes(notes);
        }

        self.storage.leads.update(lead.clone())?;
        self.storage.leads.save()?;
        info!(lead = %id, status = %lead.status, "lead updated");
        Ok(lead)
    }
}
