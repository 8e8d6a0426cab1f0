//! Upsell lead model
//!
//! Leads are created by the cycle completion cascade, one per student who was
//! still enrolled when the cycle concluded. Afterwards only the status and
//! notes change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::{CustomerId, CycleId, LeadId, StudentId};
use crate::error::CycleError;

/// Sales status of a lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Interested,
    NotInterested,
    Converted,
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Contacted => write!(f, "contacted"),
            Self::Interested => write!(f, "interested"),
            Self::NotInterested => write!(f, "not_interested"),
            Self::Converted => write!(f, "converted"),
        }
    }
}

impl FromStr for LeadStatus {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "new" => Ok(Self::New),
            "contacted" => Ok(Self::Contacted),
            "interested" => Ok(Self::Interested),
            "not_interested" => Ok(Self::NotInterested),
            "converted" => Ok(Self::Converted),
            other => Err(CycleError::Validation(format!("Unknown lead status: '{}'", other))),
        }
    }
}

/// A renewal lead generated when a cycle concludes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsellLead {
    pub id: LeadId,
    pub cycle_id: CycleId,
    pub customer_id: CustomerId,
    pub student_id: StudentId,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UpsellLead {
    pub fn new(cycle_id: CycleId, customer_id: CustomerId, student_id: StudentId) -> Self {
        let now = Utc::now();
        Self {
            id: LeadId::new(),
            cycle_id,
            customer_id,
            student_id,
            status: LeadStatus::New,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Dedupe key: one lead per student per cycle
    pub fn key(&self) -> (CycleId, StudentId) {
        (self.cycle_id, self.student_id)
    }

    pub fn set_status(&mut self, status: LeadStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lead_status() {
        let lead = UpsellLead::new(CycleId::new(), CustomerId::new(), StudentId::new());
        assert_eq!(lead.status, LeadStatus::New);
        assert!(lead.notes.is_empty());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            "not-interested".parse::<LeadStatus>().unwrap(),
            LeadStatus::NotInterested
        );
        assert!("maybe".parse::<LeadStatus>().is_err());
    }
}
