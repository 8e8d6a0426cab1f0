//! Upsell lead repository for JSON storage
//!
//! At most one lead exists per (cycle, student) pair. The pair check and the
//! insert happen under a single write lock.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::CycleError;
use crate::models::{CycleId, LeadId, LeadStatus, StudentId, UpsellLead};

use super::file_io::JsonFile;
use super::{read_guard, write_guard};

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct LeadData {
    #[serde(default)]
    leads: Vec<UpsellLead>,
}

/// Repository for upsell lead persistence
pub struct LeadRepository {
    file: JsonFile,
    leads: RwLock<HashMap<LeadId, UpsellLead>>,
}

impl LeadRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: JsonFile::new(path),
            leads: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), CycleError> {
        let file_data: LeadData = self.file.load()?;
        let mut leads = write_guard(&self.leads)?;
        leads.clear();
        for lead in file_data.leads {
            leads.insert(lead.id, lead);
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), CycleError> {
        self.file.store(|| {
            Ok(LeadData {
                leads: self.list(None)?,
            })
        })
    }

    pub fn get(&self, id: LeadId) -> Result<Option<UpsellLead>, CycleError> {
        Ok(read_guard(&self.leads)?.get(&id).cloned())
    }

    /// Find the lead for a (cycle, student) pair
    pub fn find(
        &self,
        cycle_id: CycleId,
        student_id: StudentId,
    ) -> Result<Option<UpsellLead>, CycleError> {
        Ok(read_guard(&self.leads)?
            .values()
            .find(|l| l.key() == (cycle_id, student_id))
            .cloned())
    }

    /// List leads, oldest first, optionally filtered by status
    pub fn list(&self, status: Option<LeadStatus>) -> Result<Vec<UpsellLead>, CycleError> {
        let mut list: Vec<_> = read_guard(&self.leads)?
            .values()
            .filter(|l| status.map_or(true, |s| l.status == s))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    pub fn get_by_cycle(&self, cycle_id: CycleId) -> Result<Vec<UpsellLead>, CycleError> {
        Ok(self
            .list(None)?
            .into_iter()
            .filter(|l| l.cycle_id == cycle_id)
            .collect())
    }

    /// Insert a lead unless one already exists for its (cycle, student) pair
    ///
    /// Returns `true` if the lead was inserted.
    pub fn insert_if_absent(&self, lead: UpsellLead) -> Result<bool, CycleError> {
        let mut leads = write_guard(&self.leads)?;
        if leads.values().any(|l| l.key() == lead.key()) {
            return Ok(false);
        }
        leads.insert(lead.id, lead);
        Ok(true)
    }

    /// Insert a new lead, failing with `Conflict` on a duplicate pair
    pub fn insert(&self, lead: UpsellLead) -> Result<(), CycleError> {
        let (cycle_id, student_id) = lead.key();
        if self.insert_if_absent(lead)? {
            Ok(())
        } else {
            Err(CycleError::Conflict(format!(
                "A lead already exists for student {} in cycle {}",
                student_id, cycle_id
            )))
        }
    }

    /// Replace an existing lead (status and notes edits)
    pub fn update(&self, lead: UpsellLead) -> Result<(), CycleError> {
        let mut leads = write_guard(&self.leads)?;
        match leads.get_mut(&lead.id) {
            Some(existing) => {
                *existing = lead;
                Ok(())
            }
            None => Err(CycleError::lead_not_found(lead.id.to_string())),
        }
    }

    pub fn count(&self) -> Result<usize, CycleError> {
        Ok(read_guard(&self.leads)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CustomerId;
    use tempfile::TempDir;

    fn create_repo() -> (TempDir, LeadRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = LeadRepository::new(temp_dir.path().join("leads.json"));
        (temp_dir, repo)
    }

    #[test]
    fn test_insert_if_absent_dedupes_pair() {
        let (_dir, repo) = create_repo();
        let cycle_id = CycleId::new();
        let student_id = StudentId::new();

        assert!(repo
            .insert_if_absent(UpsellLead::new(cycle_id, CustomerId::new(), student_id))
            .unwrap());
        assert!(!repo
            .insert_if_absent(UpsellLead::new(cycle_id, CustomerId::new(), student_id))
            .unwrap());
        assert_eq!(repo.count().unwrap(), 1);

        // Same student in another cycle is a different pair
        assert!(repo
            .insert_if_absent(UpsellLead::new(CycleId::new(), CustomerId::new(), student_id))
            .unwrap());
    }

    #[test]
    fn test_insert_duplicate_is_conflict() {
        let (_dir, repo) = create_repo();
        let lead = UpsellLead::new(CycleId::new(), CustomerId::new(), StudentId::new());
        let duplicate = UpsellLead::new(lead.cycle_id, lead.customer_id, lead.student_id);

        repo.insert(lead).unwrap();
        assert!(repo.insert(duplicate).unwrap_err().is_conflict());
    }

    #[test]
    fn test_list_filters_by_status() {
        let (_dir, repo) = create_repo();
        let mut contacted = UpsellLead::new(CycleId::new(), CustomerId::new(), StudentId::new());
        contacted.set_status(LeadStatus::Contacted);
        repo.insert(contacted).unwrap();
        repo.insert(UpsellLead::new(CycleId::new(), CustomerId::new(), StudentId::new()))
            .unwrap();

        assert_eq!(repo.list(Some(LeadStatus::New)).unwrap().len(), 1);
        assert_eq!(repo.list(Some(LeadStatus::Contacted)).unwrap().len(), 1);
        assert_eq!(repo.list(None).unwrap().len(), 2);
    }

    #[test]
    fn test_update_missing_lead() {
        let (_dir, repo) = create_repo();
        let lead = UpsellLead::new(CycleId::new(), CustomerId::new(), StudentId::new());
        assert!(repo.update(lead).unwrap_err().is_not_found());
    }
}
