//! Registration repository for JSON storage

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::CycleError;
use crate::models::{CycleId, Registration, RegistrationId};

use super::file_io::JsonFile;
use super::{read_guard, write_guard};

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct RegistrationData {
    #[serde(default)]
    registrations: Vec<Registration>,
}

/// Repository for registration persistence
pub struct RegistrationRepository {
    file: JsonFile,
    registrations: RwLock<HashMap<RegistrationId, Registration>>,
}

impl RegistrationRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: JsonFile::new(path),
            registrations: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), CycleError> {
        let file_data: RegistrationData = self.file.load()?;
        let mut registrations = write_guard(&self.registrations)?;
        registrations.clear();
        for registration in file_data.registrations {
            registrations.insert(registration.id, registration);
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), CycleError> {
        self.file.store(|| {
            let mut list: Vec<_> = read_guard(&self.registrations)?.values().cloned().collect();
            list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(RegistrationData {
                registrations: list,
            })
        })
    }

    pub fn get(&self, id: RegistrationId) -> Result<Option<Registration>, CycleError> {
        Ok(read_guard(&self.registrations)?.get(&id).cloned())
    }

    /// Get all registrations of a cycle in enrollment order
    pub fn get_by_cycle(&self, cycle_id: CycleId) -> Result<Vec<Registration>, CycleError> {
        let mut list: Vec<_> = read_guard(&self.registrations)?
            .values()
            .filter(|r| r.cycle_id == cycle_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    pub fn upsert(&self, registration: Registration) -> Result<(), CycleError> {
        write_guard(&self.registrations)?.insert(registration.id, registration);
        Ok(())
    }

    /// Complete every active registration of a cycle
    ///
    /// Returns exactly the registrations this call transitioned.
    pub fn complete_active_for_cycle(
        &self,
        cycle_id: CycleId,
    ) -> Result<Vec<Registration>, CycleError> {
        let mut registrations = write_guard(&self.registrations)?;
        let mut transitioned = Vec::new();
        for registration in registrations
            .values_mut()
            .filter(|r| r.cycle_id == cycle_id && r.is_active())
        {
            registration.complete();
            transitioned.push(registration.clone());
        }
        transitioned.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(transitioned)
    }
}
