//! Cycle repository for JSON storage

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::Utc;

use crate::error::CycleError;
use crate::models::{Cycle, CycleId, CycleStatus};

use super::file_io::JsonFile;
use super::{read_guard, write_guard};

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct CycleData {
    #[serde(default)]
    cycles: Vec<Cycle>,
}

/// Repository for cycle persistence
pub struct CycleRepository {
    file: JsonFile,
    cycles: RwLock<HashMap<CycleId, Cycle>>,
}

impl CycleRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: JsonFile::new(path),
            cycles: RwLock::new(HashMap::new()),
        }
    }

    /// Load cycles from disk
    pub fn load(&self) -> Result<(), CycleError> {
        let file_data: CycleData = self.file.load()?;
        let mut cycles = write_guard(&self.cycles)?;
        cycles.clear();
        for cycle in file_data.cycles {
            cycles.insert(cycle.id, cycle);
        }
        Ok(())
    }

    /// Save cycles to disk
    pub fn save(&self) -> Result<(), CycleError> {
        self.file.store(|| {
            let mut list = self.get_all()?;
            list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(CycleData { cycles: list })
        })
    }

    pub fn get(&self, id: CycleId) -> Result<Option<Cycle>, CycleError> {
        Ok(read_guard(&self.cycles)?.get(&id).cloned())
    }

    /// Get all cycles, sorted by name
    pub fn get_all(&self) -> Result<Vec<Cycle>, CycleError> {
        let mut list: Vec<_> = read_guard(&self.cycles)?.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    pub fn upsert(&self, cycle: Cycle) -> Result<(), CycleError> {
        write_guard(&self.cycles)?.insert(cycle.id, cycle);
        Ok(())
    }

    /// Write recounted progress counters without touching anything else
    pub fn update_counters(&self, id: CycleId, completed: u32) -> Result<Cycle, CycleError> {
        let mut cycles = write_guard(&self.cycles)?;
        let cycle = cycles
            .get_mut(&id)
            .ok_or_else(|| CycleError::cycle_not_found(id.to_string()))?;
        cycle.apply_completed_count(completed);
        Ok(cycle.clone())
    }

    /// Transition an active cycle to completed
    ///
    /// Check-then-set under the write lock: returns `true` only for the caller
    /// that performed the transition, `false` if the cycle was already completed.
    pub fn mark_completed(&self, id: CycleId) -> Result<bool, CycleError> {
        let mut cycles = write_guard(&self.cycles)?;
        let cycle = cycles
            .get_mut(&id)
            .ok_or_else(|| CycleError::cycle_not_found(id.to_string()))?;

        if cycle.status == CycleStatus::Completed {
            return Ok(false);
        }
        cycle.status = CycleStatus::Completed;
        cycle.updated_at = Utc::now();
        Ok(true)
    }

    pub fn count(&self) -> Result<usize, CycleError> {
        Ok(read_guard(&self.cycles)?.len())
    }
}
