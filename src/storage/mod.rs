//! Storage layer for the cycle ledger
//!
//! JSON file repositories with atomic writes, held in memory behind
//! `RwLock`s, plus the per-cycle lock registry the completion coordinator
//! serializes on.

pub mod cycles;
pub mod dataset;
pub mod expenses;
pub mod file_io;
pub mod instructors;
pub mod leads;
pub mod locks;
pub mod meetings;
pub mod registrations;

pub use cycles::CycleRepository;
pub use dataset::{DataSet, ImportSummary};
pub use expenses::ExpenseRepository;
pub use file_io::{read_json, write_json_atomic};
pub use instructors::InstructorRepository;
pub use leads::LeadRepository;
pub use locks::CycleLocks;
pub use meetings::MeetingRepository;
pub use registrations::RegistrationRepository;

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::paths::LedgerPaths;
use crate::error::CycleError;

pub(crate) fn read_guard<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, CycleError> {
    lock.read()
        .map_err(|e| CycleError::Storage(format!("Failed to acquire read lock: {}", e)))
}

pub(crate) fn write_guard<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, CycleError> {
    lock.write()
        .map_err(|e| CycleError::Storage(format!("Failed to acquire write lock: {}", e)))
}

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: LedgerPaths,
    pub cycles: CycleRepository,
    pub meetings: MeetingRepository,
    pub registrations: RegistrationRepository,
    pub expenses: ExpenseRepository,
    pub leads: LeadRepository,
    pub instructors: InstructorRepository,
    pub locks: CycleLocks,
}

impl Storage {
    /// Create a new Storage instance
    pub fn new(paths: LedgerPaths) -> Result<Self, CycleError> {
        paths.ensure_directories()?;

        Ok(Self {
            cycles: CycleRepository::new(paths.cycles_file()),
            meetings: MeetingRepository::new(paths.meetings_file()),
            registrations: RegistrationRepository::new(paths.registrations_file()),
            expenses: ExpenseRepository::new(paths.expenses_file()),
            leads: LeadRepository::new(paths.leads_file()),
            instructors: InstructorRepository::new(paths.instructors_file()),
            locks: CycleLocks::new(),
            paths,
        })
    }

    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    /// Load all data from disk
    pub fn load_all(&mut self) -> Result<(), CycleError> {
        self.instructors.load()?;
        self.cycles.load()?;
        self.meetings.load()?;
        self.registrations.load()?;
        self.expenses.load()?;
        self.leads.load()?;
        Ok(())
    }

    /// Save all data to disk
    pub fn save_all(&self) -> Result<(), CycleError> {
        self.instructors.save()?;
        self.cycles.save()?;
        self.meetings.save()?;
        self.registrations.save()?;
        self.expenses.save()?;
        self.leads.save()?;
        Ok(())
    }

    /// Check if storage has been initialized
    pub fn is_initialized(&self) -> bool {
        self.paths.is_initialized()
    }
}
