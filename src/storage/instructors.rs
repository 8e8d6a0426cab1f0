//! Instructor repository for JSON storage

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::CycleError;
use crate::models::{Instructor, InstructorId};

use super::file_io::JsonFile;
use super::{read_guard, write_guard};

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct InstructorData {
    #[serde(default)]
    instructors: Vec<Instructor>,
}

/// Repository for instructor persistence
pub struct InstructorRepository {
    file: JsonFile,
    instructors: RwLock<HashMap<InstructorId, Instructor>>,
}

impl InstructorRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: JsonFile::new(path),
            instructors: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), CycleError> {
        let file_data: InstructorData = self.file.load()?;
        let mut instructors = write_guard(&self.instructors)?;
        instructors.clear();
        for instructor in file_data.instructors {
            instructors.insert(instructor.id, instructor);
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), CycleError> {
        self.file.store(|| {
            Ok(InstructorData {
                instructors: self.get_all()?,
            })
        })
    }

    pub fn get(&self, id: InstructorId) -> Result<Option<Instructor>, CycleError> {
        Ok(read_guard(&self.instructors)?.get(&id).cloned())
    }

    /// Get an instructor, failing with `NotFound` if missing
    pub fn require(&self, id: InstructorId) -> Result<Instructor, CycleError> {
        self.get(id)?
            .ok_or_else(|| CycleError::instructor_not_found(id.to_string()))
    }

    /// Get all instructors, sorted by name
    pub fn get_all(&self) -> Result<Vec<Instructor>, CycleError> {
        let mut list: Vec<_> = read_guard(&self.instructors)?.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    /// Snapshot of all instructors keyed by id
    pub fn as_map(&self) -> Result<HashMap<InstructorId, Instructor>, CycleError> {
        Ok(read_guard(&self.instructors)?.clone())
    }

    pub fn upsert(&self, instructor: Instructor) -> Result<(), CycleError> {
        write_guard(&self.instructors)?.insert(instructor.id, instructor);
        Ok(())
    }
}
