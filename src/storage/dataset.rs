//! YAML data set import
//!
//! A data set seeds the store with instructors, cycles, meetings,
//! registrations and expenses in one document. Money amounts are written in
//! cents and ids as full UUIDs, matching the JSON files.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CycleError;
use crate::models::{
    Cycle, CycleExpense, CycleExpenseCost, CycleId, Instructor, InstructorId, Meeting,
    MeetingExpense, MeetingExpenseCost, MeetingId, Registration,
};

use super::Storage;

/// Contents of a seed file
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DataSet {
    #[serde(default)]
    pub instructors: Vec<Instructor>,
    #[serde(default)]
    pub cycles: Vec<Cycle>,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub registrations: Vec<Registration>,
    #[serde(default)]
    pub cycle_expenses: Vec<CycleExpense>,
    #[serde(default)]
    pub meeting_expenses: Vec<MeetingExpense>,
}

/// Counts of imported entities
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub instructors: usize,
    pub cycles: usize,
    pub meetings: usize,
    pub registrations: usize,
    pub cycle_expenses: usize,
    pub meeting_expenses: usize,
}

impl DataSet {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CycleError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CycleError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| CycleError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&contents)
    }
}

impl Storage {
    /// Validate a data set against itself and the current store, then upsert it
    ///
    /// Nothing is written unless the whole set validates. Progress counters of
    /// every touched cycle are recounted from the stored meetings afterwards.
    pub fn import(&self, data: &DataSet) -> Result<ImportSummary, CycleError> {
        self.validate_dataset(data)?;

        for instructor in &data.instructors {
            self.instructors.upsert(instructor.clone())?;
        }
        for cycle in &data.cycles {
            self.cycles.upsert(cycle.clone())?;
        }
        for meeting in &data.meetings {
            self.meetings.upsert(meeting.clone())?;
        }
        for registration in &data.registrations {
            self.registrations.upsert(registration.clone())?;
        }
        for expense in &data.cycle_expenses {
            self.expenses.upsert_cycle_expense(expense.clone())?;
        }
        for expense in &data.meeting_expenses {
            self.expenses.upsert_meeting_expense(expense.clone())?;
        }

        let touched: HashSet<CycleId> = data
            .cycles
            .iter()
            .map(|c| c.id)
            .chain(data.meetings.iter().map(|m| m.cycle_id))
            .collect();
        for cycle_id in touched {
            let (completed, _) = self.meetings.count_for_cycle(cycle_id)?;
            let cycle = self.cycles.update_counters(cycle_id, completed)?;
            debug!(cycle = %cycle.id, completed = cycle.completed_meetings, "recounted imported cycle");
        }

        let summary = ImportSummary {
            instructors: data.instructors.len(),
            cycles: data.cycles.len(),
            meetings: data.meetings.len(),
            registrations: data.registrations.len(),
            cycle_expenses: data.cycle_expenses.len(),
            meeting_expenses: data.meeting_expenses.len(),
        };
        info!(?summary, "imported data set");
        Ok(summary)
    }

    fn validate_dataset(&self, data: &DataSet) -> Result<(), CycleError> {
        let mut instructors: HashSet<InstructorId> = self.instructors.as_map()?.into_keys().collect();
        for instructor in &data.instructors {
            instructor.validate()?;
            instructors.insert(instructor.id);
        }

        let mut cycles: HashSet<CycleId> = self.cycles.get_all()?.iter().map(|c| c.id).collect();
        for cycle in &data.cycles {
            cycle.validate()?;
            if let Some(instructor_id) = cycle.instructor_id {
                require_instructor(&instructors, instructor_id)?;
            }
            cycles.insert(cycle.id);
        }

        let mut meetings: HashMap<MeetingId, CycleId> = self
            .meetings
            .get_all()?
            .iter()
            .map(|m| (m.id, m.cycle_id))
            .collect();
        for meeting in &data.meetings {
            meeting.validate()?;
            require_cycle(&cycles, meeting.cycle_id)?;
            require_instructor(&instructors, meeting.instructor_id)?;
            meetings.insert(meeting.id, meeting.cycle_id);
        }

        for registration in &data.registrations {
            registration.validate()?;
            require_cycle(&cycles, registration.cycle_id)?;
        }

        for expense in &data.cycle_expenses {
            expense.validate()?;
            require_cycle(&cycles, expense.cycle_id)?;
            if let CycleExpenseCost::Hourly { instructor_id, .. } = expense.cost {
                require_instructor(&instructors, instructor_id)?;
            }
        }

        for expense in &data.meeting_expenses {
            expense.validate()?;
            if !meetings.contains_key(&expense.meeting_id) {
                return Err(CycleError::meeting_not_found(expense.meeting_id.to_string()));
            }
            if let MeetingExpenseCost::ExtraInstructor { instructor_id, .. } = expense.cost {
                require_instructor(&instructors, instructor_id)?;
            }
        }

        Ok(())
    }
}

fn require_cycle(known: &HashSet<CycleId>, id: CycleId) -> Result<(), CycleError> {
    if known.contains(&id) {
        Ok(())
    } else {
        Err(CycleError::cycle_not_found(id.to_string()))
    }
}

fn require_instructor(known: &HashSet<InstructorId>, id: InstructorId) -> Result<(), CycleError> {
    if known.contains(&id) {
        Ok(())
    } else {
        Err(CycleError::instructor_not_found(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::LedgerPaths;
    use tempfile::TempDir;

    const SEED: &str = r#"
instructors:
  - id: 11111111-1111-1111-1111-111111111111
    name: Dana
    employment_type: employee
    rates:
      frontal: 10000
      online: 8000
      private_lesson: 12000
cycles:
  - id: 22222222-2222-2222-2222-222222222222
    name: Robotics A
    billing:
      type: institutional_fixed
      meeting_revenue: 50000
    activity_type: frontal
    total_meetings: 2
    completed_meetings: 7
meetings:
  - id: 33333333-3333-3333-3333-333333333333
    cycle_id: 22222222-2222-2222-2222-222222222222
    instructor_id: 11111111-1111-1111-1111-111111111111
    scheduled_date: 2025-03-02
    duration_minutes: 90
    status: completed
  - id: 44444444-4444-4444-4444-444444444444
    cycle_id: 22222222-2222-2222-2222-222222222222
    instructor_id: 11111111-1111-1111-1111-111111111111
    scheduled_date: 2025-03-09
    duration_minutes: 90
meeting_expenses:
  - id: 55555555-5555-5555-5555-555555555555
    meeting_id: 33333333-3333-3333-3333-333333333333
    expense_type: taxi
    cost:
      basis: amount
      amount: 4000
"#;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_import_recounts_counters() {
        let (_dir, storage) = create_test_storage();
        let data = DataSet::from_yaml_str(SEED).unwrap();

        let summary = storage.import(&data).unwrap();
        assert_eq!(summary.meetings, 2);
        assert_eq!(summary.meeting_expenses, 1);

        let cycle = storage
            .cycles
            .get(data.cycles[0].id)
            .unwrap()
            .unwrap();
        // The file claimed 7 completed; only one meeting actually is
        assert_eq!(cycle.completed_meetings, 1);
        assert_eq!(cycle.remaining_meetings, 1);
    }

    #[test]
    fn test_import_rejects_dangling_reference() {
        let (_dir, storage) = create_test_storage();
        let mut data = DataSet::from_yaml_str(SEED).unwrap();
        data.instructors.clear();

        let err = storage.import(&data).unwrap_err();
        assert!(err.is_not_found());
        // Nothing written
        assert_eq!(storage.cycles.count().unwrap(), 0);
    }

    #[test]
    fn test_bad_yaml_is_yaml_error() {
        let err = DataSet::from_yaml_str("cycles: [ {name: ").unwrap_err();
        assert!(matches!(err, CycleError::Yaml(_)));
    }
}
