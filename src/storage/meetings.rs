//! Meeting repository for JSON storage

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::NaiveDate;

use crate::error::CycleError;
use crate::models::{CycleId, Meeting, MeetingId, MeetingStatus};

use super::file_io::JsonFile;
use super::{read_guard, write_guard};

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct MeetingData {
    #[serde(default)]
    meetings: Vec<Meeting>,
}

/// Repository for meeting persistence
pub struct MeetingRepository {
    file: JsonFile,
    meetings: RwLock<HashMap<MeetingId, Meeting>>,
}

impl MeetingRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: JsonFile::new(path),
            meetings: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), CycleError> {
        let file_data: MeetingData = self.file.load()?;
        let mut meetings = write_guard(&self.meetings)?;
        meetings.clear();
        for meeting in file_data.meetings {
            meetings.insert(meeting.id, meeting);
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), CycleError> {
        self.file.store(|| {
            Ok(MeetingData {
                meetings: self.get_all()?,
            })
        })
    }

    pub fn get(&self, id: MeetingId) -> Result<Option<Meeting>, CycleError> {
        Ok(read_guard(&self.meetings)?.get(&id).cloned())
    }

    /// Get all meetings sorted by date
    pub fn get_all(&self) -> Result<Vec<Meeting>, CycleError> {
        let mut list: Vec<_> = read_guard(&self.meetings)?.values().cloned().collect();
        sort_by_date(&mut list);
        Ok(list)
    }

    /// Get all meetings of a cycle sorted by date
    pub fn get_by_cycle(&self, cycle_id: CycleId) -> Result<Vec<Meeting>, CycleError> {
        let mut list: Vec<_> = read_guard(&self.meetings)?
            .values()
            .filter(|m| m.cycle_id == cycle_id)
            .cloned()
            .collect();
        sort_by_date(&mut list);
        Ok(list)
    }

    /// Get meetings scheduled within a date range (inclusive)
    pub fn get_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Meeting>, CycleError> {
        let mut list: Vec<_> = read_guard(&self.meetings)?
            .values()
            .filter(|m| m.scheduled_date >= start && m.scheduled_date <= end)
            .cloned()
            .collect();
        sort_by_date(&mut list);
        Ok(list)
    }

    /// Count a cycle's meetings: (completed, all rows)
    pub fn count_for_cycle(&self, cycle_id: CycleId) -> Result<(u32, u32), CycleError> {
        let meetings = read_guard(&self.meetings)?;
        let mut completed = 0;
        let mut total = 0;
        for meeting in meetings.values().filter(|m| m.cycle_id == cycle_id) {
            total += 1;
            if meeting.is_completed() {
                completed += 1;
            }
        }
        Ok((completed, total))
    }

    pub fn upsert(&self, meeting: Meeting) -> Result<(), CycleError> {
        write_guard(&self.meetings)?.insert(meeting.id, meeting);
        Ok(())
    }

    /// Mutate one meeting in place under the write lock
    ///
    /// Returns the meeting as it was before and after the change.
    pub fn update<F>(&self, id: MeetingId, f: F) -> Result<(Meeting, Meeting), CycleError>
    where
        F: FnOnce(&mut Meeting) -> Result<(), CycleError>,
    {
        let mut meetings = write_guard(&self.meetings)?;
        let meeting = meetings
            .get_mut(&id)
            .ok_or_else(|| CycleError::meeting_not_found(id.to_string()))?;
        let before = meeting.clone();
        f(meeting)?;
        Ok((before, meeting.clone()))
    }

    pub fn delete(&self, id: MeetingId) -> Result<Option<Meeting>, CycleError> {
        Ok(write_guard(&self.meetings)?.remove(&id))
    }

    /// Delete every meeting of a cycle that is still scheduled
    ///
    /// Returns the removed meetings. Other statuses are left untouched.
    pub fn delete_scheduled_for_cycle(&self, cycle_id: CycleId) -> Result<Vec<Meeting>, CycleError> {
        let mut meetings = write_guard(&self.meetings)?;
        let doomed: Vec<MeetingId> = meetings
            .values()
            .filter(|m| m.cycle_id == cycle_id && m.status == MeetingStatus::Scheduled)
            .map(|m| m.id)
            .collect();

        let mut removed: Vec<Meeting> = doomed
            .iter()
            .filter_map(|id| meetings.remove(id))
            .collect();
        sort_by_date(&mut removed);
        Ok(removed)
    }
}

fn sort_by_date(list: &mut [Meeting]) {
    list.sort_by(|a, b| {
        a.scheduled_date
            .cmp(&b.scheduled_date)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InstructorId;
    use tempfile::TempDir;

    fn meeting_on(cycle_id: CycleId, day: u32, status: MeetingStatus) -> Meeting {
        let mut meeting = Meeting::new(
            cycle_id,
            InstructorId::new(),
            NaiveDate::from_ymd_opt(2025, 5, day).unwrap(),
            60,
        );
        meeting.status = status;
        meeting
    }

    #[test]
    fn test_count_for_cycle() {
        let temp_dir = TempDir::new().unwrap();
        let repo = MeetingRepository::new(temp_dir.path().join("meetings.json"));
        let cycle_id = CycleId::new();

        repo.upsert(meeting_on(cycle_id, 1, MeetingStatus::Completed)).unwrap();
        repo.upsert(meeting_on(cycle_id, 8, MeetingStatus::Cancelled)).unwrap();
        repo.upsert(meeting_on(cycle_id, 15, MeetingStatus::Scheduled)).unwrap();
        repo.upsert(meeting_on(CycleId::new(), 15, MeetingStatus::Completed)).unwrap();

        assert_eq!(repo.count_for_cycle(cycle_id).unwrap(), (1, 3));
    }

    #[test]
    fn test_delete_scheduled_only() {
        let temp_dir = TempDir::new().unwrap();
        let repo = MeetingRepository::new(temp_dir.path().join("meetings.json"));
        let cycle_id = CycleId::new();

        let completed = meeting_on(cycle_id, 1, MeetingStatus::Completed);
        let postponed = meeting_on(cycle_id, 8, MeetingStatus::Postponed);
        repo.upsert(completed.clone()).unwrap();
        repo.upsert(postponed.clone()).unwrap();
        repo.upsert(meeting_on(cycle_id, 15, MeetingStatus::Scheduled)).unwrap();
        repo.upsert(meeting_on(cycle_id, 22, MeetingStatus::Scheduled)).unwrap();

        let removed = repo.delete_scheduled_for_cycle(cycle_id).unwrap();
        assert_eq!(removed.len(), 2);

        let remaining = repo.get_by_cycle(cycle_id).unwrap();
        let ids: Vec<_> = remaining.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![completed.id, postponed.id]);
    }

    #[test]
    fn test_date_range() {
        let temp_dir = TempDir::new().unwrap();
        let repo = MeetingRepository::new(temp_dir.path().join("meetings.json"));
        let cycle_id = CycleId::new();
        repo.upsert(meeting_on(cycle_id, 1, MeetingStatus::Completed)).unwrap();
        repo.upsert(meeting_on(cycle_id, 20, MeetingStatus::Completed)).unwrap();

        let found = repo
            .get_by_date_range(
                NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
                NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
            )
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
