//! Cycle service
//!
//! Creating cycles, editing the planned meeting count, scheduling meetings
//! and enrolling students. Scheduling never changes `total_meetings`; only
//! [`CycleService::set_total_meetings`] does.

use chrono::NaiveDate;
use tracing::info;

use crate::error::{CycleError, CycleResult};
use crate::models::{
    ActivityType, Billing, CustomerId, Cycle, CycleId, CycleProgress, InstructorId, Meeting,
    Money, Registration, RegistrationId, StudentId,
};
use crate::storage::Storage;

use super::completion::{CompletionCoordinator, CompletionOutcome};

/// Input for creating a new cycle
#[derive(Debug, Clone)]
pub struct CreateCycleInput {
    pub name: String,
    pub billing: Billing,
    pub activity_type: ActivityType,
    pub total_meetings: u32,
    pub customer_id: Option<CustomerId>,
    pub instructor_id: Option<InstructorId>,
    pub start_date: Option<NaiveDate>,
}

/// A cycle with its counted meeting rows
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub cycle: Cycle,
    pub progress: CycleProgress,
}

/// Service for cycle management
pub struct CycleService<'a> {
    storage: &'a Storage,
}

impl<'a> CycleService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn get(&self, id: CycleId) -> CycleResult<Cycle> {
        self.storage
            .cycles
            .get(id)?
            .ok_or_else(|| CycleError::cycle_not_found(id.to_string()))
    }

    /// Find a cycle by id or exact name
    pub fn find(&self, identifier: &str) -> CycleResult<Option<Cycle>> {
        if let Ok(id) = identifier.parse::<CycleId>() {
            if let Some(cycle) = self.storage.cycles.get(id)? {
                return Ok(Some(cycle));
            }
        }
        Ok(self
            .storage
            .cycles
            .get_all()?
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(identifier.trim())))
    }

    /// All cycles with their stored counters and meeting row counts
    pub fn list(&self) -> CycleResult<Vec<CycleSummary>> {
        self.storage
            .cycles
            .get_all()?
            .into_iter()
            .map(|cycle| {
                let (_, in_table) = self.storage.meetings.count_for_cycle(cycle.id)?;
                let progress = cycle.progress(in_table);
                Ok(CycleSummary { cycle, progress })
            })
            .collect()
    }

    pub fn create(&self, input: CreateCycleInput) -> CycleResult<Cycle> {
        if let Some(instructor_id) = input.instructor_id {
            self.storage.instructors.require(instructor_id)?;
        }

        let mut cycle = Cycle::new(
            input.name.trim(),
            input.billing,
            input.activity_type,
            input.total_meetings,
        );
        cycle.customer_id = input.customer_id;
        cycle.instructor_id = input.instructor_id;
        cycle.start_date = input.start_date;
        cycle.validate()?;

        self.storage.cycles.upsert(cycle.clone())?;
        self.storage.cycles.save()?;
        info!(cycle = %cycle.id, name = %cycle.name, billing = %cycle.billing, "cycle created");
        Ok(cycle)
    }

    /// Explicitly change the planned number of meetings
    ///
    /// Refuses totals below the completed count. A total equal to the
    /// completed count concludes the cycle like a final meeting would.
    pub fn set_total_meetings(&self, id: CycleId, total: u32) -> CycleResult<CompletionOutcome> {
        if total == 0 {
            return Err(CycleError::Validation(
                "A cycle needs at least one meeting".into(),
            ));
        }
        self.storage.locks.with_cycle(id, || {
            let mut cycle = self.get(id)?;
            let (completed, _) = self.storage.meetings.count_for_cycle(id)?;
            cycle.apply_completed_count(completed);
            cycle.set_total_meetings(total)?;
            self.storage.cycles.upsert(cycle)
        })?;
        self.storage.cycles.save()?;

        CompletionCoordinator::new(self.storage).evaluate(id)
    }

    /// Add a scheduled meeting to an active cycle
    ///
    /// Without an explicit instructor the cycle's default instructor is used.
    pub fn schedule_meeting(
        &self,
        cycle_id: CycleId,
        date: NaiveDate,
        duration_minutes: u32,
        instructor_id: Option<InstructorId>,
    ) -> CycleResult<Meeting> {
        let cycle = self.get(cycle_id)?;
        if !cycle.is_active() {
            return Err(CycleError::Validation(format!(
                "Cannot schedule meetings in completed cycle '{}'",
                cycle.name
            )));
        }
        let instructor_id = instructor_id.or(cycle.instructor_id).ok_or_else(|| {
            CycleError::Validation(format!(
                "Cycle '{}' has no default instructor; pass one explicitly",
                cycle.name
            ))
        })?;
        self.storage.instructors.require(instructor_id)?;

        let meeting = Meeting::new(cycle_id, instructor_id, date, duration_minutes);
        meeting.validate()?;

        self.storage.meetings.upsert(meeting.clone())?;
        self.storage.meetings.save()?;
        Ok(meeting)
    }

    /// Enroll a student in an active cycle
    pub fn enroll(
        &self,
        cycle_id: CycleId,
        student_id: StudentId,
        customer_id: CustomerId,
        amount: Money,
    ) -> CycleResult<Registration> {
        let cycle = self.get(cycle_id)?;
        if !cycle.is_active() {
            return Err(CycleError::Validation(format!(
                "Cannot enroll in completed cycle '{}'",
                cycle.name
            )));
        }

        let registration = Registration::new(cycle_id, student_id, customer_id, amount);
        registration.validate()?;

        self.storage.registrations.upsert(registration.clone())?;
        self.storage.registrations.save()?;
        Ok(registration)
    }

    pub fn record_payment(&self, id: RegistrationId, payment: Money) -> CycleResult<Registration> {
        let mut registration = self
            .storage
            .registrations
            .get(id)?
            .ok_or_else(|| CycleError::registration_not_found(id.to_string()))?;
        registration.record_payment(payment)?;

        self.storage.registrations.upsert(registration.clone())?;
        self.storage.registrations.save()?;
        Ok(registration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::LedgerPaths;
    use crate::models::{CycleStatus, EmploymentType, Instructor, MeetingStatus, RateCard};
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn instructor(storage: &Storage) -> InstructorId {
        let instructor = Instructor::new("Yael", RateCard::default(), EmploymentType::Freelancer);
        let id = instructor.id;
        storage.instructors.upsert(instructor).unwrap();
        id
    }

    fn input(total: u32, instructor_id: Option<InstructorId>) -> CreateCycleInput {
        CreateCycleInput {
            name: "  Math Club ".into(),
            billing: Billing::InstitutionalPerChild {
                price_per_student: Money::from_units(40),
                student_count: 15,
            },
            activity_type: ActivityType::Frontal,
            total_meetings: total,
            customer_id: None,
            instructor_id,
            start_date: None,
        }
    }

    #[test]
    fn test_create_cycle() {
        let (_dir, storage) = create_test_storage();
        let service = CycleService::new(&storage);
        let cycle = service.create(input(8, None)).unwrap();

        assert_eq!(cycle.name, "Math Club");
        assert_eq!(cycle.status, CycleStatus::Active);
        assert_eq!(cycle.completed_meetings, 0);
        assert_eq!(cycle.remaining_meetings, 8);
        assert_eq!(service.find("math club").unwrap().unwrap().id, cycle.id);
    }

    #[test]
    fn test_create_rejects_zero_meetings() {
        let (_dir, storage) = create_test_storage();
        let err = CycleService::new(&storage).create(input(0, None)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_scheduling_does_not_touch_total() {
        let (_dir, storage) = create_test_storage();
        let instructor_id = instructor(&storage);
        let service = CycleService::new(&storage);
        let cycle = service.create(input(2, Some(instructor_id))).unwrap();

        for day in 1..=3 {
            service
                .schedule_meeting(cycle.id, NaiveDate::from_ymd_opt(2025, 9, day).unwrap(), 45, None)
                .unwrap();
        }

        let summary = service.list().unwrap().remove(0);
        assert_eq!(summary.progress.total_meetings, 2);
        assert_eq!(summary.progress.meetings_in_table, 3);
    }

    #[test]
    fn test_schedule_needs_instructor() {
        let (_dir, storage) = create_test_storage();
        let service = CycleService::new(&storage);
        let cycle = service.create(input(2, None)).unwrap();
        let err = service
            .schedule_meeting(cycle.id, NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(), 45, None)
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_set_total_meetings() {
        let (_dir, storage) = create_test_storage();
        let instructor_id = instructor(&storage);
        let service = CycleService::new(&storage);
        let cycle = service.create(input(4, Some(instructor_id))).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        for _ in 0..2 {
            let meeting = service.schedule_meeting(cycle.id, date, 60, None).unwrap();
            storage
                .meetings
                .update(meeting.id, |m| {
                    m.set_status(MeetingStatus::Completed);
                    Ok(())
                })
                .unwrap();
        }

        assert!(service.set_total_meetings(cycle.id, 1).unwrap_err().is_validation());

        let outcome = service.set_total_meetings(cycle.id, 6).unwrap();
        assert_eq!(outcome.progress.remaining_meetings, 4);
        assert!(!outcome.completed_now());

        let outcome = service.set_total_meetings(cycle.id, 2).unwrap();
        assert!(outcome.completed_now());
    }

    #[test]
    fn test_enroll_and_pay() {
        let (_dir, storage) = create_test_storage();
        let service = CycleService::new(&storage);
        let cycle = service.create(input(4, None)).unwrap();

        let registration = service
            .enroll(cycle.id, StudentId::new(), CustomerId::new(), Money::from_units(900))
            .unwrap();
        let paid = service
            .record_payment(registration.id, Money::from_units(900))
            .unwrap();
        assert!(paid.is_paid_in_full());

        assert!(service
            .record_payment(RegistrationId::new(), Money::from_units(1))
            .unwrap_err()
            .is_not_found());
    }
}
