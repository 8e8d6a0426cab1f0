//! Cycle completion coordinator
//!
//! Progress counters are always recounted from the meeting set. When the
//! count reaches the planned total of an active cycle, the cycle is marked
//! completed exactly once and the cascade runs:
//!
//! 1. active registrations become completed
//! 2. one upsell lead per transitioned registration (deduplicated per student)
//! 3. meetings still scheduled are deleted
//!
//! All of this happens inside the cycle's critical section.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{CycleError, CycleResult};
use crate::models::{CycleId, CycleProgress, MeetingId, UpsellLead};
use crate::storage::Storage;

/// Side effects of one cycle completion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeSummary {
    pub registrations_completed: usize,
    pub leads_created: usize,
    /// Leads that already existed for the (cycle, student) pair
    pub leads_skipped: usize,
    pub meetings_deleted: Vec<MeetingId>,
}

/// Result of evaluating one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionOutcome {
    pub cycle_id: CycleId,
    pub progress: CycleProgress,
    /// Present only for the evaluation that completed the cycle
    pub cascade: Option<CascadeSummary>,
}

impl CompletionOutcome {
    pub fn completed_now(&self) -> bool {
        self.cascade.is_some()
    }
}

/// Failure to evaluate one cycle within a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleFailure {
    pub cycle_id: CycleId,
    pub error: String,
}

/// Per-cycle results of a batch evaluation
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchCompletion {
    pub outcomes: Vec<CompletionOutcome>,
    pub failures: Vec<CycleFailure>,
}

/// Drives the cycle state machine from meeting status changes
pub struct CompletionCoordinator<'a> {
    storage: &'a Storage,
}

impl<'a> CompletionCoordinator<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Recount a cycle's progress without evaluating completion
    ///
    /// Never changes `total_meetings`.
    pub fn sync_progress(&self, cycle_id: CycleId) -> CycleResult<CycleProgress> {
        let progress = self
            .storage
            .locks
            .with_cycle(cycle_id, || self.recount(cycle_id))?;
        self.storage.cycles.save()?;
        Ok(progress)
    }

    /// Recount and, if the cycle just reached its total, complete it
    pub fn evaluate(&self, cycle_id: CycleId) -> CycleResult<CompletionOutcome> {
        let outcome = self
            .storage
            .locks
            .with_cycle(cycle_id, || self.evaluate_locked(cycle_id))?;
        self.storage.cycles.save()?;
        Ok(outcome)
    }

    /// Evaluate every cycle touched by a set of changed meetings, once per cycle
    pub fn on_meetings_changed<I>(&self, cycle_ids: I) -> BatchCompletion
    where
        I: IntoIterator<Item = CycleId>,
    {
        let unique: BTreeSet<CycleId> = cycle_ids.into_iter().collect();
        let mut batch = BatchCompletion::default();
        for cycle_id in unique {
            match self.evaluate(cycle_id) {
                Ok(outcome) => batch.outcomes.push(outcome),
                Err(e) => {
                    warn!(cycle = %cycle_id, error = %e, "completion evaluation failed");
                    batch.failures.push(CycleFailure {
                        cycle_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        batch
    }

    // Caller holds the cycle lock.
    fn recount(&self, cycle_id: CycleId) -> CycleResult<CycleProgress> {
        let cycle = self
            .storage
            .cycles
            .get(cycle_id)?
            .ok_or_else(|| CycleError::cycle_not_found(cycle_id.to_string()))?;
        let (completed, in_table) = self.storage.meetings.count_for_cycle(cycle_id)?;

        if completed > cycle.total_meetings {
            warn!(
                cycle = %cycle_id,
                completed,
                total = cycle.total_meetings,
                "more completed meetings than planned; capping progress"
            );
        }

        let cycle = self.storage.cycles.update_counters(cycle_id, completed)?;
        debug!(
            cycle = %cycle_id,
            completed = cycle.completed_meetings,
            remaining = cycle.remaining_meetings,
            "recounted cycle progress"
        );
        Ok(cycle.progress(in_table))
    }

    // Caller holds the cycle lock.
    fn evaluate_locked(&self, cycle_id: CycleId) -> CycleResult<CompletionOutcome> {
        let progress = self.recount(cycle_id)?;

        let reached_total = progress.total_meetings > 0
            && progress.completed_meetings == progress.total_meetings;
        if !reached_total {
            return Ok(CompletionOutcome {
                cycle_id,
                progress,
                cascade: None,
            });
        }

        if !self.storage.cycles.mark_completed(cycle_id)? {
            debug!(cycle = %cycle_id, "cycle already completed");
            return Ok(CompletionOutcome {
                cycle_id,
                progress,
                cascade: None,
            });
        }
        info!(cycle = %cycle_id, "cycle completed");

        let cascade = self.cascade(cycle_id).map_err(|e| {
            warn!(cycle = %cycle_id, error = %e, "completion cascade failed");
            CycleError::Internal(format!(
                "Cycle {} was completed but its cascade failed: {}",
                cycle_id, e
            ))
        })?;

        // Deleting scheduled rows changes the table size
        let (_, in_table) = self.storage.meetings.count_for_cycle(cycle_id)?;
        Ok(CompletionOutcome {
            cycle_id,
            progress: CycleProgress {
                meetings_in_table: in_table,
                ..progress
            },
            cascade: Some(cascade),
        })
    }

    fn cascade(&self, cycle_id: CycleId) -> CycleResult<CascadeSummary> {
        let mut summary = CascadeSummary::default();

        let transitioned = self.storage.registrations.complete_active_for_cycle(cycle_id)?;
        summary.registrations_completed = transitioned.len();

        for registration in &transitioned {
            let lead = UpsellLead::new(cycle_id, registration.customer_id, registration.student_id);
            if self.storage.leads.insert_if_absent(lead)? {
                summary.leads_created += 1;
            } else {
                summary.leads_skipped += 1;
            }
        }

        summary.meetings_deleted = self
            .storage
            .meetings
            .delete_scheduled_for_cycle(cycle_id)?
            .into_iter()
            .map(|m| m.id)
            .collect();

        self.storage.registrations.save()?;
        self.storage.leads.save()?;
        self.storage.meetings.save()?;

        info!(
            cycle = %cycle_id,
            registrations = summary.registrations_completed,
            leads = summary.leads_created,
            deleted_meetings = summary.meetings_deleted.len(),
            "completion cascade finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::LedgerPaths;
    use crate::models::{
        ActivityType, Billing, CustomerId, Cycle, CycleStatus, InstructorId, LeadStatus, Meeting,
        MeetingStatus, Money, Registration, RegistrationStatus, StudentId,
    };
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn seed_cycle(storage: &Storage, total: u32, statuses: &[MeetingStatus]) -> (CycleId, Vec<MeetingId>) {
        let cycle = Cycle::new("Robotics", Billing::Private, ActivityType::Frontal, total);
        let cycle_id = cycle.id;
        storage.cycles.upsert(cycle).unwrap();

        let instructor_id = InstructorId::new();
        let ids = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let mut meeting = Meeting::new(
                    cycle_id,
                    instructor_id,
                    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Days::new(7 * i as u64),
                    60,
                );
                meeting.status = *status;
                let id = meeting.id;
                storage.meetings.upsert(meeting).unwrap();
                id
            })
            .collect();
        (cycle_id, ids)
    }

    fn enroll(storage: &Storage, cycle_id: CycleId) -> Registration {
        let registration = Registration::new(
            cycle_id,
            StudentId::new(),
            CustomerId::new(),
            Money::from_units(1000),
        );
        storage.registrations.upsert(registration.clone()).unwrap();
        registration
    }

    fn complete(storage: &Storage, id: MeetingId) {
        storage
            .meetings
            .update(id, |m| {
                m.set_status(MeetingStatus::Completed);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_non_last_completion_leaves_cycle_active() {
        use MeetingStatus::*;
        let (_dir, storage) = create_test_storage();
        let (cycle_id, _) = seed_cycle(&storage, 3, &[Completed, Scheduled, Scheduled]);

        let outcome = CompletionCoordinator::new(&storage).evaluate(cycle_id).unwrap();
        assert!(!outcome.completed_now());
        assert_eq!(outcome.progress.completed_meetings, 1);
        assert_eq!(outcome.progress.remaining_meetings, 2);

        let cycle = storage.cycles.get(cycle_id).unwrap().unwrap();
        assert_eq!(cycle.status, CycleStatus::Active);
    }

    #[test]
    fn test_two_meeting_cycle_completes_on_second() {
        use MeetingStatus::*;
        let (_dir, storage) = create_test_storage();
        let (cycle_id, ids) = seed_cycle(&storage, 2, &[Scheduled, Scheduled]);
        let coordinator = CompletionCoordinator::new(&storage);

        complete(&storage, ids[0]);
        let first = coordinator.evaluate(cycle_id).unwrap();
        assert!(!first.completed_now());
        assert_eq!(
            storage.cycles.get(cycle_id).unwrap().unwrap().status,
            CycleStatus::Active
        );
        assert_eq!(first.progress.completed_meetings, 1);
        assert_eq!(first.progress.remaining_meetings, 1);

        complete(&storage, ids[1]);
        let second = coordinator.evaluate(cycle_id).unwrap();
        assert!(second.completed_now());
        assert_eq!(second.progress.completed_meetings, 2);
        assert_eq!(second.progress.remaining_meetings, 0);

        // Evaluating again does not fire twice
        assert!(!coordinator.evaluate(cycle_id).unwrap().completed_now());
    }

    #[test]
    fn test_cascade_effects() {
        use MeetingStatus::*;
        let (_dir, storage) = create_test_storage();
        let (cycle_id, ids) = seed_cycle(
            &storage,
            2,
            &[Completed, Completed, Cancelled, Postponed, Scheduled, Scheduled],
        );
        let first = enroll(&storage, cycle_id);
        let second = enroll(&storage, cycle_id);
        let mut dropped = Registration::new(cycle_id, StudentId::new(), CustomerId::new(), Money::zero());
        dropped.complete();
        storage.registrations.upsert(dropped).unwrap();

        let outcome = CompletionCoordinator::new(&storage).evaluate(cycle_id).unwrap();
        let cascade = outcome.cascade.clone().unwrap();
        assert_eq!(cascade.registrations_completed, 2);
        assert_eq!(cascade.leads_created, 2);
        assert_eq!(cascade.meetings_deleted, vec![ids[4], ids[5]]);
        assert_eq!(outcome.progress.meetings_in_table, 4);

        let leads = storage.leads.get_by_cycle(cycle_id).unwrap();
        assert_eq!(leads.len(), 2);
        for registration in [&first, &second] {
            let lead = storage
                .leads
                .find(cycle_id, registration.student_id)
                .unwrap()
                .unwrap();
            assert_eq!(lead.status, LeadStatus::New);
            assert_eq!(lead.customer_id, registration.customer_id);
        }

        assert!(storage
            .registrations
            .get_by_cycle(cycle_id)
            .unwrap()
            .iter()
            .all(|r| r.status == RegistrationStatus::Completed));

        let remaining: Vec<_> = storage
            .meetings
            .get_by_cycle(cycle_id)
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(remaining, ids[..4].to_vec());
    }

    #[test]
    fn test_existing_lead_is_not_duplicated() {
        use MeetingStatus::*;
        let (_dir, storage) = create_test_storage();
        let (cycle_id, _) = seed_cycle(&storage, 1, &[Completed]);
        let registration = enroll(&storage, cycle_id);
        storage
            .leads
            .insert(UpsellLead::new(
                cycle_id,
                registration.customer_id,
                registration.student_id,
            ))
            .unwrap();

        let cascade = CompletionCoordinator::new(&storage)
            .evaluate(cycle_id)
            .unwrap()
            .cascade
            .unwrap();
        assert_eq!(cascade.leads_created, 0);
        assert_eq!(cascade.leads_skipped, 1);
        assert_eq!(storage.leads.count().unwrap(), 1);
    }

    #[test]
    fn test_sync_progress_keeps_total() {
        use MeetingStatus::*;
        let (_dir, storage) = create_test_storage();
        let (cycle_id, _) = seed_cycle(&storage, 10, &[Completed, Completed, Scheduled]);

        let progress = CompletionCoordinator::new(&storage)
            .sync_progress(cycle_id)
            .unwrap();
        assert_eq!(
            progress,
            CycleProgress {
                completed_meetings: 2,
                remaining_meetings: 8,
                total_meetings: 10,
                meetings_in_table: 3,
            }
        );
    }

    #[test]
    fn test_batch_groups_by_cycle() {
        use MeetingStatus::*;
        let (_dir, storage) = create_test_storage();
        let (cycle_a, _) = seed_cycle(&storage, 2, &[Completed, Completed]);
        let (cycle_b, _) = seed_cycle(&storage, 3, &[Completed]);
        enroll(&storage, cycle_a);

        let batch = CompletionCoordinator::new(&storage)
            .on_meetings_changed([cycle_a, cycle_a, cycle_b, cycle_a, CycleId::new()]);
        assert_eq!(batch.outcomes.len(), 2);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.outcomes.iter().filter(|o| o.completed_now()).count(), 1);
        assert_eq!(storage.leads.count().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_evaluations_fire_once() {
        use MeetingStatus::*;
        let (_dir, storage) = create_test_storage();
        let (cycle_id, ids) = seed_cycle(&storage, 4, &[Scheduled, Scheduled, Scheduled, Scheduled]);
        for _ in 0..3 {
            enroll(&storage, cycle_id);
        }

        let coordinator = CompletionCoordinator::new(&storage);
        let fired: usize = std::thread::scope(|s| {
            let handles: Vec<_> = ids
                .iter()
                .map(|&id| {
                    let storage = &storage;
                    let coordinator = &coordinator;
                    s.spawn(move || {
                        complete(storage, id);
                        coordinator.evaluate(cycle_id).unwrap().completed_now() as usize
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(fired, 1);
        assert_eq!(storage.leads.count().unwrap(), 3);
    }

    proptest! {
        #[test]
        fn prop_counters_add_up_to_total(
            total in 1u32..12,
            statuses in prop::collection::vec(0u8..4, 0..16),
        ) {
            let (_dir, storage) = create_test_storage();
            let statuses: Vec<MeetingStatus> = statuses
                .into_iter()
                .map(|s| match s {
                    0 => MeetingStatus::Scheduled,
                    1 => MeetingStatus::Completed,
                    2 => MeetingStatus::Cancelled,
                    _ => MeetingStatus::Postponed,
                })
                .collect();
            let (cycle_id, _) = seed_cycle(&storage, total, &statuses);

            let progress = CompletionCoordinator::new(&storage).sync_progress(cycle_id).unwrap();
            prop_assert_eq!(progress.completed_meetings + progress.remaining_meetings, total);
            prop_assert_eq!(progress.total_meetings, total);
            prop_assert_eq!(progress.meetings_in_table as usize, statuses.len());
        }
    }
}
