//! Meeting status updates
//!
//! A status write is committed first. Completing a meeting then stores its
//! financials, refreshes its expense view and evaluates the owning cycle.
//! Failures in those follow-ups are reported next to the committed write;
//! the write is not rolled back.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::settings::Settings;
use crate::error::{CycleError, CycleResult};
use crate::models::{CycleId, Meeting, MeetingFinancials, MeetingId, MeetingStatus};
use crate::storage::Storage;

use super::completion::{BatchCompletion, CompletionCoordinator, CompletionOutcome};
use super::expenses::{ExpenseService, MeetingBreakdown};
use super::financials::{BulkOutcome, FinancialService};

/// Follow-up step of a status update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpStage {
    Financials,
    Expenses,
    Completion,
}

impl std::fmt::Display for FollowUpStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Financials => write!(f, "financials"),
            Self::Expenses => write!(f, "expenses"),
            Self::Completion => write!(f, "completion"),
        }
    }
}

/// A follow-up that failed after the status write succeeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowUpError {
    pub stage: FollowUpStage,
    pub error: String,
}

/// Result of a single status update
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub meeting: Meeting,
    pub previous_status: MeetingStatus,
    pub financials: Option<MeetingFinancials>,
    pub breakdown: Option<MeetingBreakdown>,
    pub completion: Option<CompletionOutcome>,
    pub follow_up_errors: Vec<FollowUpError>,
}

impl StatusUpdate {
    pub fn changed(&self) -> bool {
        self.previous_status != self.meeting.status
    }

    pub fn is_consistent(&self) -> bool {
        self.follow_up_errors.is_empty()
    }
}

/// A follow-up that failed for one meeting of a bulk update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFollowUpError {
    pub meeting_id: MeetingId,
    #[serde(flatten)]
    pub follow_up: FollowUpError,
}

/// Result of a bulk status update
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkStatusOutcome {
    #[serde(flatten)]
    pub items: BulkOutcome,
    pub follow_up_errors: Vec<BulkFollowUpError>,
    pub completion: BatchCompletion,
}

/// Service for meeting status changes
pub struct MeetingService<'a> {
    storage: &'a Storage,
    settings: Settings,
}

impl<'a> MeetingService<'a> {
    pub fn new(storage: &'a Storage, settings: &Settings) -> Self {
        Self {
            storage,
            settings: settings.clone(),
        }
    }

    pub fn get(&self, id: MeetingId) -> CycleResult<Meeting> {
        self.storage
            .meetings
            .get(id)?
            .ok_or_else(|| CycleError::meeting_not_found(id.to_string()))
    }

    /// Write a new status under the cycle's lock
    ///
    /// Completing a meeting of a cycle whose completed count already equals
    /// its total is rejected.
    fn write_status(&self, id: MeetingId, status: MeetingStatus) -> CycleResult<(Meeting, Meeting)> {
        let cycle_id = self.get(id)?.cycle_id;

        self.storage.locks.with_cycle(cycle_id, || {
            let current = self.get(id)?;
            if status.is_completed() && !current.is_completed() {
                let cycle = self
                    .storage
                    .cycles
                    .get(cycle_id)?
                    .ok_or_else(|| CycleError::cycle_not_found(cycle_id.to_string()))?;
                let (completed, _) = self.storage.meetings.count_for_cycle(cycle_id)?;
                if completed >= cycle.total_meetings {
                    return Err(CycleError::Validation(format!(
                        "Cycle '{}' already has all {} meetings completed",
                        cycle.name, cycle.total_meetings
                    )));
                }
            }

            self.storage.meetings.update(id, |m| {
                m.set_status(status);
                Ok(())
            })
        })
    }

    /// Store financials of a freshly completed meeting
    fn store_financials(&self, id: MeetingId) -> CycleResult<MeetingFinancials> {
        let financials = FinancialService::new(self.storage, &self.settings);
        let meeting = self.get(id)?;
        let computed = financials.compute(&meeting)?;
        self.storage.meetings.update(id, |m| {
            m.set_financials(computed);
            Ok(())
        })?;
        Ok(computed)
    }

    /// Change one meeting's status and run the follow-ups
    pub fn update_status(&self, id: MeetingId, status: MeetingStatus) -> CycleResult<StatusUpdate> {
        let (before, after) = self.write_status(id, status)?;
        self.storage.meetings.save()?;

        let mut update = StatusUpdate {
            previous_status: before.status,
            meeting: after,
            financials: None,
            breakdown: None,
            completion: None,
            follow_up_errors: Vec::new(),
        };
        if !update.changed() {
            return Ok(update);
        }
        info!(meeting = %id, from = %before.status, to = %status, "meeting status changed");

        if status.is_completed() {
            match self.store_financials(id).and_then(|f| {
                self.storage.meetings.save()?;
                Ok(f)
            }) {
                Ok(financials) => {
                    update.financials = Some(financials);
                    update.meeting.financials = Some(financials);
                }
                Err(e) => update.fail(FollowUpStage::Financials, &e),
            }

            match ExpenseService::new(self.storage, &self.settings).meeting_breakdown(id) {
                Ok(breakdown) => update.breakdown = Some(breakdown),
                Err(e) => update.fail(FollowUpStage::Expenses, &e),
            }
        }

        match CompletionCoordinator::new(self.storage).evaluate(update.meeting.cycle_id) {
            Ok(outcome) => update.completion = Some(outcome),
            Err(e) => update.fail(FollowUpStage::Completion, &e),
        }

        Ok(update)
    }

    /// Change the status of several meetings
    ///
    /// Each meeting is written independently and failures are collected.
    /// Completion is then evaluated once per affected cycle.
    pub fn bulk_update_status(
        &self,
        ids: &[MeetingId],
        status: MeetingStatus,
    ) -> CycleResult<BulkStatusOutcome> {
        let mut outcome = BulkStatusOutcome::default();
        let mut touched: BTreeSet<CycleId> = BTreeSet::new();

        for &id in ids {
            let (before, after) = match self.write_status(id, status) {
                Ok(written) => written,
                Err(e) => {
                    outcome.items.record_error(id, &e);
                    continue;
                }
            };
            // The write is committed; its cycle is recounted regardless of follow-ups
            touched.insert(after.cycle_id);
            outcome.items.updated.push(id);

            if status.is_completed() && !before.is_completed() {
                if let Err(e) = self.store_financials(id) {
                    warn!(meeting = %id, error = %e, "financials follow-up failed");
                    outcome.follow_up_errors.push(BulkFollowUpError {
                        meeting_id: id,
                        follow_up: FollowUpError {
                            stage: FollowUpStage::Financials,
                            error: e.to_string(),
                        },
                    });
                }
            }
        }

        if !outcome.items.updated.is_empty() {
            self.storage.meetings.save()?;
        }

        outcome.completion = CompletionCoordinator::new(self.storage).on_meetings_changed(touched);
        info!(
            updated = outcome.items.updated.len(),
            failed = outcome.items.errors.len(),
            follow_ups_failed = outcome.follow_up_errors.len(),
            cycles = outcome.completion.outcomes.len(),
            "bulk status update finished"
        );
        Ok(outcome)
    }
}

impl StatusUpdate {
    fn fail(&mut self, stage: FollowUpStage, error: &CycleError) {
        warn!(meeting = %self.meeting.id, ?stage, %error, "status follow-up failed");
        self.follow_up_errors.push(FollowUpError {
            stage,
            error: error.to_string(),
        });
    }
}
