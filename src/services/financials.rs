//! Meeting financial calculation
//!
//! Revenue comes from one strategy function per billing variant. Instructor
//! payment is the resolved hourly rate times the meeting's duration. Profit
//! is stored as revenue minus payment; expenses are applied at read time by
//! the expense attributor.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::settings::Settings;
use crate::error::{CycleError, CycleResult};
use crate::models::{
    Billing, Cycle, Instructor, Meeting, MeetingFinancials, MeetingId, Money, RateKind,
    Registration,
};
use crate::storage::Storage;

use super::rates::RateResolver;

/// How a private cycle's registration amounts become per-meeting revenue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivateRevenueStrategy {
    /// Each registration's amount covers the whole cycle and is spread evenly
    /// over `total_meetings`
    #[default]
    SplitAcrossMeetings,
    /// Each registration's amount is charged for every meeting
    PerMeeting,
}

/// Revenue of one meeting of an institutional cycle with a fixed meeting price
pub fn institutional_fixed_revenue(meeting_revenue: Money) -> Money {
    meeting_revenue
}

/// Revenue of one meeting of an institutional cycle billed per child
pub fn institutional_per_child_revenue(price_per_student: Money, student_count: u32) -> Money {
    price_per_student.scale(f64::from(student_count))
}

/// Revenue of one meeting of a private cycle
///
/// Registrations completed by the cycle's own completion still count, so a
/// recalculation after the cycle concluded yields the same figures.
pub fn private_revenue(
    registrations: &[Registration],
    total_meetings: u32,
    strategy: PrivateRevenueStrategy,
) -> Money {
    let agreed: Money = registrations.iter().map(|r| r.amount).sum();
    match strategy {
        PrivateRevenueStrategy::SplitAcrossMeetings => agreed.split(total_meetings),
        PrivateRevenueStrategy::PerMeeting => agreed,
    }
}

/// Computes revenue, instructor payment and profit of meetings
#[derive(Debug, Clone, Copy, Default)]
pub struct MeetingFinancialCalculator {
    rates: RateResolver,
    private_revenue: PrivateRevenueStrategy,
}

/// Result of a (re)calculation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Recalculation {
    pub financials: MeetingFinancials,
    /// False when stored values were returned without recomputing
    pub recomputed: bool,
}

impl MeetingFinancialCalculator {
    pub fn new(rates: RateResolver, private_revenue: PrivateRevenueStrategy) -> Self {
        Self {
            rates,
            private_revenue,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(RateResolver::from_settings(settings), settings.private_revenue)
    }

    pub fn rates(&self) -> &RateResolver {
        &self.rates
    }

    /// Revenue of one meeting of `cycle`
    pub fn meeting_revenue(&self, cycle: &Cycle, registrations: &[Registration]) -> Money {
        match cycle.billing {
            Billing::InstitutionalFixed { meeting_revenue } => {
                institutional_fixed_revenue(meeting_revenue)
            }
            Billing::InstitutionalPerChild {
                price_per_student,
                student_count,
            } => institutional_per_child_revenue(price_per_student, student_count),
            Billing::Private => {
                private_revenue(registrations, cycle.total_meetings, self.private_revenue)
            }
        }
    }

    /// Instructor payment for a meeting, at the cycle's activity rate
    pub fn instructor_payment(&self, meeting: &Meeting, cycle: &Cycle, instructor: &Instructor) -> Money {
        self.rates.cost(
            instructor,
            RateKind::from(cycle.activity_type),
            meeting.duration_hours(),
        )
    }

    /// Financials of a meeting regardless of its status
    ///
    /// Used to project scheduled meetings; stored figures always go through
    /// [`MeetingFinancialCalculator::calculate`].
    pub fn project(
        &self,
        meeting: &Meeting,
        cycle: &Cycle,
        instructor: &Instructor,
        registrations: &[Registration],
    ) -> MeetingFinancials {
        MeetingFinancials::new(
            self.meeting_revenue(cycle, registrations),
            self.instructor_payment(meeting, cycle, instructor),
        )
    }

    /// Financials of a completed meeting
    pub fn calculate(
        &self,
        meeting: &Meeting,
        cycle: &Cycle,
        instructor: &Instructor,
        registrations: &[Registration],
    ) -> CycleResult<MeetingFinancials> {
        if !meeting.is_completed() {
            return Err(CycleError::Validation(format!(
                "Financials are only defined for completed meetings; {} is {}",
                meeting.id, meeting.status
            )));
        }
        if meeting.cycle_id != cycle.id {
            return Err(CycleError::Validation(format!(
                "Meeting {} does not belong to cycle {}",
                meeting.id, cycle.id
            )));
        }
        Ok(self.project(meeting, cycle, instructor, registrations))
    }

    /// Calculate unless figures are already stored and `force` is off
    pub fn recalculate(
        &self,
        meeting: &Meeting,
        cycle: &Cycle,
        instructor: &Instructor,
        registrations: &[Registration],
        force: bool,
    ) -> CycleResult<Recalculation> {
        if !meeting.is_completed() {
            // Same error as calculate, even when stale figures are stored
            self.calculate(meeting, cycle, instructor, registrations)?;
        }
        match meeting.financials {
            Some(financials) if !force => Ok(Recalculation {
                financials,
                recomputed: false,
            }),
            _ => Ok(Recalculation {
                financials: self.calculate(meeting, cycle, instructor, registrations)?,
                recomputed: true,
            }),
        }
    }
}

/// A failed item of a bulk operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    pub meeting_id: MeetingId,
    pub error: String,
}

/// Partial-success result of a bulk operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkOutcome {
    pub updated: Vec<MeetingId>,
    pub errors: Vec<ItemError>,
}

impl BulkOutcome {
    pub fn record_error(&mut self, meeting_id: MeetingId, error: &CycleError) {
        warn!(meeting = %meeting_id, %error, "bulk item failed");
        self.errors.push(ItemError {
            meeting_id,
            error: error.to_string(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Storage-backed recalculation of meeting financials
pub struct FinancialService<'a> {
    storage: &'a Storage,
    calculator: MeetingFinancialCalculator,
}

impl<'a> FinancialService<'a> {
    pub fn new(storage: &'a Storage, settings: &Settings) -> Self {
        Self {
            storage,
            calculator: MeetingFinancialCalculator::from_settings(settings),
        }
    }

    pub fn calculator(&self) -> &MeetingFinancialCalculator {
        &self.calculator
    }

    fn inputs(&self, meeting: &Meeting) -> CycleResult<(Cycle, Instructor, Vec<Registration>)> {
        let cycle = self
            .storage
            .cycles
            .get(meeting.cycle_id)?
            .ok_or_else(|| CycleError::cycle_not_found(meeting.cycle_id.to_string()))?;
        let instructor = self.storage.instructors.require(meeting.instructor_id)?;
        let registrations = self.storage.registrations.get_by_cycle(cycle.id)?;
        Ok((cycle, instructor, registrations))
    }

    /// Compute a meeting's figures from current inputs without storing them
    pub fn compute(&self, meeting: &Meeting) -> CycleResult<MeetingFinancials> {
        let (cycle, instructor, registrations) = self.inputs(meeting)?;
        self.calculator
            .calculate(meeting, &cycle, &instructor, &registrations)
    }

    /// Project a scheduled meeting's figures
    pub fn project(&self, meeting: &Meeting) -> CycleResult<MeetingFinancials> {
        let (cycle, instructor, registrations) = self.inputs(meeting)?;
        Ok(self
            .calculator
            .project(meeting, &cycle, &instructor, &registrations))
    }

    /// Stored figures of a completed meeting, computed when missing
    pub fn effective(&self, meeting: &Meeting) -> CycleResult<MeetingFinancials> {
        match meeting.financials {
            Some(financials) => Ok(financials),
            None => self.compute(meeting),
        }
    }

    /// Recalculate one meeting and persist the result
    pub fn recalculate(&self, id: MeetingId, force: bool) -> CycleResult<Recalculation> {
        let result = self.recalculate_in_memory(id, force)?;
        if result.recomputed {
            self.storage.meetings.save()?;
        }
        Ok(result)
    }

    fn recalculate_in_memory(&self, id: MeetingId, force: bool) -> CycleResult<Recalculation> {
        let meeting = self
            .storage
            .meetings
            .get(id)?
            .ok_or_else(|| CycleError::meeting_not_found(id.to_string()))?;
        let (cycle, instructor, registrations) = self.inputs(&meeting)?;
        let result = self
            .calculator
            .recalculate(&meeting, &cycle, &instructor, &registrations, force)?;

        if result.recomputed {
            let financials = result.financials;
            self.storage
                .meetings
                .update(id, |m| {
                    m.set_financials(financials);
                    Ok(())
                })?;
            debug!(
                meeting = %id,
                revenue = %financials.revenue,
                payment = %financials.instructor_payment,
                profit = %financials.profit,
                "stored meeting financials"
            );
        }
        Ok(result)
    }

    /// Recalculate several meetings; one failure does not stop the rest
    pub fn recalculate_bulk(&self, ids: &[MeetingId], force: bool) -> CycleResult<BulkOutcome> {
        let mut outcome = BulkOutcome::default();
        for &id in ids {
            match self.recalculate_in_memory(id, force) {
                Ok(_) => outcome.updated.push(id),
                Err(e) => outcome.record_error(id, &e),
            }
        }
        if !outcome.updated.is_empty() {
            self.storage.meetings.save()?;
        }
        Ok(outcome)
    }
}
