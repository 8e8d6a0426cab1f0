//! Expense attribution and the meeting expense approval workflow
//!
//! Cycle expenses are resolved to amounts and spread evenly over the cycle's
//! planned meetings. Meeting expenses count unless rejected. Neither is ever
//! written back into a meeting's stored profit; the adjusted profit is a
//! read-time view.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::info;

use crate::config::settings::Settings;
use crate::error::{CycleError, CycleResult};
use crate::models::{
    Cycle, CycleExpense, CycleExpenseCost, CycleId, ExpenseId, Instructor, InstructorId,
    MeetingExpense, MeetingExpenseCost, MeetingId, Money,
};
use crate::storage::Storage;

use super::financials::{FinancialService, MeetingFinancialCalculator};
use super::rates::RateResolver;

/// Role of the person acting on an expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Coordinator,
    Instructor,
}

impl Role {
    /// Whether the role may approve, reject and delete expenses
    pub fn can_review(&self) -> bool {
        matches!(self, Self::Admin | Self::Coordinator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Coordinator => write!(f, "coordinator"),
            Self::Instructor => write!(f, "instructor"),
        }
    }
}

impl FromStr for Role {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "coordinator" => Ok(Self::Coordinator),
            "instructor" => Ok(Self::Instructor),
            other => Err(CycleError::Validation(format!("Unknown role: '{}'", other))),
        }
    }
}

/// Authorization context of an expense action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }

    fn require_reviewer(&self, action: &str) -> CycleResult<()> {
        if self.role.can_review() {
            Ok(())
        } else {
            Err(CycleError::Forbidden(format!(
                "{} ({}) may not {} expenses",
                self.name, self.role, action
            )))
        }
    }
}

/// Pure expense arithmetic
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpenseAttributor {
    rates: RateResolver,
}

impl ExpenseAttributor {
    pub fn new(rates: RateResolver) -> Self {
        Self { rates }
    }

    fn instructor<'i>(
        instructors: &'i HashMap<InstructorId, Instructor>,
        id: InstructorId,
    ) -> CycleResult<&'i Instructor> {
        instructors
            .get(&id)
            .ok_or_else(|| CycleError::instructor_not_found(id.to_string()))
    }

    /// Amount of one cycle expense
    ///
    /// `projected_revenue` is the cycle's revenue over all planned meetings;
    /// percentage expenses are taken from it.
    pub fn resolve_cycle_expense(
        &self,
        expense: &CycleExpense,
        projected_revenue: Money,
        instructors: &HashMap<InstructorId, Instructor>,
    ) -> CycleResult<Money> {
        expense.validate()?;
        Ok(match expense.cost {
            CycleExpenseCost::Fixed { amount } => amount,
            CycleExpenseCost::PercentOfRevenue { percent } => projected_revenue.scale(percent / 100.0),
            CycleExpenseCost::Hourly {
                instructor_id,
                rate_kind,
                hours,
            } => self
                .rates
                .cost(Self::instructor(instructors, instructor_id)?, rate_kind, hours),
        })
    }

    pub fn cycle_expense_total(
        &self,
        expenses: &[CycleExpense],
        projected_revenue: Money,
        instructors: &HashMap<InstructorId, Instructor>,
    ) -> CycleResult<Money> {
        expenses
            .iter()
            .map(|e| self.resolve_cycle_expense(e, projected_revenue, instructors))
            .sum()
    }

    /// Per-meeting share of the cycle expense total; zero for a cycle without meetings
    pub fn cycle_expense_share(&self, total: Money, total_meetings: u32) -> Money {
        total.split(total_meetings)
    }

    /// Amount of one meeting expense
    ///
    /// Extra instructor hours are rounded to whole currency units.
    pub fn resolve_meeting_expense(
        &self,
        expense: &MeetingExpense,
        instructors: &HashMap<InstructorId, Instructor>,
    ) -> CycleResult<Money> {
        expense.validate()?;
        Ok(match expense.cost {
            MeetingExpenseCost::Amount { amount } => amount,
            MeetingExpenseCost::ExtraInstructor {
                instructor_id,
                rate_kind,
                hours,
            } => self
                .rates
                .cost(Self::instructor(instructors, instructor_id)?, rate_kind, hours)
                .round_to_units(),
        })
    }

    /// Sum of all meeting expenses that are not rejected
    pub fn meeting_expense_total(
        &self,
        expenses: &[MeetingExpense],
        instructors: &HashMap<InstructorId, Instructor>,
    ) -> CycleResult<Money> {
        expenses
            .iter()
            .filter(|e| e.counts())
            .map(|e| self.resolve_meeting_expense(e, instructors))
            .sum()
    }

    pub fn adjusted_profit(&self, profit: Money, cycle_share: Money, meeting_expenses: Money) -> Money {
        profit - cycle_share - meeting_expenses
    }
}

/// Read-time financial view of one meeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MeetingBreakdown {
    pub meeting_id: MeetingId,
    pub revenue: Money,
    pub instructor_payment: Money,
    pub profit: Money,
    pub cycle_expense_share: Money,
    pub meeting_expenses: Money,
    pub adjusted_profit: Money,
}

/// Service for expense management and attribution
pub struct ExpenseService<'a> {
    storage: &'a Storage,
    attributor: ExpenseAttributor,
    calculator: MeetingFinancialCalculator,
    settings: Settings,
}

impl<'a> ExpenseService<'a> {
    pub fn new(storage: &'a Storage, settings: &Settings) -> Self {
        Self {
            storage,
            attributor: ExpenseAttributor::new(RateResolver::from_settings(settings)),
            calculator: MeetingFinancialCalculator::from_settings(settings),
            settings: settings.clone(),
        }
    }

    pub fn attributor(&self) -> &ExpenseAttributor {
        &self.attributor
    }

    /// Record a cycle-level expense
    pub fn add_cycle_expense(&self, expense: CycleExpense) -> CycleResult<CycleExpense> {
        expense.validate()?;
        self.storage
            .cycles
            .get(expense.cycle_id)?
            .ok_or_else(|| CycleError::cycle_not_found(expense.cycle_id.to_string()))?;
        if let CycleExpenseCost::Hourly { instructor_id, .. } = expense.cost {
            self.storage.instructors.require(instructor_id)?;
        }

        self.storage.expenses.upsert_cycle_expense(expense.clone())?;
        self.storage.expenses.save()?;
        Ok(expense)
    }

    /// Record a meeting-level expense, pending review
    pub fn add_meeting_expense(&self, expense: MeetingExpense) -> CycleResult<MeetingExpense> {
        expense.validate()?;
        self.storage
            .meetings
            .get(expense.meeting_id)?
            .ok_or_else(|| CycleError::meeting_not_found(expense.meeting_id.to_string()))?;
        if let MeetingExpenseCost::ExtraInstructor { instructor_id, .. } = expense.cost {
            self.storage.instructors.require(instructor_id)?;
        }

        self.storage.expenses.upsert_meeting_expense(expense.clone())?;
        self.storage.expenses.save()?;
        Ok(expense)
    }

    fn meeting_expense(&self, id: ExpenseId) -> CycleResult<MeetingExpense> {
        self.storage
            .expenses
            .get_meeting_expense(id)?
            .ok_or_else(|| CycleError::expense_not_found(id.to_string()))
    }

    pub fn approve(&self, id: ExpenseId, actor: &Actor) -> CycleResult<MeetingExpense> {
        actor.require_reviewer("approve")?;
        let mut expense = self.meeting_expense(id)?;
        expense.approve(&actor.name)?;

        self.storage.expenses.upsert_meeting_expense(expense.clone())?;
        self.storage.expenses.save()?;
        info!(expense = %id, reviewer = %actor.name, "expense approved");
        Ok(expense)
    }

    pub fn reject(&self, id: ExpenseId, actor: &Actor, reason: &str) -> CycleResult<MeetingExpense> {
        actor.require_reviewer("reject")?;
        let mut expense = self.meeting_expense(id)?;
        expense.reject(&actor.name, reason)?;

        self.storage.expenses.upsert_meeting_expense(expense.clone())?;
        self.storage.expenses.save()?;
        info!(expense = %id, reviewer = %actor.name, reason, "expense rejected");
        Ok(expense)
    }

    /// Delete a meeting or cycle expense, whatever its status
    pub fn delete(&self, id: ExpenseId, actor: &Actor) -> CycleResult<()> {
        actor.require_reviewer("delete")?;
        let removed = self.storage.expenses.delete_meeting_expense(id)?.is_some()
            || self.storage.expenses.delete_cycle_expense(id)?.is_some();
        if !removed {
            return Err(CycleError::expense_not_found(id.to_string()));
        }

        self.storage.expenses.save()?;
        info!(expense = %id, actor = %actor.name, "expense deleted");
        Ok(())
    }

    /// Per-meeting share of a cycle's expenses
    pub fn cycle_expense_share(
        &self,
        cycle: &Cycle,
        instructors: &HashMap<InstructorId, Instructor>,
    ) -> CycleResult<Money> {
        let registrations = self.storage.registrations.get_by_cycle(cycle.id)?;
        let per_meeting = self.calculator.meeting_revenue(cycle, &registrations);
        let projected = per_meeting.scale(f64::from(cycle.total_meetings));
        let expenses = self.storage.expenses.cycle_expenses_for(cycle.id)?;

        let total = self
            .attributor
            .cycle_expense_total(&expenses, projected, instructors)?;
        Ok(self.attributor.cycle_expense_share(total, cycle.total_meetings))
    }

    /// Cycle expense shares for several cycles, computed once each
    pub fn cycle_expense_shares(
        &self,
        cycles: &[Cycle],
        instructors: &HashMap<InstructorId, Instructor>,
    ) -> CycleResult<HashMap<CycleId, Money>> {
        cycles
            .iter()
            .map(|c| Ok((c.id, self.cycle_expense_share(c, instructors)?)))
            .collect()
    }

    pub fn meeting_expense_total(
        &self,
        meeting_id: MeetingId,
        instructors: &HashMap<InstructorId, Instructor>,
    ) -> CycleResult<Money> {
        let expenses = self.storage.expenses.meeting_expenses_for(meeting_id)?;
        self.attributor.meeting_expense_total(&expenses, instructors)
    }

    /// Full financial view of a completed meeting
    pub fn meeting_breakdown(&self, meeting_id: MeetingId) -> CycleResult<MeetingBreakdown> {
        let meeting = self
            .storage
            .meetings
            .get(meeting_id)?
            .ok_or_else(|| CycleError::meeting_not_found(meeting_id.to_string()))?;
        let cycle = self
            .storage
            .cycles
            .get(meeting.cycle_id)?
            .ok_or_else(|| CycleError::cycle_not_found(meeting.cycle_id.to_string()))?;
        let instructors = self.storage.instructors.as_map()?;

        let financials = FinancialService::new(self.storage, &self.settings).effective(&meeting)?;
        let cycle_share = self.cycle_expense_share(&cycle, &instructors)?;
        let meeting_expenses = self.meeting_expense_total(meeting_id, &instructors)?;

        Ok(MeetingBreakdown {
            meeting_id,
            revenue: financials.revenue,
            instructor_payment: financials.instructor_payment,
            profit: financials.profit,
            cycle_expense_share: cycle_share,
            meeting_expenses,
            adjusted_profit: self
                .attributor
                .adjusted_profit(financials.profit, cycle_share, meeting_expenses),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::LedgerPaths;
    use crate::models::{
        ActivityType, Billing, CycleExpenseType, EmploymentType, ExpenseStatus, Meeting,
        MeetingExpenseType, MeetingStatus, RateCard, RateKind,
    };
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn employee() -> Instructor {
        Instructor::new(
            "Lior",
            RateCard::new(
                Money::from_units(100),
                Money::from_units(90),
                Money::from_units(120),
            ),
            EmploymentType::Employee,
        )
    }

    fn instructor_map(instructor: &Instructor) -> HashMap<InstructorId, Instructor> {
        HashMap::from([(instructor.id, instructor.clone())])
    }

    fn extra_instructor(instructor_id: InstructorId, hours: f64) -> MeetingExpense {
        MeetingExpense::new(
            MeetingId::new(),
            MeetingExpenseType::ExtraInstructor,
            MeetingExpenseCost::ExtraInstructor {
                instructor_id,
                rate_kind: RateKind::Frontal,
                hours,
            },
        )
    }

    #[test]
    fn test_extra_instructor_formula() {
        let instructor = employee();
        let attributor = ExpenseAttributor::default();
        let amount = attributor
            .resolve_meeting_expense(&extra_instructor(instructor.id, 1.5), &instructor_map(&instructor))
            .unwrap();
        assert_eq!(amount, Money::from_units(195));
    }

    #[test]
    fn test_extra_instructor_rounds_to_whole_units() {
        let instructor = employee();
        let attributor = ExpenseAttributor::default();
        // 100 × 1.3 × 1.25 = 162.5 -> 163
        let amount = attributor
            .resolve_meeting_expense(&extra_instructor(instructor.id, 1.25), &instructor_map(&instructor))
            .unwrap();
        assert_eq!(amount, Money::from_units(163));
    }

    #[test]
    fn test_unknown_extra_instructor_is_not_found() {
        let attributor = ExpenseAttributor::default();
        let err = attributor
            .resolve_meeting_expense(&extra_instructor(InstructorId::new(), 1.0), &HashMap::new())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_rejected_expenses_do_not_count() {
        let attributor = ExpenseAttributor::default();
        let meeting_id = MeetingId::new();
        let taxi = |units| {
            MeetingExpense::new(
                meeting_id,
                MeetingExpenseType::Taxi,
                MeetingExpenseCost::Amount {
                    amount: Money::from_units(units),
                },
            )
        };
        let mut rejected = taxi(70);
        rejected.reject("admin", "no receipt").unwrap();
        let mut approved = taxi(30);
        approved.approve("admin").unwrap();
        let expenses = vec![taxi(20), approved, rejected];

        assert_eq!(
            attributor.meeting_expense_total(&expenses, &HashMap::new()).unwrap(),
            Money::from_units(50)
        );
    }

    #[test]
    fn test_cycle_expense_resolution() {
        let instructor = employee();
        let instructors = instructor_map(&instructor);
        let attributor = ExpenseAttributor::default();
        let cycle_id = CycleId::new();
        let expenses = vec![
            CycleExpense::new(
                cycle_id,
                CycleExpenseType::Equipment,
                CycleExpenseCost::Fixed {
                    amount: Money::from_units(300),
                },
            ),
            CycleExpense::new(
                cycle_id,
                CycleExpenseType::Materials,
                CycleExpenseCost::PercentOfRevenue { percent: 10.0 },
            ),
            CycleExpense::new(
                cycle_id,
                CycleExpenseType::AdditionalInstructor,
                CycleExpenseCost::Hourly {
                    instructor_id: instructor.id,
                    rate_kind: RateKind::Online,
                    hours: 2.0,
                },
            ),
        ];

        // 300 + 10% of 5000 + 90 × 1.3 × 2
        let total = attributor
            .cycle_expense_total(&expenses, Money::from_units(5000), &instructors)
            .unwrap();
        assert_eq!(total, Money::from_units(1034));
        assert_eq!(attributor.cycle_expense_share(total, 10), Money::from_cents(10340));
        assert_eq!(attributor.cycle_expense_share(total, 0), Money::zero());
    }

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn seed_meeting(storage: &Storage) -> (Meeting, Instructor) {
        let instructor = employee();
        let cycle = Cycle::new(
            "Coding",
            Billing::InstitutionalFixed {
                meeting_revenue: Money::from_units(600),
            },
            ActivityType::Frontal,
            4,
        );
        let mut meeting = Meeting::new(
            cycle.id,
            instructor.id,
            NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
            60,
        );
        meeting.status = MeetingStatus::Completed;

        storage.instructors.upsert(instructor.clone()).unwrap();
        storage
            .expenses
            .upsert_cycle_expense(CycleExpense::new(
                cycle.id,
                CycleExpenseType::Equipment,
                CycleExpenseCost::Fixed {
                    amount: Money::from_units(400),
                },
            ))
            .unwrap();
        storage.cycles.upsert(cycle).unwrap();
        storage.meetings.upsert(meeting.clone()).unwrap();
        (meeting, instructor)
    }

    #[test]
    fn test_meeting_breakdown() {
        let (_dir, storage) = create_test_storage();
        let (meeting, _) = seed_meeting(&storage);
        let service = ExpenseService::new(&storage, &Settings::default());
        service
            .add_meeting_expense(MeetingExpense::new(
                meeting.id,
                MeetingExpenseType::Travel,
                MeetingExpenseCost::Amount {
                    amount: Money::from_units(45),
                },
            ))
            .unwrap();

        let breakdown = service.meeting_breakdown(meeting.id).unwrap();
        assert_eq!(breakdown.revenue, Money::from_units(600));
        assert_eq!(breakdown.instructor_payment, Money::from_units(130));
        assert_eq!(breakdown.profit, Money::from_units(470));
        assert_eq!(breakdown.cycle_expense_share, Money::from_units(100));
        assert_eq!(breakdown.meeting_expenses, Money::from_units(45));
        assert_eq!(breakdown.adjusted_profit, Money::from_units(325));

        // Stored meeting row is untouched by attribution
        assert!(storage.meetings.get(meeting.id).unwrap().unwrap().financials.is_none());
    }

    #[test]
    fn test_review_requires_authorized_role() {
        let (_dir, storage) = create_test_storage();
        let (meeting, _) = seed_meeting(&storage);
        let service = ExpenseService::new(&storage, &Settings::default());
        let expense = service
            .add_meeting_expense(MeetingExpense::new(
                meeting.id,
                MeetingExpenseType::Taxi,
                MeetingExpenseCost::Amount {
                    amount: Money::from_units(80),
                },
            ))
            .unwrap();

        let instructor = Actor::new("lior", Role::Instructor);
        assert!(matches!(
            service.approve(expense.id, &instructor),
            Err(CycleError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete(expense.id, &instructor),
            Err(CycleError::Forbidden(_))
        ));

        let coordinator = Actor::new("maya", Role::Coordinator);
        let rejected = service.reject(expense.id, &coordinator, "not approved in advance").unwrap();
        assert_eq!(rejected.status, ExpenseStatus::Rejected);
        assert_eq!(rejected.reviewed_by.as_deref(), Some("maya"));

        // Deletion is allowed from any status
        service.delete(expense.id, &coordinator).unwrap();
        assert!(service.delete(expense.id, &coordinator).unwrap_err().is_not_found());
    }

    #[test]
    fn test_extra_instructor_needs_known_instructor() {
        let (_dir, storage) = create_test_storage();
        let (meeting, _) = seed_meeting(&storage);
        let service = ExpenseService::new(&storage, &Settings::default());

        let mut expense = extra_instructor(InstructorId::new(), 1.0);
        expense.meeting_id = meeting.id;
        assert!(service.add_meeting_expense(expense).unwrap_err().is_not_found());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("parent".parse::<Role>().is_err());
    }
}
