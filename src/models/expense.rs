//! Expense models
//!
//! Cycle expenses apply to the whole cycle and are attributed to meetings at
//! read time. Meeting expenses belong to one meeting and go through an
//! approval workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::{CycleId, ExpenseId, InstructorId, MeetingId};
use super::instructor::RateKind;
use super::money::Money;
use crate::error::CycleError;

/// Category of a cycle-level expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleExpenseType {
    Materials,
    WraparoundHours,
    Equipment,
    TravelFixed,
    AdditionalInstructor,
    Other,
}

impl fmt::Display for CycleExpenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Materials => "materials",
            Self::WraparoundHours => "wraparound_hours",
            Self::Equipment => "equipment",
            Self::TravelFixed => "travel_fixed",
            Self::AdditionalInstructor => "additional_instructor",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

impl FromStr for CycleExpenseType {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "materials" => Ok(Self::Materials),
            "wraparound_hours" => Ok(Self::WraparoundHours),
            "equipment" => Ok(Self::Equipment),
            "travel_fixed" => Ok(Self::TravelFixed),
            "additional_instructor" => Ok(Self::AdditionalInstructor),
            "other" => Ok(Self::Other),
            other => Err(CycleError::Validation(format!(
                "Unknown cycle expense type: '{}'",
                other
            ))),
        }
    }
}

/// How a cycle expense amount is derived
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum CycleExpenseCost {
    Fixed {
        amount: Money,
    },
    /// Percentage (0-100) of the cycle's projected revenue
    PercentOfRevenue {
        percent: f64,
    },
    /// Hours of a specific instructor's time at a resolved rate
    Hourly {
        instructor_id: InstructorId,
        rate_kind: RateKind,
        hours: f64,
    },
}

/// An expense recorded against a whole cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleExpense {
    pub id: ExpenseId,

    pub cycle_id: CycleId,

    pub expense_type: CycleExpenseType,

    pub cost: CycleExpenseCost,

    #[serde(default)]
    pub description: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl CycleExpense {
    pub fn new(cycle_id: CycleId, expense_type: CycleExpenseType, cost: CycleExpenseCost) -> Self {
        Self {
            id: ExpenseId::new(),
            cycle_id,
            expense_type,
            cost,
            description: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Check that the cost shape matches the expense type
    pub fn validate(&self) -> Result<(), CycleError> {
        match (self.expense_type, &self.cost) {
            (CycleExpenseType::AdditionalInstructor, CycleExpenseCost::Hourly { hours, .. }) => {
                validate_hours(*hours)
            }
            (CycleExpenseType::AdditionalInstructor, _) => Err(CycleError::Validation(
                "additional_instructor expenses need an instructor, rate kind and hours".into(),
            )),
            (_, CycleExpenseCost::Hourly { .. }) => Err(CycleError::Validation(format!(
                "{} expenses cannot be billed hourly",
                self.expense_type
            ))),
            (_, CycleExpenseCost::Fixed { amount }) if amount.is_negative() => Err(
                CycleError::Validation("Expense amount cannot be negative".into()),
            ),
            (_, CycleExpenseCost::PercentOfRevenue { percent })
                if !percent.is_finite() || !(0.0..=100.0).contains(percent) =>
            {
                Err(CycleError::Validation(format!(
                    "Expense percentage must be between 0 and 100, got {}",
                    percent
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Category of a meeting-level expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingExpenseType {
    Travel,
    Taxi,
    ExtraInstructor,
    Materials,
    Other,
}

impl fmt::Display for MeetingExpenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Travel => "travel",
            Self::Taxi => "taxi",
            Self::ExtraInstructor => "extra_instructor",
            Self::Materials => "materials",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

impl FromStr for MeetingExpenseType {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "travel" => Ok(Self::Travel),
            "taxi" => Ok(Self::Taxi),
            "extra_instructor" => Ok(Self::ExtraInstructor),
            "materials" => Ok(Self::Materials),
            "other" => Ok(Self::Other),
            other => Err(CycleError::Validation(format!(
                "Unknown meeting expense type: '{}'",
                other
            ))),
        }
    }
}

/// How a meeting expense amount is derived
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum MeetingExpenseCost {
    Amount {
        amount: Money,
    },
    ExtraInstructor {
        instructor_id: InstructorId,
        rate_kind: RateKind,
        hours: f64,
    },
}

/// Review state of a meeting expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for ExpenseStatus {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(CycleError::Validation(format!(
                "Unknown expense status: '{}'",
                other
            ))),
        }
    }
}

/// An expense recorded against one meeting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingExpense {
    pub id: ExpenseId,

    pub meeting_id: MeetingId,

    pub expense_type: MeetingExpenseType,

    pub cost: MeetingExpenseCost,

    #[serde(default)]
    pub status: ExpenseStatus,

    #[serde(default)]
    pub rejection_reason: Option<String>,

    #[serde(default)]
    pub reviewed_by: Option<String>,

    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub description: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl MeetingExpense {
    /// Create a pending expense
    pub fn new(meeting_id: MeetingId, expense_type: MeetingExpenseType, cost: MeetingExpenseCost) -> Self {
        Self {
            id: ExpenseId::new(),
            meeting_id,
            expense_type,
            cost,
            status: ExpenseStatus::Pending,
            rejection_reason: None,
            reviewed_by: None,
            reviewed_at: None,
            description: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Whether the expense counts toward totals
    pub fn counts(&self) -> bool {
        self.status != ExpenseStatus::Rejected
    }

    pub fn approve(&mut self, reviewer: &str) -> Result<(), CycleError> {
        self.ensure_pending()?;
        self.status = ExpenseStatus::Approved;
        self.reviewed_by = Some(reviewer.to_string());
        self.reviewed_at = Some(Utc::now());
        Ok(())
    }

    pub fn reject(&mut self, reviewer: &str, reason: &str) -> Result<(), CycleError> {
        self.ensure_pending()?;
        if reason.trim().is_empty() {
            return Err(CycleError::Validation("A rejection reason is required".into()));
        }
        self.status = ExpenseStatus::Rejected;
        self.rejection_reason = Some(reason.trim().to_string());
        self.reviewed_by = Some(reviewer.to_string());
        self.reviewed_at = Some(Utc::now());
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), CycleError> {
        if self.status != ExpenseStatus::Pending {
            return Err(CycleError::Validation(format!(
                "Expense {} is already {}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    /// Check that the cost shape matches the expense type
    pub fn validate(&self) -> Result<(), CycleError> {
        match (self.expense_type, &self.cost) {
            (MeetingExpenseType::ExtraInstructor, MeetingExpenseCost::ExtraInstructor { hours, .. }) => {
                validate_hours(*hours)
            }
            (MeetingExpenseType::ExtraInstructor, MeetingExpenseCost::Amount { .. }) => {
                Err(CycleError::Validation(
                    "extra_instructor expenses need an instructor, rate kind and hours".into(),
                ))
            }
            (_, MeetingExpenseCost::ExtraInstructor { .. }) => Err(CycleError::Validation(format!(
                "{} expenses need an explicit amount",
                self.expense_type
            ))),
            (_, MeetingExpenseCost::Amount { amount }) if amount.is_negative() => Err(
                CycleError::Validation("Expense amount cannot be negative".into()),
            ),
            _ => Ok(()),
        }
    }
}

fn validate_hours(hours: f64) -> Result<(), CycleError> {
    if hours.is_finite() && hours > 0.0 {
        Ok(())
    } else {
        Err(CycleError::Validation(format!(
            "Hours must be a positive number, got {}",
            hours
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extra_instructor(hours: f64) -> MeetingExpenseCost {
        MeetingExpenseCost::ExtraInstructor {
            instructor_id: InstructorId::new(),
            rate_kind: RateKind::Frontal,
            hours,
        }
    }

    #[test]
    fn test_meeting_expense_shape_validation() {
        let ok = MeetingExpense::new(
            MeetingId::new(),
            MeetingExpenseType::ExtraInstructor,
            extra_instructor(1.5),
        );
        assert!(ok.validate().is_ok());

        let missing_instructor = MeetingExpense::new(
            MeetingId::new(),
            MeetingExpenseType::ExtraInstructor,
            MeetingExpenseCost::Amount {
                amount: Money::from_units(50),
            },
        );
        assert!(missing_instructor.validate().unwrap_err().is_validation());

        let taxi_with_hours =
            MeetingExpense::new(MeetingId::new(), MeetingExpenseType::Taxi, extra_instructor(1.0));
        assert!(taxi_with_hours.validate().is_err());

        let zero_hours = MeetingExpense::new(
            MeetingId::new(),
            MeetingExpenseType::ExtraInstructor,
            extra_instructor(0.0),
        );
        assert!(zero_hours.validate().is_err());
    }

    #[test]
    fn test_cycle_expense_shape_validation() {
        let cycle_id = CycleId::new();
        let percent = CycleExpense::new(
            cycle_id,
            CycleExpenseType::Materials,
            CycleExpenseCost::PercentOfRevenue { percent: 10.0 },
        );
        assert!(percent.validate().is_ok());

        let too_much = CycleExpense::new(
            cycle_id,
            CycleExpenseType::Materials,
            CycleExpenseCost::PercentOfRevenue { percent: 150.0 },
        );
        assert!(too_much.validate().is_err());

        let flat_instructor = CycleExpense::new(
            cycle_id,
            CycleExpenseType::AdditionalInstructor,
            CycleExpenseCost::Fixed {
                amount: Money::from_units(300),
            },
        );
        assert!(flat_instructor.validate().is_err());
    }

    #[test]
    fn test_approval_workflow() {
        let mut expense = MeetingExpense::new(
            MeetingId::new(),
            MeetingExpenseType::Taxi,
            MeetingExpenseCost::Amount {
                amount: Money::from_units(60),
            },
        );
        assert!(expense.counts());

        expense.approve("noa").unwrap();
        assert_eq!(expense.status, ExpenseStatus::Approved);
        assert_eq!(expense.reviewed_by.as_deref(), Some("noa"));

        // Already reviewed
        assert!(expense.reject("noa", "duplicate").is_err());
    }

    #[test]
    fn test_rejection_excludes_from_totals() {
        let mut expense = MeetingExpense::new(
            MeetingId::new(),
            MeetingExpenseType::Travel,
            MeetingExpenseCost::Amount {
                amount: Money::from_units(40),
            },
        );
        assert!(expense.reject("noa", "  ").is_err());

        expense.reject("noa", "no receipt").unwrap();
        assert!(!expense.counts());
        assert_eq!(expense.rejection_reason.as_deref(), Some("no receipt"));
    }
}
