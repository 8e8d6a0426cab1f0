//! Meeting model
//!
//! One scheduled occurrence within a cycle. Financial figures are stored on
//! the meeting once it has been completed (or explicitly recalculated).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::{CycleId, InstructorId, MeetingId};
use super::money::Money;
use crate::error::CycleError;

/// Status of a meeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
    Postponed,
}

impl MeetingStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Postponed => write!(f, "postponed"),
        }
    }
}

impl FromStr for MeetingStatus {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "completed" | "done" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "postponed" => Ok(Self::Postponed),
            other => Err(CycleError::Validation(format!(
                "Unknown meeting status: '{}'",
                other
            ))),
        }
    }
}

/// Stored financial figures of a completed meeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingFinancials {
    pub revenue: Money,
    pub instructor_payment: Money,
    /// Revenue minus instructor payment; expenses are applied at read time
    pub profit: Money,
}

impl MeetingFinancials {
    pub fn new(revenue: Money, instructor_payment: Money) -> Self {
        Self {
            revenue,
            instructor_payment,
            profit: revenue - instructor_payment,
        }
    }
}

/// A single meeting of a cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,

    pub cycle_id: CycleId,

    pub instructor_id: InstructorId,

    pub scheduled_date: NaiveDate,

    pub duration_minutes: u32,

    #[serde(default)]
    pub status: MeetingStatus,

    /// Set on completion or explicit recalculation
    #[serde(default)]
    pub financials: Option<MeetingFinancials>,

    #[serde(default)]
    pub notes: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    /// Create a new scheduled meeting
    pub fn new(
        cycle_id: CycleId,
        instructor_id: InstructorId,
        scheduled_date: NaiveDate,
        duration_minutes: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: MeetingId::new(),
            cycle_id,
            instructor_id,
            scheduled_date,
            duration_minutes,
            status: MeetingStatus::Scheduled,
            financials: None,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn duration_hours(&self) -> f64 {
        f64::from(self.duration_minutes) / 60.0
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    pub fn set_status(&mut self, status: MeetingStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn set_financials(&mut self, financials: MeetingFinancials) {
        self.financials = Some(financials);
        self.updated_at = Utc::now();
    }

    /// Validate the meeting
    pub fn validate(&self) -> Result<(), CycleError> {
        if self.duration_minutes == 0 {
            return Err(CycleError::Validation(
                "Meeting duration must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Meeting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} min, {})",
            self.id, self.scheduled_date, self.duration_minutes, self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_meeting_is_scheduled() {
        let meeting = Meeting::new(
            CycleId::new(),
            InstructorId::new(),
            NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
            90,
        );
        assert_eq!(meeting.status, MeetingStatus::Scheduled);
        assert!(meeting.financials.is_none());
        assert_eq!(meeting.duration_hours(), 1.5);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Completed".parse::<MeetingStatus>().unwrap(), MeetingStatus::Completed);
        assert_eq!("canceled".parse::<MeetingStatus>().unwrap(), MeetingStatus::Cancelled);
        assert!("finished-ish".parse::<MeetingStatus>().unwrap_err().is_validation());
    }

    #[test]
    fn test_financials_profit() {
        let f = MeetingFinancials::new(Money::from_units(500), Money::from_units(130));
        assert_eq!(f.profit, Money::from_units(370));
    }
}
