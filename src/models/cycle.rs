//! Cycle model
//!
//! A cycle is a recurring course series: a fixed number of meetings, one
//! billing model, and derived progress counters. The counters are only ever
//! written from a full recount of the cycle's meetings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::{CustomerId, CycleId, InstructorId};
use super::money::Money;
use crate::error::CycleError;

/// How a cycle is billed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Billing {
    /// Each registration carries its own agreed amount
    Private,
    /// An institution pays a price per participating child
    InstitutionalPerChild {
        price_per_student: Money,
        student_count: u32,
    },
    /// An institution pays a fixed amount per meeting
    InstitutionalFixed { meeting_revenue: Money },
}

impl Billing {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::InstitutionalPerChild { .. } => "institutional_per_child",
            Self::InstitutionalFixed { .. } => "institutional_fixed",
        }
    }

    fn validate(&self) -> Result<(), CycleError> {
        match self {
            Self::Private => Ok(()),
            Self::InstitutionalPerChild {
                price_per_student, ..
            } if price_per_student.is_negative() => Err(CycleError::Validation(
                "price_per_student cannot be negative".into(),
            )),
            Self::InstitutionalFixed { meeting_revenue } if meeting_revenue.is_negative() => Err(
                CycleError::Validation("meeting_revenue cannot be negative".into()),
            ),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Billing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Delivery format of a cycle's meetings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    #[default]
    Frontal,
    Online,
    PrivateLesson,
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frontal => write!(f, "frontal"),
            Self::Online => write!(f, "online"),
            Self::PrivateLesson => write!(f, "private_lesson"),
        }
    }
}

impl FromStr for ActivityType {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "frontal" => Ok(Self::Frontal),
            "online" => Ok(Self::Online),
            "private_lesson" | "private" => Ok(Self::PrivateLesson),
            other => Err(CycleError::Validation(format!("Unknown activity type: '{}'", other))),
        }
    }
}

/// Lifecycle state of a cycle. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    #[default]
    Active,
    Completed,
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for CycleStatus {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(CycleError::Validation(format!("Unknown cycle status: '{}'", other))),
        }
    }
}

/// Result of recounting a cycle's meetings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleProgress {
    pub completed_meetings: u32,
    pub remaining_meetings: u32,
    pub total_meetings: u32,
    /// Number of meeting rows stored for the cycle, whatever their status
    pub meetings_in_table: u32,
}

/// A recurring course cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cycle {
    pub id: CycleId,

    pub name: String,

    /// Customer the cycle is sold to (institution or family)
    #[serde(default)]
    pub customer_id: Option<CustomerId>,

    /// Default instructor for newly scheduled meetings
    #[serde(default)]
    pub instructor_id: Option<InstructorId>,

    pub billing: Billing,

    #[serde(default)]
    pub activity_type: ActivityType,

    /// Planned number of meetings; changed only by an explicit edit
    pub total_meetings: u32,

    #[serde(default)]
    pub completed_meetings: u32,

    #[serde(default)]
    pub remaining_meetings: u32,

    #[serde(default)]
    pub status: CycleStatus,

    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Cycle {
    /// Create a new active cycle with no completed meetings
    pub fn new(
        name: impl Into<String>,
        billing: Billing,
        activity_type: ActivityType,
        total_meetings: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CycleId::new(),
            name: name.into(),
            customer_id: None,
            instructor_id: None,
            billing,
            activity_type,
            total_meetings,
            completed_meetings: 0,
            remaining_meetings: total_meetings,
            status: CycleStatus::Active,
            start_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == CycleStatus::Active
    }

    /// Write the counters from a recount of completed meetings
    ///
    /// The completed count is capped at `total_meetings` so the counters
    /// always add up to the total.
    pub fn apply_completed_count(&mut self, completed: u32) {
        let completed = completed.min(self.total_meetings);
        self.completed_meetings = completed;
        self.remaining_meetings = self.total_meetings - completed;
        self.updated_at = Utc::now();
    }

    /// Explicitly change the planned number of meetings
    pub fn set_total_meetings(&mut self, total: u32) -> Result<(), CycleError> {
        if total < self.completed_meetings {
            return Err(CycleError::Validation(format!(
                "Cannot set total meetings to {}: {} meetings are already completed",
                total, self.completed_meetings
            )));
        }
        self.total_meetings = total;
        self.remaining_meetings = total - self.completed_meetings;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn progress(&self, meetings_in_table: u32) -> CycleProgress {
        CycleProgress {
            completed_meetings: self.completed_meetings,
            remaining_meetings: self.remaining_meetings,
            total_meetings: self.total_meetings,
            meetings_in_table,
        }
    }

    /// Validate the cycle
    pub fn validate(&self) -> Result<(), CycleError> {
        if self.name.trim().is_empty() {
            return Err(CycleError::Validation("Cycle name cannot be empty".into()));
        }
        if self.total_meetings == 0 {
            return Err(CycleError::Validation(
                "A cycle needs at least one meeting".into(),
            ));
        }
        self.billing.validate()
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}/{} meetings, {})",
            self.name, self.billing, self.completed_meetings, self.total_meetings, self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_cycle(total: u32) -> Cycle {
        Cycle::new(
            "Robotics",
            Billing::InstitutionalFixed {
                meeting_revenue: Money::from_units(500),
            },
            ActivityType::Frontal,
            total,
        )
    }

    #[test]
    fn test_new_cycle_counters() {
        let cycle = fixed_cycle(8);
        assert!(cycle.is_active());
        assert_eq!(cycle.completed_meetings, 0);
        assert_eq!(cycle.remaining_meetings, 8);
    }

    #[test]
    fn test_apply_completed_count_caps_at_total() {
        let mut cycle = fixed_cycle(3);
        cycle.apply_completed_count(1);
        assert_eq!((cycle.completed_meetings, cycle.remaining_meetings), (1, 2));

        cycle.apply_completed_count(5);
        assert_eq!((cycle.completed_meetings, cycle.remaining_meetings), (3, 0));
    }

    #[test]
    fn test_set_total_below_completed_rejected() {
        let mut cycle = fixed_cycle(4);
        cycle.apply_completed_count(3);
        assert!(cycle.set_total_meetings(2).is_err());

        cycle.set_total_meetings(6).unwrap();
        assert_eq!(cycle.remaining_meetings, 3);
    }

    #[test]
    fn test_billing_serialization_is_tagged() {
        let billing = Billing::InstitutionalPerChild {
            price_per_student: Money::from_units(40),
            student_count: 12,
        };
        let json = serde_json::to_value(billing).unwrap();
        assert_eq!(json["type"], "institutional_per_child");
        assert_eq!(json["student_count"], 12);
    }

    #[test]
    fn test_validate() {
        assert!(fixed_cycle(0).validate().is_err());
        assert!(fixed_cycle(2).validate().is_ok());
    }
}
