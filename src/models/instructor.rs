//! Instructor model
//!
//! An instructor carries a rate card (hourly base rate per kind of work) and
//! an employment type. Contact fields are kept for the messaging layer, which
//! lives outside this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::cycle::ActivityType;
use super::ids::InstructorId;
use super::money::Money;
use crate::error::CycleError;

/// Kind of work an hourly rate applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateKind {
    /// In-person group teaching
    Frontal,
    /// Remote group teaching
    Online,
    /// Preparation work and private lessons share one rate
    #[serde(alias = "private_lesson")]
    Preparation,
}

impl RateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Frontal => "frontal",
            Self::Online => "online",
            Self::Preparation => "preparation",
        }
    }
}

impl From<ActivityType> for RateKind {
    fn from(activity: ActivityType) -> Self {
        match activity {
            ActivityType::Frontal => Self::Frontal,
            ActivityType::Online => Self::Online,
            ActivityType::PrivateLesson => Self::Preparation,
        }
    }
}

impl fmt::Display for RateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateKind {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "frontal" => Ok(Self::Frontal),
            "online" => Ok(Self::Online),
            "preparation" | "private_lesson" | "private" => Ok(Self::Preparation),
            other => Err(CycleError::Validation(format!("Unknown rate kind: '{}'", other))),
        }
    }
}

/// Employment relationship, which determines the cost multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    #[default]
    Freelancer,
    /// Employer-side costs apply on top of the base rate
    Employee,
}

impl fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Freelancer => write!(f, "freelancer"),
            Self::Employee => write!(f, "employee"),
        }
    }
}

/// Base hourly rates by kind of work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateCard {
    #[serde(default)]
    pub frontal: Money,
    #[serde(default)]
    pub online: Money,
    /// Rate for preparation hours and private lessons
    #[serde(default, alias = "private_lesson")]
    pub preparation: Money,
}

impl RateCard {
    pub fn new(frontal: Money, online: Money, preparation: Money) -> Self {
        Self {
            frontal,
            online,
            preparation,
        }
    }

    /// Base rate for a kind of work
    pub fn base_rate(&self, kind: RateKind) -> Money {
        match kind {
            RateKind::Frontal => self.frontal,
            RateKind::Online => self.online,
            RateKind::Preparation => self.preparation,
        }
    }
}

/// An instructor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instructor {
    pub id: InstructorId,

    pub name: String,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub rates: RateCard,

    #[serde(default)]
    pub employment_type: EmploymentType,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Instructor {
    pub fn new(name: impl Into<String>, rates: RateCard, employment_type: EmploymentType) -> Self {
        Self {
            id: InstructorId::new(),
            name: name.into(),
            phone: None,
            email: None,
            rates,
            employment_type,
            created_at: Utc::now(),
        }
    }

    /// Validate the instructor
    pub fn validate(&self) -> Result<(), CycleError> {
        if self.name.trim().is_empty() {
            return Err(CycleError::Validation("Instructor name cannot be empty".into()));
        }
        let rates = [self.rates.frontal, self.rates.online, self.rates.preparation];
        if rates.iter().any(|r| r.is_negative()) {
            return Err(CycleError::Validation(format!(
                "Instructor '{}' has a negative rate",
                self.name
            )));
        }
        Ok(())
    }
}
