//! Registration model
//!
//! A student's enrollment in a cycle, with the agreed billing amount.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{CustomerId, CycleId, RegistrationId, StudentId};
use super::money::Money;
use crate::error::CycleError;

/// Status of a registration. Only the completion cascade moves it forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    #[default]
    Active,
    Completed,
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// A student's enrollment in a cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,

    pub cycle_id: CycleId,

    pub student_id: StudentId,

    /// Customer billed for this student
    pub customer_id: CustomerId,

    #[serde(default)]
    pub status: RegistrationStatus,

    /// Agreed price for the registration
    #[serde(default)]
    pub amount: Money,

    #[serde(default)]
    pub paid_amount: Money,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    pub fn new(
        cycle_id: CycleId,
        student_id: StudentId,
        customer_id: CustomerId,
        amount: Money,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RegistrationId::new(),
            cycle_id,
            student_id,
            customer_id,
            status: RegistrationStatus::Active,
            amount,
            paid_amount: Money::zero(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RegistrationStatus::Active
    }

    pub fn complete(&mut self) {
        self.status = RegistrationStatus::Completed;
        self.updated_at = Utc::now();
    }

    /// Record a payment against the agreed amount
    pub fn record_payment(&mut self, payment: Money) -> Result<(), CycleError> {
        if !payment.is_positive() {
            return Err(CycleError::Validation("Payment must be positive".into()));
        }
        self.paid_amount += payment;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn balance_due(&self) -> Money {
        self.amount - self.paid_amount
    }

    pub fn is_paid_in_full(&self) -> bool {
        !self.balance_due().is_positive()
    }

    /// Validate the registration
    pub fn validate(&self) -> Result<(), CycleError> {
        if self.amount.is_negative() {
            return Err(CycleError::Validation(
                "Registration amount cannot be negative".into(),
            ));
        }
        Ok(())
    }
}
