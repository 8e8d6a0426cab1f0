//! Core data models for the cycle ledger
//!
//! Cycles, meetings, registrations, instructors, expenses and upsell leads,
//! plus the money and month value types they are measured in.

pub mod cycle;
pub mod expense;
pub mod ids;
pub mod instructor;
pub mod lead;
pub mod meeting;
pub mod money;
pub mod month;
pub mod registration;

pub use cycle::{ActivityType, Billing, Cycle, CycleProgress, CycleStatus};
pub use expense::{
    CycleExpense, CycleExpenseCost, CycleExpenseType, ExpenseStatus, MeetingExpense,
    MeetingExpenseCost, MeetingExpenseType,
};
pub use ids::{
    CustomerId, CycleId, ExpenseId, InstructorId, LeadId, MeetingId, RegistrationId, StudentId,
};
pub use instructor::{EmploymentType, Instructor, RateCard, RateKind};
pub use lead::{LeadStatus, UpsellLead};
pub use meeting::{Meeting, MeetingFinancials, MeetingStatus};
pub use money::Money;
pub use month::Month;
pub use registration::{Registration, RegistrationStatus};
