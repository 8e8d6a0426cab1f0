//! Service layer for the cycle ledger
//!
//! The financial and lifecycle engine on top of the storage layer: rate
//! resolution, meeting financials, expense attribution, cycle completion,
//! and the cycle, meeting and lead operations that drive them.

pub mod completion;
pub mod cycle;
pub mod expenses;
pub mod financials;
pub mod lead;
pub mod meeting;
pub mod rates;

pub use completion::{CascadeSummary, CompletionCoordinator, CompletionOutcome};
pub use cycle::{CreateCycleInput, CycleService, CycleSummary};
pub use expenses::{Actor, ExpenseAttributor, ExpenseService, MeetingBreakdown, Role};
pub use financials::{
    BulkOutcome, FinancialService, MeetingFinancialCalculator, PrivateRevenueStrategy,
};
pub use lead::LeadService;
pub use meeting::{BulkFollowUpError, BulkStatusOutcome, MeetingService, StatusUpdate};
pub use rates::RateResolver;
