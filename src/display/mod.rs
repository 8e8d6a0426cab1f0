//! Display formatting for terminal output
//!
//! Tables for cycles, meetings and leads, plus the detail and outcome views
//! printed by the CLI.

pub mod cycle;
pub mod format;
pub mod lead;
pub mod meeting;

pub use cycle::{format_batch_completion, format_completion, format_cycle_list};
pub use format::{format_money_colored, format_percentage, separator, truncate};
pub use lead::format_lead_list;
pub use meeting::{
    format_bulk_outcome, format_bulk_status, format_meeting_details, format_meeting_expenses,
    format_status_update,
};
