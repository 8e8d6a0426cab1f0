//! Meeting display formatting
//!
//! Detail views for a single meeting, status-update results and bulk
//! outcomes.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::{Meeting, MeetingExpense, Money};
use crate::services::financials::BulkOutcome;
use crate::services::{BulkStatusOutcome, MeetingBreakdown, StatusUpdate};

use super::cycle::{format_batch_completion, format_completion};
use super::format::{field, format_money_colored, separator};

/// Format a meeting with its financial breakdown
pub fn format_meeting_details(
    meeting: &Meeting,
    breakdown: Option<&MeetingBreakdown>,
    currency: &str,
) -> String {
    let money = |m: Money| m.format_with_symbol(currency);
    let mut output = String::new();

    output.push_str(&format!("Meeting: {}\n", meeting.id));
    output.push_str(&field("Cycle", meeting.cycle_id));
    output.push_str(&field("Instructor", meeting.instructor_id));
    output.push_str(&field("Date", meeting.scheduled_date.format("%Y-%m-%d")));
    output.push_str(&field("Duration", format!("{} min", meeting.duration_minutes)));
    output.push_str(&field("Status", meeting.status));
    if !meeting.notes.is_empty() {
        output.push_str(&field("Notes", &meeting.notes));
    }

    if let Some(b) = breakdown {
        output.push_str(&separator(40));
        output.push('\n');
        output.push_str(&field("Revenue", money(b.revenue)));
        output.push_str(&field("Instructor payment", money(b.instructor_payment)));
        output.push_str(&field("Profit", money(b.profit)));
        output.push_str(&field("Cycle expense share", money(b.cycle_expense_share)));
        output.push_str(&field("Meeting expenses", money(b.meeting_expenses)));
        output.push_str(&field("Adjusted profit", format_money_colored(b.adjusted_profit, currency)));
    } else if let Some(f) = &meeting.financials {
        output.push_str(&separator(40));
        output.push('\n');
        output.push_str(&field("Revenue", money(f.revenue)));
        output.push_str(&field("Instructor payment", money(f.instructor_payment)));
        output.push_str(&field("Profit", money(f.profit)));
    }
    output
}

#[derive(Tabled)]
struct ExpenseRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    expense_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Description")]
    description: String,
}

/// Format the expenses recorded on a meeting
pub fn format_meeting_expenses(expenses: &[MeetingExpense]) -> String {
    if expenses.is_empty() {
        return String::new();
    }
    let rows = expenses.iter().map(|e| ExpenseRow {
        id: e.id.to_string(),
        expense_type: e.expense_type.to_string(),
        status: e.status.to_string(),
        description: e.description.clone(),
    });
    let mut output = Table::new(rows).with(Style::psql()).to_string();
    output.push('\n');
    output
}

/// Describe a single status update
pub fn format_status_update(update: &StatusUpdate, currency: &str) -> String {
    if !update.changed() {
        return format!(
            "Meeting {} is already {}\n",
            update.meeting.id, update.meeting.status
        );
    }

    let mut output = format!(
        "Meeting {}: {} -> {}\n",
        update.meeting.id, update.previous_status, update.meeting.status
    );
    if let Some(b) = &update.breakdown {
        output.push_str(&format!(
            "  Revenue {}, instructor {}, adjusted profit {}\n",
            b.revenue.format_with_symbol(currency),
            b.instructor_payment.format_with_symbol(currency),
            b.adjusted_profit.format_with_symbol(currency),
        ));
    } else if let Some(f) = &update.financials {
        output.push_str(&format!(
            "  Revenue {}, instructor {}, profit {}\n",
            f.revenue.format_with_symbol(currency),
            f.instructor_payment.format_with_symbol(currency),
            f.profit.format_with_symbol(currency),
        ));
    }
    if let Some(outcome) = &update.completion {
        output.push_str(&format_completion(outcome));
    }
    for failure in &update.follow_up_errors {
        output.push_str(&format!("  Warning: {} failed: {}\n", failure.stage, failure.error));
    }
    output
}

/// Describe per-item results of a bulk operation
pub fn format_bulk_outcome(outcome: &BulkOutcome, verb: &str) -> String {
    let mut output = format!("{} {} meeting(s)\n", verb, outcome.updated.len());
    for item in &outcome.errors {
        output.push_str(&format!("  {}: {}\n", item.meeting_id, item.error));
    }
    output
}

pub fn format_bulk_status(outcome: &BulkStatusOutcome) -> String {
    let mut output = format_bulk_outcome(&outcome.items, "Updated");
    for failure in &outcome.follow_up_errors {
        output.push_str(&format!(
            "  Warning: {} {} failed: {}\n",
            failure.meeting_id, failure.follow_up.stage, failure.follow_up.error
        ));
    }
    output.push_str(&format_batch_completion(&outcome.completion));
    output
}
