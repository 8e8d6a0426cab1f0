//! Cycle display formatting

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::services::completion::BatchCompletion;
use crate::services::{CompletionOutcome, CycleSummary};

use super::format::truncate;

#[derive(Tabled)]
struct CycleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Billing")]
    billing: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Done")]
    completed: u32,
    #[tabled(rename = "Left")]
    remaining: u32,
    #[tabled(rename = "Total")]
    total: u32,
    #[tabled(rename = "Rows")]
    in_table: u32,
}

/// Format cycles as a table
pub fn format_cycle_list(cycles: &[CycleSummary]) -> String {
    if cycles.is_empty() {
        return "No cycles found.\n".to_string();
    }

    let rows = cycles.iter().map(|s| CycleRow {
        id: s.cycle.id.to_string(),
        name: truncate(&s.cycle.name, 28),
        billing: s.cycle.billing.to_string(),
        status: s.cycle.status.to_string(),
        completed: s.progress.completed_meetings,
        remaining: s.progress.remaining_meetings,
        total: s.progress.total_meetings,
        in_table: s.progress.meetings_in_table,
    });

    let mut output = Table::new(rows).with(Style::psql()).to_string();
    output.push('\n');
    output
}

/// Describe the result of evaluating one cycle
pub fn format_completion(outcome: &CompletionOutcome) -> String {
    let progress = &outcome.progress;
    let mut output = format!(
        "Cycle {}: {}/{} meetings completed, {} remaining ({} rows)\n",
        outcome.cycle_id,
        progress.completed_meetings,
        progress.total_meetings,
        progress.remaining_meetings,
        progress.meetings_in_table,
    );

    if let Some(cascade) = &outcome.cascade {
        output.push_str(&format!(
            "  Cycle completed: {} registrations closed, {} leads created",
            cascade.registrations_completed, cascade.leads_created
        ));
        if cascade.leads_skipped > 0 {
            output.push_str(&format!(" ({} already existed)", cascade.leads_skipped));
        }
        output.push_str(&format!(
            ", {} scheduled meetings removed\n",
            cascade.meetings_deleted.len()
        ));
    }
    output
}

/// Describe every cycle touched by a batch
pub fn format_batch_completion(batch: &BatchCompletion) -> String {
    let mut output = String::new();
    for outcome in &batch.outcomes {
        output.push_str(&format_completion(outcome));
    }
    for failure in &batch.failures {
        output.push_str(&format!(
            "Cycle {}: evaluation failed: {}\n",
            failure.cycle_id, failure.error
        ));
    }
    output
}
