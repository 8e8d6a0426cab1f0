//! Meeting CLI commands
//!
//! Status changes (single and bulk), financial recalculation and the
//! meeting detail view.

use clap::Subcommand;

use crate::config::settings::Settings;
use crate::display::{
    format_bulk_outcome, format_bulk_status, format_meeting_details, format_meeting_expenses,
    format_status_update,
};
use crate::error::CycleResult;
use crate::models::{MeetingId, MeetingStatus};
use crate::services::{ExpenseService, FinancialService, MeetingService};
use crate::storage::Storage;

use super::{print_json, resolve_id};

/// Meeting subcommands
#[derive(Subcommand)]
pub enum MeetingCommands {
    /// Change a meeting's status
    Status {
        /// Meeting ID
        meeting: String,
        /// New status (scheduled, completed, cancelled, postponed)
        status: MeetingStatus,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the status of several meetings at once
    BulkStatus {
        /// New status (scheduled, completed, cancelled, postponed)
        status: MeetingStatus,
        /// Meeting IDs
        #[arg(required = true)]
        meetings: Vec<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recalculate stored financials of completed meetings
    Recalc {
        /// Meeting IDs
        #[arg(required = true)]
        meetings: Vec<String>,
        /// Recompute even when figures are already stored
        #[arg(short, long)]
        force: bool,
    },
    /// Show a meeting with its financial breakdown
    Show {
        /// Meeting ID
        meeting: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn resolve_meeting(storage: &Storage, identifier: &str) -> CycleResult<MeetingId> {
    let known = storage.meetings.get_all()?.into_iter().map(|m| m.id);
    resolve_id(identifier, known, "Meeting")
}

/// Handle a meeting command
pub fn handle_meeting_command(
    storage: &Storage,
    settings: &Settings,
    cmd: MeetingCommands,
) -> CycleResult<()> {
    let service = MeetingService::new(storage, settings);
    let currency = settings.currency_symbol.as_str();

    match cmd {
        MeetingCommands::Status {
            meeting,
            status,
            json,
        } => {
            let id = resolve_meeting(storage, &meeting)?;
            let update = service.update_status(id, status)?;
            if json {
                print_json(&update)?;
            } else {
                print!("{}", format_status_update(&update, currency));
            }
        }

        MeetingCommands::BulkStatus {
            status,
            meetings,
            json,
        } => {
            let ids = meetings
                .iter()
                .map(|m| resolve_meeting(storage, m))
                .collect::<CycleResult<Vec<_>>>()?;
            let outcome = service.bulk_update_status(&ids, status)?;
            if json {
                print_json(&outcome)?;
            } else {
                print!("{}", format_bulk_status(&outcome));
            }
        }

        MeetingCommands::Recalc { meetings, force } => {
            let ids = meetings
                .iter()
                .map(|m| resolve_meeting(storage, m))
                .collect::<CycleResult<Vec<_>>>()?;
            let outcome = FinancialService::new(storage, settings).recalculate_bulk(&ids, force)?;
            print!("{}", format_bulk_outcome(&outcome, "Recalculated"));
        }

        MeetingCommands::Show { meeting, json } => {
            let id = resolve_meeting(storage, &meeting)?;
            let meeting = service.get(id)?;
            let breakdown = if meeting.is_completed() {
                Some(ExpenseService::new(storage, settings).meeting_breakdown(id)?)
            } else {
                None
            };

            if json {
                print_json(&serde_json::json!({
                    "meeting": meeting,
                    "breakdown": breakdown,
                }))?;
            } else {
                print!("{}", format_meeting_details(&meeting, breakdown.as_ref(), currency));
                let expenses = storage.expenses.meeting_expenses_for(id)?;
                print!("{}", format_meeting_expenses(&expenses));
            }
        }
    }

    Ok(())
}
