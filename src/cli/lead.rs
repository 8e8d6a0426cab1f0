//! Upsell lead CLI commands

use clap::Subcommand;

use crate::display::format_lead_list;
use crate::error::{CycleError, CycleResult};
use crate::models::LeadStatus;
use crate::services::LeadService;
use crate::storage::Storage;

use super::print_json;

/// Lead subcommands
#[derive(Subcommand)]
pub enum LeadCommands {
    /// List leads
    List {
        /// Only leads with this status (new, contacted, interested, not_interested, converted)
        #[arg(short, long)]
        status: Option<LeadStatus>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update a lead's status and/or notes
    Update {
        /// Lead ID
        lead: String,
        /// New status
        #[arg(short, long)]
        status: Option<LeadStatus>,
        /// Replacement notes
        #[arg(short, long)]
        notes: Option<String>,
    },
}

/// Handle a lead command
pub fn handle_lead_command(storage: &Storage, cmd: LeadCommands) -> CycleResult<()> {
    let service = LeadService::new(storage);

    match cmd {
        LeadCommands::List { status, json } => {
            let leads = service.list(status)?;
            if json {
                print_json(&leads)?;
            } else {
                print!("{}", format_lead_list(&leads));
            }
        }

        LeadCommands::Update {
            lead,
            status,
            notes,
        } => {
            let found = service
                .find(&lead)?
                .ok_or_else(|| CycleError::lead_not_found(&lead))?;
            let updated = service.update(found.id, status, notes)?;
            println!("Updated lead {}: {}", updated.id, updated.status);
            if !updated.notes.is_empty() {
                println!("  Notes: {}", updated.notes);
            }
        }
    }

    Ok(())
}
