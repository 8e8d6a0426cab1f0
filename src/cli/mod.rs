//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod cycle;
pub mod data;
pub mod expense;
pub mod lead;
pub mod meeting;
pub mod report;

pub use cycle::{handle_cycle_command, CycleCommands};
pub use data::handle_load_command;
pub use expense::{handle_expense_command, ExpenseCommands};
pub use lead::{handle_lead_command, LeadCommands};
pub use meeting::{handle_meeting_command, MeetingCommands};
pub use report::{handle_report_command, ReportCommands};

use std::fmt::Display;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{CycleError, CycleResult};

/// Resolve a full UUID or a displayed short id (`mtg-1a2b3c4d`) among known ids
pub(crate) fn resolve_id<I>(
    identifier: &str,
    known: impl IntoIterator<Item = I>,
    entity_type: &'static str,
) -> CycleResult<I>
where
    I: Copy + Display + FromStr,
{
    let identifier = identifier.trim();
    if let Ok(id) = identifier.parse::<I>() {
        return Ok(id);
    }

    let matches: Vec<I> = known
        .into_iter()
        .filter(|id| {
            let shown = id.to_string();
            let short = shown.split_once('-').map_or(shown.as_str(), |(_, s)| s);
            !identifier.is_empty() && (shown.starts_with(identifier) || short.starts_with(identifier))
        })
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(CycleError::NotFound {
            entity_type,
            identifier: identifier.to_string(),
        }),
        _ => Err(CycleError::Validation(format!(
            "{} id '{}' is ambiguous ({} matches)",
            entity_type,
            identifier,
            matches.len()
        ))),
    }
}

/// Print a value as pretty JSON on stdout
pub(crate) fn print_json<T: Serialize>(value: &T) -> CycleResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
