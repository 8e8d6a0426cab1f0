//! Loading seed data sets

use std::path::Path;

use crate::error::CycleResult;
use crate::storage::{DataSet, Storage};

/// Import a YAML data set into storage
pub fn handle_load_command(storage: &Storage, file: &Path) -> CycleResult<()> {
    let data = DataSet::from_file(file)?;
    let summary = storage.import(&data)?;

    println!("Loaded {}", file.display());
    println!("  Instructors:      {}", summary.instructors);
    println!("  Cycles:           {}", summary.cycles);
    println!("  Meetings:         {}", summary.meetings);
    println!("  Registrations:    {}", summary.registrations);
    println!("  Cycle expenses:   {}", summary.cycle_expenses);
    println!("  Meeting expenses: {}", summary.meeting_expenses);
    Ok(())
}
