//! Expense repository for JSON storage
//!
//! Cycle-level and meeting-level expenses share one file.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::CycleError;
use crate::models::{CycleExpense, CycleId, ExpenseId, MeetingExpense, MeetingId};

use super::file_io::JsonFile;
use super::{read_guard, write_guard};

/// Serializable expense data
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExpenseData {
    #[serde(default)]
    pub cycle_expenses: Vec<CycleExpense>,
    #[serde(default)]
    pub meeting_expenses: Vec<MeetingExpense>,
}

/// Repository for cycle and meeting expenses
pub struct ExpenseRepository {
    file: JsonFile,
    cycle_expenses: RwLock<HashMap<ExpenseId, CycleExpense>>,
    meeting_expenses: RwLock<HashMap<ExpenseId, MeetingExpense>>,
}

impl ExpenseRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: JsonFile::new(path),
            cycle_expenses: RwLock::new(HashMap::new()),
            meeting_expenses: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), CycleError> {
        let file_data: ExpenseData = self.file.load()?;

        let mut cycle_expenses = write_guard(&self.cycle_expenses)?;
        cycle_expenses.clear();
        for expense in file_data.cycle_expenses {
            cycle_expenses.insert(expense.id, expense);
        }

        let mut meeting_expenses = write_guard(&self.meeting_expenses)?;
        meeting_expenses.clear();
        for expense in file_data.meeting_expenses {
            meeting_expenses.insert(expense.id, expense);
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), CycleError> {
        self.file.store(|| {
            let mut cycle_expenses: Vec<_> =
                read_guard(&self.cycle_expenses)?.values().cloned().collect();
            cycle_expenses.sort_by(|a, b| a.created_at.cmp(&b.created_at));

            Ok(ExpenseData {
                cycle_expenses,
                meeting_expenses: self.all_meeting_expenses()?,
            })
        })
    }

    // Cycle expenses

    pub fn get_cycle_expense(&self, id: ExpenseId) -> Result<Option<CycleExpense>, CycleError> {
        Ok(read_guard(&self.cycle_expenses)?.get(&id).cloned())
    }

    pub fn cycle_expenses_for(&self, cycle_id: CycleId) -> Result<Vec<CycleExpense>, CycleError> {
        let mut list: Vec<_> = read_guard(&self.cycle_expenses)?
            .values()
            .filter(|e| e.cycle_id == cycle_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    pub fn upsert_cycle_expense(&self, expense: CycleExpense) -> Result<(), CycleError> {
        write_guard(&self.cycle_expenses)?.insert(expense.id, expense);
        Ok(())
    }

    pub fn delete_cycle_expense(&self, id: ExpenseId) -> Result<Option<CycleExpense>, CycleError> {
        Ok(write_guard(&self.cycle_expenses)?.remove(&id))
    }

    // Meeting expenses

    pub fn get_meeting_expense(&self, id: ExpenseId) -> Result<Option<MeetingExpense>, CycleError> {
        Ok(read_guard(&self.meeting_expenses)?.get(&id).cloned())
    }

    pub fn meeting_expenses_for(
        &self,
        meeting_id: MeetingId,
    ) -> Result<Vec<MeetingExpense>, CycleError> {
        let mut list: Vec<_> = read_guard(&self.meeting_expenses)?
            .values()
            .filter(|e| e.meeting_id == meeting_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    pub fn all_meeting_expenses(&self) -> Result<Vec<MeetingExpense>, CycleError> {
        let mut list: Vec<_> = read_guard(&self.meeting_expenses)?.values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    pub fn upsert_meeting_expense(&self, expense: MeetingExpense) -> Result<(), CycleError> {
        write_guard(&self.meeting_expenses)?.insert(expense.id, expense);
        Ok(())
    }

    pub fn delete_meeting_expense(
        &self,
        id: ExpenseId,
    ) -> Result<Option<MeetingExpense>, CycleError> {
        Ok(write_guard(&self.meeting_expenses)?.remove(&id))
    }
}
