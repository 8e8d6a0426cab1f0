//! Cycle Profitability Report
//!
//! Per-cycle totals over completed meetings: revenue, instructor payments,
//! attributed cycle expenses, meeting expenses and adjusted profit.

use serde::Serialize;

use crate::config::settings::Settings;
use crate::display::{format_percentage, truncate};
use crate::error::CycleResult;
use crate::models::{CycleId, CycleProgress, CycleStatus, Money};
use crate::services::{ExpenseService, FinancialService};
use crate::storage::Storage;

/// Profitability of one cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleProfitRow {
    pub cycle_id: CycleId,
    pub name: String,
    pub status: CycleStatus,
    pub progress: CycleProgress,
    pub revenue: Money,
    pub instructor_payments: Money,
    pub cycle_expenses: Money,
    pub meeting_expenses: Money,
    pub adjusted_profit: Money,
}

impl CycleProfitRow {
    pub fn margin(&self) -> Option<f64> {
        if self.revenue.is_zero() {
            None
        } else {
            Some(self.adjusted_profit.as_f64() / self.revenue.as_f64() * 100.0)
        }
    }
}

/// Profitability of every cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleProfitReport {
    pub cycles: Vec<CycleProfitRow>,
    pub total_revenue: Money,
    pub total_adjusted_profit: Money,
}

impl CycleProfitReport {
    pub fn generate(storage: &Storage, settings: &Settings) -> CycleResult<Self> {
        let financials = FinancialService::new(storage, settings);
        let expenses = ExpenseService::new(storage, settings);
        let instructors = storage.instructors.as_map()?;

        let mut rows = Vec::new();
        for cycle in storage.cycles.get_all()? {
            let share = expenses.cycle_expense_share(&cycle, &instructors)?;
            let meetings = storage.meetings.get_by_cycle(cycle.id)?;
            let in_table = meetings.len() as u32;

            let mut row = CycleProfitRow {
                cycle_id: cycle.id,
                name: cycle.name.clone(),
                status: cycle.status,
                progress: cycle.progress(in_table),
                revenue: Money::zero(),
                instructor_payments: Money::zero(),
                cycle_expenses: Money::zero(),
                meeting_expenses: Money::zero(),
                adjusted_profit: Money::zero(),
            };

            for meeting in meetings.iter().filter(|m| m.is_completed()) {
                let figures = financials.effective(meeting)?;
                let meeting_expenses = expenses.meeting_expense_total(meeting.id, &instructors)?;
                row.revenue += figures.revenue;
                row.instructor_payments += figures.instructor_payment;
                row.cycle_expenses += share;
                row.meeting_expenses += meeting_expenses;
                row.adjusted_profit += expenses.attributor().adjusted_profit(
                    figures.profit,
                    share,
                    meeting_expenses,
                );
            }
            rows.push(row);
        }

        rows.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

        Ok(Self {
            total_revenue: rows.iter().map(|r| r.revenue).sum(),
            total_adjusted_profit: rows.iter().map(|r| r.adjusted_profit).sum(),
            cycles: rows,
        })
    }

    /// Format the report for terminal display
    pub fn format_terminal(&self, currency: &str) -> String {
        let money = |m: Money| m.format_with_symbol(currency);
        let mut output = String::new();

        output.push_str("Cycle Profitability\n");
        output.push_str(&"=".repeat(100));
        output.push('\n');
        output.push_str(&format!(
            "{:<24} {:>9} {:>9} {:>12} {:>12} {:>12} {:>12} {:>7}\n",
            "Cycle", "Status", "Meetings", "Revenue", "Instructors", "Expenses", "Profit", "Margin"
        ));
        output.push_str(&"-".repeat(100));
        output.push('\n');

        for row in &self.cycles {
            let margin = row
                .margin()
                .map(format_percentage)
                .unwrap_or_else(|| "-".to_string());
            output.push_str(&format!(
                "{:<24} {:>9} {:>9} {:>12} {:>12} {:>12} {:>12} {:>7}\n",
                truncate(&row.name, 24),
                row.status.to_string(),
                format!("{}/{}", row.progress.completed_meetings, row.progress.total_meetings),
                money(row.revenue),
                money(row.instructor_payments),
                money(row.cycle_expenses + row.meeting_expenses),
                money(row.adjusted_profit),
                margin,
            ));
        }

        output.push_str(&"-".repeat(100));
        output.push('\n');
        output.push_str(&format!(
            "{:<24} {:>9} {:>9} {:>12} {:>12} {:>12} {:>12}\n",
            "TOTAL",
            "",
            "",
            money(self.total_revenue),
            "",
            "",
            money(self.total_adjusted_profit),
        ));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::LedgerPaths;
    use crate::models::{
        ActivityType, Billing, Cycle, CycleExpense, CycleExpenseCost, CycleExpenseType,
        EmploymentType, Instructor, Meeting, MeetingExpense, MeetingExpenseCost,
        MeetingExpenseType, MeetingStatus, RateCard,
    };
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_profit_totals() {
        let (_dir, storage) = create_test_storage();
        let instructor = Instructor::new(
            "Noa",
            RateCard::new(Money::from_units(100), Money::from_units(80), Money::from_units(120)),
            EmploymentType::Freelancer,
        );
        storage.instructors.upsert(instructor.clone()).unwrap();

        let cycle = Cycle::new(
            "Robotics",
            Billing::InstitutionalFixed {
                meeting_revenue: Money::from_units(500),
            },
            ActivityType::Frontal,
            4,
        );
        storage.cycles.upsert(cycle.clone()).unwrap();
        storage
            .expenses
            .upsert_cycle_expense(CycleExpense::new(
                cycle.id,
                CycleExpenseType::Equipment,
                CycleExpenseCost::Fixed {
                    amount: Money::from_units(200),
                },
            ))
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let mut done = Meeting::new(cycle.id, instructor.id, date, 60);
        done.set_status(MeetingStatus::Completed);
        let pending = Meeting::new(cycle.id, instructor.id, date, 60);
        storage.meetings.upsert(done.clone()).unwrap();
        storage.meetings.upsert(pending).unwrap();
        storage
            .expenses
            .upsert_meeting_expense(MeetingExpense::new(
                done.id,
                MeetingExpenseType::Taxi,
                MeetingExpenseCost::Amount {
                    amount: Money::from_units(30),
                },
            ))
            .unwrap();

        let report = CycleProfitReport::generate(&storage, &Settings::default()).unwrap();
        assert_eq!(report.cycles.len(), 1);
        let row = &report.cycles[0];
        assert_eq!(row.progress.meetings_in_table, 2);
        assert_eq!(row.revenue, Money::from_units(500));
        assert_eq!(row.instructor_payments, Money::from_units(100));
        assert_eq!(row.cycle_expenses, Money::from_units(50));
        assert_eq!(row.meeting_expenses, Money::from_units(30));
        assert_eq!(row.adjusted_profit, Money::from_units(320));
        assert_eq!(report.total_adjusted_profit, Money::from_units(320));

        let text = report.format_terminal("$");
        assert!(text.contains("Robotics"));
        assert!(text.contains("64%"));
    }
}
