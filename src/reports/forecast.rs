//! Forecast Report
//!
//! Aggregates completed meetings into calendar months, detects recurring
//! meeting expenses per cycle, and projects the coming months from the
//! historical means. The current month is partial: its completed meetings
//! are actuals and its still-scheduled meetings are projected.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::settings::Settings;
use crate::error::{CycleError, CycleResult};
use crate::models::{
    CycleId, Meeting, MeetingExpenseType, MeetingFinancials, MeetingId, MeetingStatus, Money, Month,
};
use crate::services::{ExpenseService, FinancialService};
use crate::storage::Storage;

/// One meeting as seen by the forecast engine
#[derive(Debug, Clone, PartialEq)]
pub struct MeetingRecord {
    pub meeting_id: MeetingId,
    pub cycle_id: CycleId,
    pub date: NaiveDate,
    pub status: MeetingStatus,
    /// Stored figures for completed meetings, projected ones for scheduled
    pub financials: MeetingFinancials,
    pub cycle_expense_share: Money,
    /// Non-rejected meeting expenses
    pub expenses: Vec<(MeetingExpenseType, Money)>,
}

impl MeetingRecord {
    fn expense_total(&self) -> Money {
        self.expenses.iter().map(|(_, amount)| *amount).sum()
    }
}

/// Totals of one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthlyAggregate {
    pub month: Month,
    pub meeting_count: u32,
    pub revenue: Money,
    pub instructor_payments: Money,
    pub cycle_expenses: Money,
    pub meeting_expenses: Money,
    pub total_expenses: Money,
    pub profit: Money,
}

impl MonthlyAggregate {
    fn empty(month: Month) -> Self {
        Self {
            month,
            meeting_count: 0,
            revenue: Money::zero(),
            instructor_payments: Money::zero(),
            cycle_expenses: Money::zero(),
            meeting_expenses: Money::zero(),
            total_expenses: Money::zero(),
            profit: Money::zero(),
        }
    }

    fn add(&mut self, record: &MeetingRecord) {
        self.meeting_count += 1;
        self.revenue += record.financials.revenue;
        self.instructor_payments += record.financials.instructor_payment;
        self.cycle_expenses += record.cycle_expense_share;
        self.meeting_expenses += record.expense_total();
        self.close();
    }

    fn close(&mut self) {
        self.total_expenses = self.instructor_payments + self.cycle_expenses + self.meeting_expenses;
        self.profit = self.revenue - self.total_expenses;
    }
}

/// Mean and sample standard deviation of a monthly series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
    pub mean: Money,
    pub std_dev: Money,
}

impl SeriesStats {
    /// Sample statistics; the deviation is zero with fewer than two values
    pub fn from_values(values: &[Money]) -> Self {
        let (mean, std_dev) = mean_and_std_dev(values);
        Self {
            mean: Money::from_cents(mean.round() as i64),
            std_dev: Money::from_cents(std_dev.round() as i64),
        }
    }
}

fn mean_and_std_dev(values: &[Money]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|v| v.cents() as f64).sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let variance = values
        .iter()
        .map(|v| (v.cents() as f64 - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    (mean, variance.sqrt())
}

/// Confidence score in [0, 100] from the spread of historical profit
///
/// Decreases as the coefficient of variation grows. A zero mean gives zero.
pub fn forecast_confidence(mean: f64, std_dev: f64) -> f64 {
    if mean == 0.0 || !mean.is_finite() || !std_dev.is_finite() {
        return 0.0;
    }
    let variation = std_dev.abs() / mean.abs();
    (100.0 - variation * 100.0).clamp(0.0, 100.0)
}

/// Summary statistics over the historical window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastSummary {
    pub revenue: SeriesStats,
    pub expenses: SeriesStats,
    pub profit: SeriesStats,
    pub forecast_confidence: f64,
}

/// A meeting expense type that recurs for a cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpensePattern {
    pub cycle_id: CycleId,
    pub expense_type: MeetingExpenseType,
    pub months_present: u32,
    /// Months of the window in which the cycle had completed meetings
    pub months_active: u32,
    pub frequency: f64,
    /// Mean monthly amount in the months the type appeared
    pub avg_amount: Money,
}

impl ExpensePattern {
    /// Expected amount per month
    pub fn expected_value(&self) -> Money {
        self.avg_amount.scale(self.frequency)
    }
}

/// Breakdown of the current, unfinished month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartialMonth {
    pub completed_count: u32,
    pub scheduled_count: u32,
}

/// One projected month
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastMonth {
    pub month: Month,
    pub partial: Option<PartialMonth>,
    pub revenue: Money,
    pub instructor_payments: Money,
    pub cycle_expenses: Money,
    pub meeting_expenses: Money,
    pub total_expenses: Money,
    pub profit: Money,
    pub lower_bound: Money,
    pub upper_bound: Money,
}

/// Output of the forecast engine
#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub historical: Vec<MonthlyAggregate>,
    pub forecast: Vec<ForecastMonth>,
    pub summary: ForecastSummary,
    pub patterns: Vec<ExpensePattern>,
}

/// Longest history or projection window, in months
pub const MAX_WINDOW_MONTHS: u32 = 120;

/// Pure forecasting over meeting records
#[derive(Debug, Clone, Copy)]
pub struct ForecastEngine {
    pub historical_months: u32,
    pub forecast_months: u32,
}

impl ForecastEngine {
    pub fn new(historical_months: u32, forecast_months: u32) -> CycleResult<Self> {
        if historical_months == 0 {
            return Err(CycleError::Validation(
                "The forecast needs at least one historical month".into(),
            ));
        }
        if historical_months > MAX_WINDOW_MONTHS || forecast_months > MAX_WINDOW_MONTHS {
            return Err(CycleError::Validation(format!(
                "Forecast windows are limited to {} months (got {} historical, {} ahead)",
                MAX_WINDOW_MONTHS, historical_months, forecast_months
            )));
        }
        Ok(Self {
            historical_months,
            forecast_months,
        })
    }

    /// Run the forecast as of `today`
    ///
    /// `active_cycles` limits pattern projections to cycles that will still
    /// hold meetings.
    pub fn run(
        &self,
        records: &[MeetingRecord],
        active_cycles: &HashSet<CycleId>,
        today: NaiveDate,
    ) -> Forecast {
        let current = Month::containing(today);
        let window = current.preceding(self.historical_months);

        let historical = self.historical(records, &window);
        let summary = self.summarize(&historical);
        let patterns = self.detect_patterns(records, &window);
        let forecast = self.project(records, &historical, &summary, &patterns, active_cycles, current);

        debug!(
            months = historical.len(),
            patterns = patterns.len(),
            confidence = summary.forecast_confidence,
            "forecast computed"
        );
        Forecast {
            historical,
            forecast,
            summary,
            patterns,
        }
    }

    /// Monthly totals of completed meetings, one entry per window month
    pub fn historical(&self, records: &[MeetingRecord], window: &[Month]) -> Vec<MonthlyAggregate> {
        let mut months: BTreeMap<Month, MonthlyAggregate> = window
            .iter()
            .map(|&m| (m, MonthlyAggregate::empty(m)))
            .collect();

        for record in records.iter().filter(|r| r.status.is_completed()) {
            if let Some(aggregate) = months.get_mut(&Month::containing(record.date)) {
                aggregate.add(record);
            }
        }
        months.into_values().collect()
    }

    pub fn summarize(&self, historical: &[MonthlyAggregate]) -> ForecastSummary {
        let revenue: Vec<Money> = historical.iter().map(|m| m.revenue).collect();
        let expenses: Vec<Money> = historical.iter().map(|m| m.total_expenses).collect();
        let profit: Vec<Money> = historical.iter().map(|m| m.profit).collect();

        let (profit_mean, profit_sd) = mean_and_std_dev(&profit);
        ForecastSummary {
            revenue: SeriesStats::from_values(&revenue),
            expenses: SeriesStats::from_values(&expenses),
            profit: SeriesStats::from_values(&profit),
            forecast_confidence: forecast_confidence(profit_mean, profit_sd),
        }
    }

    /// Recurring (cycle, expense type) pairs within the window
    pub fn detect_patterns(&self, records: &[MeetingRecord], window: &[Month]) -> Vec<ExpensePattern> {
        let window: BTreeSet<Month> = window.iter().copied().collect();
        let mut active_months: HashMap<CycleId, BTreeSet<Month>> = HashMap::new();
        let mut occurrences: BTreeMap<(CycleId, MeetingExpenseType), BTreeMap<Month, Money>> =
            BTreeMap::new();

        for record in records.iter().filter(|r| r.status.is_completed()) {
            let month = Month::containing(record.date);
            if !window.contains(&month) {
                continue;
            }
            active_months.entry(record.cycle_id).or_default().insert(month);
            for &(expense_type, amount) in &record.expenses {
                *occurrences
                    .entry((record.cycle_id, expense_type))
                    .or_default()
                    .entry(month)
                    .or_insert_with(Money::zero) += amount;
            }
        }

        occurrences
            .into_iter()
            .filter_map(|((cycle_id, expense_type), by_month)| {
                let months_active = active_months.get(&cycle_id).map_or(0, |m| m.len() as u32);
                let months_present = by_month.len() as u32;
                if months_active == 0 || months_present == 0 {
                    return None;
                }
                let amounts: Vec<Money> = by_month.into_values().collect();
                Some(ExpensePattern {
                    cycle_id,
                    expense_type,
                    months_present,
                    months_active,
                    frequency: f64::from(months_present) / f64::from(months_active),
                    avg_amount: SeriesStats::from_values(&amounts).mean,
                })
            })
            .collect()
    }

    fn project(
        &self,
        records: &[MeetingRecord],
        historical: &[MonthlyAggregate],
        summary: &ForecastSummary,
        patterns: &[ExpensePattern],
        active_cycles: &HashSet<CycleId>,
        current: Month,
    ) -> Vec<ForecastMonth> {
        let instructor_mean = mean_of(historical, |a| a.instructor_payments);
        let cycle_expense_mean = mean_of(historical, |a| a.cycle_expenses);
        let pattern_expenses: Money = patterns
            .iter()
            .filter(|p| active_cycles.contains(&p.cycle_id))
            .map(ExpensePattern::expected_value)
            .sum();
        let spread = summary.profit.std_dev;

        current
            .following(self.forecast_months)
            .into_iter()
            .map(|month| {
                if month == current {
                    return self.project_partial(records, current, spread);
                }
                let total_expenses = instructor_mean + cycle_expense_mean + pattern_expenses;
                let profit = summary.revenue.mean - total_expenses;
                ForecastMonth {
                    month,
                    partial: None,
                    revenue: summary.revenue.mean,
                    instructor_payments: instructor_mean,
                    cycle_expenses: cycle_expense_mean,
                    meeting_expenses: pattern_expenses,
                    total_expenses,
                    profit,
                    lower_bound: profit - spread,
                    upper_bound: profit + spread,
                }
            })
            .collect()
    }

    /// Actuals of completed meetings plus projections of scheduled ones
    fn project_partial(&self, records: &[MeetingRecord], current: Month, spread: Money) -> ForecastMonth {
        let mut aggregate = MonthlyAggregate::empty(current);
        let mut partial = PartialMonth {
            completed_count: 0,
            scheduled_count: 0,
        };
        for record in records.iter().filter(|r| current.contains(r.date)) {
            match record.status {
                MeetingStatus::Completed => partial.completed_count += 1,
                MeetingStatus::Scheduled => partial.scheduled_count += 1,
                _ => continue,
            }
            aggregate.add(record);
        }

        ForecastMonth {
            month: current,
            partial: Some(partial),
            revenue: aggregate.revenue,
            instructor_payments: aggregate.instructor_payments,
            cycle_expenses: aggregate.cycle_expenses,
            meeting_expenses: aggregate.meeting_expenses,
            total_expenses: aggregate.total_expenses,
            profit: aggregate.profit,
            lower_bound: aggregate.profit - spread,
            upper_bound: aggregate.profit + spread,
        }
    }
}

fn mean_of<F>(months: &[MonthlyAggregate], field: F) -> Money
where
    F: Fn(&MonthlyAggregate) -> Money,
{
    let values: Vec<Money> = months.iter().map(field).collect();
    SeriesStats::from_values(&values).mean
}

/// Forecast report over the stored meetings
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub as_of: NaiveDate,
    pub historical_months: u32,
    pub forecast_months: u32,
    /// Meetings left out because their figures could not be resolved
    pub skipped_meetings: Vec<MeetingId>,
    #[serde(flatten)]
    pub forecast: Forecast,
}

impl ForecastReport {
    /// Generate a forecast as of `today`
    pub fn generate(
        storage: &Storage,
        settings: &Settings,
        today: NaiveDate,
        historical_months: u32,
        forecast_months: u32,
    ) -> CycleResult<Self> {
        let engine = ForecastEngine::new(historical_months, forecast_months)?;
        let (records, skipped_meetings) =
            collect_records(storage, settings, today, historical_months)?;
        let active_cycles: HashSet<CycleId> = storage
            .cycles
            .get_all()?
            .into_iter()
            .filter(|c| c.is_active())
            .map(|c| c.id)
            .collect();

        Ok(Self {
            as_of: today,
            historical_months,
            forecast_months,
            skipped_meetings,
            forecast: engine.run(&records, &active_cycles, today),
        })
    }

    /// Format the report for terminal display
    pub fn format_terminal(&self, currency: &str) -> String {
        let money = |m: Money| m.format_with_symbol(currency);
        let mut output = String::new();

        let _ = writeln!(
            output,
            "Forecast as of {} ({} months history, {} months ahead)",
            self.as_of, self.historical_months, self.forecast_months
        );
        let _ = writeln!(output, "{}", "=".repeat(78));
        let _ = writeln!(
            output,
            "{:<8} {:>8} {:>14} {:>14} {:>14} {:>14}",
            "Month", "Meetings", "Revenue", "Instructors", "Expenses", "Profit"
        );
        let _ = writeln!(output, "{}", "-".repeat(78));
        for month in &self.forecast.historical {
            let _ = writeln!(
                output,
                "{:<8} {:>8} {:>14} {:>14} {:>14} {:>14}",
                month.month,
                month.meeting_count,
                money(month.revenue),
                money(month.instructor_payments),
                money(month.cycle_expenses + month.meeting_expenses),
                money(month.profit),
            );
        }

        let summary = &self.forecast.summary;
        let _ = writeln!(output, "{}", "-".repeat(78));
        let _ = writeln!(
            output,
            "Mean profit {} (± {}), confidence {:.0}%",
            money(summary.profit.mean),
            money(summary.profit.std_dev),
            summary.forecast_confidence
        );

        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "{:<16} {:>14} {:>14} {:>14} {:>24}",
            "Month", "Revenue", "Expenses", "Profit", "Range"
        );
        let _ = writeln!(output, "{}", "-".repeat(86));
        for month in &self.forecast.forecast {
            let label = match month.partial {
                Some(p) => format!("{}* ({}+{})", month.month, p.completed_count, p.scheduled_count),
                None => month.month.to_string(),
            };
            let _ = writeln!(
                output,
                "{:<16} {:>14} {:>14} {:>14} {:>24}",
                label,
                money(month.revenue),
                money(month.total_expenses),
                money(month.profit),
                format!("{} .. {}", money(month.lower_bound), money(month.upper_bound)),
            );
        }

        if !self.forecast.patterns.is_empty() {
            let _ = writeln!(output);
            let _ = writeln!(output, "Recurring expenses");
            for pattern in &self.forecast.patterns {
                let _ = writeln!(
                    output,
                    "  {} {:<16} {:>3.0}% of months, avg {}",
                    pattern.cycle_id,
                    pattern.expense_type.to_string(),
                    pattern.frequency * 100.0,
                    money(pattern.avg_amount),
                );
            }
        }

        if !self.skipped_meetings.is_empty() {
            let _ = writeln!(output);
            let _ = writeln!(
                output,
                "Warning: {} meeting(s) skipped, their figures could not be resolved",
                self.skipped_meetings.len()
            );
        }

        output
    }
}

/// Build engine records from storage
///
/// Completed meetings inside the window and the current month, plus the
/// current month's scheduled meetings with projected figures. A meeting whose
/// figures, expenses or cycle expense share cannot be resolved is skipped
/// and returned separately.
fn collect_records(
    storage: &Storage,
    settings: &Settings,
    today: NaiveDate,
    historical_months: u32,
) -> CycleResult<(Vec<MeetingRecord>, Vec<MeetingId>)> {
    let current = Month::containing(today);
    let start = current
        .preceding(historical_months)
        .first()
        .copied()
        .unwrap_or(current)
        .start_date();
    let meetings = storage
        .meetings
        .get_by_date_range(start, current.end_date())?;

    let financials = FinancialService::new(storage, settings);
    let expenses = ExpenseService::new(storage, settings);
    let instructors = storage.instructors.as_map()?;

    let mut shares: HashMap<CycleId, Option<Money>> = HashMap::new();
    for cycle in storage.cycles.get_all()? {
        let share = match expenses.cycle_expense_share(&cycle, &instructors) {
            Ok(share) => Some(share),
            Err(e) => {
                warn!(cycle = %cycle.id, error = %e, "cycle expense share unavailable, its meetings are skipped");
                None
            }
        };
        shares.insert(cycle.id, share);
    }

    let record_for = |meeting: &Meeting| -> CycleResult<Option<MeetingRecord>> {
        let figures = match meeting.status {
            MeetingStatus::Completed => financials.effective(meeting)?,
            MeetingStatus::Scheduled if current.contains(meeting.scheduled_date) => {
                financials.project(meeting)?
            }
            _ => return Ok(None),
        };

        let cycle_expense_share = match shares.get(&meeting.cycle_id) {
            Some(Some(share)) => *share,
            Some(None) => {
                return Err(CycleError::Validation(format!(
                    "expense share of cycle {} is unavailable",
                    meeting.cycle_id
                )))
            }
            None => return Err(CycleError::cycle_not_found(meeting.cycle_id.to_string())),
        };

        let meeting_expenses = if meeting.is_completed() {
            storage
                .expenses
                .meeting_expenses_for(meeting.id)?
                .iter()
                .filter(|e| e.counts())
                .map(|e| {
                    Ok((
                        e.expense_type,
                        expenses.attributor().resolve_meeting_expense(e, &instructors)?,
                    ))
                })
                .collect::<CycleResult<Vec<_>>>()?
        } else {
            Vec::new()
        };

        Ok(Some(MeetingRecord {
            meeting_id: meeting.id,
            cycle_id: meeting.cycle_id,
            date: meeting.scheduled_date,
            status: meeting.status,
            financials: figures,
            cycle_expense_share,
            expenses: meeting_expenses,
        }))
    };

    let mut records = Vec::new();
    let mut skipped = Vec::new();
    for meeting in &meetings {
        match record_for(meeting) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => {
                warn!(meeting = %meeting.id, error = %e, "meeting left out of the forecast");
                skipped.push(meeting.id);
            }
        }
    }
    Ok((records, skipped))
}
