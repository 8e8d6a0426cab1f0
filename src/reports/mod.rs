//! Reports for the cycle ledger
//!
//! Profit forecasting over completed meetings and per-cycle profitability.

pub mod forecast;
pub mod profit;

pub use forecast::{
    forecast_confidence, ExpensePattern, Forecast, ForecastEngine, ForecastMonth, ForecastReport,
    ForecastSummary, MeetingRecord, MAX_WINDOW_MONTHS, MonthlyAggregate, PartialMonth, SeriesStats,
};
pub use profit::{CycleProfitReport, CycleProfitRow};
