//! CLI commands for reports

use chrono::{Local, NaiveDate};
use clap::Subcommand;

use crate::config::settings::Settings;
use crate::error::CycleResult;
use crate::reports::{CycleProfitReport, ForecastReport, MAX_WINDOW_MONTHS};
use crate::storage::Storage;

use super::print_json;

/// Report subcommands
#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Project profit for the coming months from completed meetings
    Forecast {
        /// Full calendar months of history to aggregate
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_WINDOW_MONTHS as i64))]
        historical: Option<u32>,
        /// Months to project, starting with the current one
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=MAX_WINDOW_MONTHS as i64))]
        forecast: Option<u32>,
        /// Date to forecast from (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Profitability of each cycle over its completed meetings
    Profit {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Handle a report command
pub fn handle_report_command(
    storage: &Storage,
    settings: &Settings,
    cmd: ReportCommands,
) -> CycleResult<()> {
    match cmd {
        ReportCommands::Forecast {
            historical,
            forecast,
            as_of,
            json,
        } => {
            let today = as_of.unwrap_or_else(|| Local::now().date_naive());
            let report = ForecastReport::generate(
                storage,
                settings,
                today,
                historical.unwrap_or(settings.forecast.historical_months),
                forecast.unwrap_or(settings.forecast.forecast_months),
            )?;
            if json {
                print_json(&report)?;
            } else {
                print!("{}", report.format_terminal(&settings.currency_symbol));
            }
        }

        ReportCommands::Profit { json } => {
            let report = CycleProfitReport::generate(storage, settings)?;
            if json {
                print_json(&report)?;
            } else {
                print!("{}", report.format_terminal(&settings.currency_symbol));
            }
        }
    }

    Ok(())
}
