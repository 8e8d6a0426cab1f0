//! Engine settings for the cycle ledger
//!
//! Holds the tunables of the financial engine (employee cost multiplier,
//! private-cycle revenue strategy, forecast window) and presentation
//! preferences.

use serde::{Deserialize, Serialize};

use super::paths::LedgerPaths;
use crate::error::CycleError;
use crate::reports::forecast::MAX_WINDOW_MONTHS;
use crate::services::financials::PrivateRevenueStrategy;

/// Default window sizes for the forecast report
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForecastDefaults {
    /// Number of full calendar months of history to aggregate
    pub historical_months: u32,
    /// Number of months to project, starting with the current month
    pub forecast_months: u32,
}

impl Default for ForecastDefaults {
    fn default() -> Self {
        Self {
            historical_months: 6,
            forecast_months: 3,
        }
    }
}

/// User settings for the cycle ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Cost multiplier applied to employee (non-freelance) instructor rates
    #[serde(default = "default_employee_multiplier")]
    pub employee_multiplier: f64,

    /// How private-cycle registration amounts become per-meeting revenue
    #[serde(default)]
    pub private_revenue: PrivateRevenueStrategy,

    /// Forecast window defaults
    #[serde(default)]
    pub forecast: ForecastDefaults,

    /// Default currency symbol
    #[serde(default = "default_currency")]
    pub currency_symbol: String,

    /// Log filter used when neither RUST_LOG nor --verbose is given
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_employee_multiplier() -> f64 {
    1.3
}

fn default_currency() -> String {
    "$".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            employee_multiplier: default_employee_multiplier(),
            private_revenue: PrivateRevenueStrategy::default(),
            forecast: ForecastDefaults::default(),
            currency_symbol: default_currency(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_create(paths: &LedgerPaths) -> Result<Self, CycleError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| CycleError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents)
                .map_err(|e| CycleError::Config(format!("Failed to parse settings file: {}", e)))?;

            settings.validate()?;
            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &LedgerPaths) -> Result<(), CycleError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| CycleError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| CycleError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// Reject settings the engine cannot compute with
    pub fn validate(&self) -> Result<(), CycleError> {
        if !self.employee_multiplier.is_finite() || self.employee_multiplier <= 0.0 {
            return Err(CycleError::Config(format!(
                "employee_multiplier must be a positive number, got {}",
                self.employee_multiplier
            )));
        }
        if self.forecast.historical_months == 0 {
            return Err(CycleError::Config(
                "forecast.historical_months must be at least 1".into(),
            ));
        }
        if self.forecast.historical_months > MAX_WINDOW_MONTHS
            || self.forecast.forecast_months > MAX_WINDOW_MONTHS
        {
            return Err(CycleError::Config(format!(
                "forecast windows must not exceed {} months",
                MAX_WINDOW_MONTHS
            )));
        }
        Ok(())
    }
}
