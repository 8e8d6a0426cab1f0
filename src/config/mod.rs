//! Configuration module for the cycle ledger
//!
//! - XDG-compliant path resolution
//! - Engine settings persistence

pub mod paths;
pub mod settings;

pub use paths::LedgerPaths;
pub use settings::{ForecastDefaults, Settings};
