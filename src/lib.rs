//! Cycle Ledger - financial and lifecycle engine for tutoring course cycles
//!
//! A cycle is a course sold to an institution or to private families and
//! delivered as a planned number of meetings. This library computes what each
//! completed meeting earns and costs, attributes cycle and meeting expenses,
//! concludes a cycle once its last planned meeting is done (closing its
//! registrations and opening renewal leads), and forecasts profit from the
//! meeting history.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (cycles, meetings, registrations, expenses, leads)
//! - `storage`: JSON file storage layer and per-cycle locks
//! - `services`: Rate resolution, meeting financials, expense attribution and
//!   cycle completion
//! - `reports`: Profit forecast and cycle profitability
//! - `display`: Terminal formatting
//! - `cli`: Command handlers for the `cycles` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use cycle_ledger::config::{paths::LedgerPaths, settings::Settings};
//! use cycle_ledger::models::MeetingStatus;
//! use cycle_ledger::services::MeetingService;
//! use cycle_ledger::storage::Storage;
//!
//! let paths = LedgerPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let mut storage = Storage::new(paths)?;
//! storage.load_all()?;
//!
//! let update = MeetingService::new(&storage, &settings)
//!     .update_status(meeting_id, MeetingStatus::Completed)?;
//! ```

pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod reports;
pub mod services;
pub mod storage;

pub use error::{CycleError, CycleResult};
