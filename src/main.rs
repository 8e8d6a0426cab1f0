use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cycle_ledger::cli::{
    handle_cycle_command, handle_expense_command, handle_lead_command, handle_load_command,
    handle_meeting_command, handle_report_command,
};
use cycle_ledger::config::{paths::LedgerPaths, settings::Settings};
use cycle_ledger::storage::Storage;

#[derive(Parser)]
#[command(
    name = "cycles",
    version,
    about = "Financial and lifecycle engine for tutoring course cycles",
    long_about = "Tracks recurring course cycles and their meetings: computes \
                  per-meeting revenue and instructor cost, attributes expenses, \
                  completes cycles when their last meeting is done, and forecasts \
                  profit from the meeting history."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Meeting status and financials
    #[command(subcommand)]
    Meeting(cycle_ledger::cli::MeetingCommands),

    /// Cycle management commands
    #[command(subcommand)]
    Cycle(cycle_ledger::cli::CycleCommands),

    /// Expense recording and review
    #[command(subcommand)]
    Expense(cycle_ledger::cli::ExpenseCommands),

    /// Upsell lead follow-up
    #[command(subcommand)]
    Lead(cycle_ledger::cli::LeadCommands),

    /// Forecast and profitability reports
    #[command(subcommand)]
    Report(cycle_ledger::cli::ReportCommands),

    /// Load a YAML data set
    Load {
        /// Path to the YAML file
        file: PathBuf,
    },

    /// Initialize the data directory
    Init,

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = LedgerPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    // Priority: RUST_LOG env var > --verbose flag > configured level
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .compact()
                .with_writer(std::io::stderr),
        )
        .init();

    // Initialize storage
    let mut storage = Storage::new(paths.clone())?;
    storage.load_all()?;

    match cli.command {
        Some(Commands::Meeting(cmd)) => handle_meeting_command(&storage, &settings, cmd)?,
        Some(Commands::Cycle(cmd)) => handle_cycle_command(&storage, cmd)?,
        Some(Commands::Expense(cmd)) => handle_expense_command(&storage, &settings, cmd)?,
        Some(Commands::Lead(cmd)) => handle_lead_command(&storage, cmd)?,
        Some(Commands::Report(cmd)) => handle_report_command(&storage, &settings, cmd)?,
        Some(Commands::Load { file }) => handle_load_command(&storage, &file)?,
        Some(Commands::Init) => {
            println!("Initializing cycle ledger at: {}", paths.base_dir().display());
            storage.save_all()?;
            settings.save(&paths)?;
            println!("Initialization complete!");
            println!();
            println!("Run 'cycles load <file.yaml>' to import instructors, cycles and meetings.");
        }
        Some(Commands::Config) => {
            println!("Cycle Ledger Configuration");
            println!("==========================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Settings file:    {}", paths.settings_file().display());
            println!("Initialized:      {}", storage.is_initialized());
            println!();
            println!("Settings:");
            println!("  Employee multiplier: {}", settings.employee_multiplier);
            println!("  Private revenue:     {:?}", settings.private_revenue);
            println!(
                "  Forecast window:     {} months back, {} ahead",
                settings.forecast.historical_months, settings.forecast.forecast_months
            );
            println!("  Currency symbol:     {}", settings.currency_symbol);
            println!("  Log level:           {}", settings.log_level);
        }
        None => {
            println!("Cycle Ledger - tutoring cycle finances");
            println!();
            println!("Run 'cycles --help' for usage information.");
        }
    }

    Ok(())
}
