use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use fxledger::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for fxledger::AppCommand {
    fn from(cmd: Commands) -> fxledger::AppCommand {
        match cmd {
            Commands::Rate { from, to, date } => fxledger::AppCommand::Rate { from, to, date },
            Commands::Convert {
                amount,
                from,
                to,
                date,
            } => fxledger::AppCommand::Convert {
                amount,
                from,
                to,
                date,
            },
            Commands::Rates { base, date } => fxledger::AppCommand::Rates { base, date },
            Commands::Report {
                input,
                currency,
                status,
            } => fxledger::AppCommand::Report {
                input,
                currency,
                status,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show how many FROM units one TO unit is worth
    Rate {
        from: String,
        to: String,
        /// Rate date (YYYY-MM-DD), latest published when omitted
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Convert an amount between two currencies
    Convert {
        amount: f64,
        from: String,
        to: String,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// List the rate table for a base currency
    Rates {
        base: String,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Convert a CSV ledger into one currency
    Report {
        input: PathBuf,
        /// Reporting currency, defaults to the configured one
        #[arg(long)]
        currency: Option<String>,
        /// Only include rows with this status
        #[arg(long)]
        status: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => fxledger::cli::setup::setup_at_path(path),
            None => fxledger::cli::setup::setup(),
        },
        Some(cmd) => fxledger::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
