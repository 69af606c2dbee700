pub mod cli;
pub mod core;
pub mod providers;
pub mod report;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::{RateConverter, ToCurrency};
use crate::providers::CurrencyApiClient;
use anyhow::Result;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Rate {
        from: String,
        to: String,
        date: Option<NaiveDate>,
    },
    Convert {
        amount: f64,
        from: String,
        to: String,
        date: Option<NaiveDate>,
    },
    Rates {
        base: String,
        date: Option<NaiveDate>,
    },
    Report {
        input: PathBuf,
        currency: Option<String>,
        status: Option<String>,
    },
}

/// Wires the HTTP rate source and the on-disk cache described by `config`.
pub fn build_converter(config: &AppConfig) -> Result<RateConverter> {
    let source = CurrencyApiClient::from_config(&config.rates)?;
    let cache = store::open_rate_cache(&config.cache_dir()?);
    Ok(RateConverter::new(Arc::new(source), cache))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxledger starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let converter = build_converter(&config)?;

    let output = match command {
        AppCommand::Rate { from, to, date } => {
            cli::rates::show_rate(&converter, &from, &to, date).await?
        }
        AppCommand::Convert {
            amount,
            from,
            to,
            date,
        } => cli::rates::show_conversion(&converter, amount, &from, &to, date).await?,
        AppCommand::Rates { base, date } => cli::rates::show_rates(&converter, &base, date).await?,
        AppCommand::Report {
            input,
            currency,
            status,
        } => {
            let target = match currency {
                Some(code) => code.to_currency()?,
                None => config.currency,
            };
            cli::report::run_report(&converter, &input, target, status.as_deref()).await?
        }
    };

    println!("{output}");
    Ok(())
}
