use crate::core::currency::Currency;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_URL_TEMPLATE: &str =
    "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@{date}/v1/currencies/{base}.json";

fn default_url_template() -> String {
    DEFAULT_URL_TEMPLATE.to_string()
}

fn default_cutoff_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 1).unwrap_or_default()
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_currency() -> Currency {
    Currency::USD
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RatesConfig {
    /// Upstream URL with `{date}` and `{base}` placeholders.
    #[serde(default = "default_url_template")]
    pub url_template: String,
    /// Last day the upstream has published rates for.
    #[serde(default = "default_cutoff_date")]
    pub cutoff_date: NaiveDate,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        RatesConfig {
            url_template: default_url_template(),
            cutoff_date: default_cutoff_date(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Default target currency for reports.
    #[serde(default = "default_currency")]
    pub currency: Currency,
    #[serde(default)]
    pub rates: RatesConfig,
    pub cache_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currency: default_currency(),
            rates: RatesConfig::default(),
            cache_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "fxledger", "fxledger")
            .context("Could not determine project directories")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.yaml"))
    }

    /// Directory of the persistent rate cache.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.cache_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(Self::project_dirs()?.data_dir().join("cache"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
