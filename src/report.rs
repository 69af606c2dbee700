//! Ledger rows and their conversion into a single reporting currency.

use crate::core::RateConverter;
use crate::core::currency::{Currency, round2};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::future::join_all;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub id: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Reads ledger rows from a CSV file with a header row.
///
/// When `status` is given, only rows carrying exactly that status are kept.
pub fn read_ledger<P: AsRef<Path>>(path: P, status: Option<&str>) -> Result<Vec<LedgerRow>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open ledger file: {}", path.display()))?;

    let mut rows = Vec::new();
    for (line, record) in reader.deserialize::<LedgerRow>().enumerate() {
        let row = record.with_context(|| {
            format!("Failed to parse row {} of {}", line + 1, path.display())
        })?;
        if let Some(status) = status
            && row.status.as_deref() != Some(status)
        {
            continue;
        }
        rows.push(row);
    }

    info!(path = %path.display(), rows = rows.len(), "Loaded ledger");
    Ok(rows)
}

/// Converts one row into `target`.
///
/// A row that cannot be converted keeps its original amount and currency.
pub async fn convert_row(
    converter: &RateConverter,
    mut row: LedgerRow,
    target: Currency,
) -> LedgerRow {
    if row.currency.trim().eq_ignore_ascii_case(target.code()) {
        row.amount = round2(row.amount);
        row.currency = target.code().to_string();
        return row;
    }

    match converter
        .safe_convert(
            row.amount,
            row.currency.as_str(),
            target,
            row.date,
            Some(row.amount),
        )
        .await
    {
        Ok(result) if !result.fallback => {
            debug!(id = %row.id, %result, "Converted ledger row");
            row.amount = result.converted_amount;
            row.currency = target.code().to_string();
        }
        Ok(_) => {
            debug!(id = %row.id, "Keeping original amount for ledger row");
            row.amount = round2(row.amount);
        }
        Err(e) => {
            error!(id = %row.id, error = %e, "Currency conversion error for ledger row");
            row.amount = round2(row.amount);
        }
    }
    row
}

/// Converts every row into `target`. Rows are never dropped.
pub async fn convert_rows(
    converter: &RateConverter,
    rows: Vec<LedgerRow>,
    target: Currency,
    pb: &ProgressBar,
) -> Vec<LedgerRow> {
    let futures = rows.into_iter().map(|row| async move {
        let converted = convert_row(converter, row, target).await;
        pb.inc(1);
        converted
    });
    join_all(futures).await
}

/// Sum of the rows already expressed in `target`.
pub fn total_in(rows: &[LedgerRow], target: Currency) -> f64 {
    round2(
        rows.iter()
            .filter(|row| row.currency == target.code())
            .map(|row| row.amount)
            .sum(),
    )
}
