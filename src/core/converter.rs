//! Rate resolution and amount conversion.
//!
//! A [`RateConverter`] answers "what is this amount, dated D, worth in currency T?"
//! by looking up a rate table for T in its [`RateStore`], fetching it from its
//! [`RateSource`] on a miss, and writing the fetched table back. Rate tables are
//! always resolved with the *target* currency as base, and amounts are divided by
//! the source currency's entry in that table.
//!
//! Concurrent misses on the same table wait for a single fetch.
//!
//! The store is an optimisation only: its failures are logged and never reach the
//! caller. [`RateConverter::safe_convert`] is the one place conversion failures are
//! recovered from.

use crate::core::cache::{RateStore, entry_key};
use crate::core::currency::{ConversionResult, Currency, RateSource, RateTable, ToCurrency, round2};
use crate::core::error::RateError;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct RateConverter {
    source: Arc<dyn RateSource>,
    cache: Arc<dyn RateStore>,
    // One lock per (base, effective date); held across the fetch and cache write
    flights: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RateConverter {
    pub fn new(source: Arc<dyn RateSource>, cache: Arc<dyn RateStore>) -> Self {
        Self {
            source,
            cache,
            flights: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the complete rate table for `base` on the day `date` resolves to.
    ///
    /// Tables are cached under the date the source actually serves for `date`, so
    /// every request clamped to the same day shares one entry.
    pub async fn resolve_rate_table(
        &self,
        base: impl ToCurrency,
        date: Option<NaiveDate>,
    ) -> Result<RateTable, RateError> {
        let base = base.to_currency()?;
        self.rate_table(base, date).await
    }

    async fn rate_table(
        &self,
        base: Currency,
        date: Option<NaiveDate>,
    ) -> Result<RateTable, RateError> {
        let key = base.as_key();
        let effective = self.source.effective_date(date);

        if let Some(rates) = self.cached(key, effective).await {
            return Ok(rates);
        }

        let flight = self.flight(&entry_key(key, effective)).await;
        let _guard = flight.lock().await;

        // Filled by a concurrent caller while this one waited
        if let Some(rates) = self.cached(key, effective).await {
            return Ok(rates);
        }

        info!(base = key, date = %effective, "Fetching new rates");
        let rates = self
            .source
            .fetch_rates(key, Some(effective))
            .await
            .map_err(|e| RateError::RateUnavailable {
                base: key.to_string(),
                date: effective,
                source: Box::new(e),
            })?;

        if let Err(e) = self.cache.put(key, &rates, effective).await {
            warn!(error = %e, base = key, date = %effective, "Rate cache write failed");
        }

        Ok(rates)
    }

    async fn cached(&self, key: &str, effective: NaiveDate) -> Option<RateTable> {
        match self.cache.get(key, effective).await {
            Ok(rates) => rates,
            Err(e) => {
                warn!(error = %e, base = key, date = %effective, "Rate cache read failed");
                None
            }
        }
    }

    async fn flight(&self, entry: &str) -> Arc<Mutex<()>> {
        let mut flights = self.flights.lock().await;
        Arc::clone(flights.entry(entry.to_string()).or_default())
    }

    /// Units of `from` per one unit of `to`, as published in the `to`-based table.
    pub async fn get_rate(
        &self,
        from: impl ToCurrency,
        to: impl ToCurrency,
        date: Option<NaiveDate>,
    ) -> Result<f64, RateError> {
        let from = from.to_currency()?;
        let to = to.to_currency()?;
        self.pair_rate(from, to, date).await
    }

    async fn pair_rate(
        &self,
        from: Currency,
        to: Currency,
        date: Option<NaiveDate>,
    ) -> Result<f64, RateError> {
        if from == to {
            return Ok(1.0);
        }

        let rates = self.rate_table(to, date).await?;
        let rate = *rates
            .get(from.as_key())
            .ok_or(RateError::CurrencyNotFound {
                currency: from,
                base: to,
            })?;

        if !rate.is_finite() || rate <= 0.0 {
            return Err(RateError::InvalidRate {
                currency: from,
                base: to,
                rate,
            });
        }
        Ok(rate)
    }

    /// Converts `amount` from `from` into `to`, rounded to two decimals.
    pub async fn convert(
        &self,
        amount: f64,
        from: impl ToCurrency,
        to: impl ToCurrency,
        date: Option<NaiveDate>,
    ) -> Result<f64, RateError> {
        let rate = self.get_rate(from, to, date).await?;
        Ok(round2(amount / rate))
    }

    /// Converts several amounts with a single rate lookup.
    pub async fn convert_many(
        &self,
        amounts: &[f64],
        from: impl ToCurrency,
        to: impl ToCurrency,
        date: Option<NaiveDate>,
    ) -> Result<Vec<f64>, RateError> {
        let rate = self.get_rate(from, to, date).await?;
        Ok(amounts.iter().map(|amount| round2(amount / rate)).collect())
    }

    async fn conversion(
        &self,
        amount: f64,
        from: Currency,
        to: Currency,
        date: Option<NaiveDate>,
    ) -> Result<ConversionResult, RateError> {
        let rate = self.pair_rate(from, to, date).await?;
        Ok(ConversionResult {
            original_amount: amount,
            converted_amount: round2(amount / rate),
            from_currency: from,
            to_currency: to,
            conversion_date: date,
            rate,
            fallback: false,
        })
    }

    /// Converts `amount`, substituting `default_value` when the conversion cannot be
    /// resolved.
    ///
    /// A substituted result carries `converted_amount = default_value`, `rate = 1.0`
    /// and `fallback = true`; currencies that could not be parsed are reported as
    /// USD. Without a default the error is returned as is.
    pub async fn safe_convert(
        &self,
        amount: f64,
        from: impl ToCurrency,
        to: impl ToCurrency,
        date: Option<NaiveDate>,
        default_value: Option<f64>,
    ) -> Result<ConversionResult, RateError> {
        let from = from.to_currency();
        let to = to.to_currency();

        let attempt = match (&from, &to) {
            (Ok(from), Ok(to)) => self.conversion(amount, *from, *to, date).await,
            (Err(e), _) | (_, Err(e)) => Err(RateError::InvalidCurrency(e.clone())),
        };

        match (attempt, default_value) {
            (Ok(result), _) => {
                debug!(%result, "Converted amount");
                Ok(result)
            }
            (Err(e), Some(default)) if e.is_recoverable() => {
                warn!(error = %e, amount, default, "Conversion failed, using default value");
                Ok(ConversionResult {
                    original_amount: amount,
                    converted_amount: default,
                    from_currency: from.unwrap_or(Currency::USD),
                    to_currency: to.unwrap_or(Currency::USD),
                    conversion_date: date,
                    rate: 1.0,
                    fallback: true,
                })
            }
            (Err(e), _) => Err(e),
        }
    }
}
