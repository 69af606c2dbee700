//! Error types for rate resolution and the rate cache

use crate::core::currency::Currency;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported currency code: {0}")]
pub struct UnknownCurrency(pub String);

#[derive(Debug, Error)]
pub enum RateError {
    #[error("Rate service unavailable at {url}: {source}")]
    UpstreamUnavailable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected rate service response: {0}")]
    UpstreamFormat(String),

    #[error("Currency {currency} not found in {base} exchange rates")]
    CurrencyNotFound { currency: Currency, base: Currency },

    #[error("Invalid {currency} rate {rate} in {base} exchange rates")]
    InvalidRate {
        currency: Currency,
        base: Currency,
        rate: f64,
    },

    #[error(transparent)]
    InvalidCurrency(#[from] UnknownCurrency),

    #[error("No {base} exchange rates available for {date}: {source}")]
    RateUnavailable {
        base: String,
        date: NaiveDate,
        #[source]
        source: Box<RateError>,
    },
}

impl RateError {
    /// Whether a safe conversion may substitute a default value for this failure.
    ///
    /// Bare upstream errors are only eligible once they surface through rate
    /// resolution, which wraps them in [`RateError::RateUnavailable`].
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            RateError::UpstreamUnavailable { .. } | RateError::UpstreamFormat(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache store error: {0}")]
    Store(#[from] fjall::Error),

    #[error("Cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(RateError::InvalidCurrency(UnknownCurrency("XYZ".into())).is_recoverable());
        assert!(
            RateError::CurrencyNotFound {
                currency: Currency::TON,
                base: Currency::USD
            }
            .is_recoverable()
        );
        assert!(!RateError::UpstreamFormat("missing key".into()).is_recoverable());

        let wrapped = RateError::RateUnavailable {
            base: "eur".into(),
            date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            source: Box::new(RateError::UpstreamFormat("missing key".into())),
        };
        assert!(wrapped.is_recoverable());
        assert_eq!(
            wrapped.to_string(),
            "No eur exchange rates available for 2024-04-01: Unexpected rate service response: missing key"
        );
    }
}
