//! Currency model and exchange-rate abstractions

use crate::core::error::{RateError, UnknownCurrency};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// Rates keyed by lower-cased currency code, relative to one base currency on one date.
pub type RateTable = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Currency {
    USD,
    EUR,
    RUB,
    UZS,
    USDT,
    INR,
    TON,
}

impl Currency {
    pub const ALL: [Currency; 7] = [
        Currency::USD,
        Currency::EUR,
        Currency::RUB,
        Currency::UZS,
        Currency::USDT,
        Currency::INR,
        Currency::TON,
    ];

    /// Upper-case code, as shown to users.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::RUB => "RUB",
            Currency::UZS => "UZS",
            Currency::USDT => "USDT",
            Currency::INR => "INR",
            Currency::TON => "TON",
        }
    }

    /// Lower-case code, as used by the rate service and the cache.
    pub fn as_key(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::RUB => "rub",
            Currency::UZS => "uzs",
            Currency::USDT => "usdt",
            Currency::INR => "inr",
            Currency::TON => "ton",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "RUB" => Ok(Currency::RUB),
            "UZS" => Ok(Currency::UZS),
            "USDT" => Ok(Currency::USDT),
            "INR" => Ok(Currency::INR),
            "TON" => Ok(Currency::TON),
            _ => Err(UnknownCurrency(s.to_string())),
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = UnknownCurrency;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Anything a caller may hand over as a currency: the enum itself or its code.
pub trait ToCurrency {
    fn to_currency(&self) -> Result<Currency, UnknownCurrency>;
}

impl ToCurrency for Currency {
    fn to_currency(&self) -> Result<Currency, UnknownCurrency> {
        Ok(*self)
    }
}

impl ToCurrency for &str {
    fn to_currency(&self) -> Result<Currency, UnknownCurrency> {
        self.parse()
    }
}

impl ToCurrency for String {
    fn to_currency(&self) -> Result<Currency, UnknownCurrency> {
        self.parse()
    }
}

impl ToCurrency for &String {
    fn to_currency(&self) -> Result<Currency, UnknownCurrency> {
        self.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub original_amount: f64,
    pub converted_amount: f64,
    pub from_currency: Currency,
    pub to_currency: Currency,
    pub conversion_date: Option<NaiveDate>,
    pub rate: f64,
    /// Set when the amount is a caller-supplied placeholder rather than a real conversion.
    pub fallback: bool,
}

impl Display for ConversionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} = {} {} (rate: {} on {})",
            self.original_amount,
            self.from_currency,
            self.converted_amount,
            self.to_currency,
            self.rate,
            self.conversion_date
                .map_or("latest".to_string(), |d| d.to_string())
        )
    }
}

#[async_trait]
pub trait RateSource: Send + Sync {
    /// The date whose data a request for `requested` is actually served with.
    fn effective_date(&self, requested: Option<NaiveDate>) -> NaiveDate;

    /// Fetches the complete rate table for `base` (lower-cased code).
    async fn fetch_rates(
        &self,
        base: &str,
        date: Option<NaiveDate>,
    ) -> Result<RateTable, RateError>;
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_parsing_is_case_insensitive() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::USD);
        assert_eq!(" Eur ".parse::<Currency>().unwrap(), Currency::EUR);
        assert_eq!("usdt".parse::<Currency>().unwrap(), Currency::USDT);
        for currency in Currency::ALL {
            assert_eq!(currency.as_key().parse::<Currency>().unwrap(), currency);
            assert_eq!(currency.code().to_lowercase(), currency.as_key());
        }
    }

    #[test]
    fn test_unknown_currency_is_rejected() {
        let err = "XYZ".parse::<Currency>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported currency code: XYZ");
        assert!("".parse::<Currency>().is_err());
    }

    #[test]
    fn test_to_currency_accepts_enum_and_strings() {
        assert_eq!(Currency::TON.to_currency().unwrap(), Currency::TON);
        assert_eq!("inr".to_currency().unwrap(), Currency::INR);
        assert_eq!("RUB".to_string().to_currency().unwrap(), Currency::RUB);
        assert!("GBP".to_currency().is_err());
    }

    #[test]
    fn test_currency_serde_uses_codes() {
        let parsed: Currency = serde_json::from_str("\"uzs\"").unwrap();
        assert_eq!(parsed, Currency::UZS);
        assert_eq!(serde_json::to_string(&Currency::UZS).unwrap(), "\"UZS\"");
        assert!(serde_json::from_str::<Currency>("\"GBP\"").is_err());
    }

    #[test]
    fn test_conversion_result_display() {
        let result = ConversionResult {
            original_amount: 100.0,
            converted_amount: 92.29,
            from_currency: Currency::USD,
            to_currency: Currency::EUR,
            conversion_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            rate: 1.0835,
            fallback: false,
        };
        assert_eq!(
            result.to_string(),
            "100 USD = 92.29 EUR (rate: 1.0835 on 2024-03-01)"
        );

        let latest = ConversionResult {
            conversion_date: None,
            ..result
        };
        assert!(latest.to_string().ends_with("on latest)"));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(100.0 / 1.0835), 92.29);
        assert_eq!(round2(1.005 * 1000.0), 1005.0);
        assert_eq!(round2(-2.345678), -2.35);
    }
}
