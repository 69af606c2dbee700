//! Core rate-resolution abstractions

pub mod cache;
pub mod config;
pub mod converter;
pub mod currency;
pub mod error;
pub mod log;

// Re-export main types for cleaner imports
pub use cache::{CacheEntry, RateStore};
pub use converter::RateConverter;
pub use currency::{ConversionResult, Currency, RateSource, RateTable, ToCurrency};
pub use error::{CacheError, RateError, UnknownCurrency};
