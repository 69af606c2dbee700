use crate::core::currency::RateTable;
use crate::core::error::CacheError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Name of the collection holding rate tables.
pub const RATES_COLLECTION: &str = "currency_rates";

/// One stored rate table. `timestamp` is informational and never used for invalidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub base_currency: String,
    pub date: NaiveDate,
    pub rates: RateTable,
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(base_currency: &str, rates: &RateTable, date: NaiveDate) -> Self {
        Self {
            base_currency: base_currency.to_lowercase(),
            date,
            rates: rates.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Primary key of a cache entry.
pub fn entry_key(base_currency: &str, date: NaiveDate) -> String {
    format!("{}/{}", base_currency.to_lowercase(), date.format("%Y-%m-%d"))
}

/// Keyed storage of complete rate tables. Entries never expire; `put` overwrites.
#[async_trait]
pub trait RateStore: Send + Sync {
    async fn get(&self, base_currency: &str, date: NaiveDate)
    -> Result<Option<RateTable>, CacheError>;

    async fn put(
        &self,
        base_currency: &str,
        rates: &RateTable,
        date: NaiveDate,
    ) -> Result<(), CacheError>;
}
