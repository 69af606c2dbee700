use crate::core::cache::{CacheEntry, RateStore, entry_key};
use crate::core::currency::RateTable;
use crate::core::error::CacheError;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-process rate cache. Used when the on-disk store cannot be opened.
#[derive(Clone, Default)]
pub struct MemoryRateCache {
    inner: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl MemoryRateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[async_trait]
impl RateStore for MemoryRateCache {
    async fn get(
        &self,
        base_currency: &str,
        date: NaiveDate,
    ) -> Result<Option<RateTable>, CacheError> {
        let key = entry_key(base_currency, date);
        let cache = self.inner.lock().await;
        match cache.get(&key) {
            Some(entry) => {
                debug!("Cache HIT for key: {}", key);
                Ok(Some(entry.rates.clone()))
            }
            None => {
                debug!("Cache MISS for key: {}", key);
                Ok(None)
            }
        }
    }

    async fn put(
        &self,
        base_currency: &str,
        rates: &RateTable,
        date: NaiveDate,
    ) -> Result<(), CacheError> {
        let key = entry_key(base_currency, date);
        let entry = CacheEntry::new(base_currency, rates, date);
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for key: {}", key);
        cache.insert(key, entry);
        Ok(())
    }
}
