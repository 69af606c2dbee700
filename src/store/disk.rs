use crate::core::cache::{CacheEntry, RATES_COLLECTION, RateStore, entry_key};
use crate::core::currency::RateTable;
use crate::core::error::CacheError;
use async_trait::async_trait;
use chrono::NaiveDate;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File-backed rate cache.
///
/// The keyspace handle stays open for the lifetime of the value and is flushed
/// and released when it is dropped.
pub struct DiskRateCache {
    path: PathBuf,
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskRateCache {
    /// Opens the store at `path`, creating the directory and collection when missing.
    /// Existing entries are left untouched.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(path)?;

        let keyspace = Config::new(path).open()?;
        if keyspace.partition_exists(RATES_COLLECTION) {
            info!(path = %path.display(), "Reusing existing rate cache");
        } else {
            info!(path = %path.display(), "Creating rate cache");
        }
        let partition =
            keyspace.open_partition(RATES_COLLECTION, PartitionCreateOptions::default())?;

        Ok(Self {
            path: path.to_path_buf(),
            keyspace,
            partition,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full stored entry, including the time it was written.
    pub fn entry(
        &self,
        base_currency: &str,
        date: NaiveDate,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let key = entry_key(base_currency, date);
        match self.partition.get(key.as_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RateStore for DiskRateCache {
    async fn get(
        &self,
        base_currency: &str,
        date: NaiveDate,
    ) -> Result<Option<RateTable>, CacheError> {
        let entry = self.entry(base_currency, date)?;
        if entry.is_some() {
            debug!("Cache HIT for key: {}", entry_key(base_currency, date));
        } else {
            debug!("Cache MISS for key: {}", entry_key(base_currency, date));
        }
        Ok(entry.map(|e| e.rates))
    }

    async fn put(
        &self,
        base_currency: &str,
        rates: &RateTable,
        date: NaiveDate,
    ) -> Result<(), CacheError> {
        let key = entry_key(base_currency, date);
        let entry = CacheEntry::new(base_currency, rates, date);
        self.partition.insert(key.as_bytes(), serde_json::to_vec(&entry)?)?;
        debug!("Cache PUT for key: {}", key);
        Ok(())
    }
}

impl Drop for DiskRateCache {
    fn drop(&mut self) {
        match self.keyspace.persist(PersistMode::SyncAll) {
            Ok(()) => debug!(path = %self.path.display(), "Closed rate cache"),
            Err(e) => warn!(error = %e, "Failed to flush rate cache on close"),
        }
    }
}
