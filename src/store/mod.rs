pub mod disk;
pub mod memory;

use crate::core::cache::RateStore;
use disk::DiskRateCache;
use memory::MemoryRateCache;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Opens the persistent rate cache at `path`.
///
/// The cache only saves network calls, so a store that cannot be opened degrades
/// to an in-process cache instead of failing.
pub fn open_rate_cache(path: &Path) -> Arc<dyn RateStore> {
    match DiskRateCache::open(path) {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            warn!(
                error = %e,
                path = %path.display(),
                "Could not open rate cache, falling back to memory"
            );
            Arc::new(MemoryRateCache::new())
        }
    }
}
