//! Read-through cache over the transaction store.
//!
//! Two regions with independent locks: `transactions` keyed by id and
//! `allTransactions` keyed by the `(page, size)` cursor. Loaders always run
//! outside the region lock.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::model::TransactionRecord;
use crate::region_cache::{CacheConfig, CacheStatistics, RegionCache};
use crate::traits::{Clock, SystemClock};

/// Name of the by-id region
pub const TRANSACTIONS_REGION: &str = "transactions";
/// Name of the page region
pub const ALL_TRANSACTIONS_REGION: &str = "allTransactions";

/// Cursor identifying one cached listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub page: usize,
    pub size: usize,
}

impl PageKey {
    pub fn new(page: usize, size: usize) -> Self {
        Self { page, size }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page={} size={}", self.page, self.size)
    }
}

/// A materialized listing shared between the cache and its readers
pub type Page = Arc<Vec<TransactionRecord>>;

pub struct TransactionCache {
    by_id: Mutex<RegionCache<String, TransactionRecord>>,
    pages: Mutex<RegionCache<PageKey, Page>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl TransactionCache {
    /// Creates an empty cache on the system clock
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an empty cache whose deadlines are measured on `clock`
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            by_id: Mutex::new(RegionCache::new(TRANSACTIONS_REGION, &config)),
            pages: Mutex::new(RegionCache::new(ALL_TRANSACTIONS_REGION, &config)),
            config,
            clock,
        }
    }

    /// Returns the cached record for `id`, or calls `loader` and caches what
    /// it returns. `None` from the loader is passed through uncached.
    ///
    /// If any id is invalidated while `loader` runs, the loaded record is
    /// returned but not cached.
    pub fn get_or_load<F>(&self, id: &str, loader: F) -> Option<TransactionRecord>
    where
        F: FnOnce() -> Option<TransactionRecord>,
    {
        let key = id.to_string();
        let generation = {
            let mut region = self.by_id.lock();
            if let Some(record) = region.get(&key, self.clock.now()) {
                trace!("{}: hit {}", TRANSACTIONS_REGION, id);
                return Some(record);
            }
            region.generation()
        };

        trace!("{}: miss {}", TRANSACTIONS_REGION, id);
        let record = loader()?;
        self.by_id
            .lock()
            .insert_if_current(key, record.clone(), generation, self.clock.now());
        Some(record)
    }

    /// Returns the cached listing for `(page, size)`, or calls `loader` and
    /// caches its result.
    pub fn get_or_load_page<F>(&self, page: usize, size: usize, loader: F) -> Page
    where
        F: FnOnce() -> Vec<TransactionRecord>,
    {
        let key = PageKey::new(page, size);
        let generation = {
            let mut region = self.pages.lock();
            if let Some(listing) = region.get(&key, self.clock.now()) {
                trace!("{}: hit {}", ALL_TRANSACTIONS_REGION, key);
                return listing;
            }
            region.generation()
        };

        trace!("{}: miss {}", ALL_TRANSACTIONS_REGION, key);
        let listing: Page = Arc::new(loader());
        self.pages
            .lock()
            .insert_if_current(key, listing.clone(), generation, self.clock.now());
        listing
    }

    /// Drops the cached record for `id`, if any
    pub fn invalidate_by_id(&self, id: &str) {
        let removed = self.by_id.lock().invalidate(&id.to_string()).is_some();
        debug!("{}: invalidated {} (was cached: {})", TRANSACTIONS_REGION, id, removed);
    }

    /// Drops every cached listing
    pub fn invalidate_all_pages(&self) {
        self.pages.lock().invalidate_all();
        debug!("{}: cleared", ALL_TRANSACTIONS_REGION);
    }

    /// Removes expired entries from both regions. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let by_id = self.by_id.lock().evict_expired(now);
        let pages = self.pages.lock().evict_expired(now);
        if by_id + pages > 0 {
            debug!(
                "Swept {} expired entries ({}: {}, {}: {})",
                by_id + pages,
                TRANSACTIONS_REGION,
                by_id,
                ALL_TRANSACTIONS_REGION,
                pages
            );
        }
        by_id + pages
    }

    /// Spawns a task on the current tokio runtime that sweeps expired
    /// entries every `interval`. Abort the handle to stop it.
    pub fn spawn_expiry_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match cache.upgrade() {
                    Some(cache) => {
                        cache.evict_expired();
                    }
                    None => {
                        debug!("Cache dropped, stopping expiry sweeper");
                        break;
                    }
                }
            }
        })
    }

    /// Number of entries resident in the by-id region
    pub fn cached_records(&self) -> usize {
        self.by_id.lock().len()
    }

    /// Number of entries resident in the page region
    pub fn cached_pages(&self) -> usize {
        self.pages.lock().len()
    }

    /// Runs `f` over the by-id region's statistics
    pub fn with_record_statistics<R>(&self, f: impl FnOnce(&CacheStatistics) -> R) -> R {
        f(self.by_id.lock().statistics())
    }

    /// Runs `f` over the page region's statistics
    pub fn with_page_statistics<R>(&self, f: impl FnOnce(&CacheStatistics) -> R) -> R {
        f(self.pages.lock().statistics())
    }

    /// The configuration both regions were built from
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl Default for TransactionCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
