use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default initial capacity of each cache region
pub const DEFAULT_INITIAL_CAPACITY: usize = 100;
/// Default maximum number of entries per cache region
pub const DEFAULT_MAXIMUM_SIZE: usize = 1000;
/// Default time-to-live of a cache entry, measured from its insertion
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Per-region counters.
///
/// When collection is disabled every counter stays at zero.
#[derive(Debug)]
pub struct CacheStatistics {
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheStatistics {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Lookups served from the region
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that found nothing servable, expired entries included
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Entries dropped by the size bound or past their deadline
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Calls to `invalidate` or `invalidate_all`
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    /// Fraction of lookups served; zero before the first lookup
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits() + self.misses();
        match lookups {
            0 => 0.0,
            n => self.hits() as f64 / n as f64,
        }
    }

    fn record(&self, counter: &AtomicU64, n: u64) {
        if self.enabled && n > 0 {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }

    fn record_hit(&self) {
        self.record(&self.hits, 1);
    }

    fn record_miss(&self) {
        self.record(&self.misses, 1);
    }

    fn record_evictions(&self, n: u64) {
        self.record(&self.evictions, n);
    }

    fn record_invalidation(&self) {
        self.record(&self.invalidations, 1);
    }
}

/// Entry metadata for cache management
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
    /// Position in the recency order; larger is more recent
    tick: u64,
}

/// Configuration shared by the cache regions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of entries to preallocate per region
    pub initial_capacity: usize,
    /// Maximum number of entries per region before LRU eviction
    pub maximum_size: usize,
    /// Time-to-live of an entry, counted from when it was written.
    /// Serialized as whole milliseconds under `ttl_ms`.
    #[serde(rename = "ttl_ms", with = "duration_millis")]
    pub ttl: Duration,
    /// Whether hit/miss/eviction counters are maintained
    pub record_stats: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            maximum_size: DEFAULT_MAXIMUM_SIZE,
            ttl: DEFAULT_TTL,
            record_stats: true,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with the given size bound
    pub fn new(maximum_size: usize) -> Self {
        Self {
            maximum_size,
            ..Self::default()
        }
    }

    /// Set the TTL for cache entries
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the maximum number of entries per region
    pub fn with_maximum_size(mut self, maximum_size: usize) -> Self {
        self.maximum_size = maximum_size;
        self
    }

    /// Set the number of entries preallocated per region
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Enable or disable statistics collection
    pub fn with_stats(mut self, record_stats: bool) -> Self {
        self.record_stats = record_stats;
        self
    }

    /// Parse a configuration from JSON; absent fields take their defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

mod duration_millis {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    /// A zero TTL would make every entry expire on insert, so it is rejected.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match u64::deserialize(deserializer)? {
            0 => Err(D::Error::custom("ttl_ms must be greater than zero")),
            millis => Ok(Duration::from_millis(millis)),
        }
    }
}

/// A size-bounded, expire-after-write cache region with LRU eviction.
///
/// Not synchronized itself; owners wrap it in a lock.
///
/// Invalidation is tracked with one generation counter for the whole
/// region, not per key. Invalidating any key therefore also discards loads
/// of unrelated keys that were in flight at the time; they are returned to
/// their callers but not cached. Under frequent writes this costs some hit
/// rate in exchange for bounded bookkeeping.
pub struct RegionCache<K, V> {
    name: &'static str,
    entries: HashMap<K, CacheEntry<V>>,
    /// Recency order: tick -> key, oldest first
    access_order: BTreeMap<u64, K>,
    next_tick: u64,
    /// Bumped by every invalidation
    generation: u64,
    maximum_size: usize,
    ttl: Duration,
    statistics: CacheStatistics,
}

impl<K: Hash + Eq + Clone + Debug, V: Clone> RegionCache<K, V> {
    /// Creates an empty region with the given configuration
    pub fn new(name: &'static str, config: &CacheConfig) -> Self {
        Self {
            name,
            entries: HashMap::with_capacity(config.initial_capacity),
            access_order: BTreeMap::new(),
            next_tick: 0,
            generation: 0,
            maximum_size: config.maximum_size.max(1),
            ttl: config.ttl,
            statistics: CacheStatistics::new(config.record_stats),
        }
    }

    /// Gets a value if present and not past its deadline.
    ///
    /// A hit refreshes recency but never the deadline.
    pub fn get(&mut self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => self.is_expired(entry, now),
            None => {
                self.statistics.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_internal(key);
            self.statistics.record_evictions(1);
            self.statistics.record_miss();
            debug!("{}: entry {:?} expired", self.name, key);
            return None;
        }

        let tick = self.bump_tick();
        let entry = self.entries.get_mut(key)?;
        self.access_order.remove(&entry.tick);
        entry.tick = tick;
        self.access_order.insert(tick, key.clone());

        self.statistics.record_hit();
        Some(entry.value.clone())
    }

    /// Inserts or replaces a value, starting a fresh TTL clock.
    ///
    /// Evicts least recently used entries while the region is full.
    pub fn insert(&mut self, key: K, value: V, now: DateTime<Utc>) {
        if self.remove_internal(&key).is_none() {
            let mut evicted = 0;
            while self.entries.len() >= self.maximum_size {
                match self.access_order.pop_first() {
                    Some((_, oldest)) => {
                        self.entries.remove(&oldest);
                        evicted += 1;
                    }
                    None => break,
                }
            }
            if evicted > 0 {
                self.statistics.record_evictions(evicted);
                debug!("{}: evicted {} least recently used entries", self.name, evicted);
            }
        }

        let tick = self.bump_tick();
        self.access_order.insert(tick, key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                tick,
            },
        );
    }

    /// Inserts only if no invalidation, of this key or any other, happened
    /// since `generation` was read.
    ///
    /// Returns whether the value was stored.
    pub fn insert_if_current(
        &mut self,
        key: K,
        value: V,
        generation: u64,
        now: DateTime<Utc>,
    ) -> bool {
        if generation != self.generation {
            debug!("{}: discarding load of {:?} that raced an invalidation", self.name, key);
            return false;
        }
        self.insert(key, value, now);
        true
    }

    /// Removes an entry by key. Returns the removed value if it existed.
    pub fn invalidate(&mut self, key: &K) -> Option<V> {
        self.generation += 1;
        self.statistics.record_invalidation();
        self.remove_internal(key)
    }

    /// Removes every entry.
    pub fn invalidate_all(&mut self) {
        self.generation += 1;
        self.statistics.record_invalidation();
        self.entries.clear();
        self.access_order.clear();
    }

    /// Removes every entry past its deadline. Returns how many were removed.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove_internal(key);
        }
        self.statistics.record_evictions(expired.len() as u64);
        expired.len()
    }

    /// The current invalidation generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Checks if an entry is resident, expired or not
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of resident entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn statistics(&self) -> &CacheStatistics {
        &self.statistics
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.inserted_at)
            .to_std()
            .is_ok_and(|elapsed| elapsed >= self.ttl)
    }

    fn bump_tick(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }

    fn remove_internal(&mut self, key: &K) -> Option<V> {
        let entry = self.entries.remove(key)?;
        self.access_order.remove(&entry.tick);
        Some(entry.value)
    }
}
