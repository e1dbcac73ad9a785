//! The canonical in-memory store of transaction records.
//!
//! [`TransactionStore`] is generic over the [`ConcurrentMap`] it keeps its
//! records in. Two containers are provided: [`ShardedMap`], a lock-striped
//! map where writers to different shards never contend, and [`LockedMap`],
//! a single `RwLock` around a `HashMap`.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::model::TransactionRecord;
use crate::traits::{ConcurrentMap, HasPrimaryKey};

/// Default number of shards in a [`ShardedMap`]
pub const DEFAULT_SHARD_COUNT: usize = 16;

/// Configuration for the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of independently locked shards
    pub shard_count: usize,
}

impl StoreConfig {
    /// Parse a configuration from JSON; absent fields take their defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
        }
    }
}

/// A lock-striped map.
///
/// Each key hashes to one shard; operations on a key take only that
/// shard's lock. A snapshot read-locks every shard in index order before
/// copying, so it reflects a single instant.
pub struct ShardedMap<V> {
    shards: Vec<RwLock<HashMap<String, V>>>,
    hasher: RandomState,
}

impl<V> ShardedMap<V> {
    /// Creates a map with `shard_count` shards (at least one).
    pub fn new(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        Self {
            shards: (0..shard_count).map(|_| RwLock::new(HashMap::new())).collect(),
            hasher: RandomState::new(),
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, key: &str) -> &RwLock<HashMap<String, V>> {
        let index = (self.hasher.hash_one(key) as usize) % self.shards.len();
        &self.shards[index]
    }
}

impl<V> Default for ShardedMap<V> {
    fn default() -> Self {
        Self::new(DEFAULT_SHARD_COUNT)
    }
}

impl<V: Clone + Send + Sync> ConcurrentMap<V> for ShardedMap<V> {
    fn put(&self, key: String, value: V) -> Option<V> {
        self.shard(&key).write().insert(key, value)
    }

    fn replace(&self, key: &str, value: V) -> Option<V> {
        let mut shard = self.shard(key).write();
        shard.get_mut(key).map(|slot| std::mem::replace(slot, value))
    }

    fn get(&self, key: &str) -> Option<V> {
        self.shard(key).read().get(key).cloned()
    }

    fn remove(&self, key: &str) -> Option<V> {
        self.shard(key).write().remove(key)
    }

    fn contains(&self, key: &str) -> bool {
        self.shard(key).read().contains_key(key)
    }

    fn snapshot(&self) -> Vec<V> {
        let guards: Vec<_> = self.shards.iter().map(|shard| shard.read()).collect();
        let total = guards.iter().map(|guard| guard.len()).sum();
        let mut values = Vec::with_capacity(total);
        for guard in &guards {
            values.extend(guard.values().cloned());
        }
        values
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }
}

/// A map behind a single reader-writer lock.
pub struct LockedMap<V> {
    inner: RwLock<HashMap<String, V>>,
}

impl<V> LockedMap<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> Default for LockedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> ConcurrentMap<V> for LockedMap<V> {
    fn put(&self, key: String, value: V) -> Option<V> {
        self.inner.write().insert(key, value)
    }

    fn replace(&self, key: &str, value: V) -> Option<V> {
        let mut inner = self.inner.write();
        inner.get_mut(key).map(|slot| std::mem::replace(slot, value))
    }

    fn get(&self, key: &str) -> Option<V> {
        self.inner.read().get(key).cloned()
    }

    fn remove(&self, key: &str) -> Option<V> {
        self.inner.write().remove(key)
    }

    fn contains(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    fn snapshot(&self) -> Vec<V> {
        self.inner.read().values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.inner.read().len()
    }
}

/// The single source of truth for transaction records.
///
/// None of its operations fail. Existence checks and not-found policy
/// belong to the caller.
pub struct TransactionStore<M = ShardedMap<TransactionRecord>>
where
    M: ConcurrentMap<TransactionRecord>,
{
    records: M,
}

impl TransactionStore<ShardedMap<TransactionRecord>> {
    /// Creates an empty store on a [`ShardedMap`] with the default shard count.
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default())
    }

    /// Creates an empty store on a [`ShardedMap`] sized by `config`.
    pub fn with_config(config: &StoreConfig) -> Self {
        Self::with_map(ShardedMap::new(config.shard_count))
    }
}

impl Default for TransactionStore<ShardedMap<TransactionRecord>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ConcurrentMap<TransactionRecord>> TransactionStore<M> {
    /// Creates a store on the given container.
    pub fn with_map(records: M) -> Self {
        Self { records }
    }

    /// Inserts the record, replacing any record with the same id.
    pub fn put(&self, record: TransactionRecord) -> TransactionRecord {
        let key = record.primary_key().to_string();
        let replaced = self.records.put(key, record.clone()).is_some();
        trace!("Store: put {} (replaced={})", record.id, replaced);
        record
    }

    /// Replaces the record with the same id if one is stored.
    ///
    /// Returns the stored record, or `None` (storing nothing) when the id
    /// is absent. The check and the write happen under one lock.
    pub fn replace(&self, record: TransactionRecord) -> Option<TransactionRecord> {
        let replaced = self.records.replace(record.primary_key(), record.clone()).is_some();
        trace!("Store: replace {} (present={})", record.id, replaced);
        replaced.then_some(record)
    }

    /// Looks up a record by id.
    pub fn get(&self, id: &str) -> Option<TransactionRecord> {
        self.records.get(id)
    }

    /// Removes a record. Returns whether one was present.
    pub fn delete(&self, id: &str) -> bool {
        let removed = self.records.remove(id).is_some();
        trace!("Store: delete {} (removed={})", id, removed);
        removed
    }

    pub fn exists(&self, id: &str) -> bool {
        self.records.contains(id)
    }

    /// Returns every record, in no particular order.
    pub fn list_all(&self) -> Vec<TransactionRecord> {
        self.records.snapshot()
    }

    /// Returns `limit` records after skipping `offset`, ordered by
    /// timestamp and then id.
    ///
    /// The ordering is taken over a fresh snapshot, so pages are only
    /// stable across calls when no writes happen in between.
    pub fn list_page(&self, offset: usize, limit: usize) -> Vec<TransactionRecord> {
        if limit == 0 {
            return Vec::new();
        }
        let mut records = self.records.snapshot();
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        records.into_iter().skip(offset).take(limit).collect()
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }
}
