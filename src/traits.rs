use chrono::{DateTime, Utc};

/// A trait for models that have a string primary key.
pub trait HasPrimaryKey {
    /// Returns the primary key of the model.
    fn primary_key(&self) -> &str;
}

/// A concurrency-safe associative container the store is built on.
///
/// Implementations must linearize operations on the same key: a reader
/// either sees the value before a `put` or after it, never a mix.
pub trait ConcurrentMap<V: Clone>: Send + Sync {
    /// Inserts or replaces the value at `key`, returning the previous value.
    fn put(&self, key: String, value: V) -> Option<V>;

    /// Replaces the value at `key` only if one is present, returning the
    /// previous value. An absent key is left absent.
    fn replace(&self, key: &str, value: V) -> Option<V>;

    /// Returns a copy of the value at `key`.
    fn get(&self, key: &str) -> Option<V>;

    /// Removes the value at `key`, returning it if it was present.
    fn remove(&self, key: &str) -> Option<V>;

    /// Returns true if `key` is present.
    fn contains(&self, key: &str) -> bool;

    /// Copies every value out at a single point in time.
    fn snapshot(&self) -> Vec<V>;

    /// Returns the number of entries.
    fn len(&self) -> usize;

    /// Returns true if there are no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A source of wall-clock time.
///
/// Used for cache deadlines and creation timestamps so both can be driven
/// deterministically.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
