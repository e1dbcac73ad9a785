//! CRUD and paging over the store, with the cache kept coherent.
//!
//! Writes go to the store first and then invalidate:
//!
//! | operation | `transactions` | `allTransactions` |
//! |-----------|----------------|-------------------|
//! | create    | -              | cleared           |
//! | update    | id evicted     | cleared           |
//! | delete    | id evicted     | cleared           |
//!
//! No lock spans the store and the cache, so a reader may briefly observe
//! the pre-write value until the writer's invalidation returns.

use std::sync::Arc;

use tracing::debug;

use crate::cache::TransactionCache;
use crate::dto::TransactionDto;
use crate::error::{TransactionError, TransactionResult};
use crate::model::TransactionRecord;
use crate::store::{ShardedMap, TransactionStore};
use crate::traits::{Clock, ConcurrentMap, SystemClock};

pub struct TransactionService<M = ShardedMap<TransactionRecord>>
where
    M: ConcurrentMap<TransactionRecord>,
{
    store: Arc<TransactionStore<M>>,
    cache: Arc<TransactionCache>,
    clock: Arc<dyn Clock>,
}

impl<M: ConcurrentMap<TransactionRecord>> TransactionService<M> {
    pub fn new(store: Arc<TransactionStore<M>>, cache: Arc<TransactionCache>) -> Self {
        Self::with_clock(store, cache, Arc::new(SystemClock))
    }

    /// Uses `clock` for default timestamps of created records.
    pub fn with_clock(
        store: Arc<TransactionStore<M>>,
        cache: Arc<TransactionCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, cache, clock }
    }

    /// Stores a new transaction, assigning id, timestamp and status when
    /// absent.
    ///
    /// A supplied id that already exists is replaced.
    pub fn create(&self, dto: TransactionDto) -> TransactionResult<TransactionDto> {
        let record = dto.into_record(self.clock.as_ref())?;
        let saved = self.store.put(record);
        self.cache.invalidate_all_pages();
        debug!("Created transaction {}", saved.id);
        Ok(TransactionDto::from(saved))
    }

    /// Returns a transaction, from the cache when possible.
    pub fn get(&self, id: &str) -> TransactionResult<TransactionDto> {
        self.cache
            .get_or_load(id, || self.store.get(id))
            .map(TransactionDto::from)
            .ok_or_else(|| TransactionError::NotFound(id.to_string()))
    }

    /// Replaces the transaction stored under `id`. The record keeps `id`
    /// whatever the transfer object carries.
    ///
    /// A record deleted concurrently is not brought back: the existence
    /// check and the write are one store operation.
    pub fn update(&self, id: &str, dto: TransactionDto) -> TransactionResult<TransactionDto> {
        let record = dto.into_record(self.clock.as_ref())?.with_id(id);
        let updated = self
            .store
            .replace(record)
            .ok_or_else(|| TransactionError::NotFound(id.to_string()))?;
        self.cache.invalidate_by_id(id);
        self.cache.invalidate_all_pages();
        debug!("Updated transaction {}", id);
        Ok(TransactionDto::from(updated))
    }

    /// Removes the transaction stored under `id`. Of several racing
    /// deletes of one id, exactly one succeeds.
    pub fn delete(&self, id: &str) -> TransactionResult<()> {
        if !self.store.delete(id) {
            return Err(TransactionError::NotFound(id.to_string()));
        }
        self.cache.invalidate_by_id(id);
        self.cache.invalidate_all_pages();
        debug!("Deleted transaction {}", id);
        Ok(())
    }

    /// Returns the zero-based `page` of `size` transactions, oldest first.
    pub fn list_page(&self, page: usize, size: usize) -> Vec<TransactionDto> {
        let listing = self.cache.get_or_load_page(page, size, || {
            self.store.list_page(page.saturating_mul(size), size)
        });
        listing.iter().map(TransactionDto::from).collect()
    }

    pub fn count(&self) -> usize {
        self.store.count()
    }

    pub fn store(&self) -> &Arc<TransactionStore<M>> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<TransactionCache> {
        &self.cache
    }
}

impl TransactionService {
    /// Builds a service on a fresh default store and cache.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(TransactionStore::new()),
            Arc::new(TransactionCache::default()),
        )
    }
}
