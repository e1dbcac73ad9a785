//! # Transaction Ledger Cache
//!
//! This crate provides an in-memory store for financial transaction records
//! with a read-through cache in front of its lookups and listings.
//!
//! ## Key Components
//!
//! - `TransactionStore`: Thread-safe canonical store over a pluggable `ConcurrentMap`
//! - `TransactionCache`: Two-region LRU cache with expire-after-write TTL
//! - `TransactionService`: CRUD and paging that keeps the cache coherent with the store
//! - `TransactionDto`: Wire representation, default-fill mapping and field validation

mod cache;
mod dto;
mod error;
mod model;
mod region_cache;
mod service;
mod store;
mod traits;

pub use cache::{Page, PageKey, TransactionCache, ALL_TRANSACTIONS_REGION, TRANSACTIONS_REGION};
pub use dto::TransactionDto;
pub use error::{ErrorKind, TransactionError, TransactionResult, ValidationError};
pub use model::{TransactionRecord, TransactionStatus, TransactionType};
pub use region_cache::{
    CacheConfig, CacheStatistics, RegionCache, DEFAULT_INITIAL_CAPACITY, DEFAULT_MAXIMUM_SIZE,
    DEFAULT_TTL,
};
pub use service::TransactionService;
pub use store::{LockedMap, ShardedMap, StoreConfig, TransactionStore, DEFAULT_SHARD_COUNT};
pub use traits::{Clock, ConcurrentMap, HasPrimaryKey, SystemClock};
