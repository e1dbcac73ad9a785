//! The transaction entity held by the store.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::traits::HasPrimaryKey;

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Credit,
    Debit,
}

/// Processing state of a transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    #[default]
    Completed,
    Failed,
}

/// A stored transaction.
///
/// Every field is populated: defaults for identity, timestamp and status are
/// filled in before a record reaches the store. Two records are equal when
/// their ids are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub amount: Decimal,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub category: String,
    pub status: TransactionStatus,
}

impl TransactionRecord {
    /// Returns the record with its id replaced by `id`.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

impl HasPrimaryKey for TransactionRecord {
    fn primary_key(&self) -> &str {
        &self.id
    }
}

impl PartialEq for TransactionRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TransactionRecord {}

impl Hash for TransactionRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
