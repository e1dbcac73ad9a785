//! Wire representation of a transaction and its mapping to the stored record.
//!
//! The transfer object leaves identity, timestamp and status optional;
//! [`TransactionDto::into_record`] fills them in. Field validation lives here
//! too but is never invoked by the service: callers validate before handing
//! records over.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::model::{TransactionRecord, TransactionStatus, TransactionType};
use crate::traits::Clock;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, rename = "type")]
    pub tx_type: Option<TransactionType>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TransactionStatus>,
}

impl TransactionDto {
    /// Creates a transfer object carrying only the required fields.
    pub fn new(
        amount: Decimal,
        description: impl Into<String>,
        tx_type: TransactionType,
        category: impl Into<String>,
    ) -> Self {
        Self {
            amount: Some(amount),
            description: Some(description.into()),
            tx_type: Some(tx_type),
            category: Some(category.into()),
            ..Self::default()
        }
    }

    /// Checks the fields the store relies on being well-formed.
    ///
    /// Returns the first failing rule.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.amount {
            None => return Err(ValidationError::MissingAmount),
            Some(amount) if amount <= Decimal::ZERO => {
                return Err(ValidationError::NonPositiveAmount)
            }
            Some(_) => {}
        }
        if is_blank(self.description.as_deref()) {
            return Err(ValidationError::BlankDescription);
        }
        if self.tx_type.is_none() {
            return Err(ValidationError::MissingType);
        }
        if is_blank(self.category.as_deref()) {
            return Err(ValidationError::BlankCategory);
        }
        Ok(())
    }

    /// Converts into a stored record, assigning a fresh id, the current
    /// instant and `COMPLETED` where those are absent.
    ///
    /// Fails only when a required field is missing altogether.
    pub fn into_record(self, clock: &dyn Clock) -> Result<TransactionRecord, ValidationError> {
        Ok(TransactionRecord {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            amount: self.amount.ok_or(ValidationError::MissingAmount)?,
            description: self.description.ok_or(ValidationError::BlankDescription)?,
            timestamp: self.timestamp.unwrap_or_else(|| clock.now()),
            tx_type: self.tx_type.ok_or(ValidationError::MissingType)?,
            category: self.category.ok_or(ValidationError::BlankCategory)?,
            status: self.status.unwrap_or_default(),
        })
    }
}

impl From<&TransactionRecord> for TransactionDto {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            id: Some(record.id.clone()),
            amount: Some(record.amount),
            description: Some(record.description.clone()),
            timestamp: Some(record.timestamp),
            tx_type: Some(record.tx_type),
            category: Some(record.category.clone()),
            status: Some(record.status),
        }
    }
}

impl From<TransactionRecord> for TransactionDto {
    fn from(record: TransactionRecord) -> Self {
        Self::from(&record)
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |s| s.trim().is_empty())
}
