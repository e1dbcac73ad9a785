use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use transaction_ledger_cache::{Clock, TransactionDto, TransactionType};

/// A clock that only moves when told to
#[allow(dead_code)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    #[allow(dead_code)]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        })
    }

    #[allow(dead_code)]
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Sample credit transaction
#[allow(dead_code)]
pub fn credit(amount: Decimal) -> TransactionDto {
    TransactionDto::new(amount, "Salary", TransactionType::Credit, "Income")
}

/// Sample debit transaction
#[allow(dead_code)]
pub fn debit(amount: Decimal) -> TransactionDto {
    TransactionDto::new(amount, "Groceries", TransactionType::Debit, "Food")
}

/// Installs a test subscriber once; later calls are no-ops
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
