mod common;

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use common::{credit, debit, init_tracing};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use transaction_ledger_cache::{
    ConcurrentMap, ShardedMap, TransactionCache, TransactionDto, TransactionError,
    TransactionRecord, TransactionService, TransactionStore,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_keep_ids_unique() {
    init_tracing();
    let service = Arc::new(TransactionService::in_memory());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                (0..100)
                    .map(|_| service.create(credit(dec!(1))).unwrap().id.unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        ids.extend(task.await.unwrap());
    }

    assert_eq!(ids.len(), 800);
    assert_eq!(service.count(), 800);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_see_latest_value_after_update_completes() {
    let service = Arc::new(TransactionService::in_memory());
    let id = service.create(credit(dec!(0))).unwrap().id.unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            let id = id.clone();
            tokio::spawn(async move {
                for _ in 0..500 {
                    service.get(&id).unwrap();
                }
            })
        })
        .collect();

    for i in 1..=200 {
        service.update(&id, credit(Decimal::from(i))).unwrap();
        // Once update returns, no reader may be served an older amount
        assert_eq!(service.get(&id).unwrap().amount, Some(Decimal::from(i)));
    }

    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(service.get(&id).unwrap().amount, Some(dec!(200)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_listing_converges_after_writers_finish() {
    let service = Arc::new(TransactionService::in_memory());

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    service.create(debit(dec!(2.50))).unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let service = service.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                let page = service.list_page(0, 25);
                assert!(page.len() <= 25);
            }
        })
    };

    for writer in writers {
        writer.await.unwrap();
    }
    reader.await.unwrap();

    let listed: usize = (0..8).map(|page| service.list_page(page, 25).len()).sum();
    assert_eq!(listed, 200);
}

/// Pauses racing threads at chosen points of a wrapped [`ShardedMap`]
struct GatedMap {
    inner: ShardedMap<TransactionRecord>,
    /// Held by every `remove` so all removers reach the map together
    remove_gate: Option<Barrier>,
    /// `replace` signals the first barrier, then waits on the second
    replace_gate: Option<Arc<(Barrier, Barrier)>>,
}

impl GatedMap {
    fn new() -> Self {
        Self {
            inner: ShardedMap::default(),
            remove_gate: None,
            replace_gate: None,
        }
    }
}

impl ConcurrentMap<TransactionRecord> for GatedMap {
    fn put(&self, key: String, value: TransactionRecord) -> Option<TransactionRecord> {
        self.inner.put(key, value)
    }

    fn replace(&self, key: &str, value: TransactionRecord) -> Option<TransactionRecord> {
        if let Some(gate) = &self.replace_gate {
            let (reached, release) = gate.as_ref();
            reached.wait();
            release.wait();
        }
        self.inner.replace(key, value)
    }

    fn get(&self, key: &str) -> Option<TransactionRecord> {
        self.inner.get(key)
    }

    fn remove(&self, key: &str) -> Option<TransactionRecord> {
        if let Some(gate) = &self.remove_gate {
            gate.wait();
        }
        self.inner.remove(key)
    }

    fn contains(&self, key: &str) -> bool {
        self.inner.contains(key)
    }

    fn snapshot(&self) -> Vec<TransactionRecord> {
        self.inner.snapshot()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

fn gated_service(map: GatedMap) -> TransactionService<GatedMap> {
    TransactionService::new(
        Arc::new(TransactionStore::with_map(map)),
        Arc::new(TransactionCache::default()),
    )
}

fn shared(amount: Decimal) -> TransactionDto {
    TransactionDto {
        id: Some("shared".to_string()),
        ..credit(amount)
    }
}

#[test]
fn test_racing_deletes_succeed_exactly_once() {
    const RACERS: usize = 4;
    let service = gated_service(GatedMap {
        remove_gate: Some(Barrier::new(RACERS)),
        ..GatedMap::new()
    });
    service.create(shared(dec!(5))).unwrap();
    service.get("shared").unwrap();

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..RACERS)
            .map(|_| scope.spawn(|| service.delete("shared")))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert_eq!(result, &Err(TransactionError::NotFound("shared".to_string())));
    }
    assert_eq!(service.count(), 0);
    assert!(service.get("shared").is_err());
}

#[test]
fn test_update_does_not_resurrect_concurrently_deleted_record() {
    let gate = Arc::new((Barrier::new(2), Barrier::new(2)));
    let service = gated_service(GatedMap {
        replace_gate: Some(gate.clone()),
        ..GatedMap::new()
    });
    service.create(shared(dec!(5))).unwrap();

    let (deleted, updated) = thread::scope(|scope| {
        let updater = scope.spawn(|| service.update("shared", shared(dec!(9))));

        let (reached, release) = gate.as_ref();
        reached.wait();
        // The updater is now inside the store, before its write
        let deleted = service.delete("shared");
        release.wait();

        (deleted, updater.join().unwrap())
    });

    assert_eq!(deleted, Ok(()));
    assert_eq!(updated, Err(TransactionError::NotFound("shared".to_string())));
    assert_eq!(service.count(), 0);
    assert!(service.get("shared").is_err());
}

