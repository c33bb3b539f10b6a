#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::future::join_all;
use pageviews_core::{CounterStore, MemoryCounterStore, PageviewsError};

#[tokio::test]
async fn first_call_after_provisioning_returns_one() {
    let store = MemoryCounterStore::new();
    assert_eq!(store.increment_and_read().await.unwrap(), 1);
    assert_eq!(store.current().await.unwrap(), 1);
}

#[tokio::test]
async fn sequential_calls_differ_by_one() {
    let store = MemoryCounterStore::with_hits(41);
    let a = store.increment_and_read().await.unwrap();
    let b = store.increment_and_read().await.unwrap();
    assert_eq!(a, 42);
    assert_eq!(b, a + 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_increments_are_distinct_and_gapless() {
    let h0 = 7;
    let n = 200;
    let store = Arc::new(MemoryCounterStore::with_hits(h0));

    let tasks = (0..n).map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.increment_and_read().await })
    });
    let seen: Vec<u64> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked").expect("increment failed"))
        .collect();

    let distinct: BTreeSet<u64> = seen.iter().copied().collect();
    assert_eq!(distinct.len(), seen.len(), "duplicate counts returned");
    assert_eq!(distinct, (h0 + 1..=h0 + n).collect::<BTreeSet<_>>());
    assert_eq!(store.current().await.unwrap(), h0 + n);
}

#[tokio::test]
async fn unprovisioned_store_reports_integrity_error() {
    let store = MemoryCounterStore::unprovisioned();
    assert!(store.ping().await.is_ok());

    let err = store.increment_and_read().await.unwrap_err();
    assert!(matches!(err, PageviewsError::StorageIntegrity(_)));
    assert_eq!(err.kind().as_str(), "STORAGE_INTEGRITY");

    assert!(store.current().await.is_err());
}
