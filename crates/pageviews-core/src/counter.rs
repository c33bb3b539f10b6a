//! Counter store contract and the in-memory backend.
//!
//! Every backend must implement `increment_and_read` as one atomic step against
//! its storage. A read, add-in-memory, write-back sequence loses updates under
//! concurrent callers and is never acceptable here.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::error::{PageviewsError, Result};

/// Persisted visit counter (one row, one counter).
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Check that storage is reachable.
    async fn ping(&self) -> Result<()>;

    /// Atomically add 1 to `hits` and return the new value.
    ///
    /// Concurrent callers always observe distinct values; no increment is dropped.
    async fn increment_and_read(&self) -> Result<u64>;

    /// Read `hits` without changing it.
    async fn current(&self) -> Result<u64>;
}

/// Process-local counter for tests; the service binary always uses MySQL.
///
/// An unprovisioned store behaves like a table with no counter row.
#[derive(Debug)]
pub struct MemoryCounterStore {
    row: Option<AtomicU64>,
}

impl MemoryCounterStore {
    /// Provisioned store starting at `hits = 0`.
    pub fn new() -> Self {
        Self::with_hits(0)
    }

    pub fn with_hits(hits: u64) -> Self {
        Self {
            row: Some(AtomicU64::new(hits)),
        }
    }

    pub fn unprovisioned() -> Self {
        Self { row: None }
    }

    fn row(&self) -> Result<&AtomicU64> {
        self.row
            .as_ref()
            .ok_or_else(|| PageviewsError::StorageIntegrity("counter row missing".into()))
    }
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn increment_and_read(&self) -> Result<u64> {
        let prev = self
            .row()?
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |h| h.checked_add(1))
            .map_err(|h| PageviewsError::StorageIntegrity(format!("hits overflow at {h}")))?;
        Ok(prev + 1)
    }

    async fn current(&self) -> Result<u64> {
        Ok(self.row()?.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn overflow_is_an_integrity_error() {
        let store = MemoryCounterStore::with_hits(u64::MAX);
        let err = store.increment_and_read().await.unwrap_err();
        assert!(matches!(err, PageviewsError::StorageIntegrity(_)));
        assert_eq!(store.current().await.unwrap(), u64::MAX);
    }
}
