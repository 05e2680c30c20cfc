//! In-memory key-value storage for fast, deterministic tests
//!
//! [`InMemoryKeyValueStore`] keeps values in a `HashMap` and records every write so
//! tests can assert on how often and with what the application persisted. Failures
//! and latency can be injected to exercise retry and error paths.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only happens after a test already panicked

use basket_core::kv_store::{KeyValueStore, KvFuture, KvStoreError};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory key-value store for testing.
///
/// Clones share the same underlying data, so a test can hand one clone to the
/// application and keep another for assertions.
///
/// # Example
///
/// ```
/// use basket_testing::InMemoryKeyValueStore;
/// use basket_core::kv_store::KeyValueStore;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryKeyValueStore::new();
/// store.set("GROCERY_LIST", "{}".to_string()).await.unwrap();
///
/// assert_eq!(store.value("GROCERY_LIST").as_deref(), Some("{}"));
/// assert_eq!(store.write_count(), 1);
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<Mutex<Vec<(String, String)>>>,
    set_failures: Arc<Mutex<VecDeque<KvStoreError>>>,
    get_failure: Arc<Mutex<Option<KvStoreError>>>,
    reads: Arc<AtomicUsize>,
    in_flight_writes: Arc<AtomicUsize>,
    max_in_flight_writes: Arc<AtomicUsize>,
    latency: Option<Duration>,
}

impl InMemoryKeyValueStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without recording it as a write
    #[must_use]
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.lock().unwrap().insert(key.into(), value.into());
        self
    }

    /// Delay every read and write by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next `count` writes fail with `error`
    pub fn fail_next_sets(&self, count: usize, error: KvStoreError) {
        let mut failures = self.set_failures.lock().unwrap();
        for _ in 0..count {
            failures.push_back(error.clone());
        }
    }

    /// Make every read fail with `error` until cleared with [`Self::clear_get_failure`]
    pub fn fail_gets_with(&self, error: KvStoreError) {
        *self.get_failure.lock().unwrap() = Some(error);
    }

    /// Stop failing reads
    pub fn clear_get_failure(&self) {
        *self.get_failure.lock().unwrap() = None;
    }

    /// Current value stored under `key`
    #[must_use]
    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Every successful write in order, as `(key, value)` pairs
    #[must_use]
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }

    /// Number of successful writes
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    /// Number of reads attempted, failed ones included
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Highest number of writes that were in progress at the same time
    #[must_use]
    pub fn max_concurrent_writes(&self) -> usize {
        self.max_in_flight_writes.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get<'a>(&'a self, key: &'a str) -> KvFuture<'a, Option<String>> {
        Box::pin(async move {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.simulate_latency().await;

            if let Some(error) = self.get_failure.lock().unwrap().clone() {
                return Err(error);
            }
            Ok(self.entries.lock().unwrap().get(key).cloned())
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> KvFuture<'a, ()> {
        Box::pin(async move {
            let now = self.in_flight_writes.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight_writes.fetch_max(now, Ordering::SeqCst);

            self.simulate_latency().await;

            let failure = self.set_failures.lock().unwrap().pop_front();
            let result = match failure {
                Some(error) => Err(error),
                None => {
                    self.entries
                        .lock()
                        .unwrap()
                        .insert(key.to_string(), value.clone());
                    self.writes.lock().unwrap().push((key.to_string(), value));
                    Ok(())
                },
            };

            self.in_flight_writes.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_reads_none() {
        let store = InMemoryKeyValueStore::new();
        assert_eq!(store.get("absent").await, Ok(None));
        assert_eq!(store.read_count(), 1);
    }

    #[tokio::test]
    async fn test_seeded_entry_is_not_a_write() {
        let store = InMemoryKeyValueStore::new().with_entry("k", "v");
        assert_eq!(store.get("k").await, Ok(Some("v".to_string())));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_set_failures_are_consumed_in_order() {
        let store = InMemoryKeyValueStore::new();
        store.fail_next_sets(1, KvStoreError::Io("disk".to_string()));

        assert_eq!(
            store.set("k", "a".to_string()).await,
            Err(KvStoreError::Io("disk".to_string()))
        );
        assert_eq!(store.set("k", "b".to_string()).await, Ok(()));
        assert_eq!(store.writes(), vec![("k".to_string(), "b".to_string())]);
    }

    #[tokio::test]
    async fn test_get_failure_until_cleared() {
        let store = InMemoryKeyValueStore::new().with_entry("k", "v");
        store.fail_gets_with(KvStoreError::Unavailable("locked".to_string()));
        assert!(store.get("k").await.is_err());

        store.clear_get_failure();
        assert_eq!(store.get("k").await, Ok(Some("v".to_string())));
    }

    #[tokio::test]
    async fn test_clones_share_data() {
        let store = InMemoryKeyValueStore::new();
        let other = store.clone();
        other.set("k", "v".to_string()).await.unwrap();
        assert_eq!(store.value("k").as_deref(), Some("v"));
    }
}
