//! # Basket Testing
//!
//! Testing utilities and helpers for the Basket reducer architecture.
//!
//! This crate provides:
//! - Mock implementations of Environment traits
//! - An in-memory key-value store with failure and latency injection
//! - A Given-When-Then builder for reducer tests
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use basket_testing::{test_clock, InMemoryKeyValueStore, SequentialIdGenerator};
//!
//! #[tokio::test]
//! async fn test_add_item() {
//!     let storage = InMemoryKeyValueStore::new();
//!     let store = ListStore::new(config, Arc::new(storage.clone()), ids, clock);
//!     store.initialize().await?;
//!
//!     store.set_draft_text("Milk").await?;
//!     let state = store.add_item().await?;
//!     assert_eq!(state.pending.last().map(|i| i.text.as_str()), Some("Milk"));
//! }
//! ```

use basket_core::environment::{Clock, IdGenerator};
use chrono::{DateTime, Utc};

mod kv_mocks;
mod reducer_test;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use basket_testing::mocks::FixedClock;
    /// use basket_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Id generator producing `{prefix}-1`, `{prefix}-2`, ...
    ///
    /// ```
    /// use basket_testing::mocks::SequentialIdGenerator;
    /// use basket_core::environment::IdGenerator;
    ///
    /// let ids = SequentialIdGenerator::new("item");
    /// assert_eq!(ids.new_id(), "item-1");
    /// assert_eq!(ids.new_id(), "item-2");
    /// ```
    #[derive(Debug)]
    pub struct SequentialIdGenerator {
        prefix: String,
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Create a generator whose first id is `{prefix}-1`
        #[must_use]
        pub fn new(prefix: impl Into<String>) -> Self {
            Self {
                prefix: prefix.into(),
                next: AtomicU64::new(1),
            }
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn new_id(&self) -> String {
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            format!("{}-{n}", self.prefix)
        }
    }
}

// Re-export commonly used items
pub use kv_mocks::InMemoryKeyValueStore;
pub use mocks::{FixedClock, SequentialIdGenerator, test_clock};
pub use reducer_test::{ReducerTest, assertions};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_sequential_ids_are_unique() {
        let ids = SequentialIdGenerator::new("x");
        let a = ids.new_id();
        let b = ids.new_id();
        assert_ne!(a, b);
        assert_eq!(a, "x-1");
    }
}
