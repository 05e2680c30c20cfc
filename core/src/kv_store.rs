//! Key-value storage port.
//!
//! The application persists a single serialized snapshot under a fixed key. This
//! module defines the minimal contract a storage backend has to satisfy for that:
//! read a string by key, write a string by key.
//!
//! # Implementations
//!
//! - `JsonFileStore` (in `grocery-list`): one file per key on local disk
//! - `InMemoryKeyValueStore` (in `basket-testing`): fast, deterministic testing with
//!   injectable failures and latency
//!
//! # Example
//!
//! ```no_run
//! use basket_core::kv_store::{KeyValueStore, KvStoreError};
//!
//! async fn example<S: KeyValueStore>(store: &S) -> Result<(), KvStoreError> {
//!     store.set("GROCERY_LIST", "{}".to_string()).await?;
//!     let value = store.get("GROCERY_LIST").await?;
//!     assert_eq!(value.as_deref(), Some("{}"));
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`KeyValueStore`] methods
pub type KvFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, KvStoreError>> + Send + 'a>>;

/// Errors that can occur during key-value storage operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KvStoreError {
    /// Underlying I/O failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The backend refused the write because it ran out of space.
    #[error("Storage quota exceeded: needed {needed} bytes, {available} available")]
    QuotaExceeded {
        /// Bytes the write required.
        needed: usize,
        /// Bytes the backend had left.
        available: usize,
    },

    /// The backend is temporarily unavailable.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Key-value storage abstraction.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to be safely used in async contexts
/// and shared across the tasks the runtime spawns for effects.
///
/// # Dyn Compatibility
///
/// Methods return explicit `Pin<Box<dyn Future>>` instead of using `async fn` so the
/// trait can be used as `Arc<dyn KeyValueStore>`. Storage effects capture the
/// backend as a trait object.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` when nothing has been stored under the key yet.
    ///
    /// # Errors
    ///
    /// Returns [`KvStoreError`] when the backend cannot be read.
    fn get<'a>(&'a self, key: &'a str) -> KvFuture<'a, Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`KvStoreError`] when the backend cannot be written.
    fn set<'a>(&'a self, key: &'a str, value: String) -> KvFuture<'a, ()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_error_message_includes_sizes() {
        let error = KvStoreError::QuotaExceeded {
            needed: 2048,
            available: 512,
        };
        let message = error.to_string();
        assert!(message.contains("2048"));
        assert!(message.contains("512"));
    }
}
