//! Grocery checklist built on the Basket reducer architecture.
//!
//! Items move between a "to get" list and a "cart" list, can be starred, deleted with a
//! swipe, and the whole list survives restarts through a debounced write to a key-value
//! store. It demonstrates:
//!
//! - Pure next-state functions for every list operation
//! - Debounced persistence through runtime effects
//! - Validated rehydration with fallback to a template
//! - Headless gesture state machines for swipe-to-delete and long press
//!
//! # Quick Start
//!
//! ```no_run
//! use basket_core::environment::SystemClock;
//! use grocery_list::{JsonFileStore, ListConfig, ListName, ListStore, UuidGenerator};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ListConfig::default();
//! let storage = Arc::new(JsonFileStore::new(&config.data_dir));
//! let store = ListStore::new(config, storage, Arc::new(UuidGenerator), Arc::new(SystemClock));
//!
//! store.initialize().await?;
//! store.set_draft_text("Eggs").await?;
//! store.add_item().await?;
//! let state = store.toggle_complete(ListName::Pending, 0).await?;
//! println!("in the cart: {}", state.completed.len());
//!
//! store.close(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gesture;
pub mod reducer;
pub mod seed;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod transitions;
pub mod types;

// Re-export commonly used types
pub use config::{ConfigError, ListConfig};
pub use error::{ListError, SnapshotError};
pub use gesture::{
    LongPress, LongPressConfig, SwipeConfig, SwipeEvent, SwipeGesture, SwipeOutcome, Swipeable,
};
pub use reducer::{ListEnvironment, ListReducer, UuidGenerator, PERSIST_EFFECT_ID};
pub use snapshot::PersistedList;
pub use storage::JsonFileStore;
pub use store::ListStore;
pub use types::{Item, ItemId, ListAction, ListName, ListState, RehydrationStatus};
