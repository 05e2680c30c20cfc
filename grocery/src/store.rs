//! The list store: the operations the UI calls.
//!
//! [`ListStore`] wraps a runtime [`Store`] running the [`ListReducer`]. Each operation
//! sends one command and returns the state it produced, or the reason it was rejected.
//! Writes happen in the background after the debounce window.

use crate::config::ListConfig;
use crate::error::ListError;
use crate::gesture::SwipeGesture;
use crate::reducer::{ListEnvironment, ListReducer, PERSIST_EFFECT_ID};
use crate::types::{Item, ListAction, ListName, ListState, RehydrationStatus};
use basket_core::effect::EffectId;
use basket_core::environment::{Clock, IdGenerator};
use basket_core::kv_store::KeyValueStore;
use basket_runtime::{HealthCheck, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};

type ListRuntime = Store<ListState, ListAction, ListEnvironment, ListReducer>;

/// Owns the grocery list and the only operations allowed to change it
///
/// # Example
///
/// ```ignore
/// let store = ListStore::new(config, storage, Arc::new(UuidGenerator), Arc::new(SystemClock));
/// store.initialize().await?;
///
/// store.set_draft_text("Eggs").await?;
/// let state = store.add_item().await?;
/// assert_eq!(state.pending[0].name, "Eggs");
///
/// store.close(Duration::from_secs(5)).await?;
/// ```
pub struct ListStore {
    store: ListRuntime,
    config: ListConfig,
    /// Held from sending a command until its resulting state has been read
    commands: Mutex<()>,
}

impl ListStore {
    /// Creates a store whose first-run contents are the built-in template
    #[must_use]
    pub fn new(
        config: ListConfig,
        storage: Arc<dyn KeyValueStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_seed(config, storage, ids, clock, crate::seed::template())
    }

    /// Creates a store whose first-run contents are `seed`
    #[must_use]
    pub fn with_seed(
        config: ListConfig,
        storage: Arc<dyn KeyValueStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        seed: Vec<Item>,
    ) -> Self {
        let environment = ListEnvironment::new(storage, ids, clock, config.clone());
        let store = Store::with_config(
            ListState::new(seed),
            ListReducer::new(),
            environment,
            config.store.clone(),
        );

        Self {
            store,
            config,
            commands: Mutex::new(()),
        }
    }

    /// Restores the persisted list and waits until it is usable
    ///
    /// Calling it again after a successful restore does nothing.
    ///
    /// # Errors
    ///
    /// - [`ListError::Snapshot`] or [`ListError::Storage`] when the record could not
    ///   be restored. The list is usable with its template contents, but nothing is
    ///   written until [`reset_list`](Self::reset_list) or [`flush`](Self::flush).
    /// - [`ListError::NotReady`] if a restore is already running
    /// - [`ListError::UnsavedEdits`] when retrying after a failed restore would discard
    ///   edits made since. Save or reset the list first.
    /// - [`ListError::Store`] after [`close`](Self::close)
    #[tracing::instrument(skip(self))]
    pub async fn initialize(&self) -> Result<(), ListError> {
        let mut handle = {
            let _gate = self.commands.lock().await;
            let handle = self.store.send(ListAction::Initialize).await?;
            if let Some(rejection) = self.store.state(|s| s.rejection.clone()).await {
                return Err(rejection);
            }
            handle
        };

        handle.wait().await;

        self.store
            .state(|s| match s.rehydration {
                RehydrationStatus::Failed => Err(s
                    .last_error
                    .clone()
                    .unwrap_or_else(|| ListError::Storage("restore failed".to_string()))),
                _ => Ok(()),
            })
            .await
    }

    async fn dispatch(&self, action: ListAction) -> Result<ListState, ListError> {
        let _gate = self.commands.lock().await;
        self.store.send(action).await?;
        self.store
            .state(|s| s.rejection.clone().map_or_else(|| Ok(s.clone()), Err))
            .await
    }

    /// Replaces the text being typed
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NotReady`] while loading.
    pub async fn set_draft_text(&self, text: impl Into<String>) -> Result<ListState, ListError> {
        self.dispatch(ListAction::SetDraftText { text: text.into() })
            .await
    }

    /// Adds the draft text as a new pending item; does nothing when the draft is empty
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NotReady`] while loading.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self) -> Result<ListState, ListError> {
        self.dispatch(ListAction::AddItem).await
    }

    /// Stars or unstars the item at `index` of `list`
    ///
    /// # Errors
    ///
    /// Returns [`ListError::PreconditionViolation`] for an out-of-range index and
    /// [`ListError::NotReady`] while loading.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_favorite(
        &self,
        list: ListName,
        index: usize,
    ) -> Result<ListState, ListError> {
        self.dispatch(ListAction::ToggleFavorite { list, index })
            .await
    }

    /// Moves the item at `index` of `list` to the front of the other list
    ///
    /// # Errors
    ///
    /// Returns [`ListError::PreconditionViolation`] for an out-of-range index and
    /// [`ListError::NotReady`] while loading.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_complete(
        &self,
        list: ListName,
        index: usize,
    ) -> Result<ListState, ListError> {
        self.dispatch(ListAction::ToggleComplete { list, index })
            .await
    }

    /// Removes the item at `index` of `list`
    ///
    /// # Errors
    ///
    /// Returns [`ListError::PreconditionViolation`] for an out-of-range index and
    /// [`ListError::NotReady`] while loading.
    #[tracing::instrument(skip(self))]
    pub async fn delete_item(&self, list: ListName, index: usize) -> Result<ListState, ListError> {
        self.dispatch(ListAction::DeleteItem { list, index }).await
    }

    /// Starts a new list, empty or pre-filled from favorites
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NotReady`] while loading.
    #[tracing::instrument(skip(self))]
    pub async fn reset_list(&self, from_favorites: bool) -> Result<ListState, ListError> {
        self.dispatch(ListAction::ResetList { from_favorites })
            .await
    }

    /// Writes the list now and waits for storage to acknowledge it
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Storage`] when the write failed and
    /// [`ListError::NotReady`] while loading.
    #[tracing::instrument(skip(self))]
    pub async fn flush(&self) -> Result<(), ListError> {
        let mut handle = {
            let _gate = self.commands.lock().await;
            let handle = self.store.send(ListAction::Flush).await?;
            if let Some(rejection) = self.store.state(|s| s.rejection.clone()).await {
                return Err(rejection);
            }
            handle
        };

        handle.wait().await;

        self.store
            .state(|s| match &s.last_error {
                Some(error @ ListError::Storage(_)) => Err(error.clone()),
                _ => Ok(()),
            })
            .await
    }

    /// Writes any pending change and stops the store
    ///
    /// Operations called afterwards fail with [`ListError::Store`].
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Store`] if in-flight writes did not finish within `timeout`.
    #[tracing::instrument(skip(self))]
    pub async fn close(&self, timeout: Duration) -> Result<(), ListError> {
        if self.store.flush_debounced(&EffectId::new(PERSIST_EFFECT_ID)) {
            tracing::debug!("pending write flushed before shutdown");
        }
        self.store.shutdown(timeout).await?;
        Ok(())
    }

    /// Current state
    pub async fn snapshot(&self) -> ListState {
        self.store.state(Clone::clone).await
    }

    /// Events produced by storage reads and writes
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ListAction> {
        self.store.subscribe_actions()
    }

    /// Runtime health, including pending writes and the dead letter queue
    #[must_use]
    pub fn health(&self) -> HealthCheck {
        self.store.health()
    }

    /// A swipe gesture configured for this list's rows
    #[must_use]
    pub fn swipe_gesture(&self) -> SwipeGesture {
        SwipeGesture::new(self.config.swipe.clone())
    }

    /// Configuration this store was created with
    #[must_use]
    pub const fn config(&self) -> &ListConfig {
        &self.config
    }
}
