//! Reducer logic for the grocery list.
//!
//! Commands are validated and applied through the pure functions in
//! [`transitions`](crate::transitions). Accepted mutations schedule a debounced write of
//! the whole list; storage outcomes come back as events.

use crate::config::ListConfig;
use crate::error::ListError;
use crate::snapshot::PersistedList;
use crate::transitions;
use crate::types::{ItemId, ListAction, ListState, RehydrationStatus};
use basket_core::effect::{Effect, EffectId};
use basket_core::environment::{Clock, IdGenerator};
use basket_core::kv_store::KeyValueStore;
use basket_core::reducer::Reducer;
use basket_core::{smallvec, storage_get, storage_set, SmallVec};
use std::sync::Arc;

/// Debounce timer shared by every write of the list
pub const PERSIST_EFFECT_ID: &str = "persist-list";

/// Item ids backed by random UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn new_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Environment dependencies for the list reducer
#[derive(Clone)]
pub struct ListEnvironment {
    /// Where the list record lives
    pub storage: Arc<dyn KeyValueStore>,
    /// Source of item ids
    pub ids: Arc<dyn IdGenerator>,
    /// Clock for save timestamps
    pub clock: Arc<dyn Clock>,
    /// Storage key, debounce window and draft persistence
    pub config: ListConfig,
}

impl ListEnvironment {
    /// Creates a new `ListEnvironment`
    #[must_use]
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        config: ListConfig,
    ) -> Self {
        Self {
            storage,
            ids,
            clock,
            config,
        }
    }
}

/// Reducer for the grocery list
#[derive(Clone, Debug, Default)]
pub struct ListReducer;

type Effects = SmallVec<[Effect<ListAction>; 4]>;

impl ListReducer {
    /// Creates a new `ListReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn accept(state: &mut ListState) {
        state.rejection = None;
        if state.last_error.as_ref().is_some_and(ListError::is_command_error) {
            state.last_error = None;
        }
    }

    fn reject(state: &mut ListState, error: ListError) -> Effects {
        tracing::warn!(error = %error, "command rejected");
        state.rejection = Some(error.clone());
        state.last_error = Some(error);
        SmallVec::new()
    }

    /// Storage write of the current list, not debounced
    fn write_effect(state: &mut ListState, env: &ListEnvironment) -> Effect<ListAction> {
        let json = match PersistedList::from_state(state, env.config.persist_draft).to_json() {
            Ok(json) => json,
            Err(error) => {
                tracing::error!(error = %error, "could not encode list");
                state.last_error = Some(error.into());
                return Effect::None;
            },
        };

        storage_set! {
            store: env.storage,
            key: env.config.storage_key,
            value: json,
            on_success: || Some(ListAction::Persisted),
            on_error: |error| Some(ListAction::PersistFailed { error: error.to_string() })
        }
    }

    /// Debounced write, withheld while the stored record could not be restored
    fn persist(state: &mut ListState, env: &ListEnvironment) -> Effects {
        if state.rehydration == RehydrationStatus::Failed {
            tracing::debug!("stored list could not be restored, withholding write");
            state.held_edits = true;
            return SmallVec::new();
        }

        match Self::write_effect(state, env) {
            Effect::None => SmallVec::new(),
            write => smallvec![write.debounced(EffectId::new(PERSIST_EFFECT_ID), env.config.debounce)],
        }
    }

    /// Turns the raw stored value into the event that ends loading
    fn restored(value: Option<String>) -> ListAction {
        match value {
            None => ListAction::Rehydrated { snapshot: None },
            Some(raw) => match PersistedList::decode(&raw) {
                Ok(record) => ListAction::Rehydrated {
                    snapshot: Some(record),
                },
                Err(error) => ListAction::RehydrationFailed {
                    error: error.into(),
                },
            },
        }
    }

    fn rehydrate_effect(env: &ListEnvironment) -> Effect<ListAction> {
        storage_get! {
            store: env.storage,
            key: env.config.storage_key,
            on_success: |value| Some(Self::restored(value)),
            on_error: |error| Some(ListAction::RehydrationFailed {
                error: ListError::Storage(error.to_string()),
            })
        }
    }

    /// Applies a fallible transition, persisting on success
    fn apply(
        state: &mut ListState,
        env: &ListEnvironment,
        next: Result<ListState, ListError>,
    ) -> Effects {
        match next {
            Ok(next) => {
                *state = next;
                Self::accept(state);
                Self::persist(state, env)
            },
            Err(error) => Self::reject(state, error),
        }
    }
}

impl Reducer for ListReducer {
    type State = ListState;
    type Action = ListAction;
    type Environment = ListEnvironment;

    #[allow(clippy::too_many_lines)] // one arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        // The seed is not the user's list until the stored record has been read.
        let unrestored = state.rehydration == RehydrationStatus::NotStarted
            && !matches!(action, ListAction::Initialize);
        if action.is_command() && (state.loading || unrestored) {
            return Self::reject(state, ListError::NotReady);
        }

        match action {
            // ========== Commands ==========
            ListAction::Initialize => {
                if state.held_edits {
                    return Self::reject(state, ListError::UnsavedEdits);
                }
                Self::accept(state);
                if !matches!(
                    state.rehydration,
                    RehydrationStatus::NotStarted | RehydrationStatus::Failed
                ) {
                    tracing::debug!(status = ?state.rehydration, "already initialized");
                    return SmallVec::new();
                }

                tracing::debug!(key = %env.config.storage_key, "restoring list");
                state.loading = true;
                state.rehydration = RehydrationStatus::InProgress;
                smallvec![Self::rehydrate_effect(env)]
            },

            ListAction::SetDraftText { text } => {
                *state = transitions::set_draft_text(state, text);
                Self::accept(state);
                if env.config.persist_draft || state.rehydration == RehydrationStatus::Failed {
                    Self::persist(state, env)
                } else {
                    SmallVec::new()
                }
            },

            ListAction::AddItem => {
                Self::accept(state);
                if state.draft_text.is_empty() {
                    tracing::debug!("empty draft, nothing to add");
                    return SmallVec::new();
                }

                let id = ItemId::new(env.ids.new_id());
                match transitions::add_item(state, id) {
                    Some(next) => {
                        *state = next;
                        Self::persist(state, env)
                    },
                    None => SmallVec::new(),
                }
            },

            ListAction::ToggleFavorite { list, index } => {
                let next = transitions::toggle_favorite(state, list, index);
                Self::apply(state, env, next)
            },

            ListAction::ToggleComplete { list, index } => {
                let next = transitions::toggle_complete(state, list, index);
                Self::apply(state, env, next)
            },

            ListAction::DeleteItem { list, index } => {
                let next = transitions::delete_item(state, list, index);
                Self::apply(state, env, next)
            },

            ListAction::ResetList { from_favorites } => {
                *state = transitions::reset_list(state, from_favorites);
                Self::accept(state);
                if state.rehydration == RehydrationStatus::Failed {
                    tracing::info!("list reset, resuming writes");
                    state.rehydration = RehydrationStatus::Fresh;
                    state.last_error = None;
                    state.held_edits = false;
                }
                Self::persist(state, env)
            },

            ListAction::Flush => {
                Self::accept(state);
                if state.rehydration == RehydrationStatus::Failed {
                    tracing::info!("explicit save, resuming writes");
                    state.rehydration = RehydrationStatus::Fresh;
                    state.last_error = None;
                    state.held_edits = false;
                }

                match Self::write_effect(state, env) {
                    Effect::None => SmallVec::new(),
                    write => smallvec![
                        Effect::CancelDebounce(EffectId::new(PERSIST_EFFECT_ID)),
                        write
                    ],
                }
            },

            // ========== Events ==========
            ListAction::Rehydrated { snapshot } => {
                if state.rehydration != RehydrationStatus::InProgress {
                    tracing::warn!("unexpected rehydration result ignored");
                    return SmallVec::new();
                }

                match snapshot {
                    Some(record) => {
                        tracing::info!(
                            pending = record.items.len(),
                            completed = record.completed_items.len(),
                            "list restored"
                        );
                        *state = transitions::rehydrate(state, record);
                    },
                    None => {
                        tracing::info!("no stored list, starting from template");
                        state.loading = false;
                        state.rehydration = RehydrationStatus::Fresh;
                        state.last_error = None;
                    },
                }
                SmallVec::new()
            },

            ListAction::RehydrationFailed { error } => {
                if state.rehydration != RehydrationStatus::InProgress {
                    tracing::warn!("unexpected rehydration failure ignored");
                    return SmallVec::new();
                }

                tracing::error!(error = %error, "stored list could not be restored, keeping template");
                state.loading = false;
                state.rehydration = RehydrationStatus::Failed;
                state.last_error = Some(error);
                SmallVec::new()
            },

            ListAction::Persisted => {
                state.last_saved_at = Some(env.clock.now());
                if matches!(state.last_error, Some(ListError::Storage(_))) {
                    state.last_error = None;
                }
                SmallVec::new()
            },

            ListAction::PersistFailed { error } => {
                tracing::warn!(error = %error, "list write failed");
                state.last_error = Some(ListError::Storage(error));
                SmallVec::new()
            },
        }
    }
}
