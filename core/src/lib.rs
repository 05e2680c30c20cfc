//! # Basket Core
//!
//! Core traits and types for the Basket reducer architecture.
//!
//! This crate provides the fundamental abstractions the checklist application is
//! built on: a pure reducer that owns every state transition, and effect
//! descriptions that the runtime executes on its behalf.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for a feature
//! - **Action**: All possible inputs to a reducer (commands and the events effects feed back)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - Explicit Effects (no hidden I/O)
//! - Dependency Injection via Environment
//!
//! ## Example
//!
//! ```ignore
//! use basket_core::*;
//!
//! #[derive(Clone, Debug)]
//! struct CounterState {
//!     count: i64,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum CounterAction {
//!     Increment,
//! }
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = CounterEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CounterState,
//!         action: CounterAction,
//!         env: &CounterEnvironment,
//!     ) -> SmallVec<[Effect<CounterAction>; 4]> {
//!         state.count += 1;
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{smallvec, SmallVec};

/// Key-value storage port used for persisting application snapshots
pub mod kv_store;

/// Declarative macros for building effects
pub mod effect_macros;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for ListReducer {
    ///     type State = ListState;
    ///     type Action = ListAction;
    ///     type Environment = ListEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut ListState,
    ///         action: ListAction,
    ///         env: &ListEnvironment,
    ///     ) -> SmallVec<[Effect<ListAction>; 4]> {
    ///         match action {
    ///             ListAction::AddItem => {
    ///                 // Business logic here
    ///                 SmallVec::new()
    ///             }
    ///             _ => SmallVec::new(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// Effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable and cancellable.
pub mod effect {
    use crate::kv_store::{KeyValueStore, KvStoreError};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::time::Duration;

    /// Callback invoked with the outcome of a storage operation
    ///
    /// Returns `Some(action)` to feed an action back into the reducer.
    pub type StorageCallback<T, Action> = Box<dyn FnOnce(T) -> Option<Action> + Send>;

    /// Identifier for a debounced effect
    ///
    /// The runtime keeps at most one pending timer per identifier per store.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct EffectId(String);

    impl EffectId {
        /// Creates a new effect identifier
        #[must_use]
        pub fn new(id: impl Into<String>) -> Self {
            Self(id.into())
        }

        /// Returns the identifier as a string slice
        #[must_use]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl std::fmt::Display for EffectId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    /// Key-value storage operations executed by the runtime
    ///
    /// The store handle travels inside the effect so reducers stay free of I/O;
    /// the callbacks turn the outcome into actions.
    pub enum StorageOperation<Action> {
        /// Read the value stored under `key`
        Get {
            /// Storage backend
            store: Arc<dyn KeyValueStore>,
            /// Key to read
            key: String,
            /// Called with the stored value (`None` when the key is absent)
            on_success: StorageCallback<Option<String>, Action>,
            /// Called when the read fails after retries
            on_error: StorageCallback<KvStoreError, Action>,
        },

        /// Write `value` under `key`, replacing any previous value
        Set {
            /// Storage backend
            store: Arc<dyn KeyValueStore>,
            /// Key to write
            key: String,
            /// Value to write
            value: String,
            /// Called once the write is acknowledged
            on_success: StorageCallback<(), Action>,
            /// Called when the write fails after retries
            on_error: StorageCallback<KvStoreError, Action>,
        },
    }

    impl<Action> StorageOperation<Action> {
        /// Key this operation targets
        #[must_use]
        pub fn key(&self) -> &str {
            match self {
                Self::Get { key, .. } | Self::Set { key, .. } => key,
            }
        }

        /// Value carried by a `Set` operation
        #[must_use]
        pub fn value(&self) -> Option<&str> {
            match self {
                Self::Get { .. } => None,
                Self::Set { value, .. } => Some(value),
            }
        }
    }

    impl<Action> std::fmt::Debug for StorageOperation<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Get { key, .. } => f
                    .debug_struct("StorageOperation::Get")
                    .field("key", key)
                    .finish_non_exhaustive(),
                Self::Set { key, value, .. } => f
                    .debug_struct("StorageOperation::Set")
                    .field("key", key)
                    .field("value_len", &value.len())
                    .finish_non_exhaustive(),
            }
        }
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (for timeouts, retries)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Run `effect` once no other `Debounce` with the same `id` has arrived for `duration`
        ///
        /// A newer debounce with the same id replaces a pending one. Effects whose
        /// quiet period already elapsed are never cancelled.
        Debounce {
            /// Timer identity, one pending timer per id
            id: EffectId,
            /// Quiet period
            duration: Duration,
            /// Effect to run when the timer fires
            effect: Box<Effect<Action>>,
        },

        /// Disarm the pending debounce timer with this id without running it
        CancelDebounce(EffectId),

        /// Key-value storage operation
        Storage(StorageOperation<Action>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Debounce {
                    id,
                    duration,
                    effect,
                } => f
                    .debug_struct("Effect::Debounce")
                    .field("id", id)
                    .field("duration", duration)
                    .field("effect", effect)
                    .finish(),
                Effect::CancelDebounce(id) => {
                    f.debug_tuple("Effect::CancelDebounce").field(id).finish()
                },
                Effect::Storage(op) => f.debug_tuple("Effect::Storage").field(op).finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Wrap this effect in a debounce timer
        #[must_use]
        pub fn debounced(self, id: EffectId, duration: Duration) -> Effect<Action> {
            Effect::Debounce {
                id,
                duration,
                effect: Box::new(self),
            }
        }

        /// Returns true if this is `Effect::None`
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Generates identifiers that are unique for the lifetime of the application
    pub trait IdGenerator: Send + Sync {
        /// Produce a fresh identifier
        fn new_id(&self) -> String;
    }
}
