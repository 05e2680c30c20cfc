//! # Basket Runtime
//!
//! Runtime implementation for the Basket reducer architecture.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to reducers
//! - **Debounce Timers**: One timer per effect id per store, re-armed by newer effects
//! - **Storage Executor**: Runs key-value operations with retry and a dead letter queue
//!
//! ## Example
//!
//! ```ignore
//! use basket_runtime::Store;
//!
//! let store = Store::new(
//!     initial_state,
//!     my_reducer,
//!     environment,
//! );
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

use basket_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// An effect execution failed
        ///
        /// This error is logged but does not halt the store.
        /// Effects are fire-and-forget operations.
        #[error("Effect execution failed: {0}")]
        EffectFailed(String),

        /// A task join error occurred during parallel effect execution
        ///
        /// This typically means a spawned task panicked.
        #[error("Task failed during parallel execution: {0}")]
        TaskJoinError(#[from] tokio::task::JoinError),

        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for terminal action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        ///
        /// The action broadcast channel was closed, typically because the
        /// store is shutting down.
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

/// Health check status levels
///
/// Indicates the current health state of a component or system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthStatus {
    /// Component is fully operational
    Healthy,

    /// Component is operational but experiencing issues (e.g., high DLQ size)
    Degraded,

    /// Component is not operational
    Unhealthy,
}

impl HealthStatus {
    /// Check if status is healthy
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Check if status is degraded
    #[must_use]
    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::Degraded)
    }

    /// Check if status is unhealthy
    #[must_use]
    pub const fn is_unhealthy(self) -> bool {
        matches!(self, Self::Unhealthy)
    }

    /// Get the worst status between two statuses
    #[must_use]
    pub const fn worst(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unhealthy, _) | (_, Self::Unhealthy) => Self::Unhealthy,
            (Self::Degraded, _) | (_, Self::Degraded) => Self::Degraded,
            _ => Self::Healthy,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health check result for a component
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// Name of the component being checked
    pub component: String,

    /// Current health status
    pub status: HealthStatus,

    /// Optional message providing details
    pub message: Option<String>,

    /// Optional metadata (e.g., metrics, error counts)
    pub metadata: Vec<(String, String)>,
}

impl HealthCheck {
    /// Create a healthy check result
    #[must_use]
    pub fn healthy(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Healthy,
            message: None,
            metadata: Vec::new(),
        }
    }

    /// Create a degraded check result
    #[must_use]
    pub fn degraded(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Degraded,
            message: Some(message.into()),
            metadata: Vec::new(),
        }
    }

    /// Create an unhealthy check result
    #[must_use]
    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            metadata: Vec::new(),
        }
    }

    /// Add metadata to the health check
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }
}

/// Aggregated health report
///
/// Combines multiple health checks into an overall status.
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Overall status (worst of all checks)
    pub status: HealthStatus,

    /// Individual component checks
    pub checks: Vec<HealthCheck>,

    /// Timestamp when report was generated
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    /// Create a new health report from checks
    #[must_use]
    pub fn new(checks: Vec<HealthCheck>) -> Self {
        let status = checks
            .iter()
            .map(|c| c.status)
            .fold(HealthStatus::Healthy, HealthStatus::worst);

        Self {
            status,
            checks,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Check if overall system is healthy
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }

    /// Check if overall system is degraded
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.status.is_degraded()
    }

    /// Check if overall system is unhealthy
    #[must_use]
    pub const fn is_unhealthy(&self) -> bool {
        self.status.is_unhealthy()
    }
}

/// Retry policy for storage operations
///
/// Implements exponential backoff with jitter so a flaky storage backend is not
/// hammered with immediate retries.
///
/// # Example
///
/// ```ignore
/// use basket_runtime::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// // Or customize:
/// let policy = RetryPolicy::new()
///     .with_max_attempts(3)
///     .with_initial_delay(Duration::from_millis(50));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including initial attempt)
    max_attempts: u32,

    /// Initial delay before first retry
    initial_delay: Duration,

    /// Maximum delay between retries (caps exponential backoff)
    max_delay: Duration,

    /// Multiplier for exponential backoff (2.0 = double each time)
    backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Create a new retry policy with default settings
    ///
    /// Defaults:
    /// - `max_attempts`: 3
    /// - `initial_delay`: 100 milliseconds
    /// - `max_delay`: 2 seconds
    /// - `backoff_multiplier`: 2.0 (exponential)
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
        }
    }

    /// A policy that makes a single attempt and never retries
    #[must_use]
    pub const fn no_retry() -> Self {
        Self::new().with_max_attempts(1)
    }

    /// Set maximum attempts
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set initial delay before first retry
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay between retries
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set backoff multiplier for exponential backoff
    #[must_use]
    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculate delay for a given attempt number (0-indexed)
    ///
    /// Uses exponential backoff with jitter:
    /// `delay = min(initial_delay * multiplier^attempt, max_delay) * (0.5 + random(0.5))`
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        use rand::Rng;

        // Cast is safe since attempt counts stay tiny
        #[allow(clippy::cast_possible_wrap)]
        let base_delay_secs = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt as i32);

        let capped_secs = base_delay_secs.min(self.max_delay.as_secs_f64());

        let jitter = rand::thread_rng().gen_range(0.5..=1.0);
        let final_secs = capped_secs * jitter;

        Duration::from_secs_f64(final_secs)
    }

    /// Get maximum number of attempts
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Check if we should retry based on attempt number
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Dead letter queue entry
///
/// Represents a failed operation with metadata about the failure.
#[derive(Debug, Clone)]
pub struct DeadLetter<T> {
    /// The failed operation payload
    pub payload: T,

    /// Number of attempts made before giving up
    pub retry_count: usize,

    /// The error message from the last failure
    pub error_message: String,

    /// Timestamp when the operation was given up on
    pub failed_at: chrono::DateTime<chrono::Utc>,
}

impl<T> DeadLetter<T> {
    fn new(payload: T, error_message: String, retry_count: usize) -> Self {
        Self {
            payload,
            retry_count,
            error_message,
            failed_at: chrono::Utc::now(),
        }
    }
}

/// Dead Letter Queue for storing failed operations
///
/// The DLQ stores storage operations that failed after exhausting retries.
/// These can be inspected and surfaced to the user.
///
/// # Features
///
/// - Bounded queue with configurable max size
/// - FIFO ordering (oldest entries dropped when full)
/// - Thread-safe for concurrent access
///
/// # Example
///
/// ```ignore
/// use basket_runtime::DeadLetterQueue;
///
/// let dlq = DeadLetterQueue::new(100);
/// dlq.push("storage_set:GROCERY_LIST".to_string(), "disk full".to_string(), 3);
/// assert_eq!(dlq.len(), 1);
/// ```
#[derive(Debug)]
pub struct DeadLetterQueue<T> {
    queue: Arc<Mutex<VecDeque<DeadLetter<T>>>>,
    max_size: usize,
}

impl<T> DeadLetterQueue<T> {
    /// Create a new dead letter queue with the given max size
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            max_size,
        }
    }

    /// Push a failed operation onto the queue
    ///
    /// If the queue is full, the oldest entry is dropped.
    pub fn push(&self, payload: T, error_message: String, retry_count: usize) {
        let mut queue = self
            .queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if queue.len() >= self.max_size {
            queue.pop_front();
            ::metrics::counter!("dlq.dropped").increment(1);
            tracing::warn!(
                max_size = self.max_size,
                "DLQ at capacity, dropping oldest entry"
            );
        }

        queue.push_back(DeadLetter::new(payload, error_message, retry_count));

        // Queue size is bounded by max_size, well within f64 precision
        #[allow(clippy::cast_precision_loss)]
        ::metrics::gauge!("dlq.size").set(queue.len() as f64);
        ::metrics::counter!("dlq.pushed").increment(1);

        tracing::warn!(
            retry_count = retry_count,
            queue_size = queue.len(),
            "Operation added to dead letter queue"
        );
    }

    /// Get the current queue size
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Check if the queue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain all entries from the queue
    pub fn drain(&self) -> Vec<DeadLetter<T>> {
        let mut queue = self
            .queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let entries: Vec<_> = queue.drain(..).collect();

        ::metrics::gauge!("dlq.size").set(0.0);
        ::metrics::counter!("dlq.drained").increment(entries.len() as u64);

        entries
    }

    /// Peek at the oldest entry without removing it
    #[must_use]
    pub fn peek(&self) -> Option<DeadLetter<T>>
    where
        T: Clone,
    {
        self.queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .front()
            .cloned()
    }

    /// Get the maximum queue size
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }
}

impl<T> Clone for DeadLetterQueue<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            max_size: self.max_size,
        }
    }
}

impl<T> Default for DeadLetterQueue<T> {
    fn default() -> Self {
        Self::new(100)
    }
}

pub use error::StoreError;

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// Configuration for Store instances
///
/// # Example
///
/// ```ignore
/// let config = StoreConfig::default()
///     .with_dlq_max_size(50)
///     .with_retry_policy(RetryPolicy::no_retry());
///
/// let store = Store::with_config(state, reducer, env, config);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum size of the dead letter queue
    pub dlq_max_size: usize,
    /// Retry policy for storage operations
    pub retry_policy: RetryPolicy,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
    /// Capacity of the channel broadcasting effect-produced actions
    pub broadcast_capacity: usize,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(
        dlq_max_size: usize,
        retry_policy: RetryPolicy,
        default_shutdown_timeout: Duration,
        broadcast_capacity: usize,
    ) -> Self {
        Self {
            dlq_max_size,
            retry_policy,
            default_shutdown_timeout,
            broadcast_capacity,
        }
    }

    /// Set the DLQ maximum size
    #[must_use]
    pub const fn with_dlq_max_size(mut self, max_size: usize) -> Self {
        self.dlq_max_size = max_size;
        self
    }

    /// Set the retry policy
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }

    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dlq_max_size: 100,
            retry_policy: RetryPolicy::default(),
            default_shutdown_timeout: Duration::from_secs(5),
            broadcast_capacity: 16,
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for effects to complete.
/// Each action gets a handle that can be awaited to know when its effects are done.
/// A pending debounce counts as running until it fires or is cancelled.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the timeout expires before all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), ()> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| ())
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Ensures the effect counter is always decremented, even if the effect panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Internal: a debounce timer waiting for its quiet period to elapse
///
/// The effect stays here (not inside the timer task) so it can be flushed early
/// or dropped on cancellation.
struct PendingDebounce<A> {
    generation: u64,
    effect: Effect<A>,
    guard: DecrementGuard,
    timer: tokio::task::JoinHandle<()>,
}

type DebounceTable<A> = Arc<Mutex<HashMap<basket_core::effect::EffectId, PendingDebounce<A>>>>;

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        metrics, Arc, AtomicBool, AtomicCounterGuard, AtomicU64, AtomicUsize, DeadLetterQueue,
        DebounceTable, DecrementGuard, Duration, Effect, EffectHandle, EffectTracking,
        HashMap, HealthCheck, Mutex, Ordering, PendingDebounce, Reducer, RetryPolicy, RwLock,
        StoreConfig, StoreError,
    };
    use basket_core::effect::{EffectId, StorageOperation};
    use tokio::sync::{broadcast, watch};

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`, one reducer call at a time)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    /// 5. Debounce timers, one per [`EffectId`]
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        retry_policy: RetryPolicy,
        dlq: DeadLetterQueue<String>,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        debounces: DebounceTable<A>,
        debounce_generation: Arc<AtomicU64>,
        /// Serialises storage writes so at most one is in flight per store
        write_gate: Arc<tokio::sync::Mutex<()>>,
        /// Action broadcast channel for observing actions produced by effects.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Uses [`StoreConfig::default()`].
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                retry_policy: config.retry_policy,
                dlq: DeadLetterQueue::new(config.dlq_max_size),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                debounces: Arc::new(Mutex::new(HashMap::new())),
                debounce_generation: Arc::new(AtomicU64::new(0)),
                write_gate: Arc::new(tokio::sync::Mutex::new(())),
                action_broadcast,
            }
        }

        /// Get access to the dead letter queue
        #[must_use]
        pub fn dlq(&self) -> DeadLetterQueue<String> {
            self.dlq.clone()
        }

        /// Perform a health check on the Store
        ///
        /// Checks:
        /// - Dead letter queue size (degraded if > 50% capacity, unhealthy if full)
        /// - Store is not shutting down
        #[must_use]
        pub fn health(&self) -> HealthCheck {
            let dlq_size = self.dlq.len();
            let dlq_capacity = self.dlq.max_size().max(1);
            // Precision loss acceptable for a percentage
            #[allow(clippy::cast_precision_loss)]
            let dlq_usage = (dlq_size as f64 / dlq_capacity as f64) * 100.0;

            let check = if self.shutdown.load(Ordering::Acquire) {
                HealthCheck::unhealthy("store", "Store is shut down")
            } else if dlq_size >= dlq_capacity {
                HealthCheck::unhealthy("store", "Dead letter queue is full")
            } else if dlq_usage > 50.0 {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let usage_pct = dlq_usage as u32;
                HealthCheck::degraded("store", format!("Dead letter queue is {usage_pct}% full"))
            } else {
                HealthCheck::healthy("store")
            };

            check
                .with_metadata("dlq_size", dlq_size.to_string())
                .with_metadata("dlq_capacity", dlq_capacity.to_string())
                .with_metadata("pending_debounces", self.pending_debounces().to_string())
        }

        /// Number of debounce timers currently waiting to fire
        #[must_use]
        pub fn pending_debounces(&self) -> usize {
            self.debounces
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .len()
        }

        /// Initiate graceful shutdown of the store
        ///
        /// This method:
        /// 1. Sets the shutdown flag (rejecting new actions)
        /// 2. Cancels every pending debounce timer; they are never re-armed
        /// 3. Waits for in-flight effects to complete (with timeout)
        ///
        /// Flush debounced effects first with [`Store::flush_all_debounced`] if their
        /// work must not be lost.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// in-flight effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            ::metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let cancelled = self.cancel_all_debounced();
            if cancelled > 0 {
                tracing::info!(cancelled, "Cancelled pending debounce timers");
            }

            let start = tokio::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    ::metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running",
                        pending
                    );
                    ::metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Send an action to the store
        ///
        /// This is the primary way to interact with the store:
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Executes returned effects asynchronously
        /// 4. Effects may produce more actions (feedback loop)
        ///
        /// # Concurrency and Effect Execution
        ///
        /// - The reducer executes synchronously while holding a write lock
        /// - Effects execute asynchronously in spawned tasks
        /// - `send()` returns after starting effect execution, not completion
        /// - Multiple concurrent `send()` calls serialize at the reducer level
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                ::metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            ::metrics::counter!("store.commands.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let mut state = self.state.write().await;

                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                ::metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                effects
            };

            for effect in effects {
                self.execute_effect_internal(effect, tracking.clone());
            }

            Ok(handle)
        }

        /// Send an action and wait for a matching result action
        ///
        /// Subscribes to the action broadcast before sending so the result cannot
        /// be missed, then returns the first effect-produced action matching the
        /// predicate.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: Timeout expired before matching action received
        /// - [`StoreError::ChannelClosed`]: Action broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: Store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            R: Clone,
            E: Clone,
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to all actions produced by effects
        ///
        /// Only actions produced by effects are broadcast, not the ones passed to `send`.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let pending = store.state(|s| s.pending.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Fire the pending debounce with `id` immediately
        ///
        /// Returns `false` when no timer with that id is pending.
        pub fn flush_debounced(&self, id: &EffectId) -> bool
        where
            R: Clone,
            E: Clone,
        {
            let entry = self
                .debounces
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .remove(id);

            let Some(pending) = entry else {
                return false;
            };

            pending.timer.abort();
            tracing::debug!(id = %id, "Flushing debounced effect");
            self.run_debounced(id, pending);
            true
        }

        /// Fire every pending debounce immediately
        ///
        /// Returns the number of effects flushed.
        pub fn flush_all_debounced(&self) -> usize
        where
            R: Clone,
            E: Clone,
        {
            let drained: Vec<_> = self
                .debounces
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .drain()
                .collect();

            let count = drained.len();
            for (id, pending) in drained {
                pending.timer.abort();
                self.run_debounced(&id, pending);
            }
            count
        }

        fn cancel_all_debounced(&self) -> usize {
            let drained: Vec<_> = self
                .debounces
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .drain()
                .collect();

            let count = drained.len();
            for (_, pending) in drained {
                pending.timer.abort();
            }
            count
        }

        fn run_debounced(&self, id: &EffectId, pending: PendingDebounce<A>)
        where
            R: Clone,
            E: Clone,
        {
            ::metrics::counter!("store.debounce.fired").increment(1);
            tracing::trace!(id = %id, generation = pending.generation, "Debounced effect firing");

            let PendingDebounce { effect, guard, .. } = pending;
            let tracking = guard.0.clone();
            self.execute_effect_internal(effect, tracking);
            drop(guard);
        }

        fn fire_debounced(&self, id: &EffectId, generation: u64)
        where
            R: Clone,
            E: Clone,
        {
            let entry = {
                let mut table = self
                    .debounces
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                match table.get(id) {
                    Some(pending) if pending.generation == generation => table.remove(id),
                    _ => None,
                }
            };

            if let Some(pending) = entry {
                self.run_debounced(id, pending);
            }
        }

        fn arm_debounce(
            &self,
            id: EffectId,
            duration: Duration,
            effect: Effect<A>,
            tracking: EffectTracking,
        ) where
            R: Clone,
            E: Clone,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::debug!(id = %id, "Store shut down, not arming debounce");
                return;
            }

            tracking.increment();
            let guard = DecrementGuard(tracking);
            let generation = self.debounce_generation.fetch_add(1, Ordering::SeqCst) + 1;

            let mut table = self
                .debounces
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);

            if let Some(previous) = table.remove(&id) {
                previous.timer.abort();
                ::metrics::counter!("store.debounce.rearmed").increment(1);
                tracing::trace!(id = %id, "Debounce re-armed, previous effect superseded");
            }

            let store = self.clone();
            let timer_id = id.clone();
            let timer = tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                store.fire_debounced(&timer_id, generation);
            });

            table.insert(
                id,
                PendingDebounce {
                    generation,
                    effect,
                    guard,
                    timer,
                },
            );
        }

        fn cancel_debounce(&self, id: &EffectId) {
            let entry = self
                .debounces
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .remove(id);

            if let Some(pending) = entry {
                pending.timer.abort();
                ::metrics::counter!("store.debounce.cancelled").increment(1);
                tracing::debug!(id = %id, "Debounced effect cancelled");
            }
        }

        /// Retry an async operation according to the retry policy
        ///
        /// Exhausted operations are pushed to the dead letter queue.
        async fn retry_operation<F, Fut, T, Err>(
            &self,
            operation_name: &str,
            mut f: F,
        ) -> Result<T, Err>
        where
            F: FnMut() -> Fut,
            Fut: std::future::Future<Output = Result<T, Err>>,
            Err: std::fmt::Display,
        {
            let mut attempt = 0;

            loop {
                match f().await {
                    Ok(result) => {
                        if attempt > 0 {
                            ::metrics::counter!(
                                "store.retry.success",
                                "operation" => operation_name.to_string()
                            )
                            .increment(1);
                            tracing::info!(
                                operation = operation_name,
                                attempt = attempt,
                                "Operation succeeded after retry"
                            );
                        }
                        return Ok(result);
                    },
                    Err(error) => {
                        if !self.retry_policy.should_retry(attempt + 1) {
                            self.dlq.push(
                                operation_name.to_string(),
                                error.to_string(),
                                (attempt + 1) as usize,
                            );

                            ::metrics::counter!(
                                "store.retry.exhausted",
                                "operation" => operation_name.to_string()
                            )
                            .increment(1);
                            tracing::error!(
                                operation = operation_name,
                                attempt = attempt,
                                error = %error,
                                "Operation failed after exhausting retries, added to DLQ"
                            );
                            return Err(error);
                        }

                        let delay = self.retry_policy.delay_for_attempt(attempt);
                        ::metrics::counter!(
                            "store.retry.attempt",
                            "operation" => operation_name.to_string()
                        )
                        .increment(1);
                        tracing::warn!(
                            operation = operation_name,
                            attempt = attempt,
                            delay_ms = delay.as_millis(),
                            error = %error,
                            "Operation failed, retrying after delay"
                        );

                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    },
                }
            }
        }

        async fn run_storage(&self, op: StorageOperation<A>) -> Option<A> {
            match op {
                StorageOperation::Get {
                    store: backend,
                    key,
                    on_success,
                    on_error,
                } => {
                    tracing::debug!(key = %key, "Executing storage get");

                    let start = std::time::Instant::now();
                    let result = self
                        .retry_operation("storage_get", || {
                            let backend = Arc::clone(&backend);
                            let key = key.clone();
                            async move { backend.get(&key).await }
                        })
                        .await;
                    metrics::StorageMetrics::record_read(start.elapsed(), result.is_ok());

                    match result {
                        Ok(value) => {
                            tracing::debug!(key = %key, found = value.is_some(), "storage get succeeded");
                            on_success(value)
                        },
                        Err(error) => {
                            tracing::warn!(key = %key, error = %error, "storage get failed");
                            on_error(error)
                        },
                    }
                },
                StorageOperation::Set {
                    store: backend,
                    key,
                    value,
                    on_success,
                    on_error,
                } => {
                    let _gate = self.write_gate.lock().await;
                    tracing::debug!(key = %key, bytes = value.len(), "Executing storage set");

                    let start = std::time::Instant::now();
                    let result = self
                        .retry_operation("storage_set", || {
                            let backend = Arc::clone(&backend);
                            let key = key.clone();
                            let value = value.clone();
                            async move { backend.set(&key, value).await }
                        })
                        .await;
                    metrics::StorageMetrics::record_write(
                        start.elapsed(),
                        value.len(),
                        result.is_ok(),
                    );

                    match result {
                        Ok(()) => {
                            tracing::debug!(key = %key, "storage set succeeded");
                            on_success(())
                        },
                        Err(error) => {
                            tracing::warn!(key = %key, error = %error, "storage set failed");
                            on_error(error)
                        },
                    }
                },
            }
        }

        /// Spawn a tracked task whose optional result is fed back into the store
        fn spawn_tracked<F>(&self, tracking: &EffectTracking, work: F)
        where
            R: Clone,
            E: Clone,
            F: std::future::Future<Output = Option<A>> + Send + 'static,
        {
            tracking.increment();

            // Track global pending effects for shutdown
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

            let guard = DecrementGuard(tracking.clone());
            let store = self.clone();

            tokio::spawn(async move {
                let _guard = guard;
                let _pending_guard = pending_guard;

                if let Some(action) = work.await {
                    // Broadcast to observers
                    let _ = store.action_broadcast.send(action.clone());

                    // Send action back to store (auto-feedback)
                    if let Err(error) = store.send(action).await {
                        tracing::debug!(error = %error, "Feedback action dropped");
                    }
                }
            });
        }

        /// Execute an effect with tracking
        ///
        /// # Effect Types
        ///
        /// - `None`: No-op
        /// - `Future`: Executes async computation, sends resulting action if `Some`
        /// - `Delay`: Waits for duration, then sends action
        /// - `Parallel`: Executes effects concurrently
        /// - `Sequential`: Executes effects in order, waiting for each to complete
        /// - `Debounce`: (Re-)arms the timer for its id
        /// - `CancelDebounce`: Disarms the timer for its id
        /// - `Storage`: Runs a key-value operation with retry, feeds back the callback result
        ///
        /// # Error Handling Strategy
        ///
        /// Effect execution failures are logged and do not halt the store.
        /// [`DecrementGuard`] keeps the effect counter correct even if an effect panics.
        #[allow(clippy::needless_pass_by_value)] // tracking is cloned into spawned tasks
        #[tracing::instrument(skip(self, effect, tracking), name = "execute_effect")]
        fn execute_effect_internal(&self, effect: Effect<A>, tracking: EffectTracking)
        where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    ::metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    ::metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    self.spawn_tracked(&tracking, fut);
                },
                Effect::Delay { duration, action } => {
                    ::metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    self.spawn_tracked(&tracking, async move {
                        tokio::time::sleep(duration).await;
                        Some(*action)
                    });
                },
                Effect::Parallel(effects) => {
                    ::metrics::counter!("store.effects.executed", "type" => "parallel")
                        .increment(1);
                    for effect in effects {
                        self.execute_effect_internal(effect, tracking.clone());
                    }
                },
                Effect::Sequential(effects) => {
                    let effect_count = effects.len();
                    ::metrics::counter!("store.effects.executed", "type" => "sequential")
                        .increment(1);

                    let store = self.clone();
                    self.spawn_tracked(&tracking, async move {
                        for (idx, effect) in effects.into_iter().enumerate() {
                            tracing::trace!(
                                "Executing sequential effect {} of {}",
                                idx + 1,
                                effect_count
                            );

                            let (sub_tx, mut sub_rx) = watch::channel(());
                            let sub_tracking = EffectTracking {
                                counter: Arc::new(AtomicUsize::new(0)),
                                notifier: sub_tx,
                            };

                            store.execute_effect_internal(effect, sub_tracking.clone());

                            while sub_tracking.counter.load(Ordering::SeqCst) > 0 {
                                if sub_rx.changed().await.is_err() {
                                    break;
                                }
                            }
                        }
                        None
                    });
                },
                Effect::Debounce {
                    id,
                    duration,
                    effect,
                } => {
                    ::metrics::counter!("store.effects.executed", "type" => "debounce")
                        .increment(1);
                    self.arm_debounce(id, duration, *effect, tracking);
                },
                Effect::CancelDebounce(id) => {
                    ::metrics::counter!("store.effects.executed", "type" => "cancel_debounce")
                        .increment(1);
                    self.cancel_debounce(&id);
                },
                Effect::Storage(op) => {
                    ::metrics::counter!("store.effects.executed", "type" => "storage")
                        .increment(1);
                    let store = self.clone();
                    self.spawn_tracked(&tracking, async move { store.run_storage(op).await });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                retry_policy: self.retry_policy.clone(),
                dlq: self.dlq.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                debounces: Arc::clone(&self.debounces),
                debounce_generation: Arc::clone(&self.debounce_generation),
                write_gate: Arc::clone(&self.write_gate),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;
