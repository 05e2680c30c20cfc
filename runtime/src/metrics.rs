//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric descriptions and recorders for the runtime:
//! - Reducer execution
//! - Effect handling (including debounce timers)
//! - Storage reads and writes
//! - Retries and the dead letter queue
//!
//! # Example
//!
//! ```rust,no_run
//! use basket_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//!
//! // Later, e.g. on shutdown or from a debug command
//! if let Some(text) = recorder.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Process-wide Prometheus recorder.
///
/// Installs a Prometheus recorder as the global `metrics` sink and renders the
/// collected values in the text exposition format on demand.
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Create a recorder that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register metric descriptions and install the global recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the Prometheus exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a metrics recorder is already installed (e.g., in tests), this logs a
    /// warning and succeeds without a handle.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder hasn't been installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Store
    describe_counter!("store.commands.total", "Total number of actions sent to stores");
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time taken to execute reducers"
    );
    describe_counter!(
        "store.effects.executed",
        "Total number of effects executed, labelled by type"
    );
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was shutting down"
    );

    // Debounce
    describe_counter!(
        "store.debounce.rearmed",
        "Pending debounced effects superseded by a newer one"
    );
    describe_counter!("store.debounce.fired", "Debounced effects that ran");
    describe_counter!(
        "store.debounce.cancelled",
        "Debounced effects cancelled before running"
    );

    // Storage
    describe_counter!("storage.reads_total", "Total number of storage reads");
    describe_counter!("storage.writes_total", "Total number of storage writes");
    describe_counter!("storage.errors_total", "Total number of failed storage operations");
    describe_histogram!(
        "storage.read_duration_seconds",
        "Time taken to read from storage, retries included"
    );
    describe_histogram!(
        "storage.write_duration_seconds",
        "Time taken to write to storage, retries included"
    );
    describe_histogram!("storage.write_bytes", "Size of values written to storage");

    // Retry and DLQ
    describe_counter!("store.retry.attempt", "Total number of retry attempts");
    describe_counter!("store.retry.success", "Operations that succeeded after retrying");
    describe_counter!(
        "store.retry.exhausted",
        "Operations that exhausted their retries"
    );
    describe_gauge!("dlq.size", "Current dead letter queue size");
}

/// Storage metrics recorder.
pub struct StorageMetrics;

impl StorageMetrics {
    /// Record a completed read.
    pub fn record_read(duration: Duration, success: bool) {
        counter!("storage.reads_total").increment(1);
        histogram!("storage.read_duration_seconds").record(duration.as_secs_f64());
        if !success {
            counter!("storage.errors_total", "operation" => "read").increment(1);
        }
    }

    /// Record a completed write of `bytes` bytes.
    pub fn record_write(duration: Duration, bytes: usize, success: bool) {
        counter!("storage.writes_total").increment(1);
        histogram!("storage.write_duration_seconds").record(duration.as_secs_f64());
        // Snapshot sizes are far below f64 precision limits
        #[allow(clippy::cast_precision_loss)]
        histogram!("storage.write_bytes").record(bytes as f64);
        if !success {
            counter!("storage.errors_total", "operation" => "write").increment(1);
        }
    }
}
