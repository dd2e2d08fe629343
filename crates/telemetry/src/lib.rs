//! Step and run metrics for draftloop.
//!
//! [`MetricsObserver`] attaches to a refinement loop like any other
//! observer and counts producer/reviewer/refiner calls, failures,
//! durations and run outcomes. `report()` logs them as `[Metrics]` lines.

pub mod metrics;
pub mod model;

pub use metrics::MetricsObserver;
pub use model::{MetricsSnapshot, RunStats, StepStats};

/// Errors from the telemetry subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}
