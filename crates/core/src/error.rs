//! Error types for the draftloop domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use crate::step::StepKind;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// A step collaborator (producer, reviewer, refiner) failed.
///
/// The controller never inspects the cause; it only wraps it with the
/// failing step and iteration.
#[derive(Debug, Clone, Error)]
pub enum StepError {
    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("{0} returned an empty completion")]
    EmptyOutput(StepKind),

    #[error("input unavailable: {0}")]
    Input(String),

    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, Error)]
pub enum LoopError {
    #[error("{step} step failed at iteration {iteration}: {source}")]
    StepInvocation {
        step: StepKind,
        iteration: u32,
        #[source]
        source: StepError,
    },

    #[error("run cancelled at {step} step, iteration {iteration}")]
    Cancelled { step: StepKind, iteration: u32 },
}

impl LoopError {
    /// The step that failed or was about to start.
    pub fn step(&self) -> StepKind {
        match self {
            Self::StepInvocation { step, .. } | Self::Cancelled { step, .. } => *step,
        }
    }

    /// The iteration the loop was in (0 = priming).
    pub fn iteration(&self) -> u32 {
        match self {
            Self::StepInvocation { iteration, .. } | Self::Cancelled { iteration, .. } => {
                *iteration
            }
        }
    }
}
