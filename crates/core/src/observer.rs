//! Observer hooks around each step of a refinement run.
//!
//! The loop calls `on_step_start` before every step invocation and
//! `on_step_end` after it returns, whether it succeeded or not. Logging,
//! metrics and event publishing attach here without the loop knowing
//! their concrete types.

use crate::step::StepKind;
use serde::{Deserialize, Serialize};

/// Identifies one step invocation within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEvent {
    /// Unique id of the run this step belongs to
    pub run_id: String,
    /// Which collaborator is being invoked
    pub step: StepKind,
    /// Loop iteration (0 for the priming producer step)
    pub iteration: u32,
}

/// How a step invocation ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub success: bool,
    pub duration_ms: u64,
    /// Length of the artifact or verdict text returned (0 on failure)
    pub output_chars: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Reviewer steps only: whether the verdict was classified as approval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}

impl StepOutcome {
    pub fn ok(duration_ms: u64, output_chars: usize) -> Self {
        Self {
            success: true,
            duration_ms,
            output_chars,
            error: None,
            approved: None,
        }
    }

    pub fn failed(duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            success: false,
            duration_ms,
            output_chars: 0,
            error: Some(error.into()),
            approved: None,
        }
    }

    pub fn with_approval(mut self, approved: bool) -> Self {
        self.approved = Some(approved);
        self
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The reviewer returned the approval token.
    Approved,
    /// The iteration ceiling was hit without approval.
    MaxIterationsReached,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::MaxIterationsReached => write!(f, "max_iterations_reached"),
        }
    }
}

/// End-of-run summary handed to observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    /// `None` if the run aborted with an error or was cancelled
    pub termination: Option<Termination>,
    pub iterations: u32,
    pub duration_ms: u64,
}

/// Receives callbacks around every step of a refinement run.
///
/// Callbacks are synchronous and run between steps; they must not block.
pub trait LoopObserver: Send + Sync {
    fn on_step_start(&self, event: &StepEvent);

    fn on_step_end(&self, event: &StepEvent, outcome: &StepOutcome);

    fn on_run_complete(&self, _summary: &RunSummary) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn termination_display_matches_wire_name() {
        assert_eq!(Termination::Approved.to_string(), "approved");
        assert_eq!(
            Termination::MaxIterationsReached.to_string(),
            "max_iterations_reached"
        );
        let json = serde_json::to_string(&Termination::MaxIterationsReached).unwrap();
        assert_eq!(json, "\"max_iterations_reached\"");
    }

    #[test]
    fn failed_outcome_has_no_output() {
        let outcome = StepOutcome::failed(12, "boom");
        assert!(!outcome.success);
        assert_eq!(outcome.output_chars, 0);
        assert_eq!(outcome.error.as_deref(), Some("boom"));
    }
}
