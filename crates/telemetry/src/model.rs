//! Data model for step and run metrics.

use chrono::{DateTime, Utc};
use draftloop_core::observer::Termination;
use draftloop_core::step::StepKind;
use serde::{Deserialize, Serialize};

// ── Steps ─────────────────────────────────────────────────────────────────

/// Counters for one step kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStats {
    /// Calls started.
    pub invocations: u64,
    /// Calls that returned an error.
    pub failures: u64,
    pub total_duration_ms: u64,
    pub max_duration_ms: u64,
}

impl StepStats {
    /// Mean duration of finished calls, 0 if none finished.
    pub fn avg_duration_ms(&self) -> u64 {
        if self.invocations == 0 {
            0
        } else {
            self.total_duration_ms / self.invocations
        }
    }

    pub(crate) fn record(&mut self, duration_ms: u64, success: bool) {
        self.total_duration_ms += duration_ms;
        self.max_duration_ms = self.max_duration_ms.max(duration_ms);
        if !success {
            self.failures += 1;
        }
    }
}

// ── Runs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Runs observed, counted when priming starts or, for runs that never
    /// primed, on completion.
    pub started: u64,
    pub approved: u64,
    /// Runs that hit the iteration ceiling.
    pub exhausted: u64,
    /// Runs that ended with a step error or cancellation.
    pub aborted: u64,
    /// Reviewer passes across all finished runs.
    pub total_iterations: u64,
}

impl RunStats {
    pub fn finished(&self) -> u64 {
        self.approved + self.exhausted + self.aborted
    }

    pub(crate) fn record(&mut self, termination: Option<Termination>, iterations: u32) {
        match termination {
            Some(Termination::Approved) => self.approved += 1,
            Some(Termination::MaxIterationsReached) => self.exhausted += 1,
            None => self.aborted += 1,
        }
        self.total_iterations += u64::from(iterations);
    }
}

// ── Snapshot ──────────────────────────────────────────────────────────────

/// Point-in-time copy of all metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub producer: StepStats,
    pub reviewer: StepStats,
    pub refiner: StepStats,
    pub runs: RunStats,
    /// Reviewer verdicts classified as feedback.
    pub revisions_requested: u64,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl MetricsSnapshot {
    pub fn step(&self, kind: StepKind) -> &StepStats {
        match kind {
            StepKind::Producer => &self.producer,
            StepKind::Reviewer => &self.reviewer,
            StepKind::Refiner => &self.refiner,
        }
    }

    pub(crate) fn step_mut(&mut self, kind: StepKind) -> &mut StepStats {
        match kind {
            StepKind::Producer => &mut self.producer,
            StepKind::Reviewer => &mut self.reviewer,
            StepKind::Refiner => &mut self.refiner,
        }
    }

    /// Step calls across all kinds.
    pub fn total_step_calls(&self) -> u64 {
        StepKind::ALL
            .iter()
            .map(|kind| self.step(*kind).invocations)
            .sum()
    }
}
