//! Thread-safe metrics observer: counts step calls, failures, durations
//! and run outcomes, and logs a report on demand.

use crate::TelemetryError;
use crate::model::MetricsSnapshot;
use chrono::Utc;
use draftloop_core::observer::{LoopObserver, RunSummary, StepEvent, StepOutcome};
use draftloop_core::step::StepKind;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};
use tracing::info;

/// Collects metrics from every run it observes.
///
/// One observer may be shared across many runs; counters accumulate
/// until [`reset`](Self::reset).
#[derive(Debug, Default)]
pub struct MetricsObserver {
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    snapshot: MetricsSnapshot,
    /// Runs whose start was counted but that have not completed yet.
    in_flight: HashSet<String>,
}

impl State {
    fn start_run(&mut self, run_id: &str) {
        if self.in_flight.insert(run_id.to_string()) {
            self.snapshot.runs.started += 1;
        }
    }
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
    }

    pub fn reset(&self) {
        *self.write() = State::default();
    }

    /// Snapshot as pretty JSON.
    pub fn to_json(&self) -> Result<String, TelemetryError> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    /// Log the current counters as `[Metrics]` lines.
    pub fn report(&self) {
        let snapshot = self.snapshot();
        let runs = &snapshot.runs;
        info!(
            "[Metrics] Runs: {} (approved {}, max iterations {}, aborted {})",
            runs.finished(),
            runs.approved,
            runs.exhausted,
            runs.aborted
        );
        for kind in StepKind::ALL {
            let stats = snapshot.step(kind);
            info!(
                "[Metrics] {} calls: {} (failed {}, avg {} ms, max {} ms)",
                kind,
                stats.invocations,
                stats.failures,
                stats.avg_duration_ms(),
                stats.max_duration_ms
            );
        }
        info!(
            "[Metrics] Revisions requested: {}",
            snapshot.revisions_requested
        );
    }
}

impl LoopObserver for MetricsObserver {
    fn on_step_start(&self, event: &StepEvent) {
        let mut state = self.write();
        state.snapshot.step_mut(event.step).invocations += 1;
        if event.step == StepKind::Producer {
            state.start_run(&event.run_id);
        }
    }

    fn on_step_end(&self, event: &StepEvent, outcome: &StepOutcome) {
        let mut state = self.write();
        let snapshot = &mut state.snapshot;
        snapshot
            .step_mut(event.step)
            .record(outcome.duration_ms, outcome.success);
        if outcome.approved == Some(false) {
            snapshot.revisions_requested += 1;
        }
    }

    fn on_run_complete(&self, summary: &RunSummary) {
        let mut state = self.write();
        // A run cancelled before priming never reached the producer.
        state.start_run(&summary.run_id);
        state.in_flight.remove(&summary.run_id);
        state.snapshot.runs.record(summary.termination, summary.iterations);
        state.snapshot.last_run_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftloop_core::observer::Termination;

    fn event(step: StepKind, iteration: u32) -> StepEvent {
        StepEvent {
            run_id: "run-1".into(),
            step,
            iteration,
        }
    }

    fn step(metrics: &MetricsObserver, kind: StepKind, iteration: u32, outcome: StepOutcome) {
        let event = event(kind, iteration);
        metrics.on_step_start(&event);
        metrics.on_step_end(&event, &outcome);
    }

    #[test]
    fn counts_steps_and_runs() {
        let metrics = MetricsObserver::new();

        step(&metrics, StepKind::Producer, 0, StepOutcome::ok(30, 120));
        step(
            &metrics,
            StepKind::Reviewer,
            1,
            StepOutcome::ok(10, 8).with_approval(false),
        );
        step(&metrics, StepKind::Refiner, 1, StepOutcome::ok(50, 140));
        step(
            &metrics,
            StepKind::Reviewer,
            2,
            StepOutcome::ok(20, 8).with_approval(true),
        );
        metrics.on_run_complete(&RunSummary {
            run_id: "run-1".into(),
            termination: Some(Termination::Approved),
            iterations: 2,
            duration_ms: 110,
        });

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.producer.invocations, 1);
        assert_eq!(snapshot.reviewer.invocations, 2);
        assert_eq!(snapshot.reviewer.avg_duration_ms(), 15);
        assert_eq!(snapshot.reviewer.max_duration_ms, 20);
        assert_eq!(snapshot.refiner.invocations, 1);
        assert_eq!(snapshot.total_step_calls(), 4);
        assert_eq!(snapshot.revisions_requested, 1);
        assert_eq!(snapshot.runs.started, 1);
        assert_eq!(snapshot.runs.approved, 1);
        assert_eq!(snapshot.runs.total_iterations, 2);
        assert!(snapshot.last_run_at.is_some());
    }

    #[test]
    fn failures_and_aborted_runs() {
        let metrics = MetricsObserver::new();
        step(
            &metrics,
            StepKind::Producer,
            0,
            StepOutcome::failed(5, "timeout"),
        );
        metrics.on_run_complete(&RunSummary {
            run_id: "run-1".into(),
            termination: None,
            iterations: 0,
            duration_ms: 5,
        });

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.producer.failures, 1);
        assert_eq!(snapshot.runs.aborted, 1);
        assert_eq!(snapshot.runs.finished(), 1);
    }

    #[test]
    fn run_cancelled_before_priming_counts_as_started() {
        let metrics = MetricsObserver::new();
        metrics.on_run_complete(&RunSummary {
            run_id: "run-1".into(),
            termination: None,
            iterations: 0,
            duration_ms: 0,
        });

        let runs = metrics.snapshot().runs;
        assert_eq!(runs.started, 1);
        assert_eq!(runs.aborted, 1);
        assert_eq!(runs.finished(), runs.started);
    }

    #[test]
    fn started_is_counted_once_per_run() {
        let metrics = MetricsObserver::new();
        for run_id in ["run-1", "run-2"] {
            let event = StepEvent {
                run_id: run_id.into(),
                step: StepKind::Producer,
                iteration: 0,
            };
            metrics.on_step_start(&event);
            let runs = metrics.snapshot().runs;
            assert_eq!(runs.finished() + 1, runs.started);
            metrics.on_step_end(&event, &StepOutcome::ok(1, 1));
            metrics.on_run_complete(&RunSummary {
                run_id: run_id.into(),
                termination: Some(Termination::MaxIterationsReached),
                iterations: 0,
                duration_ms: 1,
            });
        }

        let runs = metrics.snapshot().runs;
        assert_eq!(runs.started, 2);
        assert_eq!(runs.finished(), 2);
    }

    #[test]
    fn reset_clears_counters() {
        let metrics = MetricsObserver::new();
        step(&metrics, StepKind::Producer, 0, StepOutcome::ok(1, 1));
        metrics.report();
        metrics.reset();

        assert_eq!(metrics.snapshot().total_step_calls(), 0);
    }

    #[test]
    fn json_export() {
        let metrics = MetricsObserver::new();
        step(&metrics, StepKind::Refiner, 1, StepOutcome::ok(7, 3));
        let json = metrics.to_json().unwrap();
        assert!(json.contains("\"refiner\""));
        assert!(json.contains("\"invocations\": 1"));
    }
}
