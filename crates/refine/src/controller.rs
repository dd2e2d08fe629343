//! The refinement loop controller.
//!
//! Sequences one producer call, then alternating reviewer and refiner
//! calls, until the reviewer approves or the iteration ceiling is hit.
//!
//! # Flow
//!
//! ```text
//! seed ──▶ Producer ──▶ A0
//!                        │
//!            ┌───────────┘
//!            ▼
//!        Reviewer(Ai) ──▶ verdict == token? ──yes──▶ Approved(Ai)
//!            ▲                    │no
//!            │                    ▼
//!            └──── Ai+1 ◀── Refiner(Ai, verdict)
//!                                 │ (iteration == max)
//!                                 ▼
//!                       MaxIterationsReached(Ai+1)
//! ```
//!
//! A run makes at most `1 + 2 * max_iterations` step calls. The refiner
//! never sees an approving verdict, and the artifact returned on
//! exhaustion is the last refiner output, never reviewed.

use crate::approval::ApprovalPolicy;
use crate::state::{LoopState, RoundRecord};
use draftloop_config::RefinementConfig;
use draftloop_core::error::{LoopError, StepError};
use draftloop_core::observer::{LoopObserver, RunSummary, StepEvent, StepOutcome, Termination};
use draftloop_core::step::{Artifact, Producer, Refiner, Reviewer, StepKind};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of review/refine passes after the first draft.
pub const DEFAULT_MAX_ITERATIONS: u32 = 2;

/// Result of a completed refinement run.
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    /// Unique id of the run (matches observer events)
    pub run_id: String,
    /// The final artifact
    pub artifact: Artifact,
    pub termination: Termination,
    /// Number of reviewer passes performed
    pub iterations: u32,
    /// Every verdict, in order
    pub rounds: Vec<RoundRecord>,
}

impl RefinementOutcome {
    pub fn is_approved(&self) -> bool {
        self.termination == Termination::Approved
    }
}

/// Bounded producer → (reviewer → refiner)* loop.
pub struct RefinementLoop {
    producer: Arc<dyn Producer>,
    reviewer: Arc<dyn Reviewer>,
    refiner: Arc<dyn Refiner>,
    max_iterations: u32,
    approval: ApprovalPolicy,
    observers: Vec<Arc<dyn LoopObserver>>,
}

impl RefinementLoop {
    /// Create a loop with the default ceiling and exact `"APPROVED"` policy.
    pub fn new(
        producer: Arc<dyn Producer>,
        reviewer: Arc<dyn Reviewer>,
        refiner: Arc<dyn Refiner>,
    ) -> Self {
        Self {
            producer,
            reviewer,
            refiner,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            approval: ApprovalPolicy::default(),
            observers: Vec::new(),
        }
    }

    /// Apply the `[refinement]` config section.
    pub fn with_config(self, config: &RefinementConfig) -> Self {
        self.with_max_iterations(config.max_iterations)
            .with_approval(ApprovalPolicy::from_config(config))
    }

    /// Set the iteration ceiling. `0` returns the first draft unreviewed.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_approval(mut self, approval: ApprovalPolicy) -> Self {
        self.approval = approval;
        self
    }

    /// Attach an observer. Observers are called in the order added.
    pub fn with_observer(mut self, observer: Arc<dyn LoopObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn approval(&self) -> &ApprovalPolicy {
        &self.approval
    }

    /// Run the loop to completion.
    pub async fn run(&self, seed: &str) -> Result<RefinementOutcome, LoopError> {
        self.run_with_cancel(seed, &CancellationToken::new()).await
    }

    /// Run the loop, stopping before the next step once `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        seed: &str,
        cancel: &CancellationToken,
    ) -> Result<RefinementOutcome, LoopError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();

        info!(
            run_id = %run_id,
            max_iterations = self.max_iterations,
            approval_token = %self.approval.token(),
            "Starting refinement run"
        );

        let result = self.drive(&run_id, seed, cancel).await;

        let summary = RunSummary {
            run_id: run_id.clone(),
            termination: result.as_ref().ok().map(|o| o.termination),
            iterations: match &result {
                Ok(outcome) => outcome.iterations,
                Err(e) => e.iteration(),
            },
            duration_ms: started.elapsed().as_millis() as u64,
        };
        for observer in &self.observers {
            observer.on_run_complete(&summary);
        }

        match &result {
            Ok(outcome) => info!(
                run_id = %run_id,
                termination = %outcome.termination,
                iterations = outcome.iterations,
                artifact_chars = outcome.artifact.len(),
                duration_ms = summary.duration_ms,
                "Refinement run finished"
            ),
            Err(e) => warn!(run_id = %run_id, error = %e, "Refinement run aborted"),
        }

        result
    }

    async fn drive(
        &self,
        run_id: &str,
        seed: &str,
        cancel: &CancellationToken,
    ) -> Result<RefinementOutcome, LoopError> {
        let first_draft = self
            .invoke(
                run_id,
                StepKind::Producer,
                0,
                cancel,
                self.producer.produce(seed),
                |artifact, ms| StepOutcome::ok(ms, artifact.len()),
            )
            .await?;

        let mut state = LoopState::primed(first_draft, self.max_iterations);

        while state.begin_review() {
            let iteration = state.iteration();

            let verdict = self
                .invoke(
                    run_id,
                    StepKind::Reviewer,
                    iteration,
                    cancel,
                    self.reviewer.review(state.artifact()),
                    |verdict, ms| {
                        StepOutcome::ok(ms, verdict.as_str().len())
                            .with_approval(self.approval.is_approval(verdict))
                    },
                )
                .await?;

            let approved = self.approval.is_approval(&verdict);
            debug!(run_id, iteration, approved, verdict = %verdict, "Reviewer verdict");
            state.record_verdict(verdict.clone(), approved);
            if approved {
                break;
            }

            let revised = self
                .invoke(
                    run_id,
                    StepKind::Refiner,
                    iteration,
                    cancel,
                    self.refiner.refine(state.artifact(), &verdict),
                    |artifact, ms| StepOutcome::ok(ms, artifact.len()),
                )
                .await?;
            state.apply_refinement(revised);
        }

        let termination = state
            .termination()
            .unwrap_or(Termination::MaxIterationsReached);
        if termination == Termination::MaxIterationsReached {
            warn!(
                run_id,
                max_iterations = self.max_iterations,
                "Iteration ceiling reached without approval"
            );
        }

        let (artifact, rounds, iterations) = state.into_parts();
        Ok(RefinementOutcome {
            run_id: run_id.to_string(),
            artifact,
            termination,
            iterations,
            rounds,
        })
    }

    /// Invoke one step with observer notifications around it.
    async fn invoke<T, F>(
        &self,
        run_id: &str,
        step: StepKind,
        iteration: u32,
        cancel: &CancellationToken,
        call: F,
        describe: impl FnOnce(&T, u64) -> StepOutcome,
    ) -> Result<T, LoopError>
    where
        F: Future<Output = Result<T, StepError>>,
    {
        if cancel.is_cancelled() {
            info!(run_id, step = %step, iteration, "Run cancelled");
            return Err(LoopError::Cancelled { step, iteration });
        }

        let event = StepEvent {
            run_id: run_id.to_string(),
            step,
            iteration,
        };
        for observer in &self.observers {
            observer.on_step_start(&event);
        }

        let started = Instant::now();
        let result = call.await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let outcome = match &result {
            Ok(value) => describe(value, duration_ms),
            Err(e) => StepOutcome::failed(duration_ms, e.to_string()),
        };
        for observer in &self.observers {
            observer.on_step_end(&event, &outcome);
        }

        result.map_err(|source| LoopError::StepInvocation {
            step,
            iteration,
            source,
        })
    }
}
