//! Explicit loop state for one refinement run.
//!
//! ```text
//! Priming ──▶ Reviewing ──▶ Terminated(Approved)
//!                 │  ▲
//!                 ▼  │
//!              Refining ──▶ Terminated(MaxIterationsReached)
//! ```
//!
//! The state owns the current artifact and verdict; steps only ever see
//! borrows of them. The iteration count rises by exactly one per review
//! and never exceeds the ceiling.

use draftloop_core::observer::Termination;
use draftloop_core::step::{Artifact, Verdict};
use serde::{Deserialize, Serialize};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    /// The first draft exists; no review has happened yet.
    Priming,
    Reviewing,
    Refining,
    Terminated(Termination),
}

/// One reviewer pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub iteration: u32,
    pub verdict: Verdict,
    pub approved: bool,
}

#[derive(Debug, Clone)]
pub struct LoopState {
    artifact: Artifact,
    verdict: Option<Verdict>,
    iteration: u32,
    max_iterations: u32,
    phase: LoopPhase,
    rounds: Vec<RoundRecord>,
}

impl LoopState {
    /// State right after the priming producer step.
    pub fn primed(artifact: Artifact, max_iterations: u32) -> Self {
        Self {
            artifact,
            verdict: None,
            iteration: 0,
            max_iterations,
            phase: LoopPhase::Priming,
            rounds: Vec::new(),
        }
    }

    /// Start the next review pass.
    ///
    /// Returns `false` when the run is over: either it already terminated,
    /// or the ceiling is reached, in which case the state moves to
    /// `Terminated(MaxIterationsReached)`.
    pub fn begin_review(&mut self) -> bool {
        if self.is_terminated() {
            return false;
        }
        if self.iteration >= self.max_iterations {
            self.phase = LoopPhase::Terminated(Termination::MaxIterationsReached);
            return false;
        }
        self.iteration += 1;
        self.phase = LoopPhase::Reviewing;
        true
    }

    /// Store the reviewer's verdict for the current iteration.
    pub fn record_verdict(&mut self, verdict: Verdict, approved: bool) {
        debug_assert_eq!(self.phase, LoopPhase::Reviewing);
        self.rounds.push(RoundRecord {
            iteration: self.iteration,
            verdict: verdict.clone(),
            approved,
        });
        self.verdict = Some(verdict);
        self.phase = if approved {
            LoopPhase::Terminated(Termination::Approved)
        } else {
            LoopPhase::Refining
        };
    }

    /// Replace the artifact with the refiner's output.
    pub fn apply_refinement(&mut self, artifact: Artifact) {
        debug_assert_eq!(self.phase, LoopPhase::Refining);
        self.artifact = artifact;
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    pub fn termination(&self) -> Option<Termination> {
        match self.phase {
            LoopPhase::Terminated(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.termination().is_some()
    }

    /// Consume the state into its parts: (artifact, rounds, iterations).
    pub(crate) fn into_parts(self) -> (Artifact, Vec<RoundRecord>, u32) {
        (self.artifact, self.rounds, self.iteration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_priming_without_verdict() {
        let state = LoopState::primed(Artifact::new("A0"), 2);
        assert_eq!(state.phase(), LoopPhase::Priming);
        assert_eq!(state.iteration(), 0);
        assert!(state.verdict().is_none());
        assert!(state.termination().is_none());
    }

    #[test]
    fn approval_terminates_immediately() {
        let mut state = LoopState::primed(Artifact::new("A0"), 3);
        assert!(state.begin_review());
        state.record_verdict(Verdict::new("APPROVED"), true);

        assert_eq!(state.termination(), Some(Termination::Approved));
        assert!(!state.begin_review());
        assert_eq!(state.iteration(), 1);
    }

    #[test]
    fn ceiling_terminates_after_last_refinement() {
        let mut state = LoopState::primed(Artifact::new("A0"), 1);
        assert!(state.begin_review());
        state.record_verdict(Verdict::new("too short"), false);
        assert_eq!(state.phase(), LoopPhase::Refining);
        state.apply_refinement(Artifact::new("A1"));

        assert!(!state.begin_review());
        assert_eq!(
            state.termination(),
            Some(Termination::MaxIterationsReached)
        );
        assert_eq!(state.artifact().as_str(), "A1");
        assert_eq!(state.iteration(), 1);
    }

    #[test]
    fn zero_ceiling_never_reviews() {
        let mut state = LoopState::primed(Artifact::new("A0"), 0);
        assert!(!state.begin_review());
        assert_eq!(state.iteration(), 0);
        assert_eq!(
            state.termination(),
            Some(Termination::MaxIterationsReached)
        );
    }

    #[test]
    fn rounds_record_every_verdict() {
        let mut state = LoopState::primed(Artifact::new("A0"), 5);
        state.begin_review();
        state.record_verdict(Verdict::new("more humor"), false);
        state.apply_refinement(Artifact::new("A1"));
        state.begin_review();
        state.record_verdict(Verdict::new("APPROVED"), true);

        let rounds = state.rounds();
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0].iteration, 1);
        assert!(!rounds[0].approved);
        assert_eq!(rounds[1].verdict.as_str(), "APPROVED");
        assert!(rounds[1].approved);
        assert_eq!(state.verdict().map(Verdict::as_str), Some("APPROVED"));
    }
}
