//! # draftloop refine
//!
//! The bounded critique/refine loop and its standard collaborators.
//!
//! - [`RefinementLoop`]: producer once, then reviewer/refiner until the
//!   approval token or the iteration ceiling
//! - [`LoopState`]: the explicit state the loop moves through
//! - [`ApprovalPolicy`]: exact (default) or contains-token matching
//! - LLM-backed steps ([`LlmProducer`], [`LlmReviewer`], [`LlmRefiner`])
//!   and a human [`ConsoleReviewer`]
//! - Observers that log ([`TracingObserver`]) or publish to the event bus
//!   ([`EventBusObserver`])

pub mod approval;
pub mod controller;
pub mod human;
pub mod observer;
pub mod state;
pub mod steps;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use approval::{ApprovalPolicy, DEFAULT_APPROVAL_TOKEN, VerdictClass};
pub use controller::{DEFAULT_MAX_ITERATIONS, RefinementLoop, RefinementOutcome};
pub use draftloop_config::ApprovalMode;
pub use human::ConsoleReviewer;
pub use observer::{EventBusObserver, TracingObserver};
pub use state::{LoopPhase, LoopState, RoundRecord};
pub use steps::{LlmProducer, LlmRefiner, LlmReviewer, LlmSettings, LlmSteps, render_prompt};
pub use tokio_util::sync::CancellationToken;
