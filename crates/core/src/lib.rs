//! # draftloop core
//!
//! Domain types, traits, and error definitions for the draftloop
//! critique/refine runtime. This crate has **zero framework dependencies**:
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the refinement loop is a trait here (providers,
//! the three step roles, observers). Implementations live in their
//! respective crates, so the loop can be driven by real models, a human
//! at the console, or scripted fakes in tests.

pub mod error;
pub mod event;
pub mod message;
pub mod observer;
pub mod provider;
pub mod step;

// Re-export key types at crate root for ergonomics
pub use error::{LoopError, ProviderError, StepError};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, Role};
pub use observer::{LoopObserver, RunSummary, StepEvent, StepOutcome, Termination};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use step::{Artifact, Producer, Refiner, Reviewer, StepKind, Verdict};
