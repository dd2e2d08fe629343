//! Step collaborators — the three operations a refinement run sequences.
//!
//! The refinement loop never talks to a model directly. It calls a
//! [`Producer`] once, then alternates [`Reviewer`] and [`Refiner`] until
//! the reviewer approves or the iteration ceiling is hit. Implementations
//! may be LLM-backed, human-backed, or scripted fakes in tests.

use crate::error::StepError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The evolving text output being iteratively improved.
///
/// Replaced wholesale on every refine step; never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Artifact(String);

impl Artifact {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Artifact {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Artifact {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The reviewer's raw judgment of an artifact.
///
/// Whether a verdict counts as approval is decided by the loop's
/// approval policy, not by the verdict itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Verdict(String);

impl Verdict {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Verdict {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Verdict {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Which collaborator a step invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Producer,
    Reviewer,
    Refiner,
}

impl StepKind {
    pub const ALL: [StepKind; 3] = [StepKind::Producer, StepKind::Reviewer, StepKind::Refiner];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Reviewer => "reviewer",
            Self::Refiner => "refiner",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generates the first artifact from a seed prompt.
#[async_trait]
pub trait Producer: Send + Sync {
    async fn produce(&self, seed: &str) -> Result<Artifact, StepError>;
}

/// Evaluates an artifact and returns either the approval token or feedback.
#[async_trait]
pub trait Reviewer: Send + Sync {
    async fn review(&self, artifact: &Artifact) -> Result<Verdict, StepError>;
}

/// Rewrites an artifact to incorporate reviewer feedback.
///
/// Never called with an approving verdict.
#[async_trait]
pub trait Refiner: Send + Sync {
    async fn refine(&self, artifact: &Artifact, verdict: &Verdict) -> Result<Artifact, StepError>;
}
