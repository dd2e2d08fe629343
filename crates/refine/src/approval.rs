//! Approval policy: decides whether a reviewer verdict ends the run.

use draftloop_config::{ApprovalMode, RefinementConfig};
use draftloop_core::step::Verdict;

/// Default sentinel a reviewer returns to approve an artifact.
pub const DEFAULT_APPROVAL_TOKEN: &str = "APPROVED";

/// How a verdict was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictClass {
    Approved,
    NeedsRevision,
}

/// Compares verdicts against an approval token.
///
/// In [`ApprovalMode::Exact`] the verdict must equal the token byte for
/// byte: no trimming, no case folding. `"APPROVED."`, `"approved"` and
/// `"APPROVED\n"` are all feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalPolicy {
    token: String,
    mode: ApprovalMode,
}

impl ApprovalPolicy {
    pub fn exact(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            mode: ApprovalMode::Exact,
        }
    }

    /// Approve any verdict that contains the token.
    pub fn contains(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            mode: ApprovalMode::ContainsToken,
        }
    }

    pub fn from_config(config: &RefinementConfig) -> Self {
        Self {
            token: config.approval_token.clone(),
            mode: config.approval_mode,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn mode(&self) -> ApprovalMode {
        self.mode
    }

    pub fn is_approval(&self, verdict: &Verdict) -> bool {
        match self.mode {
            ApprovalMode::Exact => verdict.as_str() == self.token,
            ApprovalMode::ContainsToken => verdict.as_str().contains(self.token.as_str()),
        }
    }

    pub fn classify(&self, verdict: &Verdict) -> VerdictClass {
        if self.is_approval(verdict) {
            VerdictClass::Approved
        } else {
            VerdictClass::NeedsRevision
        }
    }
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self::exact(DEFAULT_APPROVAL_TOKEN)
    }
}
