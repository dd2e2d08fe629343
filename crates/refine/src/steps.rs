//! LLM-backed step collaborators.
//!
//! Each step is one chat completion: a system message carrying the role
//! instruction and a user message carrying the seed or artifact. Provider
//! retries happen below this layer (see `RetryProvider`), so a step makes
//! exactly one logical call.

use async_trait::async_trait;
use draftloop_config::AppConfig;
use draftloop_core::error::StepError;
use draftloop_core::message::Message;
use draftloop_core::provider::{Provider, ProviderRequest};
use draftloop_core::step::{Artifact, Producer, Refiner, Reviewer, StepKind, Verdict};
use std::sync::Arc;
use tracing::debug;

/// Substitute `{name}` placeholders in a prompt template.
///
/// Unknown placeholders are left untouched.
pub fn render_prompt(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{name}}}"), value)
    })
}

/// Model settings shared by the three LLM steps.
#[derive(Clone)]
pub struct LlmSettings {
    pub provider: Arc<dyn Provider>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl LlmSettings {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self {
            provider,
            model: config.active_model().to_string(),
            temperature: config.default_temperature,
            max_tokens: Some(config.default_max_tokens),
        }
    }

    /// One system + user completion, trimmed of surrounding whitespace.
    async fn complete(
        &self,
        step: StepKind,
        instruction: &str,
        input: &str,
    ) -> Result<String, StepError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::system(instruction), Message::user(input)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stop: vec![],
        };

        debug!(
            step = %step,
            provider = %self.provider.name(),
            model = %self.model,
            input_chars = input.len(),
            "Requesting completion"
        );

        let response = self.provider.complete(request).await?;
        let text = response.message.content.trim();
        if text.is_empty() {
            return Err(StepError::EmptyOutput(step));
        }
        Ok(text.to_string())
    }
}

/// Writes the first draft from the seed.
pub struct LlmProducer {
    llm: LlmSettings,
    instruction: String,
}

impl LlmProducer {
    pub fn new(llm: LlmSettings, instruction: impl Into<String>) -> Self {
        Self {
            llm,
            instruction: instruction.into(),
        }
    }
}

#[async_trait]
impl Producer for LlmProducer {
    async fn produce(&self, seed: &str) -> Result<Artifact, StepError> {
        let text = self
            .llm
            .complete(StepKind::Producer, &self.instruction, seed)
            .await?;
        Ok(Artifact::new(text))
    }
}

/// Critiques an artifact, replying with the approval token when satisfied.
pub struct LlmReviewer {
    llm: LlmSettings,
    instruction: String,
}

impl LlmReviewer {
    /// `instruction` may reference `{approval_token}`.
    pub fn new(llm: LlmSettings, instruction: &str, approval_token: &str) -> Self {
        Self {
            llm,
            instruction: render_prompt(instruction, &[("approval_token", approval_token)]),
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }
}

#[async_trait]
impl Reviewer for LlmReviewer {
    async fn review(&self, artifact: &Artifact) -> Result<Verdict, StepError> {
        let text = self
            .llm
            .complete(StepKind::Reviewer, &self.instruction, artifact.as_str())
            .await?;
        Ok(Verdict::new(text))
    }
}

/// Rewrites an artifact to address a critique.
pub struct LlmRefiner {
    llm: LlmSettings,
    template: String,
    approval_token: String,
}

/// User turn sent to the refiner; the draft and critique live in the
/// system instruction.
const REFINE_REQUEST: &str = "Please rewrite the draft now.";

impl LlmRefiner {
    /// `template` may reference `{artifact}`, `{critique}` and
    /// `{approval_token}`.
    pub fn new(llm: LlmSettings, template: impl Into<String>, approval_token: impl Into<String>) -> Self {
        Self {
            llm,
            template: template.into(),
            approval_token: approval_token.into(),
        }
    }

    fn instruction(&self, artifact: &Artifact, verdict: &Verdict) -> String {
        render_prompt(
            &self.template,
            &[
                ("artifact", artifact.as_str()),
                ("critique", verdict.as_str()),
                ("approval_token", self.approval_token.as_str()),
            ],
        )
    }
}

#[async_trait]
impl Refiner for LlmRefiner {
    async fn refine(&self, artifact: &Artifact, verdict: &Verdict) -> Result<Artifact, StepError> {
        let instruction = self.instruction(artifact, verdict);
        let text = self
            .llm
            .complete(StepKind::Refiner, &instruction, REFINE_REQUEST)
            .await?;
        Ok(Artifact::new(text))
    }
}

/// The three LLM steps built from one config.
pub struct LlmSteps {
    pub producer: Arc<LlmProducer>,
    pub reviewer: Arc<LlmReviewer>,
    pub refiner: Arc<LlmRefiner>,
}

impl LlmSteps {
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        let llm = LlmSettings::from_config(provider, config);
        let token = config.refinement.approval_token.as_str();
        Self {
            producer: Arc::new(LlmProducer::new(llm.clone(), config.prompts.writer.clone())),
            reviewer: Arc::new(LlmReviewer::new(llm.clone(), &config.prompts.critic, token)),
            refiner: Arc::new(LlmRefiner::new(llm, config.prompts.refiner.clone(), token)),
        }
    }
}
