//! Shared test helpers for refinement tests.

use async_trait::async_trait;
use draftloop_core::error::{ProviderError, StepError};
use draftloop_core::message::Message;
use draftloop_core::observer::{LoopObserver, RunSummary, StepEvent, StepOutcome};
use draftloop_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use draftloop_core::step::{Artifact, Producer, Refiner, Reviewer, Verdict};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Scripted results handed out in order. Panics when exhausted.
struct Script<T> {
    name: &'static str,
    items: Mutex<VecDeque<Result<T, StepError>>>,
}

impl<T> Script<T> {
    fn new(name: &'static str, items: Vec<Result<T, StepError>>) -> Self {
        Self {
            name,
            items: Mutex::new(items.into()),
        }
    }

    fn next(&self) -> Result<T, StepError> {
        self.items
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("{}: no more scripted results", self.name))
    }
}

pub struct ScriptedProducer {
    script: Script<Artifact>,
    seeds: Mutex<Vec<String>>,
}

impl ScriptedProducer {
    pub fn new(outputs: Vec<Result<Artifact, StepError>>) -> Self {
        Self {
            script: Script::new("ScriptedProducer", outputs),
            seeds: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(text: &str) -> Self {
        Self::new(vec![Ok(Artifact::new(text))])
    }

    pub fn failing(error: StepError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn seeds(&self) -> Vec<String> {
        self.seeds.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.seeds.lock().unwrap().len()
    }
}

#[async_trait]
impl Producer for ScriptedProducer {
    async fn produce(&self, seed: &str) -> Result<Artifact, StepError> {
        self.seeds.lock().unwrap().push(seed.to_string());
        self.script.next()
    }
}

pub struct ScriptedReviewer {
    script: Script<Verdict>,
    reviewed: Mutex<Vec<Artifact>>,
}

impl ScriptedReviewer {
    pub fn new(verdicts: Vec<Result<Verdict, StepError>>) -> Self {
        Self {
            script: Script::new("ScriptedReviewer", verdicts),
            reviewed: Mutex::new(Vec::new()),
        }
    }

    pub fn saying(verdicts: &[&str]) -> Self {
        Self::new(verdicts.iter().map(|v| Ok(Verdict::new(*v))).collect())
    }

    /// Artifacts in the order they were reviewed.
    pub fn reviewed(&self) -> Vec<Artifact> {
        self.reviewed.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.reviewed.lock().unwrap().len()
    }
}

#[async_trait]
impl Reviewer for ScriptedReviewer {
    async fn review(&self, artifact: &Artifact) -> Result<Verdict, StepError> {
        self.reviewed.lock().unwrap().push(artifact.clone());
        self.script.next()
    }
}

pub struct ScriptedRefiner {
    script: Script<Artifact>,
    inputs: Mutex<Vec<(Artifact, Verdict)>>,
}

impl ScriptedRefiner {
    pub fn new(outputs: Vec<Result<Artifact, StepError>>) -> Self {
        Self {
            script: Script::new("ScriptedRefiner", outputs),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(outputs: &[&str]) -> Self {
        Self::new(outputs.iter().map(|a| Ok(Artifact::new(*a))).collect())
    }

    /// (artifact, verdict) pairs in the order they were refined.
    pub fn inputs(&self) -> Vec<(Artifact, Verdict)> {
        self.inputs.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }
}

#[async_trait]
impl Refiner for ScriptedRefiner {
    async fn refine(&self, artifact: &Artifact, verdict: &Verdict) -> Result<Artifact, StepError> {
        self.inputs
            .lock()
            .unwrap()
            .push((artifact.clone(), verdict.clone()));
        self.script.next()
    }
}

/// Records every observer callback as a short line.
#[derive(Default)]
pub struct RecordingObserver {
    log: Mutex<Vec<String>>,
    summaries: Mutex<Vec<RunSummary>>,
}

impl RecordingObserver {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn starts(&self) -> usize {
        self.log().iter().filter(|l| l.starts_with("start")).count()
    }

    pub fn ends(&self) -> usize {
        self.log().iter().filter(|l| l.starts_with("end")).count()
    }

    pub fn summaries(&self) -> Vec<RunSummary> {
        self.summaries.lock().unwrap().clone()
    }
}

impl LoopObserver for RecordingObserver {
    fn on_step_start(&self, event: &StepEvent) {
        self.log
            .lock()
            .unwrap()
            .push(format!("start {} {}", event.step, event.iteration));
    }

    fn on_step_end(&self, event: &StepEvent, outcome: &StepOutcome) {
        let status = if outcome.success { "ok" } else { "err" };
        self.log
            .lock()
            .unwrap()
            .push(format!("end {} {} {status}", event.step, event.iteration));
    }

    fn on_run_complete(&self, summary: &RunSummary) {
        self.summaries.lock().unwrap().push(summary.clone());
    }
}

/// A mock provider that returns a sequence of scripted completions and
/// keeps every request it was sent.
pub struct SequentialMockProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(make_text_response(t))).collect())
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("SequentialMockProvider: no more responses (call #{call})"))
    }
}

/// Create a simple text completion.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}
