//! `draftloop refine` — Draft, critique and refine a text on a topic.

use draftloop_config::{AppConfig, ApprovalMode};
use draftloop_core::step::Reviewer;
use draftloop_refine::{
    CancellationToken, ConsoleReviewer, LlmSteps, RefinementLoop, TracingObserver,
};
use draftloop_telemetry::MetricsObserver;
use std::sync::Arc;
use tracing::warn;

/// Command-line overrides for one run.
pub struct RefineOptions {
    pub topic: String,
    pub max_iterations: Option<u32>,
    pub interactive: bool,
    pub contains_token: bool,
    pub model: Option<String>,
}

impl RefineOptions {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(max_iterations) = self.max_iterations {
            config.refinement.max_iterations = max_iterations;
        }
        if self.contains_token {
            config.refinement.approval_mode = ApprovalMode::ContainsToken;
        }
        if let Some(model) = &self.model {
            config.override_model(model.clone());
        }
    }
}

/// Local servers accept any key.
fn needs_api_key(provider: &str) -> bool {
    !matches!(provider, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

pub async fn run(options: RefineOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    options.apply(&mut config);
    config.validate()?;

    // Check for API key early — give a clear error
    if !config.has_api_key() && needs_api_key(&config.default_provider) {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export OPENROUTER_API_KEY='sk-or-v1-...'   (recommended)");
        eprintln!("    export OPENAI_API_KEY='sk-...'             (for OpenAI direct)");
        eprintln!("    export DRAFTLOOP_API_KEY='sk-...'          (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = draftloop_providers::build_from_config(&config);
    let provider = router.default().ok_or("No default provider configured")?;

    let steps = LlmSteps::from_config(provider, &config);
    let reviewer: Arc<dyn Reviewer> = if options.interactive {
        Arc::new(ConsoleReviewer::stdio(
            config.refinement.approval_token.clone(),
        ))
    } else {
        steps.reviewer.clone()
    };

    let metrics = Arc::new(MetricsObserver::new());
    let mut controller = RefinementLoop::new(steps.producer.clone(), reviewer, steps.refiner.clone())
        .with_config(&config.refinement)
        .with_observer(Arc::new(TracingObserver));
    if config.telemetry.enabled {
        controller = controller.with_observer(metrics.clone());
    }

    eprintln!();
    eprintln!("  Provider:        {}", config.default_provider);
    eprintln!("  Model:           {}", config.active_model());
    eprintln!("  Max iterations:  {}", config.refinement.max_iterations);
    eprintln!(
        "  Critic:          {}",
        if options.interactive { "you" } else { "LLM" }
    );
    eprintln!();

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn(watch_interrupt(cancel.clone()));

    let result = controller.run_with_cancel(&options.topic, &cancel).await;
    interrupt.abort();

    if config.telemetry.enabled {
        metrics.report();
    }

    let outcome = result?;
    println!("{}", outcome.artifact);
    eprintln!();
    eprintln!(
        "  Finished: {} after {} iteration(s)",
        outcome.termination, outcome.iterations
    );

    Ok(())
}

/// First Ctrl+C stops the run after the current step; a second one exits.
async fn watch_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    warn!("Interrupted, stopping after the current step (Ctrl+C again to exit)");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        std::process::exit(130);
    }
}
