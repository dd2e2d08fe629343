//! Configuration loading, validation, and management for draftloop.
//!
//! Loads configuration from `~/.draftloop/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.draftloop/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Refinement loop settings
    #[serde(default)]
    pub refinement: RefinementConfig,

    /// Provider retry/backoff settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Step instructions
    #[serde(default)]
    pub prompts: PromptConfig,

    /// Metrics reporting
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "google/gemini-2.5-flash-lite".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("refinement", &self.refinement)
            .field("retry", &self.retry)
            .field("prompts", &self.prompts)
            .field("telemetry", &self.telemetry)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// How a reviewer verdict is compared against the approval token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// Byte-exact equality with the token
    #[default]
    Exact,
    /// The verdict contains the token anywhere
    ContainsToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementConfig {
    /// Maximum reviewer/refiner passes after the first draft
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Sentinel the reviewer returns to stop the loop
    #[serde(default = "default_approval_token")]
    pub approval_token: String,

    #[serde(default)]
    pub approval_mode: ApprovalMode,
}

fn default_max_iterations() -> u32 {
    2
}
fn default_approval_token() -> String {
    "APPROVED".into()
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            approval_token: default_approval_token(),
            approval_mode: ApprovalMode::default(),
        }
    }
}

/// Exponential backoff applied to every provider call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first call
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Multiplier applied to the delay on each retry
    #[serde(default = "default_exp_base")]
    pub exp_base: f64,

    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: f64,

    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: f64,

    /// HTTP statuses worth retrying
    #[serde(default = "default_http_status_codes")]
    pub http_status_codes: Vec<u16>,
}

fn default_attempts() -> u32 {
    5
}
fn default_exp_base() -> f64 {
    7.0
}
fn default_initial_delay_secs() -> f64 {
    1.0
}
fn default_max_delay_secs() -> f64 {
    60.0
}
/// Upper bound accepted for any configured retry delay (one day).
pub const MAX_RETRY_DELAY_SECS: f64 = 86_400.0;

fn default_http_status_codes() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            exp_base: default_exp_base(),
            initial_delay_secs: default_initial_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            http_status_codes: default_http_status_codes(),
        }
    }
}

/// Instructions for the three step roles.
///
/// `critic` may reference `{approval_token}`; `refiner` may reference
/// `{artifact}`, `{critique}` and `{approval_token}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_writer_prompt")]
    pub writer: String,

    #[serde(default = "default_critic_prompt")]
    pub critic: String,

    #[serde(default = "default_refiner_prompt")]
    pub refiner: String,
}

fn default_writer_prompt() -> String {
    "You are a writer. You will be given a topic and you will write a short story on that topic."
        .into()
}

fn default_critic_prompt() -> String {
    concat!(
        "You are a critic. You will be given a short story and you will provide feedback on it. ",
        "If the story is good enough, respond with exactly '{approval_token}' and nothing else. ",
        "Otherwise, provide concrete feedback on how to improve it."
    )
    .into()
}

fn default_refiner_prompt() -> String {
    concat!(
        "You are a story refiner. You have a story draft and a critique.\n\n",
        "Story Draft: {artifact}\n",
        "Critique: {critique}\n\n",
        "Rewrite the story draft to fully incorporate the feedback from the critique. ",
        "Respond with the revised story only."
    )
    .into()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            writer: default_writer_prompt(),
            critic: default_critic_prompt(),
            refiner: default_refiner_prompt(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Collect step metrics and log a report after each run
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.draftloop/config.toml).
    ///
    /// Also checks environment variables:
    /// - `DRAFTLOOP_API_KEY` (highest priority), then `OPENROUTER_API_KEY`,
    ///   then `OPENAI_API_KEY`
    /// - `DRAFTLOOP_PROVIDER`, `DRAFTLOOP_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.is_none() {
            self.api_key = lookup("DRAFTLOOP_API_KEY")
                .or_else(|| lookup("OPENROUTER_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("DRAFTLOOP_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("DRAFTLOOP_MODEL") {
            self.override_model(model);
        }
    }

    /// Model the default provider should use: its own `default_model`
    /// when set, otherwise the top-level one.
    pub fn active_model(&self) -> &str {
        self.providers
            .get(&self.default_provider)
            .and_then(|p| p.default_model.as_deref())
            .unwrap_or(&self.default_model)
    }

    /// Force a model for this run, shadowing any per-provider default.
    pub fn override_model(&mut self, model: impl Into<String>) {
        self.default_model = model.into();
        if let Some(provider) = self.providers.get_mut(&self.default_provider) {
            provider.default_model = None;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".draftloop")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.refinement.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "refinement.max_iterations must be at least 1".into(),
            ));
        }

        if self.refinement.approval_token.is_empty() {
            return Err(ConfigError::ValidationError(
                "refinement.approval_token must not be empty".into(),
            ));
        }

        if self.retry.attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.attempts must be at least 1".into(),
            ));
        }

        if !self.retry.exp_base.is_finite() || self.retry.exp_base < 1.0 {
            return Err(ConfigError::ValidationError(
                "retry.exp_base must be a finite number >= 1.0".into(),
            ));
        }

        for (name, secs) in [
            ("initial_delay_secs", self.retry.initial_delay_secs),
            ("max_delay_secs", self.retry.max_delay_secs),
        ] {
            if !secs.is_finite() || secs > MAX_RETRY_DELAY_SECS {
                return Err(ConfigError::ValidationError(format!(
                    "retry.{name} must be finite and at most {MAX_RETRY_DELAY_SECS} seconds"
                )));
            }
        }

        if self.retry.initial_delay_secs < 0.0
            || self.retry.max_delay_secs < self.retry.initial_delay_secs
        {
            return Err(ConfigError::ValidationError(
                "retry delays must satisfy 0 <= initial_delay_secs <= max_delay_secs".into(),
            ));
        }

        if let Some(code) = self
            .retry
            .http_status_codes
            .iter()
            .find(|c| !(100..=599).contains(*c))
        {
            return Err(ConfigError::ValidationError(format!(
                "retry.http_status_codes contains invalid status {code}"
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            refinement: RefinementConfig::default(),
            retry: RetryConfig::default(),
            prompts: PromptConfig::default(),
            telemetry: TelemetryConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
