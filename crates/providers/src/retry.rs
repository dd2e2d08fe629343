//! Retrying provider — exponential backoff around any `Provider`.
//!
//! Retries are the step collaborator's business, never the refinement
//! loop's: every LLM-backed step talks to a `RetryProvider`, so a flaky
//! backend costs latency instead of aborting the run.
//!
//! The delay before retry *n* (0-indexed) is:
//!
//! ```text
//! delay = min(initial_delay * exp_base ^ n, max_delay)
//! ```

use async_trait::async_trait;
use draftloop_core::error::ProviderError;
use draftloop_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff settings for [`RetryProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first call (minimum 1).
    pub attempts: u32,
    /// Multiplier applied per retry.
    pub exp_base: f64,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// HTTP statuses that are worth retrying.
    pub http_status_codes: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            exp_base: 7.0,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            http_status_codes: vec![429, 500, 502, 503, 504],
        }
    }
}

/// Convert configured seconds, clamping negatives and NaN to zero and
/// anything unrepresentable to the config ceiling.
fn secs_to_duration(secs: f64) -> Duration {
    let ceiling = Duration::from_secs_f64(draftloop_config::MAX_RETRY_DELAY_SECS);
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).map_or(ceiling, |d| d.min(ceiling))
}

impl RetryPolicy {
    /// Build a policy from the `[retry]` config section.
    pub fn from_config(config: &draftloop_config::RetryConfig) -> Self {
        Self {
            attempts: config.attempts.max(1),
            exp_base: if config.exp_base.is_finite() {
                config.exp_base.max(1.0)
            } else {
                1.0
            },
            initial_delay: secs_to_duration(config.initial_delay_secs),
            max_delay: secs_to_duration(config.max_delay_secs),
            http_status_codes: config.http_status_codes.clone(),
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff delay before retry `retry` (0-indexed), or `None` once the
    /// attempt budget is spent.
    pub fn delay_for(&self, retry: u32) -> Option<Duration> {
        if retry + 1 >= self.attempts {
            return None;
        }
        let secs = self.initial_delay.as_secs_f64() * self.exp_base.powi(retry as i32);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Some(Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay))
    }

    /// Whether an error is transient under this policy.
    ///
    /// Rate limits honour the status list like any other status; network
    /// failures and timeouts are always retried.
    pub fn is_retryable(&self, error: &ProviderError) -> bool {
        match error {
            ProviderError::ApiError { status_code, .. } => {
                self.http_status_codes.contains(status_code)
            }
            ProviderError::RateLimited { .. } => self.http_status_codes.contains(&429),
            ProviderError::Network(_) | ProviderError::Timeout(_) => true,
            ProviderError::AuthenticationFailed(_)
            | ProviderError::ModelNotFound(_)
            | ProviderError::NotConfigured(_) => false,
        }
    }
}

/// A provider that retries transient failures of an inner provider.
pub struct RetryProvider {
    inner: Arc<dyn Provider>,
    policy: RetryPolicy,
}

impl RetryProvider {
    pub fn new(inner: Arc<dyn Provider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Wait before the next attempt; `None` means give up.
    fn wait_for(&self, retry: u32, error: &ProviderError) -> Option<Duration> {
        let backoff = self.policy.delay_for(retry)?;
        match error {
            ProviderError::RateLimited { retry_after_secs } => {
                Some(backoff.max(Duration::from_secs(*retry_after_secs)))
            }
            _ => Some(backoff),
        }
    }
}

#[async_trait]
impl Provider for RetryProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut retry = 0u32;
        loop {
            match self.inner.complete(request.clone()).await {
                Ok(response) => {
                    if retry > 0 {
                        debug!(provider = %self.inner.name(), attempts = retry + 1, "Request succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) if self.policy.is_retryable(&e) => {
                    let Some(delay) = self.wait_for(retry, &e) else {
                        warn!(
                            provider = %self.inner.name(),
                            attempts = retry + 1,
                            error = %e,
                            "Retry budget exhausted"
                        );
                        return Err(e);
                    };
                    warn!(
                        provider = %self.inner.name(),
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient provider error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        self.inner.list_models().await
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        self.inner.health_check().await
    }
}
