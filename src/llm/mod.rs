mod contract;
pub mod providers;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

pub use contract::{Contract, SchemaKind, extract_json_payload, validate_payload};

/// Temperature ceiling for scoring calls.
pub const SCORING_TEMPERATURE: f64 = 0.2;
/// Temperature ceiling for narrative calls.
pub const NARRATIVE_TEMPERATURE: f64 = 0.6;

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: String,
    pub user: String,
    pub model_hint: Option<String>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub contract: Contract,
}

/// Contract-validated completion.
#[derive(Debug, Clone)]
pub enum Completion {
    Text(String),
    Number(f64),
    Json(serde_json::Value),
}

impl Completion {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Provider-level failure classification; the gateway retries transients.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transient provider failure: {0}")]
    Transient(String),

    #[error("terminal provider failure: {0}")]
    Terminal(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// All attempts exhausted or the provider failed terminally. Callers
    /// degrade their artifact; they never raise.
    #[error("gateway failure after {attempts} attempt(s): {detail}")]
    Terminal { attempts: u32, detail: String },
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete_text(&self, request: &LlmRequest) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry `attempt` (1-based): base × 2^(attempt−1) plus
    /// uniform jitter. With the defaults the worst-case total sleep across
    /// a 3-attempt call is 500 + 1000 + 2×250 = 2000 ms.
    fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = self.backoff_base * 2_u32.saturating_pow(attempt.saturating_sub(1));
        let jitter_ms = if self.jitter.is_zero() {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64)
        };
        exp + Duration::from_millis(jitter_ms)
    }
}

/// Provider-agnostic gateway enforcing response contracts and the retry
/// policy. Contract violations count as transient failures: the model is
/// asked again until attempts run out.
pub struct Gateway {
    provider: Arc<dyn LlmProvider>,
    policy: RetryPolicy,
    retries: AtomicUsize,
}

impl Gateway {
    pub fn new(provider: Arc<dyn LlmProvider>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy,
            retries: AtomicUsize::new(0),
        }
    }

    /// Total retries performed so far, for the run manifest.
    pub fn retry_count(&self) -> usize {
        self.retries.load(Ordering::Relaxed)
    }

    pub async fn complete(&self, request: &LlmRequest) -> Result<Completion, GatewayError> {
        let mut last_failure = String::new();

        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                self.retries.fetch_add(1, Ordering::Relaxed);
                let backoff = self.policy.backoff_for(attempt - 1);
                debug!(
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "retrying gateway call"
                );
                tokio::time::sleep(backoff).await;
            }

            let raw = match self.provider.complete_text(request).await {
                Ok(raw) => raw,
                Err(ProviderError::Transient(detail)) => {
                    warn!(attempt, provider = self.provider.name(), detail, "transient provider failure");
                    last_failure = detail;
                    continue;
                }
                Err(ProviderError::Terminal(detail)) => {
                    return Err(GatewayError::Terminal { attempts: attempt, detail });
                }
            };

            match request.contract.enforce(&raw) {
                Ok(completion) => return Ok(completion),
                Err(violation) => {
                    warn!(
                        attempt,
                        provider = self.provider.name(),
                        violation, "response violated contract"
                    );
                    last_failure = violation;
                }
            }
        }

        Err(GatewayError::Terminal {
            attempts: self.policy.max_attempts,
            detail: last_failure,
        })
    }
}
