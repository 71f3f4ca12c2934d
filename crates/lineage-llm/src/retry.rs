//! Retry with exponential backoff for throttled model calls
//!
//! [`ResilientInvoker`] wraps any [`ModelClient`]. Transient errors (see
//! [`LlmError::is_transient`]) are retried up to `max_retries` additional
//! times; anything else is returned immediately.

use crate::{LlmError, ModelClient};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn, Instrument, Span};

/// Errors produced by [`ResilientInvoker::invoke`]
#[derive(Error, Debug)]
pub enum InvokeError {
    /// Non-retryable failure from the underlying client
    #[error("Model invocation failed: {0}")]
    Fatal(#[source] LlmError),

    /// Transient failures persisted past the retry budget
    #[error("Retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Total attempts made, including the first
        attempts: u32,
        /// Message of the final underlying error
        last_error: String,
    },
}

/// Backoff schedule for transient failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Fraction of each delay used as the uniform jitter range
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(1000),
            jitter_ratio: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `attempt` (1-indexed), without jitter
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Delay before retry `attempt` with uniform jitter applied
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay_for(attempt).as_secs_f64() * 1000.0;
        let spread = base_ms * self.jitter_ratio;
        let offset = if spread > 0.0 {
            rand::thread_rng().gen_range(-spread..=spread)
        } else {
            0.0
        };
        Duration::from_secs_f64((base_ms + offset).max(0.0) / 1000.0)
    }

    /// Worst-case total backoff before exhaustion, without jitter
    pub fn total_base_delay(&self) -> Duration {
        (1..=self.max_retries)
            .map(|attempt| self.base_delay_for(attempt))
            .fold(Duration::ZERO, |acc, d| acc.saturating_add(d))
    }
}

/// Suspension between retry attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend the current task for `duration`
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Model client wrapper that retries throttled calls
pub struct ResilientInvoker<M> {
    client: M,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    span: Span,
}

impl<M: ModelClient> ResilientInvoker<M> {
    /// Wrap `client` with the default policy and the tokio timer
    pub fn new(client: M) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            span: tracing::info_span!("resilient_invoker"),
        }
    }

    /// Replace the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the sleeper
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Log under `span` instead of the default component span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Active policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Wrapped client
    pub fn client(&self) -> &M {
        &self.client
    }

    /// Invoke the model, retrying transient failures
    pub async fn invoke(&self, prompt: &str) -> Result<String, InvokeError> {
        self.invoke_inner(prompt).instrument(self.span.clone()).await
    }

    async fn invoke_inner(&self, prompt: &str) -> Result<String, InvokeError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            debug!(attempt, model = self.client.model_name(), "Invoking model");

            let error = match self.client.invoke_model(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };

            if !error.is_transient() {
                warn!(attempt, error = %error, "Fatal model error, not retrying");
                return Err(InvokeError::Fatal(error));
            }

            if attempt > self.policy.max_retries {
                warn!(attempts = attempt, error = %error, "Retries exhausted");
                return Err(InvokeError::RetriesExhausted {
                    attempts: attempt,
                    last_error: error.to_string(),
                });
            }

            let delay = self.policy.jittered_delay(attempt);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Model throttled, backing off"
            );
            self.sleeper.sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockProvider;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn delays(&self) -> Vec<Duration> {
            self.delays.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    fn invoker(provider: MockProvider, sleeper: Arc<RecordingSleeper>) -> ResilientInvoker<MockProvider> {
        ResilientInvoker::new(provider).with_sleeper(sleeper)
    }

    fn within_jitter(actual: Duration, base_ms: f64) -> bool {
        let ms = actual.as_secs_f64() * 1000.0;
        ms >= base_ms * 0.8 - 1e-6 && ms <= base_ms * 1.2 + 1e-6
    }

    #[test]
    fn test_base_delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.base_delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.base_delay_for(3), Duration::from_millis(4000));
        assert_eq!(policy.base_delay_for(5), Duration::from_millis(16000));
        assert_eq!(policy.total_base_delay(), Duration::from_millis(31000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy::default();
        for attempt in 1..=5 {
            let base = policy.base_delay_for(attempt).as_millis() as f64;
            for _ in 0..50 {
                assert!(within_jitter(policy.jittered_delay(attempt), base));
            }
        }
    }

    #[test]
    fn test_zero_jitter_is_exact() {
        let policy = RetryPolicy {
            jitter_ratio: 0.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.jittered_delay(2), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let provider = MockProvider::new("fourth time lucky");
        for _ in 0..3 {
            provider.push_error(LlmError::RateLimitExceeded("ThrottlingException".into()));
        }
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = invoker(provider.clone(), sleeper.clone()).invoke("p").await;

        assert_eq!(result.unwrap(), "fourth time lucky");
        assert_eq!(provider.call_count(), 4);
        let delays = sleeper.delays();
        assert_eq!(delays.len(), 3);
        for (delay, base) in delays.iter().zip([1000.0, 2000.0, 4000.0]) {
            assert!(within_jitter(*delay, base), "{:?} not near {}", delay, base);
        }
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let provider = MockProvider::new("never");
        for _ in 0..10 {
            provider.push_error(LlmError::Communication("Rate exceeded".into()));
        }
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = invoker(provider.clone(), sleeper.clone()).invoke("p").await;

        match result {
            Err(InvokeError::RetriesExhausted { attempts, last_error }) => {
                assert_eq!(attempts, 6);
                assert!(last_error.contains("Rate exceeded"));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(provider.call_count(), 6);
        assert_eq!(sleeper.delays().len(), 5);
    }

    #[tokio::test]
    async fn test_fatal_error_not_retried() {
        let provider = MockProvider::new("unused");
        provider.push_error(LlmError::ModelNotAvailable("llama3".into()));
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = invoker(provider.clone(), sleeper.clone()).invoke("p").await;

        assert!(matches!(result, Err(InvokeError::Fatal(LlmError::ModelNotAvailable(_)))));
        assert_eq!(provider.call_count(), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_custom_policy_budget() {
        let provider = MockProvider::new("never");
        for _ in 0..5 {
            provider.push_error(LlmError::RateLimitExceeded("slow down".into()));
        }
        let sleeper = Arc::new(RecordingSleeper::default());
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(10),
            jitter_ratio: 0.0,
        };

        let result = invoker(provider.clone(), sleeper.clone())
            .with_policy(policy)
            .invoke("p")
            .await;

        assert!(matches!(result, Err(InvokeError::RetriesExhausted { attempts: 3, .. })));
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
    }
}
