use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cipher_core::config::RetryConfig;

use crate::error::{InferenceError, Result};
use crate::provider::InferenceService;

/// Exponential backoff: after failed attempt `n` (1-based) the next attempt
/// waits `base_delay * 2^n`, so a one-second base gives waits of 2 s and 4 s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Wait before the next attempt, or `None` once attempts are exhausted.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor))
    }
}

/// Wraps an [`InferenceService`] with the retry policy.
pub struct RetryingInference {
    inner: Arc<dyn InferenceService>,
    policy: RetryPolicy,
}

impl RetryingInference {
    pub fn new(inner: Arc<dyn InferenceService>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl InferenceService for RetryingInference {
    async fn complete(&self, prompt: &str, system_instruction: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.complete(prompt, system_instruction).await {
                Ok(text) => return Ok(text),
                Err(e) => match self.policy.delay_after(attempt) {
                    Some(delay) => {
                        log::warn!(
                            "Inference attempt {}/{} failed, retrying in {:?}: {}",
                            attempt,
                            self.policy.max_attempts,
                            delay,
                            e
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        return Err(InferenceError::Exhausted {
                            attempts: attempt,
                            last: e.to_string(),
                        })
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl InferenceService for Flaky {
        async fn complete(&self, prompt: &str, _system: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(InferenceError::Api(format!("HTTP 503 on call {call}")))
            } else {
                Ok(format!("echo: {prompt}"))
            }
        }
    }

    fn retrying(failures: u32) -> (RetryingInference, Arc<Flaky>) {
        let flaky = Arc::new(Flaky {
            failures,
            calls: AtomicU32::new(0),
        });
        (RetryingInference::new(flaky.clone(), RetryPolicy::default()), flaky)
    }

    #[test]
    fn delays_double_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_after(2), Some(Duration::from_secs(4)));
        assert_eq!(policy.delay_after(3), None);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_on_the_last_attempt() {
        let (service, flaky) = retrying(2);
        let start = tokio::time::Instant::now();
        let text = service.complete("hi", "sys").await.unwrap();
        assert_eq!(text, "echo: hi");
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_the_last_error() {
        let (service, flaky) = retrying(u32::MAX);
        let err = service.complete("hi", "sys").await.unwrap_err();
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            err.to_string(),
            "Failed to get a response after 3 attempts. Error: API error: HTTP 503 on call 3"
        );
    }

    #[tokio::test]
    async fn success_needs_no_retry() {
        let (service, flaky) = retrying(0);
        service.complete("x", "y").await.unwrap();
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }
}
