//! Jittered exponential backoff for file store fetches.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

use crate::config::IngestConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_pct: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay_ms: u64, max_delay_ms: u64, jitter_pct: f64) -> Self {
        let base_delay_ms = base_delay_ms.max(1);
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            max_delay_ms: max_delay_ms.max(base_delay_ms),
            jitter_pct: jitter_pct.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(
            config.fetch_max_attempts,
            config.retry_base_delay_ms,
            config.retry_max_delay_ms,
            0.2,
        )
    }

    fn next_delay(&self, attempt: usize) -> Duration {
        let exp = 2_u64.saturating_pow(attempt as u32);
        let delay = self.base_delay_ms.saturating_mul(exp).min(self.max_delay_ms);
        if self.jitter_pct == 0.0 {
            return Duration::from_millis(delay);
        }
        let spread = (delay as f64 * self.jitter_pct) as i64;
        let delta = rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_millis(delay.saturating_add_signed(delta))
    }

    /// Run `op` until it succeeds, fails with an error `should_retry`
    /// rejects, or runs out of attempts. Returns the last error.
    pub async fn retry_if<F, Fut, T, E>(&self, mut op: F, should_retry: impl Fn(&E) -> bool) -> Result<T, E>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts || !should_retry(&err) {
                        return Err(err);
                    }
                    let delay = self.next_delay(attempt - 1);
                    tracing::debug!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying after transient failure"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&IngestConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::file_store::FetchError;

    #[test]
    fn new_clamps_input_parameters() {
        let policy = RetryPolicy::new(0, 0, 0, 2.0);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.base_delay_ms, 1);
        assert_eq!(policy.max_delay_ms, 1);
        assert_eq!(policy.jitter_pct, 1.0);
    }

    #[test]
    fn next_delay_doubles_and_caps() {
        let policy = RetryPolicy::new(5, 100, 500, 0.0);
        let delays: Vec<_> = (0..5).map(|attempt| policy.next_delay(attempt)).collect();
        assert_eq!(delays[0], Duration::from_millis(100));
        assert_eq!(delays[1], Duration::from_millis(200));
        assert_eq!(delays[2], Duration::from_millis(400));
        assert_eq!(delays[3], Duration::from_millis(500));
        assert_eq!(delays[4], Duration::from_millis(500));
    }

    #[test]
    fn jitter_stays_within_spread() {
        let policy = RetryPolicy::new(3, 100, 100, 0.5);
        for _ in 0..50 {
            let delay = policy.next_delay(0).as_millis();
            assert!((50..=150).contains(&delay), "delay {delay} out of range");
        }
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let policy = RetryPolicy::new(3, 1, 1, 0.0);
        let calls = AtomicUsize::new(0);

        let result = policy
            .retry_if(
                |attempt| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt < 2 {
                            Err(FetchError::Transient("503".to_string()))
                        } else {
                            Ok("content")
                        }
                    }
                },
                FetchError::is_retryable,
            )
            .await;

        assert_eq!(result, Ok("content"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let policy = RetryPolicy::new(5, 1, 1, 0.0);
        let calls = AtomicUsize::new(0);

        let result: Result<(), FetchError> = policy
            .retry_if(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(FetchError::AuthExpired("token".to_string())) }
                },
                FetchError::is_retryable,
            )
            .await;

        assert_eq!(result, Err(FetchError::AuthExpired("token".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(2, 1, 1, 0.0);
        let calls = AtomicUsize::new(0);

        let result: Result<(), FetchError> = policy
            .retry_if(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(FetchError::Transient("timeout".to_string())) }
                },
                FetchError::is_retryable,
            )
            .await;

        assert!(matches!(result, Err(FetchError::Transient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
