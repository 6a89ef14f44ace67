use anyhow::Result;
use async_openai::error::OpenAIError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Bounded exponential backoff for calls to external providers.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        let delay = self.base_delay.saturating_mul(1 << capped).min(self.max_delay);
        let jitter_ms = (self.base_delay.as_millis() / 4) as u64;
        if jitter_ms == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }

    /// Runs `op` until it succeeds, fails with an error `is_transient` rejects,
    /// or `max_attempts` is reached.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        is_transient: fn(&anyhow::Error) -> bool,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0usize;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) && attempt + 1 < self.max_attempts => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    log::warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        label,
                        attempt,
                        self.max_attempts,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Network failures, timeouts, 429 and 5xx responses are worth retrying.
pub fn is_transient_openai(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<OpenAIError>() {
        Some(OpenAIError::Reqwest(e)) => {
            e.is_timeout()
                || e.is_connect()
                || e.status()
                    .map(|s| s.as_u16() == 429 || s.is_server_error())
                    .unwrap_or(false)
        }
        Some(OpenAIError::ApiError(api)) => {
            let message = api.message.to_lowercase();
            message.contains("rate limit") || message.contains("overloaded")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quick() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result = quick()
            .run("test", |_| true, move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(anyhow::anyhow!("connection reset"))
                } else {
                    Ok(42)
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result: Result<()> = quick()
            .run("test", |_| true, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("still down"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result: Result<()> = quick()
            .run("test", |_| false, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("bad request"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_is_capped() {
        let policy = quick();
        assert!(policy.backoff(10) <= Duration::from_millis(4));
        assert!(!is_transient_openai(&anyhow::anyhow!("plain error")));
    }
}
