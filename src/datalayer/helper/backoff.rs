use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Exponential backoff with jitter calculator, used when the service waits
/// for PostgreSQL or Redis to accept connections during startup.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base_delay_ms: 200,
            max_delay_ms: 5000,
        }
    }
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    pub fn set_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Calculates the backoff time in milliseconds using exponential backoff with full jitter.
    ///
    /// `sleep = random_between(0, min(max_delay, base_delay * 2^attempt))`
    ///
    /// `attempt` is 0-indexed. Saturating arithmetic keeps large attempt numbers bounded.
    pub fn calculate(&self, attempt: u32) -> u64 {
        let exponential_delay = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));

        let capped_delay = exponential_delay.min(self.max_delay_ms);

        if capped_delay == 0 {
            return 0;
        }

        let mut rng = rand::thread_rng();
        rng.gen_range(0..=capped_delay)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.calculate(attempt))
    }

    /// Runs `op` until it succeeds or `max_attempts` is reached, sleeping
    /// between attempts. The last error is returned on exhaustion.
    pub async fn retry<T, E, F, Fut>(&self, what: &str, max_attempts: u32, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 < max_attempts => {
                    let wait = self.delay(attempt);
                    warn!(
                        target_name = what,
                        attempt = attempt + 1,
                        max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "Connection attempt failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_first_attempt() {
        let backoff = ExponentialBackoff::new().calculate(0);
        assert!(backoff <= 200);
    }

    #[test]
    fn test_backoff_increases_exponentially() {
        let backoff = ExponentialBackoff::new().set_base_delay_ms(100);
        assert!(backoff.calculate(1) <= 200);
        assert!(backoff.calculate(2) <= 400);
    }

    #[test]
    fn test_backoff_respects_max_delay() {
        let backoff = ExponentialBackoff::new().calculate(20);
        assert!(backoff <= 5000);
    }

    #[test]
    fn test_backoff_zero_base_delay() {
        let backoff = ExponentialBackoff::new().set_base_delay_ms(0).calculate(5);
        assert_eq!(backoff, 0);
    }

    #[test]
    fn test_backoff_overflow_protection() {
        let backoff = ExponentialBackoff::new()
            .set_max_delay_ms(u64::MAX)
            .calculate(100);
        assert!(backoff <= u64::MAX);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let backoff = ExponentialBackoff::new().set_base_delay_ms(0);

        let result: Result<u32, String> = backoff
            .retry("test", 5, move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err(format!("fail {}", n)) } else { Ok(n) }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_returns_last_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let backoff = ExponentialBackoff::new().set_base_delay_ms(0);

        let result: Result<(), String> = backoff
            .retry("test", 3, move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(format!("fail {}", n))
            })
            .await;

        assert_eq!(result, Err("fail 2".to_string()));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
