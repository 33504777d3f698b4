//! Retry of HTTP requests that come back with a non-successful status.
//!
//! Transport failures (timeouts, refused connections) are returned as-is;
//! only a completed response with a non-2xx status is sent again.

use std::future::Future;
use std::time::Duration;

use reqwest::Response;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry (doubles each attempt, zero means immediate)
    pub initial_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    /// One immediate retry.
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms.max(initial_delay_ms)),
        }
    }

    pub fn no_retry() -> Self {
        Self::new(0, 0, 0)
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as u64))
    }
}

/// Runs `operation`, sending it again while the response status is not a success
/// and retries remain. The last response is returned whatever its status.
pub async fn send_with_retry<F, Fut>(
    config: &RetryConfig,
    operation: F,
) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        let response = operation().await?;
        let status = response.status();

        if status.is_success() || attempt >= config.max_retries {
            if attempt > 0 {
                tracing::debug!("Request finished with {} after {} retries", status, attempt);
            }
            return Ok(response);
        }

        let delay = config.delay_for_attempt(attempt);
        attempt += 1;
        tracing::warn!(
            "Request returned {}, retry {} of {} in {:?}",
            status,
            attempt,
            config.max_retries,
            delay
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_single_immediate_retry() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
    }

    #[test]
    fn delay_doubles_and_is_capped() {
        let config = RetryConfig::new(5, 100, 500);

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(40), Duration::from_millis(500));
    }

    #[test]
    fn max_delay_never_below_initial() {
        let config = RetryConfig::new(2, 300, 0);
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(300));
    }
}
