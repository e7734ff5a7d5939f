use std::future::Future;
use std::time::Duration;

use tracing::debug;

use blogshift_common::{BackoffKind, Config, StoreError};

/// Bounded re-read for writes the store has accepted but not yet made
/// visible. The default is one retry after a fixed 1s delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRetryPolicy {
    pub delay: Duration,
    pub max_retries: u32,
    pub backoff: BackoffKind,
}

impl Default for ReadRetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1000),
            max_retries: 1,
            backoff: BackoffKind::Fixed,
        }
    }
}

impl ReadRetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            delay: config.read_retry_delay,
            max_retries: config.read_retries,
            backoff: config.read_backoff,
        }
    }

    /// No re-reads at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            BackoffKind::Fixed => self.delay,
            BackoffKind::Exponential => self
                .delay
                .saturating_mul(2u32.saturating_pow(attempt.min(16))),
        }
    }

    /// Run `read` until it yields a value or the retries are spent. Errors
    /// from `read` are returned immediately.
    pub async fn read_until_visible<T, F, Fut>(&self, mut read: F) -> Result<Option<T>, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, StoreError>>,
    {
        let mut found = read().await?;
        let mut attempt = 0;
        while found.is_none() && attempt < self.max_retries {
            let wait = self.delay_for(attempt);
            debug!(attempt, wait_ms = wait.as_millis() as u64, "Write not yet visible, re-reading");
            tokio::time::sleep(wait).await;
            found = read().await?;
            attempt += 1;
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn exponential_backoff_doubles() {
        let policy = ReadRetryPolicy {
            delay: Duration::from_millis(100),
            max_retries: 4,
            backoff: BackoffKind::Exponential,
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
    }

    #[test]
    fn fixed_backoff_is_constant() {
        let policy = ReadRetryPolicy::default();
        assert_eq!(policy.delay_for(0), policy.delay_for(5));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_max_retries() {
        let counter = AtomicU32::new(0);
        let reads = &counter;
        let policy = ReadRetryPolicy {
            delay: Duration::from_millis(50),
            max_retries: 3,
            backoff: BackoffKind::Fixed,
        };

        let start = tokio::time::Instant::now();
        let found: Option<u32> = policy
            .read_until_visible(move || async move {
                reads.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            })
            .await
            .unwrap();

        assert!(found.is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        assert_eq!(start.elapsed(), Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_visible_value_without_waiting() {
        let start = tokio::time::Instant::now();
        let found = ReadRetryPolicy::default()
            .read_until_visible(|| async { Ok(Some(7)) })
            .await
            .unwrap();
        assert_eq!(found, Some(7));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn read_errors_short_circuit() {
        let result: Result<Option<u32>, _> = ReadRetryPolicy::default()
            .read_until_visible(|| async { Err(StoreError::Network("reset".into())) })
            .await;
        assert!(matches!(result, Err(StoreError::Network(_))));
    }
}
