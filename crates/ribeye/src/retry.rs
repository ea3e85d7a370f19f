//! Optimistic version-check-and-retry policy.
//!
//! Wraps a versioned operation: read the version, run the operation, and
//! accept its result only if the version it reports is exactly one past the
//! version read beforehand. Anything else means another writer committed in
//! between; the attempt is discarded and retried after an exponential backoff
//! with jitter.
//!
//! Business failures returned by the operation are never retried.

use std::future::Future;
use std::time::Duration;

use crate::config::env_parse;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Upper bound of the random delay added to each backoff.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: env_parse("RIBEYE_RETRY_ATTEMPTS").unwrap_or(3),
            base_delay: Duration::from_millis(
                env_parse("RIBEYE_RETRY_BASE_DELAY_MS").unwrap_or(10),
            ),
            max_jitter: Duration::from_millis(env_parse("RIBEYE_RETRY_JITTER_MS").unwrap_or(5)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError<E> {
    #[error("{0}")]
    Rejected(E),
    #[error("gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Outcome of one attempt. The stale signal never leaves this module.
enum Attempt<T, E> {
    Committed(T),
    Rejected(E),
    Stale { expected: u64, actual: u64 },
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Delay before the retry that follows attempt `attempt` (zero-based):
    /// `base_delay * 2^attempt` plus up to `max_jitter`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * (1 << attempt.min(10)) + self.jitter()
    }

    fn jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        self.max_jitter.mul_f64(rand::random::<f64>())
    }

    /// Run `op` under optimistic version checking.
    ///
    /// `current_version` reads the version the operation is expected to move
    /// from; `op` returns the version it committed alongside its value.
    pub async fn run_versioned<T, E, V, F, Fut>(
        &self,
        mut current_version: V,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        V: FnMut() -> u64,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(u64, T), E>>,
    {
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            match Self::attempt(&mut current_version, &mut op).await {
                Attempt::Committed(value) => return Ok(value),
                Attempt::Rejected(err) => return Err(RetryError::Rejected(err)),
                Attempt::Stale { expected, actual } => {
                    if attempt + 1 == attempts {
                        break;
                    }
                    let backoff = self.backoff(attempt);
                    tracing::debug!(
                        attempt,
                        expected,
                        actual,
                        backoff_ms = backoff.as_millis() as u64,
                        "Stale version, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        tracing::warn!(attempts, "Optimistic retries exhausted");
        Err(RetryError::Exhausted { attempts })
    }

    async fn attempt<T, E, V, F, Fut>(current_version: &mut V, op: &mut F) -> Attempt<T, E>
    where
        V: FnMut() -> u64,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(u64, T), E>>,
    {
        let start = current_version();
        match op().await {
            Err(err) => Attempt::Rejected(err),
            Ok((version, value)) if version == start + 1 => Attempt::Committed(value),
            Ok((version, _)) => Attempt::Stale {
                expected: start + 1,
                actual: version,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(10))
    }

    /// Simulated versioned store: another writer commits just before each of
    /// the first `stale_attempts` operations.
    struct Versioned {
        version: AtomicU64,
        calls: AtomicU32,
        stale_attempts: u32,
    }

    impl Versioned {
        fn new(stale_attempts: u32) -> Arc<Self> {
            Arc::new(Self {
                version: AtomicU64::new(0),
                calls: AtomicU32::new(0),
                stale_attempts,
            })
        }

        async fn op(&self) -> Result<(u64, &'static str), &'static str> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.stale_attempts {
                // Someone else committed first.
                self.version.fetch_add(1, Ordering::SeqCst);
            }
            Ok((self.version.fetch_add(1, Ordering::SeqCst) + 1, "done"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn commits_on_first_attempt_without_interleaving() {
        let store = Versioned::new(0);
        let result = policy()
            .run_versioned(
                || store.version.load(Ordering::SeqCst),
                || store.op(),
            )
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_after_interleaved_writer() {
        let store = Versioned::new(1);
        let started = tokio::time::Instant::now();

        let result = policy()
            .run_versioned(
                || store.version.load(Ordering::SeqCst),
                || store.op(),
            )
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_attempts_with_doubling_backoff() {
        let store = Versioned::new(u32::MAX);
        let started = tokio::time::Instant::now();

        let result = policy()
            .run_versioned(
                || store.version.load(Ordering::SeqCst),
                || store.op(),
            )
            .await;

        assert_eq!(result, Err(RetryError::Exhausted { attempts: 3 }));
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        // 10ms after the first attempt, 20ms after the second, none after the last.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(30));
        assert!(elapsed < Duration::from_millis(40));
    }

    #[tokio::test(start_paused = true)]
    async fn business_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = policy()
            .run_versioned(
                || 0,
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(u64, ()), _>("empty") }
                },
            )
            .await;

        assert_eq!(result, Err(RetryError::Rejected("empty")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = policy();
        assert_eq!(policy.backoff(0), Duration::from_millis(10));
        assert_eq!(policy.backoff(1), Duration::from_millis(20));
        assert_eq!(policy.backoff(2), Duration::from_millis(40));
    }

    #[test]
    fn jitter_stays_within_bound() {
        let policy = policy().with_jitter(Duration::from_millis(5));
        for _ in 0..100 {
            let backoff = policy.backoff(1);
            assert!(backoff >= Duration::from_millis(20));
            assert!(backoff <= Duration::from_millis(25));
        }
    }

    #[test]
    fn defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(10));
    }
}
