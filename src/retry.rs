// src/retry.rs
//! Bounded retry with exponential backoff.
//!
//! Wait after the n-th failed attempt is `multiplier * 2^(n-1)`, clamped to
//! `[min_delay, max_delay]`. Only failures classified as transient are retried.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use metrics::counter;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;

use crate::config::RetryConfig;
use crate::error::Transience;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    multiplier: Duration,
    min_delay: Duration,
    max_delay: Duration,
}

/// Last failure plus how many attempts were spent on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryError<E> {
    pub attempts: u32,
    pub last: E,
}

impl<E: Display> Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (after {} attempt(s))", self.last, self.attempts)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, multiplier: Duration, min_delay: Duration, max_delay: Duration) -> Self {
        let (min_delay, max_delay) = if min_delay > max_delay {
            (max_delay, min_delay)
        } else {
            (min_delay, max_delay)
        };
        Self {
            max_attempts: max_attempts.max(1),
            multiplier,
            min_delay,
            max_delay,
        }
    }

    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self::new(
            cfg.max_attempts,
            Duration::from_millis(cfg.multiplier_ms),
            Duration::from_millis(cfg.min_delay_ms),
            Duration::from_millis(cfg.max_delay_ms),
        )
    }

    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Waits between attempts, in order. Yields `max_attempts - 1` delays.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> {
        let (min, max) = (self.min_delay, self.max_delay);
        // ExponentialBackoff yields factor * 2^n starting at n = 1.
        let half_ms = (self.multiplier.as_millis() / 2).min(u64::MAX as u128) as u64;
        ExponentialBackoff::from_millis(2)
            .factor(half_ms)
            .max_delay(max)
            .map(move |d| d.clamp(min, max))
            .take(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Backoff after `failed` attempts (1-based).
    pub fn delay_for(&self, failed: u32) -> Duration {
        let (min, max) = (self.min_delay, self.max_delay);
        let exp = failed.saturating_sub(1).min(20);
        self.multiplier.saturating_mul(1u32 << exp).clamp(min, max)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    /// `op` receives the 1-based attempt number.
    pub async fn execute<T, E, F, Fut>(&self, op_name: &'static str, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transience + Display,
    {
        let attempts = AtomicU32::new(0);
        let action = || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            counter!("newscast_retry_attempts_total", "op" => op_name).increment(1);
            op(attempt)
        };
        let retry_transient = |e: &E| {
            let transient = e.is_transient();
            if transient {
                tracing::debug!(
                    op = op_name,
                    attempt = attempts.load(Ordering::SeqCst),
                    error = %e,
                    "transient failure, backing off"
                );
            }
            transient
        };

        let res = RetryIf::spawn(self.schedule(), action, retry_transient).await;
        let attempts = attempts.load(Ordering::SeqCst);
        res.map_err(|last| {
            if last.is_transient() {
                tracing::warn!(op = op_name, attempts, error = %last, "retries exhausted");
            } else {
                tracing::debug!(op = op_name, attempts, error = %last, "permanent failure, not retrying");
            }
            RetryError { attempts, last }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn reference_delays_are_clamped() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for(1), Duration::from_secs(2));
        assert_eq!(p.delay_for(2), Duration::from_secs(2));
        assert_eq!(p.delay_for(3), Duration::from_secs(4));
        assert_eq!(p.delay_for(4), Duration::from_secs(8));
        assert_eq!(p.delay_for(5), Duration::from_secs(10));
        assert_eq!(p.delay_for(60), Duration::from_secs(10));
    }

    #[test]
    fn schedule_matches_delay_for() {
        let p = RetryPolicy::new(
            6,
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(10),
        );
        let waits: Vec<_> = p.schedule().collect();
        let expected: Vec<_> = (1..6).map(|n| p.delay_for(n)).collect();
        assert_eq!(waits, expected);
        assert_eq!(RetryPolicy::default().schedule().count(), 2);
        assert_eq!(RetryPolicy::no_retry().schedule().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_default_policy_waits_two_then_two_seconds() {
        let t0 = tokio::time::Instant::now();
        let res: Result<(), _> = RetryPolicy::default()
            .execute("test", |_| async { Err(SourceError::Transient("timeout".into())) })
            .await;
        assert_eq!(res.unwrap_err().attempts, 3);
        let elapsed = t0.elapsed();
        assert!(elapsed >= Duration::from_secs(4), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(4_100), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_use_every_attempt() {
        let calls = AtomicU32::new(0);
        let p = RetryPolicy::default();
        let res: Result<(), _> = p
            .execute("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::Transient("timeout".into())) }
            })
            .await;
        let err = res.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_short_circuits() {
        let calls = AtomicU32::new(0);
        let p = RetryPolicy::default();
        let res: Result<(), _> = p
            .execute("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::Permanent("401".into())) }
            })
            .await;
        assert_eq!(res.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_second_attempt() {
        let p = RetryPolicy::default();
        let res = p
            .execute("test", |attempt| async move {
                if attempt < 2 {
                    Err(SourceError::Transient("flaky".into()))
                } else {
                    Ok(attempt)
                }
            })
            .await;
        assert_eq!(res.unwrap(), 2);
    }
}
