// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bounded retry with optional randomized backoff.
//!
//! Scheduled units use [`RetryPolicy::scheduler_default`]: immediate retry,
//! one attempt unless configured otherwise. Sync pulls use
//! [`RetryPolicy::sync_default`]: one attempt plus three retries, each retry
//! sleeping a uniform `[f, 5f]` seconds where `f` starts at the backoff
//! factor and is squared every round, capped at the max sleep.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::consts::{
    DEFAULT_BACKOFF_FACTOR, DEFAULT_RETRY_COUNT, DEFAULT_SYNC_RETRIES, MAX_RETRY_SLEEP_SECS,
};
use crate::observability::messages::workspace::AttemptFailed;
use crate::observability::messages::StructuredLog;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub factor: f64,
    pub max_sleep: Duration,
}

impl Backoff {
    /// Sleep before retry `round` (zero based).
    pub fn delay<R: Rng + ?Sized>(&self, round: u32, rng: &mut R) -> Duration {
        let exponent = 2f64.powi(round.min(16) as i32);
        let f = self.factor.powf(exponent);
        let max = self.max_sleep.as_secs_f64();
        if f.is_nan() || f <= 0.0 {
            return Duration::ZERO;
        }
        if f >= max {
            return self.max_sleep;
        }
        Duration::from_secs_f64(rng.gen_range(f..=5.0 * f).min(max))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, never less than one
    pub attempts: u32,
    pub backoff: Option<Backoff>,
}

impl RetryPolicy {
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff: None,
        }
    }

    pub fn scheduler_default() -> Self {
        Self::immediate(DEFAULT_RETRY_COUNT)
    }

    pub fn sync_default() -> Self {
        Self {
            attempts: 1 + DEFAULT_SYNC_RETRIES,
            backoff: Some(Backoff {
                factor: DEFAULT_BACKOFF_FACTOR,
                max_sleep: Duration::from_secs_f64(MAX_RETRY_SLEEP_SECS),
            }),
        }
    }

    /// Run `op` until it succeeds or attempts run out. `op` receives the
    /// 1-based attempt number. The last error is returned.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    AttemptFailed {
                        label,
                        attempt,
                        attempts,
                        error: &error.to_string(),
                    }
                    .log();
                    if attempt >= attempts {
                        return Err(error);
                    }
                    if let Some(backoff) = &self.backoff {
                        let delay = backoff.delay(attempt - 1, &mut rand::thread_rng());
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::scheduler_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_grows_and_caps() {
        let backoff = RetryPolicy::sync_default().backoff.unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let first = backoff.delay(0, &mut rng).as_secs_f64();
        assert!((1.3..=6.5).contains(&first), "first delay {}", first);

        let second = backoff.delay(1, &mut rng).as_secs_f64();
        assert!((1.69..=8.45).contains(&second), "second delay {}", second);

        assert_eq!(backoff.delay(12, &mut rng), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_run_retries_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let result: Result<u32, String> = policy
            .run("flaky", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(format!("attempt {} failed", attempt))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_returns_last_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(2);

        let result: Result<(), String> = policy
            .run("broken", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("boom {}", attempt)) }
            })
            .await;

        assert_eq!(result, Err("boom 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_attempts_never_zero() {
        assert_eq!(RetryPolicy::immediate(0).attempts, 1);
        assert_eq!(RetryPolicy::default().attempts, DEFAULT_RETRY_COUNT);
        assert_eq!(RetryPolicy::sync_default().attempts, 4);
    }
}
