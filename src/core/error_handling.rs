//! Retry handling for external tool invocations
//!
//! Each download runs in a retry loop with exponential backoff and jitter.
//! Only errors [`AppError::is_retryable`] accepts get another attempt.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::models::{AppError, AppResult};

/// Hard cap on `max_attempts`
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Default base delay for exponential backoff
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Maximum delay cap for exponential backoff
pub const MAX_DELAY_CAP: Duration = Duration::from_secs(30);

/// Attempt count and backoff shape
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Base delay for exponential backoff
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
    /// Factor applied to the delay after every failure
    pub backoff_multiplier: f64,
    /// Randomise each delay by up to half of `jitter_factor`
    pub jitter_enabled: bool,
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: MAX_DELAY_CAP,
            backoff_multiplier: 2.0,
            jitter_enabled: true,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Default policy with a different attempt count
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_RETRY_ATTEMPTS),
            ..Default::default()
        }
    }

    /// Delay before attempt `attempt + 1`, without jitter
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay_ms =
            self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

/// Handed to the operation on every attempt
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Shared by every attempt of one execution
    pub attempt_id: String,
    /// 1-based
    pub attempt_number: u32,
    /// Time since the first attempt started
    pub total_elapsed: Duration,
    /// Message of the attempt before this one
    pub previous_error: Option<String>,
}

/// Called with the failed attempt number and its error before a retry
pub type RetryNotifier = Arc<dyn Fn(u32, &AppError) + Send + Sync>;

/// Runs a fallible async operation under a [`RetryPolicy`]
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    notifier: Option<RetryNotifier>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            notifier: None,
        }
    }

    /// Report each retry through `notifier`
    pub fn with_notifier(mut self, notifier: RetryNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `f` until it succeeds, fails permanently or runs out of attempts.
    ///
    /// Returns the value together with the number of attempts it took.
    pub async fn execute<F, Fut, T>(&self, mut f: F) -> AppResult<(T, u32)>
    where
        F: FnMut(RetryContext) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let start_time = Instant::now();
        let attempt_id = Uuid::new_v4().to_string();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut previous_error: Option<String> = None;

        for attempt in 1..=max_attempts {
            let context = RetryContext {
                attempt_id: attempt_id.clone(),
                attempt_number: attempt,
                total_elapsed: start_time.elapsed(),
                previous_error: previous_error.take(),
            };

            debug!("Executing attempt {} for {}", attempt, attempt_id);

            let error = match f(context).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(
                            "🔁 Succeeded on attempt {} ({})",
                            attempt, attempt_id
                        );
                    }
                    return Ok((value, attempt));
                }
                Err(error) => error,
            };

            warn!("Attempt {} failed for {}: {}", attempt, attempt_id, error);

            if !error.is_retryable() || attempt >= max_attempts {
                return Err(error);
            }

            if let Some(notifier) = &self.notifier {
                notifier(attempt, &error);
            }

            let delay = self.calculate_delay(attempt);
            info!(
                "Next attempt in {:?} ({}/{})",
                delay,
                attempt + 1,
                max_attempts
            );
            if !delay.is_zero() {
                sleep(delay).await;
            }

            previous_error = Some(error.to_string());
        }

        unreachable!("every attempt returns on its last iteration")
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let mut delay = self.policy.backoff_delay(attempt);

        if self.policy.jitter_enabled {
            let jitter = delay.as_millis() as f64
                * self.policy.jitter_factor
                * (rand::random::<f64>() - 0.5);
            let jittered_delay = delay.as_millis() as i64 + jitter as i64;
            delay = Duration::from_millis(jittered_delay.max(0) as u64);
        }

        delay
    }
}
