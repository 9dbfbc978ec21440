//! Attempt budgets and backoff.
//!
//! [`run`] and [`run_observed`] drive any fallible async operation through a
//! [`RetryPolicy`]: success returns at once, terminal failures return at
//! once, retryable failures sleep for the policy's backoff and try again
//! until the attempt budget is spent. The HTTP-level
//! [`invoker::RetryingInvoker`] and the provider chain both sit on top of it,
//! each with its own [`BackoffStrategy`].

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod invoker;

/// Default attempt budget.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff seed.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default upper bound on a single backoff sleep.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Status codes worth retrying: request-timeout, too-many-requests,
/// internal-error, bad-gateway, service-unavailable, gateway-timeout.
pub const RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Returns `true` when a failed response with `status` may succeed on retry.
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUS_CODES.contains(&status)
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// How the delay grows between successive attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Always `base`.
    Fixed,
    /// `base * attempt`.
    #[default]
    Linear,
    /// `base * 2^(attempt - 1)`.
    Exponential,
}

impl BackoffStrategy {
    /// Delay to wait after the failed `attempt` (1-based), before the next one.
    pub fn delay(self, base: Duration, attempt: u32) -> Duration {
        let factor = match self {
            Self::Fixed => 1,
            Self::Linear => attempt.max(1),
            Self::Exponential => 2_u32
                .checked_pow(attempt.saturating_sub(1))
                .unwrap_or(u32::MAX),
        };
        base.saturating_mul(factor)
    }
}

/// Attempt budget plus backoff law.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Backoff seed.
    pub base_delay: Duration,
    /// Cap on any single backoff sleep.
    pub max_delay: Duration,
    /// Growth law.
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            strategy: BackoffStrategy::default(),
        }
    }
}

impl RetryPolicy {
    /// Policy with linear backoff.
    pub fn linear(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            strategy: BackoffStrategy::Linear,
            ..Self::default()
        }
    }

    /// Policy with exponential backoff.
    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            strategy: BackoffStrategy::Exponential,
            ..Self::default()
        }
    }

    /// Same budget, no sleeping between attempts.
    pub fn without_delay(self) -> Self {
        Self {
            base_delay: Duration::ZERO,
            ..self
        }
    }

    /// Effective attempt budget (never below one).
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Capped delay after the failed `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.strategy
            .delay(self.base_delay, attempt)
            .min(self.max_delay)
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Failure types the retry loop can classify.
pub trait Retryable {
    /// Returns `true` if another attempt may succeed.
    fn is_retryable(&self) -> bool;
}

/// Why the retry loop gave up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError<E> {
    /// A non-retryable failure ended the loop early.
    #[error("terminal failure on attempt {attempts}: {error}")]
    Terminal {
        /// Attempts consumed, including the failing one.
        attempts: u32,
        /// The terminal failure.
        error: E,
    },
    /// Every attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts consumed.
        attempts: u32,
        /// The last observed failure.
        last: E,
    },
}

impl<E> RetryError<E> {
    /// Attempts consumed before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Terminal { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// The last failure observed.
    pub fn last_error(&self) -> &E {
        match self {
            Self::Terminal { error, .. } => error,
            Self::Exhausted { last, .. } => last,
        }
    }

    /// Consume into the last failure observed.
    pub fn into_last_error(self) -> E {
        match self {
            Self::Terminal { error, .. } => error,
            Self::Exhausted { last, .. } => last,
        }
    }

    /// Returns `true` when the budget ran out.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Timing of one attempt, handed to [`run_observed`] observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTiming {
    /// 1-based attempt number.
    pub number: u32,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Time spent in the operation.
    pub elapsed: Duration,
}

/// Run `operation` under `policy`.
///
/// # Errors
///
/// Returns [`RetryError::Terminal`] on the first non-retryable failure and
/// [`RetryError::Exhausted`] once the budget is spent.
pub async fn run<T, E, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T, RetryError<E>>
where
    E: Retryable + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    run_observed(policy, operation, |_, _| {}).await
}

/// Run `operation` under `policy`, reporting every attempt to `observe`.
///
/// `operation` receives the 1-based attempt number. Attempts are strictly
/// sequential.
///
/// # Errors
///
/// Same as [`run`].
pub async fn run_observed<T, E, F, Fut, O>(
    policy: &RetryPolicy,
    mut operation: F,
    mut observe: O,
) -> Result<T, RetryError<E>>
where
    E: Retryable + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    O: FnMut(&AttemptTiming, &Result<T, E>),
{
    let budget = policy.attempts();
    let mut attempt: u32 = 1;
    loop {
        let started_at = Utc::now();
        let clock = tokio::time::Instant::now();
        let result = operation(attempt).await;
        let timing = AttemptTiming {
            number: attempt,
            started_at,
            elapsed: clock.elapsed(),
        };
        observe(&timing, &result);

        let error = match result {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        if !error.is_retryable() {
            return Err(RetryError::Terminal {
                attempts: attempt,
                error,
            });
        }
        if attempt >= budget {
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: error,
            });
        }

        let delay = policy.delay_after(attempt);
        debug!(
            attempt,
            budget,
            delay_ms = delay.as_millis(),
            error = %error,
            "retryable failure, backing off"
        );
        tokio::time::sleep(delay).await;
        attempt = attempt.saturating_add(1);
    }
}
