//! Shared retry policy for backend calls.
//!
//! One classification table instead of ad hoc loops per call site: rate
//! limits wait for the server-advertised interval, server errors climb an
//! exponential backoff ladder, client errors and unparseable output fail
//! immediately. Sleeping goes through an injectable trait so tests can
//! observe delays without waiting them out.

use std::time::Duration;

use super::error::ApiError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (4 = 1 initial + 3 retries).
    pub max_attempts: u32,
    /// Wait applied to a 429 when the server does not advertise Retry-After.
    pub rate_limit_fallback: Duration,
    pub backoff_initial: Duration,
    pub backoff_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            rate_limit_fallback: Duration::from_secs(30),
            backoff_initial: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Sleep for the given duration, then retry.
    Wait(Duration),
    /// Do not retry; record the error as-is.
    Fatal,
}

impl RetryPolicy {
    /// Decide what to do after a failed attempt. `attempts_made` counts the
    /// attempts completed so far (1-based), which drives the backoff ladder:
    /// 1s after the first failure, 2s after the second, 4s after the third.
    pub fn next_action(&self, error: &ApiError, attempts_made: u32) -> RetryAction {
        match error {
            ApiError::Status { status: 429, retry_after, .. } => {
                RetryAction::Wait(retry_after.unwrap_or(self.rate_limit_fallback))
            }
            // Unknown model or unsupported request shape: retrying cannot help.
            ApiError::Status { status: 400 | 404, .. } => RetryAction::Fatal,
            ApiError::Parse(_) => RetryAction::Fatal,
            // 500/503 and everything transient climbs the backoff ladder.
            ApiError::Status { .. }
            | ApiError::Network(_)
            | ApiError::Timeout { .. }
            | ApiError::EmptyResponse { .. } => RetryAction::Wait(self.backoff_delay(attempts_made)),
        }
    }

    fn backoff_delay(&self, attempts_made: u32) -> Duration {
        let exponent = attempts_made.saturating_sub(1).min(31);
        let delay = self.backoff_initial.saturating_mul(2u32.pow(exponent));
        delay.min(self.backoff_cap)
    }
}

/// Suspendable delay, injectable so the retry ladder is testable without
/// real sleeps.
#[async_trait::async_trait]
pub trait Sleep: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleep;

#[async_trait::async_trait]
impl Sleep for TokioSleep {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Records requested delays instead of sleeping.
    #[derive(Default)]
    pub struct RecordingSleep {
        pub delays: Mutex<Vec<Duration>>,
    }

    #[async_trait::async_trait]
    impl Sleep for RecordingSleep {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }
}
