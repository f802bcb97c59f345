//! Configuration for the sync engine.

use crate::error::SyncError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Observer invoked with the 1-indexed failed attempt and its error,
/// just before the engine waits for the next attempt.
pub type RetryObserver = Arc<dyn Fn(u32, &SyncError) + Send + Sync>;

/// Configuration for retry behavior.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    /// Zero means a single attempt, no retries.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling for the exponential backoff.
    pub max_delay: Duration,
    /// Observer invoked before each retry wait.
    pub on_retry: Option<RetryObserver>,
}

impl RetryPolicy {
    /// Creates a retry policy with the given retry budget.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            on_retry: None,
        }
    }

    /// A policy that makes a single attempt.
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the backoff ceiling.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Installs an observer invoked before each retry wait.
    #[must_use]
    pub fn with_observer(
        mut self,
        observer: impl Fn(u32, &SyncError) + Send + Sync + 'static,
    ) -> Self {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    /// Calculates the backoff delay after the given failed attempt
    /// (1-indexed): `min(base * 2^(attempt - 1), max)`. Saturates
    /// instead of overflowing for large attempt numbers.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63);
        let factor = 1u64 << exponent;
        let base = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base.saturating_mul(factor).min(max))
    }

    pub(crate) fn notify_retry(&self, attempt: u32, error: &SyncError) {
        if let Some(observer) = &self.on_retry {
            observer(attempt, error);
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "observer"))
            .finish()
    }
}

/// A deadline for a single asynchronous operation.
#[derive(Debug, Clone)]
pub struct Deadline {
    /// Time allowed for the operation.
    pub duration: Duration,
    /// Message carried by the timeout error, if customized.
    pub message: Option<String>,
}

impl Deadline {
    /// Creates a deadline with the given duration.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            message: None,
        }
    }

    /// Creates a deadline of the given number of milliseconds.
    pub fn after_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Sets the message carried by the timeout error.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub(crate) fn timeout_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("timeout after {}ms", self.duration.as_millis()))
    }
}

/// Configuration for reconciliation runs.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Batch size when refreshing covers of already-known records.
    pub refresh_batch_size: usize,
    /// Batch size when fetching covers of newly admitted records.
    pub admit_batch_size: usize,
    /// Retry policy for transport calls.
    pub retry: RetryPolicy,
}

impl SyncConfig {
    /// Creates a configuration with the default batch sizes.
    pub fn new() -> Self {
        Self {
            refresh_batch_size: 20,
            admit_batch_size: 10,
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the cover-refresh batch size.
    #[must_use]
    pub fn with_refresh_batch_size(mut self, size: usize) -> Self {
        self.refresh_batch_size = size;
        self
    }

    /// Sets the new-record admission batch size.
    #[must_use]
    pub fn with_admit_batch_size(mut self, size: usize) -> Self {
        self.admit_batch_size = size;
        self
    }

    /// Sets the retry policy for transport calls.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
