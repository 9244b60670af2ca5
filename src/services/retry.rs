//! Bounded retry with exponential backoff around a single network call.

use crate::config::RetrySettings;
use crate::error::{ClassifierError, Result};
use crate::services::cancel::CancelToken;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetrySettings::default().into()
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: settings.base_delay,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Wait before the retry that follows failed attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `op` until it succeeds, fails with a non-transport error, or retries run out.
    pub fn run<T>(
        &self,
        label: &str,
        cancel: &CancelToken,
        op: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        self.run_with_sleep(label, cancel, op, |d| cancel.sleep(d))
    }

    /// Same as [`run`](Self::run) with an injectable sleep; `sleep` returns false to abort.
    pub fn run_with_sleep<T>(
        &self,
        label: &str,
        cancel: &CancelToken,
        mut op: impl FnMut() -> Result<T>,
        mut sleep: impl FnMut(Duration) -> bool,
    ) -> Result<T> {
        let mut attempt = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(ClassifierError::Cancelled);
            }
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transport() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "{}: attempt {} failed ({}), retrying in {}ms",
                        label,
                        attempt + 1,
                        e,
                        delay.as_millis()
                    );
                    if !sleep(delay) {
                        return Err(ClassifierError::Cancelled);
                    }
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transport() {
                        tracing::error!("{}: failed after {} attempts: {}", label, attempt + 1, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}
