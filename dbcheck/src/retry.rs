//! Bounded retry loop around a single target.
//!
//! Attempts are strictly sequential. After attempt `i` (1-indexed) fails the
//! runner sleeps `(3 * i + 1)` backoff units before the next one: linear,
//! no jitter. There is no sleep after the final attempt.

use crate::error::{ConfigError, ProbeError};
use crate::probe::{self, Probe, ProbeOutcome};
use crate::target::TargetDescriptor;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_TRIES: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_tries: u32,
    unit: Duration,
}

impl RetryPolicy {
    /// `max_tries` must be at least 1.
    pub fn new(max_tries: u32) -> Result<Self, ConfigError> {
        if max_tries == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TRIES".into(),
                value: "0".into(),
                reason: "at least one attempt is required".into(),
            });
        }
        Ok(Self { max_tries, unit: Duration::from_secs(1) })
    }

    /// Scales every backoff sleep, seconds by default.
    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    pub fn max_tries(&self) -> u32 {
        self.max_tries
    }

    /// Sleep following failed attempt `attempt` (1-indexed). Saturates
    /// instead of overflowing for very large attempt counts.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.unit.saturating_mul(attempt.saturating_mul(3).saturating_add(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_tries: DEFAULT_TRIES, unit: Duration::from_secs(1) }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    /// Number of attempts used, the last one succeeded.
    Succeeded(u32),
    /// Every attempt failed, carries the most recent reason.
    ExhaustedRetries(ProbeError),
    /// A fatal (configuration) error stopped the loop early.
    Aborted(ProbeError),
}

impl RetryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded(_))
    }
}

pub async fn run_with_retry(probe: &dyn Probe, target: &TargetDescriptor, policy: &RetryPolicy) -> RetryOutcome {
    let tries = policy.max_tries;
    let mut last_error = None;

    for attempt in 1..=tries {
        let reason = match probe::probe(probe, target).await {
            ProbeOutcome::Success { elapsed } => {
                info!(db = %target, attempt, ?elapsed, "Connect success");
                return RetryOutcome::Succeeded(attempt);
            }
            ProbeOutcome::Failure { reason, .. } => reason,
        };

        if reason.is_fatal() {
            warn!("{} Try ({}/{}) aborting, error: {}", target, attempt, tries, reason);
            return RetryOutcome::Aborted(reason);
        }

        if attempt < tries {
            let sleep = policy.backoff(attempt);
            warn!("{} Try ({}/{}) sleep {:?} error: {}", target, attempt, tries, sleep, reason);
            tokio::time::sleep(sleep).await;
        } else {
            warn!("{} Try ({}/{}) error: {}", target, attempt, tries, reason);
        }
        last_error = Some(reason);
    }

    // tries >= 1 is guaranteed by RetryPolicy::new, so at least one attempt ran.
    RetryOutcome::ExhaustedRetries(last_error.unwrap_or_else(|| ProbeError::Connect("no attempt made".into())))
}
