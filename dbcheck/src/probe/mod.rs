//! Single connectivity checks.
//!
//! A probe opens one dedicated connection, runs a trivial introspection
//! request under a deadline and releases the connection on every path.
//! It never retries and never logs failures itself: callers decide.

mod mongo;
mod mysql;

use crate::error::ProbeError;
use crate::target::{DatabaseKind, TargetDescriptor};
use async_trait::async_trait;
use std::time::{Duration, Instant};

pub const MYSQL_DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const MONGODB_DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One connectivity check against one target.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, target: &TargetDescriptor) -> Result<(), ProbeError>;
}

/// Result of a single timed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Success { elapsed: Duration },
    Failure { reason: ProbeError, elapsed: Duration },
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success { .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            ProbeOutcome::Success { elapsed } | ProbeOutcome::Failure { elapsed, .. } => *elapsed,
        }
    }
}

/// Runs `probe` once and measures it.
pub async fn probe(probe: &dyn Probe, target: &TargetDescriptor) -> ProbeOutcome {
    let started = Instant::now();
    let result = probe.check(target).await;
    let elapsed = started.elapsed();
    match result {
        Ok(()) => ProbeOutcome::Success { elapsed },
        Err(reason) => ProbeOutcome::Failure { reason, elapsed },
    }
}

/// Production probe, dispatches on the target's database kind.
#[derive(Debug, Clone, Default)]
pub struct DriverProbe {
    timeout: Option<Duration>,
}

impl DriverProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the per-kind default deadline for every attempt.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn deadline(&self, kind: DatabaseKind) -> Duration {
        self.timeout.unwrap_or(match kind {
            DatabaseKind::MySql => MYSQL_DEFAULT_TIMEOUT,
            DatabaseKind::MongoDb => MONGODB_DEFAULT_TIMEOUT,
        })
    }
}

#[async_trait]
impl Probe for DriverProbe {
    async fn check(&self, target: &TargetDescriptor) -> Result<(), ProbeError> {
        let deadline = self.deadline(target.kind);
        match target.kind {
            DatabaseKind::MySql => mysql::check(target, deadline).await,
            DatabaseKind::MongoDb => mongo::check(target, deadline).await,
        }
    }
}
