//! One-shot fan-out: one retry loop per target, all running in parallel.
//!
//! The coordinator never cancels in-flight loops. Every spawned task is
//! joined before returning so each target's diagnostics are complete, even
//! though only the first failure read from the channel is surfaced.

use crate::error::TargetFailure;
use crate::probe::Probe;
use crate::retry::{run_with_retry, RetryOutcome, RetryPolicy};
use crate::target::{TargetDescriptor, TargetId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

pub async fn check_all(
    probe: Arc<dyn Probe>,
    targets: &[TargetDescriptor],
    policy: RetryPolicy,
) -> Result<(), TargetFailure> {
    if targets.is_empty() {
        return Ok(());
    }

    let (tx, mut rx) = mpsc::channel::<(TargetId, RetryOutcome)>(targets.len());
    let mut handles = Vec::with_capacity(targets.len());

    for target in targets.iter().cloned() {
        let tx = tx.clone();
        let probe = probe.clone();
        let id = target.id();
        let handle = tokio::spawn(async move {
            let outcome = run_with_retry(probe.as_ref(), &target, &policy).await;
            // Capacity equals the target count, this never waits.
            let _ = tx.send((target.id(), outcome)).await;
        });
        handles.push((id, handle));
    }
    drop(tx);

    let mut first_failure: Option<TargetFailure> = None;
    while let Some((id, outcome)) = rx.recv().await {
        let failure = match outcome {
            RetryOutcome::Succeeded(attempts) => {
                debug!(db = %id, attempts, "target ready");
                continue;
            }
            RetryOutcome::ExhaustedRetries(source) => TargetFailure::RetriesExhausted {
                target: id,
                attempts: policy.max_tries(),
                source,
            },
            RetryOutcome::Aborted(source) => TargetFailure::Aborted { target: id, source },
        };
        error!("{}", failure);
        first_failure.get_or_insert(failure);
    }

    // The channel is closed, so every task has finished; join to catch panics.
    for (id, handle) in handles {
        if let Err(e) = handle.await {
            let failure = TargetFailure::TaskFailed { target: id, reason: e.to_string() };
            error!("{}", failure);
            first_failure.get_or_insert(failure);
        }
    }

    match first_failure {
        Some(failure) => Err(failure),
        None => Ok(()),
    }
}
