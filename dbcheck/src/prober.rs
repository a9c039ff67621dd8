//! Background re-check loop for the exporter mode.
//!
//! Each cycle probes every target once, concurrently and without retry, waits
//! for all of them and publishes one new snapshot. Probing runs outside any
//! lock; only the final swap in [`ResultsPublisher::publish`] is exclusive.
//!
//! `start` must not be called twice without an intervening `stop`.

use crate::error::ProbeError;
use crate::probe::{self, Probe, ProbeOutcome};
use crate::publisher::{ResultsPublisher, ResultsSnapshot, TargetStatus};
use crate::target::TargetDescriptor;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

pub struct PeriodicProber {
    targets: Arc<[TargetDescriptor]>,
    probe: Arc<dyn Probe>,
    interval: Duration,
    publisher: ResultsPublisher,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PeriodicProber {
    /// A zero `interval` falls back to [`DEFAULT_CHECK_INTERVAL`].
    pub fn new(
        targets: Vec<TargetDescriptor>,
        probe: Arc<dyn Probe>,
        interval: Duration,
        publisher: ResultsPublisher,
    ) -> Self {
        let interval = if interval.is_zero() { DEFAULT_CHECK_INTERVAL } else { interval };
        Self {
            targets: targets.into(),
            probe,
            interval,
            publisher,
            shutdown: CancellationToken::new(),
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn publisher(&self) -> &ResultsPublisher {
        &self.publisher
    }

    /// Runs the first cycle before returning, then spawns the ticking loop.
    pub async fn start(&mut self) {
        if self.shutdown.is_cancelled() {
            self.shutdown = CancellationToken::new();
        }

        run_cycle(&self.targets, &self.probe, &self.publisher, 1).await;

        let targets = self.targets.clone();
        let probe = self.probe.clone();
        let publisher = self.publisher.clone();
        let shutdown = self.shutdown.clone();
        let period = self.interval;

        info!(targets = targets.len(), interval = ?period, "periodic prober started");

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut cycle = 1;

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        cycle += 1;
                        run_cycle(&targets, &probe, &publisher, cycle).await;
                    }
                }
            }
            info!(cycles = cycle, "periodic prober stopped");
        }));
    }

    /// Signals the loop to exit at the next tick boundary. An in-flight cycle
    /// completes and publishes. Safe from any thread, and after the loop ended.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Token that stops this prober when cancelled, for use from other tasks.
    pub fn stop_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stops the loop and waits for it to exit.
    pub async fn shutdown(&mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("periodic prober task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PeriodicProber {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_cycle(
    targets: &Arc<[TargetDescriptor]>,
    probe: &Arc<dyn Probe>,
    publisher: &ResultsPublisher,
    cycle: u64,
) {
    let handles: Vec<_> = targets
        .iter()
        .cloned()
        .map(|target| {
            let probe = probe.clone();
            tokio::spawn(async move { probe::probe(probe.as_ref(), &target).await })
        })
        .collect();

    let entries: Vec<TargetStatus> = join_all(handles)
        .await
        .into_iter()
        .zip(targets.iter())
        .map(|(joined, target)| {
            let outcome = joined.unwrap_or_else(|e| {
                warn!(db = %target, "probe task failed: {}", e);
                ProbeOutcome::Failure {
                    reason: ProbeError::Connect(format!("probe task failed: {}", e)),
                    elapsed: Duration::ZERO,
                }
            });
            if let ProbeOutcome::Failure { reason, .. } = &outcome {
                debug!(db = %target, cycle, "unavailable: {}", reason);
            }
            TargetStatus {
                target: target.id(),
                kind: target.kind,
                available: outcome.is_success(),
                last_check_duration: outcome.elapsed(),
            }
        })
        .collect();

    let snapshot = ResultsSnapshot::new(cycle, entries);
    debug!(
        cycle,
        available = snapshot.available_count(),
        total = snapshot.entries.len(),
        "check cycle complete"
    );
    publisher.publish(snapshot);
}
