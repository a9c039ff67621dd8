//! Snapshot publication for the exporter mode.
//!
//! The prober replaces the whole snapshot behind a write lock held only for
//! the pointer swap; scrapes take the read lock just long enough to clone
//! the `Arc`. A reader therefore always sees exactly one cycle's results.
//! Gauges are rebuilt from the snapshot on every scrape, so targets dropped
//! from the configuration disappear instead of lingering.

use crate::target::{DatabaseKind, TargetId};
use parking_lot::RwLock;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::error;

pub const AVAILABLE_METRIC: &str = "db_connection_available";
pub const DURATION_METRIC: &str = "db_connection_duration_seconds";
const LABELS: [&str; 4] = ["host", "port", "database", "type"];

#[derive(Debug, Clone, PartialEq)]
pub struct TargetStatus {
    pub target: TargetId,
    pub kind: DatabaseKind,
    pub available: bool,
    pub last_check_duration: Duration,
}

/// Immutable result set of one probing cycle. Entries keep configuration
/// order; duplicate targets appear twice.
#[derive(Debug, Clone)]
pub struct ResultsSnapshot {
    pub cycle: u64,
    pub checked_at: OffsetDateTime,
    pub entries: Vec<TargetStatus>,
}

impl ResultsSnapshot {
    pub fn empty() -> Self {
        Self {
            cycle: 0,
            checked_at: OffsetDateTime::UNIX_EPOCH,
            entries: Vec::new(),
        }
    }

    pub fn new(cycle: u64, entries: Vec<TargetStatus>) -> Self {
        Self { cycle, checked_at: OffsetDateTime::now_utc(), entries }
    }

    pub fn available_count(&self) -> usize {
        self.entries.iter().filter(|e| e.available).count()
    }
}

/// Shared handle between the prober (single writer) and scrapes (readers).
#[derive(Clone)]
pub struct ResultsPublisher {
    current: Arc<RwLock<Arc<ResultsSnapshot>>>,
    available: GaugeVec,
    duration: GaugeVec,
}

impl ResultsPublisher {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            current: Arc::new(RwLock::new(Arc::new(ResultsSnapshot::empty()))),
            available: GaugeVec::new(available_opts(), &LABELS)?,
            duration: GaugeVec::new(duration_opts(), &LABELS)?,
        })
    }

    /// Replaces the current snapshot wholesale.
    pub fn publish(&self, snapshot: ResultsSnapshot) {
        let previous = std::mem::replace(&mut *self.current.write(), Arc::new(snapshot));
        drop(previous);
    }

    /// The snapshot current at call time, unaffected by later publications.
    pub fn snapshot(&self) -> Arc<ResultsSnapshot> {
        self.current.read().clone()
    }

    fn render(&self, snapshot: &ResultsSnapshot) -> prometheus::Result<Vec<MetricFamily>> {
        let available = GaugeVec::new(available_opts(), &LABELS)?;
        let duration = GaugeVec::new(duration_opts(), &LABELS)?;

        for entry in &snapshot.entries {
            let port = entry.target.port.to_string();
            let labels = [
                entry.target.host.as_str(),
                port.as_str(),
                entry.target.name.as_str(),
                entry.kind.as_str(),
            ];
            available
                .with_label_values(&labels)
                .set(if entry.available { 1.0 } else { 0.0 });
            duration
                .with_label_values(&labels)
                .set(entry.last_check_duration.as_secs_f64());
        }

        let mut families = available.collect();
        families.extend(duration.collect());
        Ok(families)
    }
}

impl Collector for ResultsPublisher {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = self.available.desc();
        descs.extend(self.duration.desc());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let snapshot = self.snapshot();
        self.render(&snapshot).unwrap_or_else(|e| {
            error!("cannot render connection gauges: {}", e);
            Vec::new()
        })
    }
}

fn available_opts() -> Opts {
    Opts::new(AVAILABLE_METRIC, "Database connection availability (1 = available, 0 = unavailable)")
}

fn duration_opts() -> Opts {
    Opts::new(DURATION_METRIC, "Database connection check duration in seconds")
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, Registry, TextEncoder};

    fn status(host: &str, name: &str, available: bool) -> TargetStatus {
        TargetStatus {
            target: TargetId { host: host.into(), port: 3306, name: name.into() },
            kind: DatabaseKind::MySql,
            available,
            last_check_duration: Duration::from_millis(250),
        }
    }

    fn scrape(publisher: &ResultsPublisher) -> String {
        let registry = Registry::new();
        registry.register(Box::new(publisher.clone())).unwrap();
        let mut buf = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_starts_empty() {
        let publisher = ResultsPublisher::new().unwrap();
        let snapshot = publisher.snapshot();
        assert_eq!(snapshot.cycle, 0);
        assert!(snapshot.entries.is_empty());
    }

    #[test]
    fn test_reader_keeps_its_snapshot_across_publish() {
        let publisher = ResultsPublisher::new().unwrap();
        publisher.publish(ResultsSnapshot::new(1, vec![status("a", "db1", true)]));

        let held = publisher.snapshot();
        publisher.publish(ResultsSnapshot::new(2, vec![status("a", "db1", false)]));

        assert_eq!(held.cycle, 1);
        assert!(held.entries[0].available);
        assert_eq!(publisher.snapshot().cycle, 2);
        assert!(!publisher.snapshot().entries[0].available);
    }

    #[test]
    fn test_gauges_are_labeled_per_target() {
        let publisher = ResultsPublisher::new().unwrap();
        publisher.publish(ResultsSnapshot::new(1, vec![status("a", "db1", true), status("b", "db2", false)]));

        let text = scrape(&publisher);
        assert!(text.contains(r#"db_connection_available{database="db1",host="a",port="3306",type="mysql"} 1"#));
        assert!(text.contains(r#"db_connection_available{database="db2",host="b",port="3306",type="mysql"} 0"#));
        assert!(text.contains(r#"db_connection_duration_seconds{database="db1",host="a",port="3306",type="mysql"} 0.25"#));
    }

    #[test]
    fn test_removed_targets_disappear() {
        let publisher = ResultsPublisher::new().unwrap();
        publisher.publish(ResultsSnapshot::new(1, vec![status("a", "db1", true), status("b", "db2", true)]));
        publisher.publish(ResultsSnapshot::new(2, vec![status("a", "db1", true)]));

        let text = scrape(&publisher);
        assert!(text.contains(r#"database="db1""#));
        assert!(!text.contains(r#"database="db2""#));
    }
}
