//! dbcheck - readiness checks and availability exporter for databases
//!
//! Two ways to drive the same probes:
//! - one-shot: [`check_all`] runs a bounded retry loop per target in
//!   parallel and reports the first target that never became reachable
//! - exporter: [`PeriodicProber`] re-probes every target on a fixed interval
//!   and publishes whole snapshots through [`ResultsPublisher`]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod probe;
pub mod prober;
pub mod publisher;
pub mod retry;
pub mod target;
pub mod tls;

pub use config::Settings;
pub use coordinator::check_all;
pub use error::{ConfigError, ProbeError, TargetFailure};
pub use probe::{DriverProbe, Probe, ProbeOutcome};
pub use prober::PeriodicProber;
pub use publisher::{ResultsPublisher, ResultsSnapshot, TargetStatus};
pub use retry::{run_with_retry, RetryOutcome, RetryPolicy};
pub use target::{Credentials, DatabaseKind, TargetDescriptor, TargetId};
pub use tls::{FileReader, OsFileReader, TlsMaterial, TlsPolicy};

/// Process exit statuses.
pub mod exit {
    pub const SUCCESS: i32 = 0;
    /// Configuration or immediate setup error.
    pub const CONFIG_ERROR: i32 = 1;
    /// At least one target never became reachable.
    pub const UNREACHABLE: i32 = 2;
}
