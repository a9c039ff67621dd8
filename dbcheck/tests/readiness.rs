//! One-shot readiness: fan-out across targets and the retry schedule.

use dbcheck::{check_all, run_with_retry, ProbeError, RetryOutcome, RetryPolicy, TargetFailure};
use dbcheck_devkit::{ScriptedProbe, TestHarness};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_all_targets_up_probes_each_once() {
    let harness = TestHarness::new();
    let targets = TestHarness::targets(3);

    let result = check_all(harness.probe_arc(), &targets, RetryPolicy::default()).await;

    assert!(result.is_ok());
    assert_eq!(harness.probe.total_calls(), 3);
    for target in &targets {
        assert_eq!(harness.probe.calls_for(&target.name), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_empty_target_set_succeeds_without_probing() {
    let harness = TestHarness::new();
    let result = check_all(harness.probe_arc(), &[], RetryPolicy::default()).await;
    assert!(result.is_ok());
    assert_eq!(harness.probe.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_target_is_named_and_others_complete() {
    let probe = ScriptedProbe::new()
        .always_fail("db1", ProbeError::Connect("connection refused".into()))
        .fail_times("db2", 2);
    let harness = TestHarness::new().with_probe(probe);
    let targets = TestHarness::targets(3);

    let policy = RetryPolicy::new(4).unwrap();
    let failure = check_all(harness.probe_arc(), &targets, policy).await.unwrap_err();

    match &failure {
        TargetFailure::RetriesExhausted { target, attempts, source } => {
            assert_eq!(target.name, "db1");
            assert_eq!(*attempts, 4);
            assert_eq!(source, &ProbeError::Connect("connection refused".into()));
        }
        other => panic!("unexpected failure: {:?}", other),
    }
    assert!(!failure.is_config_error());

    assert_eq!(harness.probe.calls_for("db0"), 1);
    assert_eq!(harness.probe.calls_for("db1"), 4);
    assert_eq!(harness.probe.calls_for("db2"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_security_error_aborts_as_config_error() {
    let probe = ScriptedProbe::new().always_fail("db0", ProbeError::SecurityConfig("bad trust bundle".into()));
    let harness = TestHarness::new().with_probe(probe);
    let targets = TestHarness::targets(1);

    let failure = check_all(harness.probe_arc(), &targets, RetryPolicy::default()).await.unwrap_err();

    assert!(failure.is_config_error());
    assert_eq!(harness.probe.calls_for("db0"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_schedule_is_linear() {
    let probe = ScriptedProbe::new().fail_times("db0", 3);
    let target = &TestHarness::targets(1)[0];

    let outcome = run_with_retry(&probe, target, &RetryPolicy::new(5).unwrap()).await;
    assert_eq!(outcome, RetryOutcome::Succeeded(4));

    let times = probe.call_times("db0");
    let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
    assert_eq!(gaps, vec![Duration::from_secs(4), Duration::from_secs(7), Duration::from_secs(10)]);
}

#[tokio::test(start_paused = true)]
async fn test_no_sleep_after_last_attempt() {
    let probe = ScriptedProbe::new().always_fail("db0", ProbeError::Connect("down".into()));
    let target = &TestHarness::targets(1)[0];

    let start = tokio::time::Instant::now();
    let outcome = run_with_retry(&probe, target, &RetryPolicy::new(2).unwrap()).await;

    assert!(matches!(outcome, RetryOutcome::ExhaustedRetries(_)));
    assert_eq!(start.elapsed(), Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_targets_retry_concurrently() {
    let probe = ScriptedProbe::new().fail_times("db0", 2).fail_times("db1", 2);
    let harness = TestHarness::new().with_probe(probe);
    let targets = TestHarness::targets(2);

    let start = tokio::time::Instant::now();
    check_all(Arc::new(harness.probe.clone()), &targets, RetryPolicy::default())
        .await
        .unwrap();

    // 4s + 7s once, not twice.
    assert_eq!(start.elapsed(), Duration::from_secs(11));
}
