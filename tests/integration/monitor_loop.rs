//! Integration tests for the monitor loop
//!
//! All tests run on a paused clock, so intervals and back-offs elapse
//! instantly once every task is idle.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use hostwatch::ServiceStatus;
use hostwatch::actors::messages::MonitorEvent;
use hostwatch::actors::monitor::{MonitorHandle, Start};
use hostwatch::config::Config;
use hostwatch::error::MonitorError;
use hostwatch::storage::MAX_OBSERVATIONS_PER_SERVICE;
use tokio::time::Instant;

use crate::helpers::*;

const HEALTHY: &str = r#"{"status":"healthy"}"#;

/// Config whose cycles give up after 5s, with probes bounded well below that
fn short_cycle_config(services: &[(&str, &str)]) -> Config {
    let mut config = create_test_config(services);
    config.intervals.probe_timeout = 2;
    config.intervals.cycle_timeout = 5;
    config
}

fn fetcher() -> ScriptedFetcher {
    ScriptedFetcher::new()
        .respond("http://api/health", 200, HEALTHY)
        .respond("http://dci/health", 503, "")
}

#[tokio::test(start_paused = true)]
async fn test_metrics_failure_still_records_health() {
    let handle = MonitorHandle::spawn_with(
        create_test_config(&[("api", "http://api/health"), ("dci", "http://dci/health")]),
        Arc::new(fetcher()),
        Arc::new(ScriptedSource::always(SourceStep::Fail)),
    );

    let summary = handle.cycle_now().await.unwrap();

    assert!(summary.metrics.is_none());
    assert!(summary.alerts.is_empty());
    assert_eq!(summary.observations.len(), 2);

    let api = handle.history().latest("api").await.unwrap();
    let dci = handle.history().latest("dci").await.unwrap();
    assert_eq!(api.status, ServiceStatus::Healthy);
    assert_eq!(dci.status, ServiceStatus::Unhealthy);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_panicking_metrics_source_still_records_health() {
    let handle = MonitorHandle::spawn_with(
        create_test_config(&[("api", "http://api/health")]),
        Arc::new(fetcher()),
        Arc::new(ScriptedSource::always(SourceStep::Panic)),
    );

    let summary = handle.cycle_now().await.unwrap();

    assert!(summary.metrics.is_none());
    assert_eq!(summary.observations.len(), 1);
    assert_eq!(summary.observations[0].status, ServiceStatus::Healthy);

    let history = handle.history().all("api").await;
    assert!(!history.is_empty());
    assert!(history.iter().all(|o| o.status == ServiceStatus::Healthy));

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_hanging_endpoint_does_not_block_others() {
    let handle = MonitorHandle::spawn_with(
        create_test_config(&[("api", "http://api/health"), ("stuck", "http://hang/health")]),
        Arc::new(fetcher()),
        Arc::new(ScriptedSource::always(SourceStep::Fail)),
    );

    let summary = handle.cycle_now().await.unwrap();

    assert_eq!(summary.observations[0].status, ServiceStatus::Healthy);
    let stuck = &summary.observations[1];
    assert_eq!(stuck.service_name, "stuck");
    assert_eq!(stuck.status, ServiceStatus::Unhealthy);
    assert!(stuck.error.as_deref().unwrap().contains("timed out"));
    assert!(handle.history().latest("api").await.is_some());

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_persistent_breach_alerts_every_cycle() {
    let handle = MonitorHandle::spawn_with(
        create_test_config(&[("api", "http://api/health")]),
        Arc::new(fetcher()),
        Arc::new(ScriptedSource::always(SourceStep::Metrics(
            create_test_metrics(85.0, 90.0, 20.0),
        ))),
    );

    let first = handle.cycle_now().await.unwrap();
    let second = handle.cycle_now().await.unwrap();

    for summary in [&first, &second] {
        let metrics: Vec<&str> = summary.alerts.iter().map(|a| a.metric.as_str()).collect();
        assert_eq!(metrics, vec!["cpu_usage", "memory_usage"]);
    }
    assert_eq!(first.alerts, second.alerts);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_cycle_backs_off_and_recovers() {
    let handle = MonitorHandle::spawn_with(
        short_cycle_config(&[("api", "http://api/health")]),
        Arc::new(fetcher()),
        Arc::new(ScriptedSource::new(
            vec![SourceStep::Hang],
            SourceStep::Metrics(create_test_metrics(10.0, 10.0, 10.0)),
        )),
    );
    let mut events = handle.subscribe();

    let failed = wait_for_event(&mut events, 60, |e| {
        matches!(e, MonitorEvent::CycleFailed { .. })
    })
    .await;
    assert_matches!(failed, Some(MonitorEvent::CycleFailed { error }) if error.contains("did not finish within 5s"));
    let failed_at = Instant::now();

    let completed = wait_for_event(&mut events, 60, |e| {
        matches!(e, MonitorEvent::CycleCompleted { .. })
    })
    .await;
    assert!(completed.is_some(), "loop should survive a failed cycle");

    let waited = failed_at.elapsed();
    assert!(waited >= Duration::from_secs(10), "waited {waited:?}");
    assert!(waited < Duration::from_secs(30), "waited {waited:?}");

    // Only the recovered cycle was recorded
    assert_eq!(handle.history().all("api").await.len(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_cycle_overrun_is_a_failed_cycle() {
    let config = short_cycle_config(&[("api", "http://api/health")]);
    assert!(config.validate().is_ok());

    let handle = MonitorHandle::spawn_with(
        config,
        Arc::new(fetcher()),
        Arc::new(ScriptedSource::always(SourceStep::Hang)),
    );
    let mut events = handle.subscribe();

    let failed = wait_for_event(&mut events, 60, |e| {
        matches!(e, MonitorEvent::CycleFailed { .. })
    })
    .await;

    assert_matches!(failed, Some(MonitorEvent::CycleFailed { error }) if error.contains("did not finish within 5s"));
    assert!(handle.history().all("api").await.is_empty());

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_events_published_per_cycle() {
    let handle = MonitorHandle::spawn_with(
        create_test_config(&[("api", "http://api/health"), ("dci", "http://dci/health")]),
        Arc::new(fetcher()),
        Arc::new(ScriptedSource::always(SourceStep::Metrics(
            create_test_metrics(95.0, 10.0, 10.0),
        ))),
    );
    let mut events = handle.subscribe();

    let mut checked = vec![];
    let mut breaches = 0;
    loop {
        match events.recv().await.unwrap() {
            MonitorEvent::HealthChecked(observation) => checked.push(observation.service_name),
            MonitorEvent::ThresholdBreached(alert) => {
                assert_eq!(alert.metric, "cpu_usage");
                breaches += 1;
            }
            MonitorEvent::CycleCompleted {
                services, alerts, ..
            } => {
                assert_eq!(services, 2);
                assert_eq!(alerts, 1);
                break;
            }
            MonitorEvent::MetricsSampled(_) => {}
            MonitorEvent::CycleFailed { error } => panic!("unexpected failure: {error}"),
        }
    }

    assert_eq!(checked, vec!["api", "dci"]);
    assert_eq!(breaches, 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_history_stays_bounded_across_cycles() {
    let fetcher = Arc::new(fetcher());
    let handle = MonitorHandle::spawn_with(
        create_test_config(&[("dci", "http://dci/health")]),
        fetcher.clone(),
        Arc::new(ScriptedSource::always(SourceStep::Fail)),
    );

    for _ in 0..(MAX_OBSERVATIONS_PER_SERVICE + 20) {
        handle.cycle_now().await.unwrap();
    }

    let history = handle.history().all("dci").await;
    assert_eq!(history.len(), MAX_OBSERVATIONS_PER_SERVICE);
    assert!(
        history
            .windows(2)
            .all(|pair| pair[0].observed_at <= pair[1].observed_at)
    );
    // Failing services are re-probed every cycle
    assert!(fetcher.calls() > MAX_OBSERVATIONS_PER_SERVICE + 20);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_sleep() {
    let handle = MonitorHandle::spawn_with(
        create_test_config(&[("api", "http://api/health")]),
        Arc::new(fetcher()),
        Arc::new(ScriptedSource::always(SourceStep::Fail)),
    );
    let mut events = handle.subscribe();

    wait_for_event(&mut events, 60, |e| {
        matches!(e, MonitorEvent::CycleCompleted { .. })
    })
    .await
    .unwrap();

    let start = Instant::now();
    handle.shutdown().await;

    assert!(start.elapsed() < Duration::from_secs(30));
    assert_matches!(handle.cycle_now().await, Err(MonitorError::Stopped));
}

#[tokio::test(start_paused = true)]
async fn test_on_demand_start_runs_a_single_cycle() {
    let fetcher = Arc::new(fetcher());
    let handle = MonitorHandle::spawn_with_start(
        create_test_config(&[("api", "http://api/health")]),
        fetcher.clone(),
        Arc::new(ScriptedSource::always(SourceStep::Fail)),
        Start::OnDemand,
    );

    // Nothing runs until asked, however long we wait
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(fetcher.calls(), 0);

    let summary = handle.cycle_now().await.unwrap();

    assert_eq!(summary.observations.len(), 1);
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(handle.history().all("api").await.len(), 1);

    handle.shutdown().await;
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_on_demand_monitor_can_stop_before_any_cycle() {
    let fetcher = Arc::new(fetcher());
    let handle = MonitorHandle::spawn_with_start(
        create_test_config(&[("api", "http://api/health")]),
        fetcher.clone(),
        Arc::new(ScriptedSource::always(SourceStep::Fail)),
        Start::OnDemand,
    );

    handle.shutdown().await;

    assert_eq!(fetcher.calls(), 0);
    assert!(handle.history().all("api").await.is_empty());
    assert_matches!(handle.cycle_now().await, Err(MonitorError::Stopped));
}
