//! Threshold evaluation
//!
//! Every evaluation stands on its own: there is no grace period, hysteresis or
//! deduplication. A breach that persists over several cycles produces one
//! alert per breaching metric in each of them.

use tracing::warn;

use crate::alerts::Alert;
use crate::config::Thresholds;
use crate::{HealthObservation, HostMetrics};

/// Compare host metrics against the configured limits
///
/// A metric breaches its limit only when it strictly exceeds it.
pub fn evaluate(metrics: &HostMetrics, thresholds: &Thresholds) -> Vec<Alert> {
    let checks = [
        (
            "cpu_usage",
            metrics.cpu_percent,
            thresholds.cpu_usage,
            "High CPU usage",
        ),
        (
            "memory_usage",
            metrics.memory_percent,
            thresholds.memory_usage,
            "High memory usage",
        ),
        (
            "disk_usage",
            metrics.disk_percent,
            thresholds.disk_usage,
            "High disk usage",
        ),
    ];

    let alerts: Vec<Alert> = checks
        .into_iter()
        .filter(|(_, value, limit, _)| value > limit)
        .map(|(metric, value, limit, label)| {
            Alert::warning(metric, value, limit, format!("{label}: {value:.1}%"))
        })
        .collect();

    log_alerts(&alerts);
    alerts
}

/// Compare each observation's response time against the configured limit
pub fn evaluate_response_times(
    observations: &[HealthObservation],
    thresholds: &Thresholds,
) -> Vec<Alert> {
    let alerts: Vec<Alert> = observations
        .iter()
        .filter_map(|observation| {
            let seconds = observation.response_time.as_secs_f64();
            (seconds > thresholds.response_time).then(|| {
                Alert::warning(
                    "response_time",
                    seconds,
                    thresholds.response_time,
                    format!(
                        "Slow response from {}: {seconds:.2}s",
                        observation.service_name
                    ),
                )
                .for_service(&observation.service_name)
            })
        })
        .collect();

    log_alerts(&alerts);
    alerts
}

fn log_alerts(alerts: &[Alert]) {
    for alert in alerts {
        warn!(
            metric = %alert.metric,
            value = alert.value,
            threshold = alert.threshold,
            "Alert: {}",
            alert.message
        );
    }
}
