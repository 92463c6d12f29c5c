//! Point-in-time monitoring reports
//!
//! A report combines the latest observation of every service in the history
//! with a fresh host metrics sample and the alerts both produce right now.
//! Generating a report never modifies the history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use crate::alerts::Alert;
use crate::config::Thresholds;
use crate::monitors::resources::MetricSampler;
use crate::monitors::thresholds;
use crate::storage::HistoryStore;
use crate::{HealthObservation, HostMetrics, ServiceStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub timestamp: DateTime<Utc>,
    pub services: BTreeMap<String, ServiceSummary>,

    /// Missing when the host metrics could not be sampled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemSummary>,

    pub alerts: Vec<Alert>,
}

/// Latest known state of one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub status: ServiceStatus,

    /// Seconds
    pub response_time: f64,

    pub last_check: DateTime<Utc>,
}

impl From<&HealthObservation> for ServiceSummary {
    fn from(observation: &HealthObservation) -> Self {
        Self {
            status: observation.status,
            response_time: observation.response_time.as_secs_f64(),
            last_check: observation.observed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSummary {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub load_average: [f64; 3],
}

impl From<&HostMetrics> for SystemSummary {
    fn from(metrics: &HostMetrics) -> Self {
        Self {
            cpu_percent: metrics.cpu_percent,
            memory_percent: metrics.memory_percent,
            disk_percent: metrics.disk_percent,
            load_average: metrics.load_average,
        }
    }
}

#[derive(Clone)]
pub struct ReportGenerator {
    history: HistoryStore,
    sampler: MetricSampler,
    thresholds: Thresholds,
}

impl ReportGenerator {
    pub fn new(history: HistoryStore, sampler: MetricSampler, thresholds: Thresholds) -> Self {
        Self {
            history,
            sampler,
            thresholds,
        }
    }

    #[instrument(skip(self))]
    pub async fn generate(&self) -> Report {
        let latest = self.history.latest_all().await;

        let services = latest
            .iter()
            .map(|(name, observation)| (name.clone(), ServiceSummary::from(observation)))
            .collect();

        let mut alerts = Vec::new();

        let system = match self.sampler.sample().await {
            Ok(metrics) => {
                alerts.extend(thresholds::evaluate(&metrics, &self.thresholds));
                Some(SystemSummary::from(&metrics))
            }
            Err(e) => {
                error!("Failed to get system metrics: {e}");
                None
            }
        };

        let observations: Vec<HealthObservation> = latest.into_values().collect();
        alerts.extend(thresholds::evaluate_response_times(
            &observations,
            &self.thresholds,
        ));

        Report {
            timestamp: Utc::now(),
            services,
            system,
            alerts,
        }
    }
}
