pub mod actors;
pub mod alerts;
pub mod config;
pub mod error;
pub mod monitors;
pub mod report;
pub mod storage;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a single health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

impl ServiceStatus {
    /// Get the string representation (lowercase)
    ///
    /// This matches the serde serialization format.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Healthy => "healthy",
            ServiceStatus::Degraded => "degraded",
            ServiceStatus::Unhealthy => "unhealthy",
            ServiceStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of polling one service endpoint once
#[derive(Debug, Clone, PartialEq)]
pub struct HealthObservation {
    pub service_name: String,
    pub status: ServiceStatus,
    /// Wall-clock time until the response arrived (zero if it never did)
    pub response_time: Duration,
    pub observed_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl HealthObservation {
    /// Observation for an endpoint that could not be reached at all
    pub fn unreachable(service_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            status: ServiceStatus::Unhealthy,
            response_time: Duration::ZERO,
            observed_at: Utc::now(),
            error: Some(error.into()),
        }
    }

    /// Observation for a probe that did not produce a result
    pub fn unknown(service_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            status: ServiceStatus::Unknown,
            response_time: Duration::ZERO,
            observed_at: Utc::now(),
            error: Some(error.into()),
        }
    }
}

/// Point-in-time snapshot of host resource usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_available: u64,
    pub disk_percent: f64,
    pub disk_free: u64,
    /// 1, 5 and 15 minute load averages
    pub load_average: [f64; 3],
    pub sampled_at: DateTime<Utc>,
}
