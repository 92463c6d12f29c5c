use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, trace};

use crate::error::{MonitorError, MonitorResult};

/// Resolved monitoring configuration
///
/// Read-only for the lifetime of a monitor. Missing sections fall back to
/// their defaults, so a file only needs to list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Service name -> health endpoint URL
    #[serde(default = "default_services")]
    pub services: BTreeMap<String, String>,

    #[serde(default)]
    pub intervals: Intervals,

    #[serde(default)]
    pub thresholds: Thresholds,

    /// Mount point whose disk usage is sampled
    #[serde(default = "default_mount_point")]
    pub mount_point: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            services: default_services(),
            intervals: Intervals::default(),
            thresholds: Thresholds::default(),
            mount_point: default_mount_point(),
        }
    }
}

/// Timings of the monitor loop, all in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervals {
    /// Sleep between two successful cycles
    #[serde(default = "default_health_check")]
    pub health_check: u64,

    #[serde(default = "default_metrics_collection")]
    pub metrics_collection: u64,

    #[serde(default = "default_alert_check")]
    pub alert_check: u64,

    /// Upper bound for a single health probe
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: u64,

    /// Sleep after a failed cycle
    #[serde(default = "default_error_backoff")]
    pub error_backoff: u64,

    /// Upper bound for a whole cycle before it counts as failed
    #[serde(default = "default_cycle_timeout")]
    pub cycle_timeout: u64,
}

impl Intervals {
    pub fn health_check(&self) -> Duration {
        Duration::from_secs(self.health_check)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout)
    }
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            health_check: default_health_check(),
            metrics_collection: default_metrics_collection(),
            alert_check: default_alert_check(),
            probe_timeout: default_probe_timeout(),
            error_backoff: default_error_backoff(),
            cycle_timeout: default_cycle_timeout(),
        }
    }
}

/// Limits a metric has to strictly exceed to raise an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Seconds
    #[serde(default = "default_response_time")]
    pub response_time: f64,

    /// Percent
    #[serde(default = "default_cpu_usage")]
    pub cpu_usage: f64,

    /// Percent
    #[serde(default = "default_memory_usage")]
    pub memory_usage: f64,

    /// Percent
    #[serde(default = "default_disk_usage")]
    pub disk_usage: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            response_time: default_response_time(),
            cpu_usage: default_cpu_usage(),
            memory_usage: default_memory_usage(),
            disk_usage: default_disk_usage(),
        }
    }
}

fn default_services() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("api".to_string(), "http://localhost:3000/health".to_string()),
        ("ottb".to_string(), "http://localhost:8083/health".to_string()),
        ("dci".to_string(), "http://localhost:8082/health".to_string()),
        (
            "workspace".to_string(),
            "http://localhost:3000/health".to_string(),
        ),
    ])
}

fn default_mount_point() -> PathBuf {
    PathBuf::from("/")
}

fn default_health_check() -> u64 {
    30
}

fn default_metrics_collection() -> u64 {
    15
}

fn default_alert_check() -> u64 {
    60
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_error_backoff() -> u64 {
    10
}

fn default_cycle_timeout() -> u64 {
    60
}

fn default_response_time() -> f64 {
    2.0
}

fn default_cpu_usage() -> f64 {
    80.0
}

fn default_memory_usage() -> f64 {
    85.0
}

fn default_disk_usage() -> f64 {
    90.0
}

impl Config {
    /// Reject values that would make the loop spin or never alert sensibly
    pub fn validate(&self) -> MonitorResult<()> {
        let intervals = [
            ("health_check", self.intervals.health_check),
            ("metrics_collection", self.intervals.metrics_collection),
            ("alert_check", self.intervals.alert_check),
            ("probe_timeout", self.intervals.probe_timeout),
            ("error_backoff", self.intervals.error_backoff),
            ("cycle_timeout", self.intervals.cycle_timeout),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, secs)| *secs == 0) {
            return Err(MonitorError::InvalidConfig(format!(
                "interval `{name}` must be greater than zero"
            )));
        }

        if self.intervals.cycle_timeout <= self.intervals.probe_timeout {
            return Err(MonitorError::InvalidConfig(format!(
                "`cycle_timeout` ({}s) must be greater than `probe_timeout` ({}s)",
                self.intervals.cycle_timeout, self.intervals.probe_timeout
            )));
        }

        let thresholds = [
            ("response_time", self.thresholds.response_time),
            ("cpu_usage", self.thresholds.cpu_usage),
            ("memory_usage", self.thresholds.memory_usage),
            ("disk_usage", self.thresholds.disk_usage),
        ];
        if let Some((name, value)) = thresholds
            .iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            return Err(MonitorError::InvalidConfig(format!(
                "threshold `{name}` must be a non-negative number, got {value}"
            )));
        }

        if let Some((name, _)) = self.services.iter().find(|(_, url)| url.trim().is_empty()) {
            return Err(MonitorError::InvalidConfig(format!(
                "service `{name}` has an empty endpoint"
            )));
        }

        Ok(())
    }

    /// Load the configuration, falling back to the built-in defaults
    pub fn load_or_default(path: &str) -> Config {
        match read_config_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("failed to load config from {path}: {e:#}, using defaults");
                Config::default()
            }
        }
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))?;
    config.validate()?;
    trace!("loaded config: {config:?}");
    Ok(config)
}
