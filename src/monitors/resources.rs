use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sysinfo::{Disks, System};
use tracing::{error, info, instrument, trace};

use crate::HostMetrics;
use crate::error::{MonitorError, MonitorResult};

/// Capability to read the host's current resource usage
#[async_trait]
pub trait HostMetricsSource: Send + Sync {
    async fn sample(&self) -> MonitorResult<HostMetrics>;
}

/// [`HostMetricsSource`] reading the local machine through `sysinfo`
#[derive(Debug, Clone)]
pub struct SystemMetricsSource {
    mount_point: PathBuf,
}

impl SystemMetricsSource {
    pub fn new(mount_point: impl Into<PathBuf>) -> Self {
        Self {
            mount_point: mount_point.into(),
        }
    }
}

#[async_trait]
impl HostMetricsSource for SystemMetricsSource {
    async fn sample(&self) -> MonitorResult<HostMetrics> {
        let mount_point = self.mount_point.clone();

        // CPU usage needs two refreshes with a pause in between, keep that off the runtime
        tokio::task::spawn_blocking(move || read_system(&mount_point))
            .await
            .map_err(|e| MonitorError::MetricsUnavailable(format!("sampling task failed: {e}")))?
    }
}

fn read_system(mount_point: &Path) -> MonitorResult<HostMetrics> {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == mount_point)
        .ok_or_else(|| {
            MonitorError::MetricsUnavailable(format!(
                "no disk mounted at {}",
                mount_point.display()
            ))
        })?;
    let disk_total = disk.total_space();
    let disk_free = disk.available_space();

    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_cpu_usage();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();

    let memory_total = sys.total_memory();
    if memory_total == 0 {
        return Err(MonitorError::MetricsUnavailable(
            "total memory reported as zero".to_string(),
        ));
    }
    let memory_available = sys.available_memory();

    let load = System::load_average();

    Ok(HostMetrics {
        cpu_percent: f64::from(sys.global_cpu_usage()),
        memory_percent: used_percent(memory_total.saturating_sub(memory_available), memory_total),
        memory_available,
        disk_percent: used_percent(disk_total.saturating_sub(disk_free), disk_total),
        disk_free,
        load_average: [load.one, load.five, load.fifteen],
        sampled_at: Utc::now(),
    })
}

/// Share of `total` taken by `used`, in percent
pub fn used_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    used as f64 / total as f64 * 100.0
}

/// Samples host metrics and logs every snapshot
#[derive(Clone)]
pub struct MetricSampler {
    source: Arc<dyn HostMetricsSource>,
}

impl MetricSampler {
    pub fn new(source: Arc<dyn HostMetricsSource>) -> Self {
        Self { source }
    }

    /// Take one sample
    ///
    /// Failures are logged and returned; the caller decides whether to skip
    /// whatever depends on the metrics.
    #[instrument(skip(self))]
    pub async fn sample(&self) -> MonitorResult<HostMetrics> {
        trace!("sampling host metrics");

        match self.source.sample().await {
            Ok(metrics) => {
                info!("System metrics: {}", snapshot(&metrics));
                Ok(metrics)
            }
            Err(e) => {
                error!("Failed to collect system metrics: {e}");
                Err(e)
            }
        }
    }
}

/// JSON rendering of a sample as it appears in the logs
pub fn snapshot(metrics: &HostMetrics) -> String {
    serde_json::to_string(metrics).unwrap_or_else(|_| format!("{metrics:?}"))
}
