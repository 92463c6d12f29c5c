//! Message types for the monitor actor
//!
//! 1. **Commands**: sent to the actor through its handle via mpsc
//! 2. **Events**: broadcast to every subscriber after each cycle
//! 3. **Request/Response**: oneshot channels carry command results back

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::alerts::Alert;
use crate::error::MonitorResult;
use crate::{HealthObservation, HostMetrics};

/// Commands that can be sent to the MonitorActor
#[derive(Debug)]
pub enum MonitorCommand {
    /// Run a cycle right away instead of waiting for the sleep to elapse
    ///
    /// The regular cadence restarts after this cycle.
    CycleNow {
        respond_to: oneshot::Sender<MonitorResult<CycleSummary>>,
    },

    /// Stop the loop
    ///
    /// Interrupts a sleep. A running cycle completes first.
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// Everything one successful cycle produced
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// One observation per configured service, ordered by service name
    pub observations: Vec<HealthObservation>,

    /// `None` if sampling failed in this cycle
    pub metrics: Option<HostMetrics>,

    pub alerts: Vec<Alert>,
}

/// Events published by the monitor on its broadcast channel
///
/// The channel may lag or drop events for slow subscribers; the monitor
/// never waits for them.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A service was probed
    HealthChecked(HealthObservation),

    /// Host metrics were sampled
    MetricsSampled(HostMetrics),

    /// A threshold was exceeded
    ThresholdBreached(Alert),

    /// A cycle finished and its observations are in the history
    CycleCompleted {
        finished_at: DateTime<Utc>,
        services: usize,
        alerts: usize,
    },

    /// A cycle failed; the loop backs off before the next one
    CycleFailed { error: String },
}
