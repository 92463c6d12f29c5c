//! MonitorActor - Runs monitoring cycles until it is shut down
//!
//! ## Cycle
//!
//! 1. Probe every configured service concurrently and wait for all of them
//! 2. Sample host metrics at the same time
//! 3. Evaluate thresholds (host thresholds are skipped if sampling failed)
//! 4. Record every observation in the history
//!
//! ## States
//!
//! ```text
//! Idle → RunningCycle ─ ok ──→ Sleeping(health_check) ─┐
//!             ↑       └ error → Sleeping(error_backoff) ┤
//!             └─────────────────────────────────────────┘
//!                  (CycleNow cuts a sleep short, Shutdown ends it)
//! ```
//!
//! Each cycle runs in its own task bounded by `cycle_timeout`. Probes and the
//! metrics sample run in tasks of their own, so a panic in one of them only
//! loses that result. An overrun of the whole cycle is reported as a failed
//! cycle; the loop itself keeps going.
//!
//! With [`Start::OnDemand`] the loop waits for the first `CycleNow` instead of
//! starting a cycle right away.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::HealthObservation;
use crate::HostMetrics;
use crate::config::Config;
use crate::error::{MonitorError, MonitorResult};
use crate::monitors::health::{HealthFetcher, HealthProbe, HttpFetcher};
use crate::monitors::resources::{HostMetricsSource, MetricSampler, SystemMetricsSource};
use crate::monitors::thresholds;
use crate::report::{Report, ReportGenerator};
use crate::storage::HistoryStore;

use super::messages::{CycleSummary, MonitorCommand, MonitorEvent};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Everything a cycle needs, cloned into the task that runs it
#[derive(Clone)]
struct Cycle {
    config: Arc<Config>,
    probe: HealthProbe,
    sampler: MetricSampler,
    history: HistoryStore,
    event_tx: broadcast::Sender<MonitorEvent>,
}

impl Cycle {
    #[instrument(skip_all)]
    async fn run(self) -> CycleSummary {
        let started_at = Utc::now();
        trace!("starting cycle over {} services", self.config.services.len());

        let (observations, sampled) =
            tokio::join!(self.run_health_checks(), self.sample_metrics());

        let limits = &self.config.thresholds;
        let metrics = sampled.ok();

        let mut alerts = match &metrics {
            Some(metrics) => thresholds::evaluate(metrics, limits),
            None => {
                debug!("no host metrics this cycle, skipping host thresholds");
                Vec::new()
            }
        };
        alerts.extend(thresholds::evaluate_response_times(&observations, limits));

        self.history.record_all(observations.iter().cloned()).await;

        for observation in &observations {
            self.publish(MonitorEvent::HealthChecked(observation.clone()));
        }
        if let Some(metrics) = &metrics {
            self.publish(MonitorEvent::MetricsSampled(metrics.clone()));
        }
        for alert in &alerts {
            self.publish(MonitorEvent::ThresholdBreached(alert.clone()));
        }

        let finished_at = Utc::now();
        self.publish(MonitorEvent::CycleCompleted {
            finished_at,
            services: observations.len(),
            alerts: alerts.len(),
        });

        CycleSummary {
            started_at,
            finished_at,
            observations,
            metrics,
            alerts,
        }
    }

    /// Probe all services concurrently and collect one observation each
    async fn run_health_checks(&self) -> Vec<HealthObservation> {
        let mut probes = JoinSet::new();
        let mut pending = HashMap::new();

        for (name, endpoint) in &self.config.services {
            let probe = self.probe.clone();
            let service_name = name.clone();
            let endpoint = endpoint.clone();

            let handle =
                probes.spawn(async move { probe.check(&service_name, &endpoint).await });
            pending.insert(handle.id(), name.clone());
        }

        let mut observations = Vec::with_capacity(pending.len());
        while let Some(joined) = probes.join_next_with_id().await {
            match joined {
                Ok((id, observation)) => {
                    pending.remove(&id);
                    observations.push(observation);
                }
                Err(e) => {
                    let service_name = pending.remove(&e.id()).unwrap_or_default();
                    error!("probe task for {service_name} failed: {e}");
                    observations.push(HealthObservation::unknown(
                        service_name,
                        format!("probe task failed: {e}"),
                    ));
                }
            }
        }

        observations.sort_by(|a, b| a.service_name.cmp(&b.service_name));
        observations
    }

    /// Sample host metrics in a task of its own; a panicking source only loses the sample
    async fn sample_metrics(&self) -> MonitorResult<HostMetrics> {
        let mut sampling = JoinSet::new();
        let sampler = self.sampler.clone();
        sampling.spawn(async move { sampler.sample().await });

        match sampling.join_next().await {
            Some(Ok(sampled)) => sampled,
            Some(Err(e)) => {
                error!("Failed to collect system metrics: {e}");
                Err(MonitorError::MetricsUnavailable(format!(
                    "metrics task failed: {e}"
                )))
            }
            None => Err(MonitorError::MetricsUnavailable(
                "metrics task was not started".to_string(),
            )),
        }
    }

    fn publish(&self, event: MonitorEvent) {
        // It's OK if nobody is listening
        if self.event_tx.send(event).is_err() {
            trace!("no receivers for monitor event");
        }
    }
}

/// When the loop runs its first cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Start {
    /// Run the first cycle as soon as the actor is spawned
    #[default]
    Immediately,
    /// Wait for a `CycleNow` (or `Shutdown`) before the first cycle
    OnDemand,
}

/// What ended a sleep
enum Wake {
    Elapsed,
    CycleNow(oneshot::Sender<MonitorResult<CycleSummary>>),
    Shutdown(Option<oneshot::Sender<()>>),
}

/// Actor that drives the monitoring loop
pub struct MonitorActor {
    cycle: Cycle,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<MonitorCommand>,

    start: Start,
    interval: Duration,
    error_backoff: Duration,
    cycle_timeout: Duration,
}

impl MonitorActor {
    pub fn new(
        config: Config,
        probe: HealthProbe,
        sampler: MetricSampler,
        history: HistoryStore,
        command_rx: mpsc::Receiver<MonitorCommand>,
        event_tx: broadcast::Sender<MonitorEvent>,
        start: Start,
    ) -> Self {
        let interval = config.intervals.health_check();
        let error_backoff = config.intervals.error_backoff();
        let cycle_timeout = config.intervals.cycle_timeout();

        Self {
            cycle: Cycle {
                config: Arc::new(config),
                probe,
                sampler,
                history,
                event_tx,
            },
            command_rx,
            start,
            interval,
            error_backoff,
            cycle_timeout,
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command is received or every handle is dropped.
    /// Errors inside a cycle never end the loop.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        info!(
            "Starting monitoring of {} services",
            self.cycle.config.services.len()
        );

        let mut waiting: Option<oneshot::Sender<MonitorResult<CycleSummary>>> = None;

        let mut wake = match self.start {
            Start::Immediately => Wake::Elapsed,
            Start::OnDemand => self.next_command().await,
        };

        loop {
            match wake {
                Wake::Elapsed => {}
                Wake::CycleNow(respond_to) => {
                    debug!("received CycleNow command");
                    waiting = Some(respond_to);
                }
                Wake::Shutdown(respond_to) => {
                    debug!("received shutdown command");
                    if let Some(respond_to) = respond_to {
                        let _ = respond_to.send(());
                    }
                    break;
                }
            }

            let outcome = self.execute_cycle().await;

            let pause = match &outcome {
                Ok(summary) => {
                    debug!(
                        "cycle finished: {} services, {} alerts",
                        summary.observations.len(),
                        summary.alerts.len()
                    );
                    self.interval
                }
                Err(e) => {
                    error!("Monitoring loop error: {e}");
                    self.cycle.publish(MonitorEvent::CycleFailed {
                        error: e.to_string(),
                    });
                    self.error_backoff
                }
            };

            if let Some(respond_to) = waiting.take() {
                let _ = respond_to.send(outcome);
            }

            wake = self.sleep(pause).await;
        }

        info!("Monitoring stopped");
    }

    /// Run one cycle in its own task so that a panic or an overrun stays contained
    async fn execute_cycle(&self) -> MonitorResult<CycleSummary> {
        let mut task = tokio::spawn(self.cycle.clone().run());

        match time::timeout(self.cycle_timeout, &mut task).await {
            Ok(Ok(summary)) => Ok(summary),
            Ok(Err(e)) => Err(MonitorError::Cycle(format!("cycle task failed: {e}"))),
            Err(_) => {
                task.abort();
                Err(MonitorError::Cycle(format!(
                    "cycle did not finish within {}s",
                    self.cycle_timeout.as_secs()
                )))
            }
        }
    }

    async fn sleep(&mut self, pause: Duration) -> Wake {
        trace!("sleeping for {}s", pause.as_secs_f64());

        tokio::select! {
            _ = time::sleep(pause) => Wake::Elapsed,
            command = self.command_rx.recv() => Self::wake_for(command),
        }
    }

    async fn next_command(&mut self) -> Wake {
        trace!("waiting for the first command");
        let command = self.command_rx.recv().await;
        Self::wake_for(command)
    }

    fn wake_for(command: Option<MonitorCommand>) -> Wake {
        match command {
            Some(MonitorCommand::CycleNow { respond_to }) => Wake::CycleNow(respond_to),
            Some(MonitorCommand::Shutdown { respond_to }) => Wake::Shutdown(Some(respond_to)),
            None => {
                warn!("command channel closed, shutting down");
                Wake::Shutdown(None)
            }
        }
    }
}

/// Handle for controlling a MonitorActor
///
/// Cheap to clone; every clone talks to the same actor and shares its history.
#[derive(Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorCommand>,
    event_tx: broadcast::Sender<MonitorEvent>,
    history: HistoryStore,
    reports: ReportGenerator,
}

impl MonitorHandle {
    /// Spawn a monitor that probes over HTTP and samples the local host
    pub fn spawn(config: Config, start: Start) -> MonitorResult<Self> {
        let fetcher = HttpFetcher::new(config.intervals.probe_timeout())?;
        let source = SystemMetricsSource::new(config.mount_point.clone());

        Ok(Self::spawn_with_start(
            config,
            Arc::new(fetcher),
            Arc::new(source),
            start,
        ))
    }

    /// Spawn a monitor with the given capabilities
    ///
    /// The first cycle starts right away.
    pub fn spawn_with(
        config: Config,
        fetcher: Arc<dyn HealthFetcher>,
        source: Arc<dyn HostMetricsSource>,
    ) -> Self {
        Self::spawn_with_start(config, fetcher, source, Start::Immediately)
    }

    pub fn spawn_with_start(
        config: Config,
        fetcher: Arc<dyn HealthFetcher>,
        source: Arc<dyn HostMetricsSource>,
        start: Start,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let history = HistoryStore::new();
        let probe = HealthProbe::new(fetcher, config.intervals.probe_timeout());
        let sampler = MetricSampler::new(source);
        let reports =
            ReportGenerator::new(history.clone(), sampler.clone(), config.thresholds.clone());

        let actor = MonitorActor::new(
            config,
            probe,
            sampler,
            history.clone(),
            cmd_rx,
            event_tx.clone(),
            start,
        );

        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            event_tx,
            history,
            reports,
        }
    }

    /// Run a cycle now and wait for its result
    pub async fn cycle_now(&self) -> MonitorResult<CycleSummary> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::CycleNow { respond_to: tx })
            .await
            .map_err(|_| MonitorError::Stopped)?;

        rx.await.map_err(|_| MonitorError::Stopped)?
    }

    /// Stop the loop, letting a running cycle finish first
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(MonitorCommand::Shutdown { respond_to: tx })
            .await
            .is_err()
        {
            return;
        }
        let _ = rx.await;
    }

    /// Subscribe to the events of future cycles
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.event_tx.subscribe()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Build a report from the current history and a fresh metrics sample
    pub async fn report(&self) -> Report {
        self.reports.generate().await
    }
}
