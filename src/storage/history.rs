//! Bounded per-service history of health observations
//!
//! Each service keeps a ring buffer of its most recent observations. When the
//! buffer is full, the oldest observation is evicted first.
//!
//! The store is cheap to clone; all clones share the same buffers. Writes take
//! a single lock over the whole map, so each service's sequence stays in
//! insertion order even when several tasks record concurrently.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::trace;

use crate::HealthObservation;

/// Maximum observations kept per service
pub const MAX_OBSERVATIONS_PER_SERVICE: usize = 100;

#[derive(Debug, Clone)]
pub struct HistoryStore {
    observations: Arc<RwLock<HashMap<String, VecDeque<HealthObservation>>>>,
    capacity: usize,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_OBSERVATIONS_PER_SERVICE)
    }

    /// Create a store keeping at most `capacity` observations per service
    ///
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            observations: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Append an observation, evicting the oldest ones beyond the capacity
    pub async fn record(&self, observation: HealthObservation) {
        let mut observations = self.observations.write().await;
        self.push(&mut observations, observation);
    }

    /// Append several observations under a single lock
    pub async fn record_all(&self, batch: impl IntoIterator<Item = HealthObservation>) {
        let mut observations = self.observations.write().await;
        for observation in batch {
            self.push(&mut observations, observation);
        }
    }

    fn push(
        &self,
        observations: &mut HashMap<String, VecDeque<HealthObservation>>,
        observation: HealthObservation,
    ) {
        let history = observations
            .entry(observation.service_name.clone())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));

        history.push_back(observation);
        while history.len() > self.capacity {
            if let Some(evicted) = history.pop_front() {
                trace!(
                    "evicted observation of {} from {}",
                    evicted.service_name, evicted.observed_at
                );
            }
        }
    }

    /// Most recent observation of a service
    pub async fn latest(&self, service_name: &str) -> Option<HealthObservation> {
        let observations = self.observations.read().await;
        observations
            .get(service_name)
            .and_then(|history| history.back().cloned())
    }

    /// All retained observations of a service, oldest first
    pub async fn all(&self, service_name: &str) -> Vec<HealthObservation> {
        let observations = self.observations.read().await;
        observations
            .get(service_name)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Most recent observation of every service with at least one entry
    pub async fn latest_all(&self) -> BTreeMap<String, HealthObservation> {
        let observations = self.observations.read().await;
        observations
            .iter()
            .filter_map(|(name, history)| {
                history
                    .back()
                    .map(|latest| (name.clone(), latest.clone()))
            })
            .collect()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
