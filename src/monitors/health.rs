//! Health probing of service endpoints
//!
//! A [`HealthProbe`] turns one request against a service's health endpoint
//! into a [`HealthObservation`]. It never returns an error: every failure is
//! folded into the observation so that a fan-out over many services cannot
//! be aborted by one broken endpoint.
//!
//! ## Classification
//!
//! ```text
//! transport failure / timeout     → Unhealthy (error set, response time 0)
//! non-2xx status code             → Unhealthy
//! body over `MAX_BODY_BYTES`      → Unhealthy (error set, response time 0)
//! 2xx, body is not JSON           → Unhealthy (protocol failure)
//! 2xx, `"status": "healthy"`      → Healthy
//! 2xx, any other or no `status`   → Degraded
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{instrument, trace, warn};

use crate::error::{MonitorError, MonitorResult};
use crate::{HealthObservation, ServiceStatus};

/// Client identifier sent with every health request
pub const USER_AGENT: &str = concat!("hostwatch/", env!("CARGO_PKG_VERSION"));

/// Largest health response body read before the answer is rejected
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Raw answer of a health endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthResponse {
    pub status_code: u16,
    pub body: String,
}

/// Capability to fetch a health endpoint
///
/// Implementations report unreachable endpoints as
/// [`MonitorError::Transport`]; any HTTP answer, including error status codes,
/// is a successful fetch.
#[async_trait]
pub trait HealthFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> MonitorResult<HealthResponse>;
}

/// [`HealthFetcher`] backed by a reusable `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> MonitorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HealthFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> MonitorResult<HealthResponse> {
        let mut response = self.client.get(url).send().await?;
        let status_code = response.status().as_u16();

        if let Some(length) = response.content_length() {
            if length > MAX_BODY_BYTES as u64 {
                return Err(body_too_large());
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(body_too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HealthResponse {
            status_code,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

fn body_too_large() -> MonitorError {
    MonitorError::Protocol(format!(
        "health response body exceeds {MAX_BODY_BYTES} bytes"
    ))
}

/// Checks a single service endpoint and classifies the result
#[derive(Clone)]
pub struct HealthProbe {
    fetcher: Arc<dyn HealthFetcher>,
    timeout: Duration,
}

impl HealthProbe {
    pub fn new(fetcher: Arc<dyn HealthFetcher>, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    #[instrument(skip(self))]
    pub async fn check(&self, service_name: &str, endpoint: &str) -> HealthObservation {
        trace!("checking service at {endpoint}");

        let start = Instant::now();

        let fetched = match tokio::time::timeout(self.timeout, self.fetcher.fetch(endpoint)).await
        {
            Ok(result) => result,
            Err(_) => Err(MonitorError::Transport(format!(
                "request timed out after {}s",
                self.timeout.as_secs_f64()
            ))),
        };

        let response = match fetched {
            Ok(response) => response,
            Err(e) => {
                warn!("health check failed for {service_name}: {e}");
                return HealthObservation::unreachable(service_name, e.to_string());
            }
        };

        let response_time = start.elapsed();
        let (status, error) = classify(&response);

        if status == ServiceStatus::Unhealthy {
            warn!(
                "health check failed for {service_name}: {}",
                error.as_deref().unwrap_or("unhealthy response")
            );
        }

        HealthObservation {
            service_name: service_name.to_string(),
            status,
            response_time,
            observed_at: Utc::now(),
            error,
        }
    }
}

/// Map an endpoint's answer to a status and an optional error description
pub fn classify(response: &HealthResponse) -> (ServiceStatus, Option<String>) {
    if !(200..300).contains(&response.status_code) {
        return (
            ServiceStatus::Unhealthy,
            Some(format!("unexpected status code: {}", response.status_code)),
        );
    }

    let body: serde_json::Value = match serde_json::from_str(&response.body) {
        Ok(body) => body,
        Err(e) => {
            let error = MonitorError::Protocol(format!("health body is not valid JSON: {e}"));
            return (ServiceStatus::Unhealthy, Some(error.to_string()));
        }
    };

    match body.get("status").and_then(|status| status.as_str()) {
        Some("healthy") => (ServiceStatus::Healthy, None),
        _ => (ServiceStatus::Degraded, None),
    }
}
