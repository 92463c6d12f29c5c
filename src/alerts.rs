use std::fmt;

use serde::{Deserialize, Serialize};

/// How urgent an alert is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARNING"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A threshold breach found during one evaluation
///
/// Alerts are not deduplicated: a breach that persists produces a fresh alert
/// every time it is evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: Severity,

    /// Name of the breaching metric (`cpu_usage`, `memory_usage`, ...)
    pub metric: String,

    /// Service the metric belongs to, for per-service metrics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// Observed value
    pub value: f64,

    /// Configured limit that was exceeded
    pub threshold: f64,

    pub message: String,
}

impl Alert {
    pub fn warning(
        metric: impl Into<String>,
        value: f64,
        threshold: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            metric: metric.into(),
            service: None,
            value,
            threshold,
            message: message.into(),
        }
    }

    pub fn for_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}
