//! Error types for monitoring operations

use thiserror::Error;

/// Result type alias for monitoring operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors that can occur while monitoring services and the host
///
/// `Transport` and `Protocol` never leave a health probe: they are folded into
/// an unhealthy observation. `MetricsUnavailable` only skips the threshold
/// evaluation of the current cycle. `Cycle` is the only error the monitor loop
/// sees, and it answers it with a back-off instead of stopping.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The endpoint could not be reached (timeout, connection refused, DNS)
    #[error("transport failure: {0}")]
    Transport(String),

    /// The endpoint answered, but the response could not be understood
    #[error("protocol failure: {0}")]
    Protocol(String),

    /// The host metrics could not be sampled
    #[error("host metrics unavailable: {0}")]
    MetricsUnavailable(String),

    /// Unexpected failure inside a monitoring cycle
    #[error("monitoring cycle failed: {0}")]
    Cycle(String),

    /// The configuration is not usable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The monitor loop is no longer running
    #[error("monitor loop has stopped")]
    Stopped,
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::Transport(err.to_string())
    }
}
