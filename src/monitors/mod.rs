//! Probes and evaluators used by a monitoring cycle
//!
//! - [`health`]: polls service health endpoints
//! - [`resources`]: samples host resource usage
//! - [`thresholds`]: turns readings into alerts

pub mod health;
pub mod resources;
pub mod thresholds;
