//! Actor running the monitoring loop
//!
//! The loop runs as an independent async task communicating via Tokio channels.
//!
//! ## Architecture Overview
//!
//! ```text
//!                 ┌─────────────────┐
//!                 │  MonitorHandle  │
//!                 └────────┬────────┘
//!                          │ commands (CycleNow, Shutdown)
//!                 ┌────────▼────────┐
//!                 │  MonitorActor   │──── sleep / back-off
//!                 └────────┬────────┘
//!                          │ spawns one task per cycle
//!            ┌─────────────┼──────────────┐
//!            │             │              │
//!     ┌──────▼──────┐ ┌────▼─────┐ ┌──────▼───────┐
//!     │ HealthProbe │ │   ...    │ │ MetricSampler│
//!     │ (service A) │ │          │ │              │
//!     └──────┬──────┘ └────┬─────┘ └──────┬───────┘
//!            └─────────────┼──────────────┘
//!                          │ join all
//!              ┌───────────▼────────────┐
//!              │ thresholds + history   │
//!              └───────────┬────────────┘
//!                          │ publish
//!                 ┌────────▼────────┐
//!                 │ Broadcast (MPMC)│ MonitorEvent
//!                 └─────────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: the actor has an mpsc command channel for control messages
//! 2. **Events**: cycle results are published to a broadcast channel for fan-out
//! 3. **Request/Response**: oneshot channels for synchronous queries

pub mod messages;
pub mod monitor;
