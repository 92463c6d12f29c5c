//! In-memory storage of health observations
//!
//! History is bounded per service and lives only as long as the process.

pub mod history;

pub use history::{HistoryStore, MAX_OBSERVATIONS_PER_SERVICE};
