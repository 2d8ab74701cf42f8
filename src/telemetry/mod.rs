pub mod aggregate;
pub mod store;

use std::time::Duration;

use chrono::{DateTime, Utc};

pub use aggregate::{AltitudeStats, HealthStatus};
pub use store::SampleStore;

/// Trailing window served by `GET /stats`.
pub const STATS_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Trailing window served by `GET /health`.
pub const HEALTH_WINDOW: Duration = Duration::from_secs(60);

/// One timestamped altitude reading.
/// Created by the sampler on every successful fetch and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    /// Altitude in km, as reported upstream
    pub altitude: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, altitude: f64) -> Self {
        Self {
            timestamp,
            altitude,
        }
    }

    /// Stamp a reading with the current UTC instant.
    pub fn now(altitude: f64) -> Self {
        Self::new(Utc::now(), altitude)
    }
}
