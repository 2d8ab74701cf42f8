use serde::Serialize;

use super::Sample;

/// Mean altitude below this is an imminent-decay warning (km).
pub const RAPID_DECAY_BELOW: f64 = 160.0;

/// Mean altitude at or above this is nominal (km).
pub const NOMINAL_FROM: f64 = 161.0;

/// Min / max / mean over one window.
/// Serialized straight into the `GET /stats` body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AltitudeStats {
    pub min_altitude: f64,
    pub max_altitude: f64,
    pub avg_altitude: f64,
}

impl AltitudeStats {
    /// Reduce a window to its stats. `None` when the window is empty.
    ///
    /// The average is a plain sum / count; gaps between samples carry no weight.
    pub fn from_samples(samples: &[Sample]) -> Option<Self> {
        let avg = mean_altitude(samples)?;
        let (min, max) = samples.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), s| (lo.min(s.altitude), hi.max(s.altitude)),
        );

        Some(Self {
            min_altitude: min,
            max_altitude: max,
            // Float rounding can push a constant series' mean one ulp outside [min, max]
            avg_altitude: avg.max(min).min(max),
        })
    }
}

/// Orbit health band for a window's mean altitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// mean < 160
    RapidDecay,
    /// 160 <= mean < 161
    SustainedLeo,
    /// mean >= 161
    Nominal,
}

impl HealthStatus {
    /// Classify a window by its mean altitude. `None` when the window is empty.
    pub fn classify(samples: &[Sample]) -> Option<Self> {
        mean_altitude(samples).map(Self::from_mean)
    }

    pub fn from_mean(mean: f64) -> Self {
        if mean < RAPID_DECAY_BELOW {
            Self::RapidDecay
        } else if mean < NOMINAL_FROM {
            Self::SustainedLeo
        } else {
            Self::Nominal
        }
    }

    /// Operator-facing text returned by `GET /health`.
    pub fn message(self) -> &'static str {
        match self {
            Self::RapidDecay => "WARNING: RAPID ORBITAL DECAY IMMINENT",
            Self::SustainedLeo => "Sustained Low Earth Orbit Resumed",
            Self::Nominal => "Altitude is A-OK",
        }
    }
}

fn mean_altitude(samples: &[Sample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let sum: f64 = samples.iter().map(|s| s.altitude).sum();
    Some(sum / samples.len() as f64)
}
