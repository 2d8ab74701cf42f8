use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::config::SamplerConfig;
use crate::telemetry::{Sample, SampleStore};

// ─── Errors ──────────────────────────────────────────────────────

/// Why one fetch produced no sample. Never leaves this module's callers;
/// the HTTP layer only ever sees the store.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned {0}")]
    Status(StatusCode),
    #[error("malformed body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response has no altitude field")]
    MissingAltitude,
    #[error("altitude {0:?} is not a finite number")]
    InvalidAltitude(String),
}

impl SampleError {
    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status(_) => "status",
            Self::Json(_) => "json",
            Self::MissingAltitude => "missing_altitude",
            Self::InvalidAltitude(_) => "invalid_altitude",
        }
    }

    /// Transport hiccups and upstream errors may clear up; a bad payload won't.
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status(_))
    }
}

// ─── Sampler ─────────────────────────────────────────────────────

/// Fetches the current altitude from the telemetry endpoint.
///
/// `reqwest::Client` is cheaply cloneable and pools connections, so one
/// `Sampler` is shared by the background task and the handlers.
pub struct Sampler {
    client: reqwest::Client,
    url: String,
    retries: u32,
    retry_backoff: Duration,
}

impl Sampler {
    /// Fails only if the TLS backend or resolver can't be initialised.
    pub fn new(config: &SamplerConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.source_url.clone(),
            retries: config.retries,
            retry_backoff: config.retry_backoff,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One logical fetch, retrying retryable failures with doubling backoff.
    pub async fn fetch(&self) -> Result<f64, SampleError> {
        let mut delay = self.retry_backoff;
        let mut attempt = 0;

        loop {
            match self.fetch_once().await {
                Ok(altitude) => return Ok(altitude),
                Err(e) if attempt < self.retries && e.is_retryable() => {
                    attempt += 1;
                    tracing::debug!(
                        attempt,
                        max = self.retries,
                        kind = e.kind(),
                        error = %e,
                        "retrying altitude fetch in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self) -> Result<f64, SampleError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SampleError::Status(status));
        }

        let body = response.text().await?;
        let value: Value = serde_json::from_str(&body)?;
        parse_altitude(&value)
    }

    /// Fetch once and append to `store` on success.
    ///
    /// Failures are logged and swallowed; the store is left untouched.
    pub async fn sample_into(&self, store: &SampleStore) -> Option<Sample> {
        let t0 = Instant::now();

        match self.fetch().await {
            Ok(altitude) => {
                let sample = store.record_now(altitude);
                tracing::debug!(
                    altitude,
                    stored = store.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "altitude sampled"
                );
                Some(sample)
            }
            Err(e) => {
                tracing::warn!(
                    kind = e.kind(),
                    url = %self.url,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "error fetching altitude: {e}"
                );
                None
            }
        }
    }
}

/// Pull the `altitude` field out of a telemetry body.
///
/// Upstream has served it both as a number and as a numeric string.
pub fn parse_altitude(body: &Value) -> Result<f64, SampleError> {
    let altitude = match body.get("altitude") {
        None | Some(Value::Null) => return Err(SampleError::MissingAltitude),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match altitude {
        Some(a) if a.is_finite() => Ok(a),
        _ => Err(SampleError::InvalidAltitude(body["altitude"].to_string())),
    }
}

// ─── Background task ─────────────────────────────────────────────

/// Samples every `period` until `shutdown` flips to `true` or its sender drops.
/// The first sample is taken immediately.
pub async fn run(
    sampler: Arc<Sampler>,
    store: Arc<SampleStore>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    // A slow fetch shouldn't trigger a burst of catch-up samples
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(url = sampler.url(), ?period, "sampler started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sampler.sample_into(&store).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!(
        samples = store.len(),
        last_altitude = ?store.latest().map(|s| s.altitude),
        "sampler stopped"
    );
}
