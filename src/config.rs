use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::telemetry::store::DEFAULT_CAPACITY;

// ─── Defaults ────────────────────────────────────────────────────

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SOURCE_URL: &str = "https://api.cfast.dev/satellite";
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_FETCH_RETRIES: u32 = 0;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;
const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 10_000;

// ─── Public types ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub sampler: SamplerConfig,
    pub sampling: SamplingMode,
    pub store_capacity: usize,
}

/// Outbound fetch policy. Every attempt is bounded by `timeout`.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    pub source_url: String,
    pub timeout: Duration,
    /// Extra attempts after the first; 0 disables retrying.
    pub retries: u32,
    /// Delay before the first retry, doubled for each one after.
    pub retry_backoff: Duration,
}

/// When samples are taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// Background task on a fixed period; queries only read the store.
    Interval(Duration),
    /// One best-effort fetch at the start of every query.
    OnRequest,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

// ─── Loading ─────────────────────────────────────────────────────

impl Config {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source; unset and empty keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(&get, "PORT", DEFAULT_PORT, "port number")?;

        let sampler = SamplerConfig {
            source_url: get("ALTITUDE_SOURCE_URL")
                .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            timeout: Duration::from_millis(non_zero(
                "FETCH_TIMEOUT_MS",
                parse_or(&get, "FETCH_TIMEOUT_MS", DEFAULT_FETCH_TIMEOUT_MS, "millisecond count")?,
            )?),
            retries: parse_or(&get, "FETCH_RETRIES", DEFAULT_FETCH_RETRIES, "retry count")?,
            retry_backoff: Duration::from_millis(parse_or(
                &get,
                "FETCH_RETRY_BACKOFF_MS",
                DEFAULT_RETRY_BACKOFF_MS,
                "millisecond count",
            )?),
        };

        let sampling = match get("SAMPLING_MODE").as_deref().map(str::trim) {
            None | Some("interval") => {
                let ms = parse_or(
                    &get,
                    "SAMPLE_INTERVAL_MS",
                    DEFAULT_SAMPLE_INTERVAL_MS,
                    "millisecond count",
                )?;
                SamplingMode::Interval(Duration::from_millis(non_zero("SAMPLE_INTERVAL_MS", ms)?))
            }
            Some("on-request") => SamplingMode::OnRequest,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "SAMPLING_MODE",
                    value: other.to_string(),
                    expected: "mode (interval | on-request)",
                })
            }
        };

        let store_capacity = non_zero(
            "SAMPLE_STORE_CAPACITY",
            parse_or(&get, "SAMPLE_STORE_CAPACITY", DEFAULT_CAPACITY, "capacity")?,
        )?;

        Ok(Self {
            port,
            sampler,
            sampling,
            store_capacity,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            sampler: SamplerConfig::default(),
            sampling: SamplingMode::Interval(Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS)),
            store_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            retries: DEFAULT_FETCH_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────

fn parse_or<T, G>(
    get: &G,
    var: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            value: raw,
            expected,
        }),
    }
}

fn non_zero<T>(var: &'static str, value: T) -> Result<T, ConfigError>
where
    T: PartialEq + Default,
{
    if value == T::default() {
        Err(ConfigError::Zero(var))
    } else {
        Ok(value)
    }
}
