use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Default per-attempt request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default exponential backoff base
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Transport tunables shared by every adapter
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Timeout for a single attempt, until response headers arrive
    #[serde(default = "default_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    /// Retries attempted after the first request for 429/5xx and network failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff base; the delay before retry `n` is `backoff_base * 2^n`
    #[serde(default = "default_backoff_base", deserialize_with = "deserialize_duration")]
    pub backoff_base: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

const fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

const fn default_backoff_base() -> Duration {
    DEFAULT_BACKOFF_BASE
}

/// Parse human-readable durations such as `"30s"` or `"250ms"`
pub(crate) fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    duration_str::parse(&raw).map_err(|e| serde::de::Error::custom(format!("invalid duration '{raw}': {e}")))
}
