use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::{PolicyError, RetryPolicy};

/// Retry policy parameters (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per call (including the first).
    pub max_attempts: u32,
    /// Delay in seconds before the second attempt (e.g. 0.25 = 250ms).
    pub min_delay_secs: f64,
    /// Ceiling on any single backoff delay, in seconds.
    pub max_delay_secs: f64,
    /// Fraction of each delay that may be shaved off at random (0 = off).
    #[serde(default)]
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay_secs: 1.0,
            max_delay_secs: 30.0,
            jitter: 0.0,
        }
    }
}

impl RetryConfig {
    /// Validate into a policy. Negative or non-finite seconds are rejected.
    pub fn to_policy(&self) -> Result<RetryPolicy, PolicyError> {
        let min = secs(self.min_delay_secs)?;
        let max = secs(self.max_delay_secs)?;
        RetryPolicy::new(self.max_attempts, min, max)?.with_jitter(self.jitter)
    }
}

fn secs(value: f64) -> Result<Duration, PolicyError> {
    Duration::try_from_secs_f64(value).map_err(|_| PolicyError::Seconds(value))
}

fn default_attempt_timeout_secs() -> f64 {
    10.0
}

/// Global configuration loaded from `~/.config/roe/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoeConfig {
    /// Deadline the caller puts on each attempt, in seconds. Not part of the
    /// retry policy: a hung attempt only becomes a retryable timeout because
    /// the caller wraps it in this deadline.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: f64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for RoeConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: default_attempt_timeout_secs(),
            retry: None,
        }
    }
}

impl RoeConfig {
    /// Effective retry policy: the `[retry]` section, or the defaults.
    pub fn retry_policy(&self) -> Result<RetryPolicy, PolicyError> {
        match &self.retry {
            Some(r) => r.to_policy(),
            None => Ok(RetryPolicy::default()),
        }
    }

    pub fn attempt_timeout(&self) -> Result<Duration, PolicyError> {
        secs(self.attempt_timeout_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("roe")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from a specific file.
pub fn load_from(path: &Path) -> Result<RoeConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: RoeConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RoeConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RoeConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from(&path)
}
