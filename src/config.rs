// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Controller configuration.
//!
//! Defaults, then an optional TOML file, then environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mounts::tracker::{DEFAULT_DRIFT_INTERVAL, DEFAULT_READINESS_POLL};
use crate::scheduler::WorkQueueConfig;

/// Environment variable naming the config file.
pub const ENV_CONFIG_PATH: &str = "MOUNTS_CONFIG";
pub const ENV_WORKERS: &str = "MOUNTS_WORKERS";
pub const ENV_DRIFT_INTERVAL_SECS: &str = "MOUNTS_DRIFT_INTERVAL_SECS";
pub const ENV_READINESS_POLL_MS: &str = "MOUNTS_READINESS_POLL_MS";
pub const ENV_BACKOFF_BASE_MS: &str = "MOUNTS_BACKOFF_BASE_MS";
pub const ENV_BACKOFF_MAX_SECS: &str = "MOUNTS_BACKOFF_MAX_SECS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unable to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings of the mount controller.
#[derive(Debug, Clone, PartialEq)]
pub struct MountsConfig {
    /// Number of resource queue workers.
    pub workers: usize,
    /// Period of the drift poll.
    pub drift_interval: Duration,
    /// Readiness check period while tracker hooks are unbound.
    pub readiness_poll: Duration,
    /// First retry delay of a failed resource key.
    pub backoff_base: Duration,
    /// Upper bound on the retry delay.
    pub backoff_max: Duration,
}

impl Default for MountsConfig {
    fn default() -> Self {
        let queue = WorkQueueConfig::default();
        Self {
            workers: 2,
            drift_interval: DEFAULT_DRIFT_INTERVAL,
            readiness_poll: DEFAULT_READINESS_POLL,
            backoff_base: queue.base_delay,
            backoff_max: queue.max_delay,
        }
    }
}

/// On-disk form; every field optional.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    workers: Option<usize>,
    drift_interval_secs: Option<u64>,
    readiness_poll_ms: Option<u64>,
    backoff_base_ms: Option<u64>,
    backoff_max_secs: Option<u64>,
}

impl MountsConfig {
    /// Overlay a TOML document on the defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(raw)?;
        let mut config = Self::default();
        if let Some(workers) = file.workers {
            config.workers = workers;
        }
        if let Some(secs) = file.drift_interval_secs {
            config.drift_interval = Duration::from_secs(secs);
        }
        if let Some(ms) = file.readiness_poll_ms {
            config.readiness_poll = Duration::from_millis(ms);
        }
        if let Some(ms) = file.backoff_base_ms {
            config.backoff_base = Duration::from_millis(ms);
        }
        if let Some(secs) = file.backoff_max_secs {
            config.backoff_max = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |var: &str| -> Result<Option<u64>, ConfigError> {
            match lookup(var) {
                None => Ok(None),
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| ConfigError::InvalidEnv { var: var.to_string(), value }),
            }
        };

        if let Some(workers) = parse(ENV_WORKERS)? {
            self.workers = usize::try_from(workers).map_err(|_| ConfigError::InvalidEnv {
                var: ENV_WORKERS.to_string(),
                value: workers.to_string(),
            })?;
        }
        if let Some(secs) = parse(ENV_DRIFT_INTERVAL_SECS)? {
            self.drift_interval = Duration::from_secs(secs);
        }
        if let Some(ms) = parse(ENV_READINESS_POLL_MS)? {
            self.readiness_poll = Duration::from_millis(ms);
        }
        if let Some(ms) = parse(ENV_BACKOFF_BASE_MS)? {
            self.backoff_base = Duration::from_millis(ms);
        }
        if let Some(secs) = parse(ENV_BACKOFF_MAX_SECS)? {
            self.backoff_max = Duration::from_secs(secs);
        }
        Ok(self)
    }

    /// Load from `path` (or `$MOUNTS_CONFIG`), apply the process environment
    /// and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from));

        let base = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io { path, source })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };

        let config = base.with_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        if self.drift_interval.is_zero() {
            return Err(ConfigError::Invalid("drift interval must be positive".to_string()));
        }
        if self.readiness_poll.is_zero() {
            return Err(ConfigError::Invalid("readiness poll must be positive".to_string()));
        }
        if self.backoff_base > self.backoff_max {
            return Err(ConfigError::Invalid(format!(
                "backoff base {:?} exceeds backoff max {:?}",
                self.backoff_base, self.backoff_max
            )));
        }
        Ok(())
    }

    pub fn queue_config(&self) -> WorkQueueConfig {
        WorkQueueConfig {
            base_delay: self.backoff_base,
            max_delay: self.backoff_max,
        }
    }

    /// Render in the file format accepted by [`MountsConfig::from_toml_str`].
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let file = ConfigFile {
            workers: Some(self.workers),
            drift_interval_secs: Some(self.drift_interval.as_secs()),
            readiness_poll_ms: Some(u64::try_from(self.readiness_poll.as_millis()).unwrap_or(u64::MAX)),
            backoff_base_ms: Some(u64::try_from(self.backoff_base.as_millis()).unwrap_or(u64::MAX)),
            backoff_max_secs: Some(self.backoff_max.as_secs()),
        };
        Ok(toml::to_string(&file)?)
    }
}
