use std::path::Path;

use dstat_publish::ScmConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// Refresh settings, shared by every root of a workspace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Delays between query attempts, in milliseconds.
    pub retry_delays_ms: Vec<u64>,
    /// Capacity of each publisher's broadcast channel.
    pub channel_capacity: usize,
    pub scm: ScmConfig,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            retry_delays_ms: vec![500, 1000],
            channel_capacity: 256,
            scm: ScmConfig::default(),
        }
    }
}

impl RefreshConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid("channel_capacity must be positive".into()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_millis(&self.retry_delays_ms)
    }
}
