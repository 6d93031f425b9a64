//! Hub configuration, loaded from environment variables.
//!
//! `main` loads a `.env` file (if any) through `dotenvy` before calling
//! `HubConfig::from_env`. Unset variables take their defaults; set but
//! unparsable variables are startup errors.

use std::path::PathBuf;
use std::str::FromStr;

use crate::message::ErrorCode;
use crate::state::DEFAULT_QUEUE_DEPTH;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PROFILES_PATH: &str = "profiles.yaml";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("{key} must be at least {min}")]
    TooSmall { key: &'static str, min: usize },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid { .. } => "E_CONFIG_INVALID",
            Self::TooSmall { .. } => "E_CONFIG_TOO_SMALL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// TCP port the gateway listens on.
    pub port: u16,
    /// YAML file holding users and their dashboards.
    pub profiles_path: PathBuf,
    /// Bounded outbound queue length per connection.
    pub queue_depth: usize,
}

impl HubConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set to something unparsable,
    /// or when `CONNECTION_QUEUE_DEPTH` is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        let queue_depth = env_parse("CONNECTION_QUEUE_DEPTH", DEFAULT_QUEUE_DEPTH)?;
        if queue_depth == 0 {
            return Err(ConfigError::TooSmall { key: "CONNECTION_QUEUE_DEPTH", min: 1 });
        }

        Ok(Self {
            port: env_parse("PORT", DEFAULT_PORT)?,
            profiles_path: std::env::var_os("PROFILES_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_PROFILES_PATH), PathBuf::from),
            queue_depth,
        })
    }
}

pub(crate) fn env_parse<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
