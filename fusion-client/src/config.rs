//! Configuration loading for the Fusion client.
//!
//! All fields are required. No defaults.

use fusion_core::ConfigError;
use fusion_storage::CacheConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV_VAR: &str = "FUSION_CLIENT_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Absolute base URL of the REST API, e.g. `http://localhost:8080/api`.
    pub api_url_prefix: String,
    pub request_timeout_ms: u64,
    /// How long a successful fetch is served from the store. Zero disables
    /// cache hits.
    pub cache_ttl_ms: u64,
    pub alerts_update_interval_ms: u64,
    pub data_update_interval_ms: u64,
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or_else(|| ConfigError::MissingConfigPath {
            env_var: CONFIG_ENV_VAR.to_string(),
        })?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = self.api_url_prefix.trim();
        if prefix.is_empty() {
            return Err(invalid("api_url_prefix", prefix, "must not be empty"));
        }
        if !(prefix.starts_with("http://") || prefix.starts_with("https://")) {
            return Err(invalid(
                "api_url_prefix",
                prefix,
                "must be an absolute http(s) URL",
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms", "0", "must be > 0"));
        }
        if self.alerts_update_interval_ms == 0 {
            return Err(invalid("alerts_update_interval_ms", "0", "must be > 0"));
        }
        if self.data_update_interval_ms == 0 {
            return Err(invalid("data_update_interval_ms", "0", "must be > 0"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new().with_ttl(Duration::from_millis(self.cache_ttl_ms))
    }

    pub fn alerts_update_interval(&self) -> Duration {
        Duration::from_millis(self.alerts_update_interval_ms)
    }

    pub fn data_update_interval(&self) -> Duration {
        Duration::from_millis(self.data_update_interval_ms)
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
