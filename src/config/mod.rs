//! Application configuration.
//!
//! Supports a YAML file and environment variable overrides.

mod storage;

pub use storage::{DynamoConfig, StoreConfig, StoreType};

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "tablemap.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "TABLEMAP_CONFIG";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "TABLEMAP_LOG";
/// Environment variable for the store type (memory/dynamo).
pub const STORE_TYPE_ENV_VAR: &str = "TABLEMAP_STORE_TYPE";
/// Environment variable for the DynamoDB endpoint override.
pub const DYNAMO_ENDPOINT_ENV_VAR: &str = "TABLEMAP_DYNAMO_ENDPOINT";
/// Environment variable for the DynamoDB region.
pub const DYNAMO_REGION_ENV_VAR: &str = "TABLEMAP_DYNAMO_REGION";
/// Environment variable for the table name prefix.
pub const TABLE_PREFIX_ENV_VAR: &str = "TABLEMAP_TABLE_PREFIX";
/// Environment variable for the deletion poll bound.
pub const DELETE_MAX_RETRIES_ENV_VAR: &str = "TABLEMAP_DELETE_MAX_RETRIES";
/// Environment variable for the deletion poll interval.
pub const DELETE_POLL_INTERVAL_ENV_VAR: &str = "TABLEMAP_DELETE_POLL_INTERVAL_MS";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    FileRead(String, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidEnv(String, String),
}

/// Main configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Table store configuration.
    pub store: StoreConfig,
    /// Polling policy for table deletion.
    pub deletion: DeletionConfig,
    /// Optional prefix for every table name.
    pub table_prefix: Option<String>,
}

/// Bounded polling after a table delete request.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeletionConfig {
    /// Existence checks after the first one before giving up.
    pub max_retries: usize,
    /// Fixed delay between existence checks.
    pub poll_interval_ms: u64,
}

impl Default for DeletionConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            poll_interval_ms: 1000,
        }
    }
}

impl DeletionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|name| std::env::var(name).ok())?;

        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides looked up through `var`.
    fn apply_env_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(store_type) = var(STORE_TYPE_ENV_VAR) {
            self.store.store_type = match store_type.to_lowercase().as_str() {
                "memory" => StoreType::Memory,
                "dynamo" => StoreType::Dynamo,
                _ => return Err(ConfigError::InvalidEnv(STORE_TYPE_ENV_VAR.into(), store_type)),
            };
        }

        if let Some(endpoint) = var(DYNAMO_ENDPOINT_ENV_VAR) {
            self.store.dynamo.endpoint_url = Some(endpoint);
        }

        if let Some(region) = var(DYNAMO_REGION_ENV_VAR) {
            self.store.dynamo.region = Some(region);
        }

        if let Some(prefix) = var(TABLE_PREFIX_ENV_VAR) {
            self.table_prefix = Some(prefix);
        }

        if let Some(retries) = var(DELETE_MAX_RETRIES_ENV_VAR) {
            self.deletion.max_retries = retries
                .parse()
                .map_err(|_| ConfigError::InvalidEnv(DELETE_MAX_RETRIES_ENV_VAR.into(), retries))?;
        }

        if let Some(interval) = var(DELETE_POLL_INTERVAL_ENV_VAR) {
            self.deletion.poll_interval_ms = interval.parse().map_err(|_| {
                ConfigError::InvalidEnv(DELETE_POLL_INTERVAL_ENV_VAR.into(), interval)
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.store.store_type, StoreType::Memory);
        assert_eq!(config.deletion.max_retries, 10);
        assert_eq!(config.deletion.poll_interval(), Duration::from_secs(1));
        assert!(config.table_prefix.is_none());
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "store:\n  type: dynamo\n  dynamo:\n    region: eu-west-1\ndeletion:\n  max_retries: 3\ntable_prefix: staging"
        )
        .unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.store.store_type, StoreType::Dynamo);
        assert_eq!(config.store.dynamo.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.deletion.max_retries, 3);
        assert_eq!(config.deletion.poll_interval_ms, 1000);
        assert_eq!(config.table_prefix.as_deref(), Some("staging"));
    }

    #[test]
    fn test_config_missing_file() {
        let err = Config::from_file("/nonexistent/tablemap.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(_, _)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (STORE_TYPE_ENV_VAR, "DYNAMO"),
            (DYNAMO_ENDPOINT_ENV_VAR, "http://localhost:8000"),
            (DELETE_MAX_RETRIES_ENV_VAR, "2"),
            (DELETE_POLL_INTERVAL_ENV_VAR, "50"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.store.store_type, StoreType::Dynamo);
        assert_eq!(
            config.store.dynamo.endpoint_url.as_deref(),
            Some("http://localhost:8000")
        );
        assert_eq!(config.deletion.max_retries, 2);
        assert_eq!(config.deletion.poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_invalid_env_override() {
        let mut config = Config::default();
        let err = config
            .apply_env_overrides(|name| (name == STORE_TYPE_ENV_VAR).then(|| "redis".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv(_, _)));
    }
}
