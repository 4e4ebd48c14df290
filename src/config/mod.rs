//! Configuration
//!
//! Settings are layered: built-in defaults, then a config file, then
//! `CONCURRENT_RUNNER_*` environment variables, then command-line flags.

mod env;
mod file;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::output::OutputFormat;
use crate::utils::LogLevel;

pub use env::{print_env_help, EnvBuilder, EnvConfig, EnvGuard, ENV_PREFIX};
pub use file::{expand_path, ConfigFile, CONFIG_LOCATIONS};

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Worker threads for every suite; unset keeps each suite's own directive
    pub default_threads: Option<u32>,

    /// Rounds per run
    pub rounds: u32,

    /// Output format name
    pub format: String,

    /// Log level name
    pub log_level: String,

    pub remote: RemoteConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_threads: None,
            rounds: 1,
            format: OutputFormat::Table.to_string(),
            log_level: LogLevel::Info.to_string(),
            remote: RemoteConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load the `app` section of a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(ConfigFile::load(path)?.app)
    }

    /// Save as a complete config file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        ConfigFile {
            app: self.clone(),
            ..ConfigFile::default()
        }
        .save(path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_threads == Some(0) {
            bail!("default_threads must be at least 1");
        }
        if self.rounds == 0 {
            bail!("rounds must be at least 1");
        }
        if OutputFormat::from_str(&self.format).is_none() {
            bail!(
                "Unknown output format '{}'. Use table, json, json-pretty, csv or summary",
                self.format
            );
        }
        if LogLevel::from_str(&self.log_level).is_none() {
            bail!("Unknown log level '{}'", self.log_level);
        }
        self.remote.validate()
    }

    /// Overlay values taken from the environment
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(threads) = env.threads {
            self.default_threads = Some(threads);
        }
        if let Some(rounds) = env.rounds {
            self.rounds = rounds;
        }
        if let Some(format) = &env.format {
            self.format = format.clone();
        }
        if let Some(level) = &env.log_level {
            self.log_level = level.clone();
        }
        if let Some(endpoint) = &env.endpoint {
            self.remote.endpoint = Some(endpoint.clone());
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_str(&self.format).unwrap_or_default()
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_str(&self.log_level).unwrap_or_default()
    }
}

/// Remote dispatch settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Test endpoint URL, e.g. `http://localhost:8080/app/testrunner`
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 30,
        }
    }
}

impl RemoteConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            bail!("remote.timeout_secs must be at least 1");
        }
        if let Some(endpoint) = &self.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                bail!("remote.endpoint must be an http(s) URL, got '{}'", endpoint);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.rounds, 1);
        assert_eq!(config.output_format(), OutputFormat::Table);
        assert_eq!(config.log_level(), LogLevel::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_threads = AppConfig {
            default_threads: Some(0),
            ..Default::default()
        };
        assert!(zero_threads.validate().is_err());

        let bad_format = AppConfig {
            format: "xml".to_string(),
            ..Default::default()
        };
        assert!(bad_format.validate().is_err());

        let mut bad_endpoint = AppConfig::default();
        bad_endpoint.remote.endpoint = Some("localhost:8080".to_string());
        assert!(bad_endpoint.validate().is_err());
    }

    #[test]
    fn test_apply_env() {
        let mut config = AppConfig::default();
        config.apply_env(&EnvConfig {
            threads: Some(5),
            rounds: Some(20),
            endpoint: Some("http://localhost:8080/testrunner".to_string()),
            ..Default::default()
        });

        assert_eq!(config.default_threads, Some(5));
        assert_eq!(config.rounds, 20);
        assert_eq!(config.format, "table");
        assert_eq!(
            config.remote.endpoint.as_deref(),
            Some("http://localhost:8080/testrunner")
        );
    }

    #[test]
    fn test_save_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("runner.json");

        let config = AppConfig {
            default_threads: Some(4),
            rounds: 3,
            ..Default::default()
        };
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("runner.yaml");
        std::fs::write(&path, "app:\n  rounds: 7\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.rounds, 7);
        assert_eq!(config.remote.timeout_secs, 30);
        assert_eq!(config.default_threads, None);
    }
}
