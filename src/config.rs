use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

use crate::{github::DEFAULT_GRAPHQL_ENDPOINT, storage};

const CONFIG_FILE: &str = "config.toml";
const CONFIG_PATH_ENV: &str = "WORKDAY_CONFIG";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
const MIN_POLL_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub api_url: String,
    pub poll_interval_secs: u64,
    pub storage_dir: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_GRAPHQL_ENDPOINT.to_owned(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            storage_dir: None,
        }
    }
}

impl DashboardConfig {
    /// Reads `$WORKDAY_CONFIG`, falling back to `~/.workday/config.toml`.
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = match env::var_os(CONFIG_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => match storage::default_storage_dir() {
                Ok(dir) => dir.join(CONFIG_FILE),
                Err(_) => return Ok(Self::default()),
            },
        };
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(MIN_POLL_INTERVAL_SECS))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_uses_defaults() {
        let config = DashboardConfig::parse("").unwrap();
        assert_eq!(config.api_url, DEFAULT_GRAPHQL_ENDPOINT);
        assert_eq!(config.poll_interval(), Duration::from_secs(300));
        assert!(config.storage_dir.is_none());
    }

    #[test]
    fn fields_override_defaults() {
        let config = DashboardConfig::parse(
            r#"
            api_url = "https://github.example.com/api/graphql"
            poll_interval_secs = 120
            storage_dir = "/tmp/workday"
            "#,
        )
        .unwrap();
        assert_eq!(config.api_url, "https://github.example.com/api/graphql");
        assert_eq!(config.poll_interval(), Duration::from_secs(120));
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/workday")));
    }

    #[test]
    fn poll_interval_has_a_floor() {
        let config = DashboardConfig::parse("poll_interval_secs = 1").unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let config = DashboardConfig::from_path(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
    }

    #[test]
    fn malformed_file_is_reported() {
        let result = DashboardConfig::parse("poll_interval_secs = \"soon\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
