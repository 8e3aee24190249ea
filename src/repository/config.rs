//! Repository configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Connection settings for a [`Repository`](super::Repository).
///
/// Immutable once handed to the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Database holding every model's table.
    pub database: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    28015
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            database: "test".to_string(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl RepositoryConfig {
    /// Create a configuration for `database` on the default host and port.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Default::default()
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Load a configuration from a JSON file. Missing host and port fall back
    /// to the defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builder() {
        let config = RepositoryConfig::new("app").host("db.internal").port(29015);
        assert_eq!(config.database, "app");
        assert_eq!(config.address(), "db.internal:29015");
        assert_eq!(RepositoryConfig::new("app").address(), "localhost:28015");
    }

    #[test]
    fn test_from_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("odm.json");
        std::fs::write(&path, r#"{"database": "app", "port": 1234}"#).unwrap();

        let config = RepositoryConfig::from_json_file(&path).unwrap();
        assert_eq!(config, RepositoryConfig::new("app").port(1234));
    }

    #[test]
    fn test_from_json_file_errors() {
        let dir = TempDir::new().unwrap();
        let missing = RepositoryConfig::from_json_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));

        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"host": "no database"}"#).unwrap();
        assert!(matches!(RepositoryConfig::from_json_file(&path), Err(ConfigError::Parse(_))));
    }
}
