//! Application settings loading from config.toml
//!
//! Settings are read from a TOML file (default `./config.toml`, overridable with
//! `STOCK_LEDGER_CONFIG`). Every section has defaults, so a missing file is not an error.
//! A handful of environment variables override the file so deployments can inject
//! credentials without editing it.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{collections::HashMap, path::Path, time::Duration};
use tracing::{debug, info};

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_VAR: &str = "STOCK_LEDGER_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Relational store settings
    pub database: DatabaseConfig,
    /// Public catalog token table
    pub catalog: CatalogConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind (e.g., `"0.0.0.0:8080"`)
    pub bind_addr: String,
    /// Upper bound on each request's store work, in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Request-scoped deadline applied to every store-backed operation.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Database connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SeaORM connection URL
    pub url: String,
    /// Pool size
    pub max_connections: u32,
    /// Connect and acquire timeout, in seconds
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/stock_ledger.sqlite?mode=rwc".to_string(),
            max_connections: 8,
            connect_timeout_secs: 5,
        }
    }
}

/// Public catalog settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Maps a shareable catalog token to the user whose products it exposes
    pub tokens: HashMap<String, String>,
}

impl AppConfig {
    /// Parses configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse config.toml: {e}"),
        })
    }

    /// Applies environment overrides (`DATABASE_URL`, `BIND_ADDR`, `REQUEST_TIMEOUT_SECS`).
    ///
    /// `lookup` is normally `std::env::var(..).ok()`; tests pass a closure instead.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(secs) = lookup("REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = secs.parse().map_err(|e| Error::Config {
                message: format!("REQUEST_TIMEOUT_SECS must be a whole number of seconds: {e}"),
            })?;
        }
        Ok(())
    }
}

/// Loads configuration from a TOML file, falling back to defaults when the file is absent.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        info!("No config file at {:?}, using defaults", path_ref);
        return Ok(AppConfig::default());
    }
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;
    AppConfig::from_toml_str(&contents)
}

/// Loads the configuration file named by `STOCK_LEDGER_CONFIG` (or `./config.toml`)
/// and applies environment overrides.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = load_config(&path)?;
    config.apply_overrides(|key| std::env::var(key).ok())?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            bind_addr = "0.0.0.0:9000"
            request_timeout_secs = 3

            [database]
            url = "sqlite::memory:"
            max_connections = 1

            [catalog.tokens]
            "shop-abc" = "user-1"
        "#;

        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.server.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.max_connections, 1);
        // Unspecified fields keep their defaults
        assert_eq!(config.database.connect_timeout_secs, 5);
        assert_eq!(config.catalog.tokens.get("shop-abc").unwrap(), "user-1");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.server.request_timeout_secs, 10);
        assert!(config.catalog.tokens.is_empty());
    }

    #[test]
    fn test_malformed_config_is_config_error() {
        let result = AppConfig::from_toml_str("[server\nbind_addr = 1");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config("definitely/not/here/config.toml").unwrap();
        assert_eq!(config.server.request_timeout_secs, 10);
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| match key {
                "DATABASE_URL" => Some("sqlite::memory:".to_string()),
                "REQUEST_TIMEOUT_SECS" => Some("30".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");

        let bad = config.apply_overrides(|key| {
            (key == "REQUEST_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(matches!(bad, Err(Error::Config { .. })));
    }
}
