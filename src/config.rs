//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default reproducing the fixed constants the service
//! was originally deployed with, so the binary runs without any
//! configuration file at all.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Listener endpoint configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Persisted-collection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_database_dir")]
    pub database_dir: String,

    #[serde(default = "default_database_file")]
    pub database_file: String,
}

// Default value functions
fn default_bind_addr() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5555 }
fn default_database_dir() -> String { "database".to_string() }
fn default_database_file() -> String { "locations.json".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_dir: default_database_dir(),
            database_file: default_database_file(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Listener bind address in `host:port` form
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind_addr, self.server.port)
    }

    /// Full path of the persisted-collection file
    pub fn store_path(&self) -> PathBuf {
        Path::new(&self.store.database_dir).join(&self.store.database_file)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.server.bind_addr.is_empty() {
            return Err(crate::error::GeoMonitorError::Config(
                toml::de::Error::custom("server bind_addr cannot be empty")
            ));
        }

        if self.store.database_file.is_empty() {
            return Err(crate::error::GeoMonitorError::Config(
                toml::de::Error::custom("store database_file cannot be empty")
            ));
        }

        Ok(())
    }
}
