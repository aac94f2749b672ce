//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! marketplace client, including environment variable loading, TOML file
//! loading, and validation.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub backend: BackendSettings,
    pub session: SessionSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Client name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Hosted backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Base URL under which uploaded blobs resolve
    pub blob_base_url: String,
}

/// Session behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Maximum undelivered one-shot notifications held at once
    pub notification_capacity: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "market-stall".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            blob_base_url: "https://blobs.market-stall.dev".to_string(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            notification_capacity: 64,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(url) = env::var("BLOB_BASE_URL") {
            config.backend.blob_base_url = url;
        }
        if let Ok(capacity) = env::var("NOTIFICATION_CAPACITY") {
            config.session.notification_capacity = capacity
                .parse()
                .map_err(|_| anyhow!("Invalid NOTIFICATION_CAPACITY value: {}", capacity))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }
    if config.backend.blob_base_url.is_empty() {
        return Err(anyhow!("Blob base URL cannot be empty"));
    }
    if config.session.notification_capacity == 0 {
        return Err(anyhow!("Notification capacity must be greater than 0"));
    }

    Ok(())
}
