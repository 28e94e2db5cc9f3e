// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::metrics::RevisionIdentity;

pub const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration load error: {0}")]
    LoadError(String),
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_workers() -> usize {
    4
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct IdentityConfig {
    pub namespace: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub configuration: String,
    pub revision: String,
}

impl From<&IdentityConfig> for RevisionIdentity {
    fn from(identity: &IdentityConfig) -> Self {
        RevisionIdentity::new(
            identity.namespace.clone(),
            identity.service.clone(),
            identity.configuration.clone(),
            identity.revision.clone(),
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RoutingConfig {
    /// Tolerate mismatches between the declared tag and the resolved route.
    #[serde(default)]
    pub enable_fallback: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UpstreamConfig {
    pub url: String,
    #[serde(default = "default_upstream_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_upstream_max_body_mb")]
    pub max_body_mb: usize,
}

fn default_upstream_timeout_seconds() -> u64 {
    30
}

fn default_upstream_max_body_mb() -> usize {
    10
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            host: default_host(),
            port: default_metrics_port(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9091
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Option<LevelFilter> {
        match self.level.to_lowercase().as_str() {
            "off" => Some(LevelFilter::Off),
            "error" => Some(LevelFilter::Error),
            "warn" => Some(LevelFilter::Warn),
            "info" => Some(LevelFilter::Info),
            "debug" => Some(LevelFilter::Debug),
            "trace" => Some(LevelFilter::Trace),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub identity: IdentityConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub server: ServerConfig,
    pub identity: IdentityConfig,
    pub routing: RoutingConfig,
    pub upstream: UpstreamConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
    pub log_level: LevelFilter,
}

impl Config {
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join(CONFIG_FILE_NAME);
        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        Self::parse(&config_content).map_err(|e| match e {
            ConfigError::LoadError(msg) => ConfigError::LoadError(format!(
                "Failed to parse config file '{}': {}",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Loads and validates configuration at startup. If validation fails, the guard should not start.
    pub fn load_and_validate(root: &Path) -> Result<ValidatedConfig, ConfigError> {
        Self::load(root)?.validate()
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        Self::validate_server(&self.server)?;
        Self::validate_identity(&self.identity)?;
        Self::validate_upstream(&self.upstream)?;

        let log_level = self.logging.level_filter().ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "Unknown logging level '{}'; expected one of off, error, warn, info, debug, trace",
                self.logging.level
            ))
        })?;

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(ConfigError::ValidationError(
                    "Metrics port must not be 0".to_string(),
                ));
            }
            if self.metrics.port == self.server.port && self.metrics.host == self.server.host {
                return Err(ConfigError::ValidationError(format!(
                    "Metrics listener {}:{} collides with the server listener",
                    self.metrics.host, self.metrics.port
                )));
            }
        }

        if self.routing.enable_fallback {
            log::info!("Tag fallback enabled; mismatched tags will be served");
        }

        Ok(ValidatedConfig {
            server: self.server,
            identity: self.identity,
            routing: self.routing,
            upstream: self.upstream,
            metrics: self.metrics,
            logging: self.logging,
            log_level,
        })
    }

    fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
        if server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must not be 0".to_string(),
            ));
        }
        if server.workers == 0 {
            return Err(ConfigError::ValidationError(
                "Server workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_identity(identity: &IdentityConfig) -> Result<(), ConfigError> {
        if identity.namespace.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Identity namespace must not be empty".to_string(),
            ));
        }
        if identity.revision.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Identity revision must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_upstream(upstream: &UpstreamConfig) -> Result<(), ConfigError> {
        if !upstream.url.starts_with("http://") && !upstream.url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "Upstream url must start with http:// or https://, got: {}",
                upstream.url
            )));
        }
        if upstream.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Upstream timeout_seconds must be at least 1".to_string(),
            ));
        }
        if upstream.max_body_mb == 0 {
            return Err(ConfigError::ValidationError(
                "Upstream max_body_mb must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl ValidatedConfig {
    pub fn revision_identity(&self) -> RevisionIdentity {
        RevisionIdentity::from(&self.identity)
    }

    pub fn server_address(&self) -> (&str, u16) {
        (self.server.host.as_str(), self.server.port)
    }

    pub fn metrics_address(&self) -> Option<(&str, u16)> {
        self.metrics
            .enabled
            .then_some((self.metrics.host.as_str(), self.metrics.port))
    }
}
