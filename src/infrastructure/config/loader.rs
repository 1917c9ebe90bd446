//! Layered configuration loading.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::RelayConfig;

/// Environment prefix shared with the job that launches the relay
pub const ENV_PREFIX: &str = "KUBEKIT_CONFIGURATOR_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `host` is blank
    #[error("Host cannot be empty")]
    EmptyHost,

    /// Unknown `logging.level`
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Unknown `logging.format`
    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    /// Unknown `logging.rotation`
    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. YAML file, when one is given
    /// 3. Environment variables (`KUBEKIT_CONFIGURATOR_*`, `__` for nesting)
    ///
    /// `KUBEKIT_CONFIGURATOR_ETIME` is accepted for the grace period.
    /// The result is not validated; call [`Self::validate`] once command-line
    /// overrides have been applied.
    pub fn load(path: Option<&Path>) -> Result<RelayConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(RelayConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }

        let config: RelayConfig = figment
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .map(|key| {
                        if key.as_str().eq_ignore_ascii_case("etime") {
                            "grace_period_secs".into()
                        } else {
                            key.as_str().to_owned().into()
                        }
                    })
                    .split("__"),
            )
            .extract()
            .context("Failed to extract configuration from figment")?;

        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &RelayConfig) -> Result<(), ConfigError> {
        if config.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}
