//! Configuration management for the Paradecast application
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::ParadecastError;
use crate::analysis::{DistributionParams, HistoryParams};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the Paradecast application
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ParadecastConfig {
    /// Weather provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Derivation pipeline tunables
    #[serde(default)]
    pub derivation: DerivationConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Weather provider configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL for the forecast API
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
    /// Base URL for the historical archive API
    #[serde(default = "default_provider_archive_url")]
    pub archive_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for failed requests
    #[serde(default = "default_provider_max_retries")]
    pub max_retries: u32,
    /// Number of past years sampled for historical probabilities
    #[serde(default = "default_historical_years")]
    pub historical_years: u32,
}

/// Derivation pipeline tunables
///
/// The blend weight and width divisor reproduce the original dashboard curve
/// by default; neither is derived from data, so both stay configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivationConfig {
    /// Distribution horizon; the curve has `horizon + 1` samples
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    /// Weight of the average probability blended into every curve sample
    #[serde(default = "default_average_weight")]
    pub average_weight: f64,
    /// Bump width is `horizon / width_divisor`
    #[serde(default = "default_width_divisor")]
    pub width_divisor: f64,
    /// Number of prior history samples compared for trend classification
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
    /// Dead band in probability points inside which a trend is stable
    #[serde(default = "default_trend_epsilon")]
    pub trend_epsilon: f64,
    /// Number of prior samples in each derived history window
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Maximum absolute history perturbation, in probability points
    #[serde(default = "default_history_jitter")]
    pub history_jitter: u8,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// HTTP server configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_server_bind")]
    pub bind: String,
    /// Listen port
    #[serde(default = "default_server_port")]
    pub port: u16,
}

// Default value functions
fn default_provider_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_provider_archive_url() -> String {
    "https://archive-api.open-meteo.com/v1".to_string()
}

fn default_provider_timeout() -> u32 {
    30
}

fn default_provider_max_retries() -> u32 {
    3
}

fn default_historical_years() -> u32 {
    30
}

fn default_horizon() -> usize {
    30
}

fn default_average_weight() -> f64 {
    0.3
}

fn default_width_divisor() -> f64 {
    6.0
}

fn default_trend_window() -> usize {
    3
}

fn default_trend_epsilon() -> f64 {
    2.0
}

fn default_history_window() -> usize {
    6
}

fn default_history_jitter() -> u8 {
    15
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_server_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8000
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            archive_url: default_provider_archive_url(),
            timeout_seconds: default_provider_timeout(),
            max_retries: default_provider_max_retries(),
            historical_years: default_historical_years(),
        }
    }
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            average_weight: default_average_weight(),
            width_divisor: default_width_divisor(),
            trend_window: default_trend_window(),
            trend_epsilon: default_trend_epsilon(),
            history_window: default_history_window(),
            history_jitter: default_history_jitter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_server_bind(),
            port: default_server_port(),
        }
    }
}

impl DerivationConfig {
    /// Distribution synthesizer parameters for this configuration
    #[must_use]
    pub fn distribution_params(&self) -> DistributionParams {
        DistributionParams {
            horizon: self.horizon,
            average_weight: self.average_weight,
            width_divisor: self.width_divisor,
        }
    }

    /// History synthesizer parameters for this configuration
    #[must_use]
    pub fn history_params(&self) -> HistoryParams {
        HistoryParams {
            window: self.history_window,
            jitter: self.history_jitter,
        }
    }
}

impl ParadecastConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Add environment variable overrides with PARADECAST_ prefix
        builder = builder.add_source(
            Environment::with_prefix("PARADECAST")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: ParadecastConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("paradecast").join("config.toml"))
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_provider()?;
        self.validate_derivation()?;
        self.validate_strings()?;
        Ok(())
    }

    /// Validate provider settings
    fn validate_provider(&self) -> Result<()> {
        if self.provider.timeout_seconds == 0 || self.provider.timeout_seconds > 300 {
            return Err(
                ParadecastError::config("Provider timeout must be within 1-300 seconds").into(),
            );
        }

        if self.provider.max_retries > 10 {
            return Err(ParadecastError::config("Provider max retries cannot exceed 10").into());
        }

        if self.provider.historical_years == 0 || self.provider.historical_years > 80 {
            return Err(
                ParadecastError::config("Historical years must be within 1-80").into(),
            );
        }

        Ok(())
    }

    /// Validate derivation tunables
    fn validate_derivation(&self) -> Result<()> {
        if self.derivation.horizon == 0 || self.derivation.horizon > 366 {
            return Err(
                ParadecastError::config("Distribution horizon must be within 1-366").into(),
            );
        }

        if !(0.0..=1.0).contains(&self.derivation.average_weight) {
            return Err(
                ParadecastError::config("Average weight must be within 0.0-1.0").into(),
            );
        }

        if self.derivation.width_divisor <= 0.0 {
            return Err(ParadecastError::config("Width divisor must be positive").into());
        }

        if self.derivation.trend_window == 0 {
            return Err(ParadecastError::config("Trend window must be at least 1").into());
        }

        if self.derivation.trend_epsilon < 0.0 {
            return Err(ParadecastError::config("Trend epsilon cannot be negative").into());
        }

        if self.derivation.history_window == 0 || self.derivation.history_window > 30 {
            return Err(
                ParadecastError::config("History window must be within 1-30").into(),
            );
        }

        if self.derivation.history_jitter > 100 {
            return Err(
                ParadecastError::config("History jitter cannot exceed 100 points").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_strings(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(ParadecastError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(ParadecastError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for url in [&self.provider.base_url, &self.provider.archive_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ParadecastError::config(
                    "Provider URLs must be valid HTTP or HTTPS URLs",
                )
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ParadecastConfig::default();
        assert_eq!(config.provider.base_url, "https://api.open-meteo.com/v1");
        assert_eq!(config.provider.timeout_seconds, 30);
        assert_eq!(config.provider.historical_years, 30);
        assert_eq!(config.derivation.horizon, 30);
        assert_eq!(config.derivation.average_weight, 0.3);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.server.port, 8000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = ParadecastConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = ParadecastConfig::default();
        config.provider.timeout_seconds = 500;
        assert!(config.validate().is_err());

        let mut config = ParadecastConfig::default();
        config.derivation.horizon = 0;
        assert!(config.validate().is_err());

        let mut config = ParadecastConfig::default();
        config.derivation.average_weight = 1.5;
        assert!(config.validate().is_err());

        let mut config = ParadecastConfig::default();
        config.derivation.width_divisor = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_urls() {
        let mut config = ParadecastConfig::default();
        config.provider.archive_url = "ftp://archive.example".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Provider URLs"));
    }

    #[test]
    fn test_config_path_generation() {
        let path = ParadecastConfig::get_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("paradecast"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_derivation_params_mapping() {
        let config = ParadecastConfig::default();
        let distribution = config.derivation.distribution_params();
        assert_eq!(distribution.horizon, 30);
        assert_eq!(distribution.width_divisor, 6.0);
        let history = config.derivation.history_params();
        assert_eq!(history.window, 6);
        assert_eq!(history.jitter, 15);
    }
}
