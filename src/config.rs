//! Configuration System using Figment
//!
//! Configuration is loaded from (lowest to highest precedence):
//! 1. Built-in defaults ([`Settings::default`])
//! 2. A TOML file (default `config/th02.toml`, missing file is not an error)
//! 3. Environment variables prefixed with `TH02_`
//!
//! # Environment Variable Overrides
//!
//! Nested keys are separated with a double underscore:
//!
//! ```text
//! TH02_APPLICATION__LOG_LEVEL=debug
//! TH02_DEVICE__ADDRESS=64
//! TH02_ACQUISITION__STRICT_TIMEOUT=true
//! ```
//!
//! # Example
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [device]
//! name = "greenhouse"
//! bus = "/dev/i2c-1"
//! address = 0x40
//!
//! [acquisition]
//! poll_interval_ms = 1
//! max_poll_attempts = 16
//! strict_timeout = false
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::acquisition::{AcquisitionPolicy, MAX_POLL_ATTEMPTS};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/th02.toml";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "TH02_";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Figment could not read or deserialize a provider.
    #[error("Configuration load error: {0}")]
    LoadError(#[from] Box<figment::Error>),
    /// Values parsed but are not usable.
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
    /// Settings could not be rendered back to TOML.
    #[error("Configuration render error: {0}")]
    RenderError(#[from] toml::ser::Error),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application settings
    pub application: ApplicationConfig,
    /// Sensor location on the bus
    pub device: DeviceConfig,
    /// Polling behaviour of a measurement cycle
    pub acquisition: AcquisitionConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Where the sensor lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Human-readable device name used in logs
    pub name: String,
    /// Bus device node (e.g. "/dev/i2c-1")
    pub bus: String,
    /// 7-bit peripheral address
    pub address: u8,
}

/// Acquisition policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Sleep before each status poll, in milliseconds
    pub poll_interval_ms: u64,
    /// Status polls before giving up on the busy bit (1-16)
    pub max_poll_attempts: u8,
    /// Fail with a timeout instead of reading data when the busy bit never clears
    pub strict_timeout: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "th02".to_string(),
            bus: "/dev/i2c-1".to_string(),
            address: 0x40,
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1,
            max_poll_attempts: MAX_POLL_ATTEMPTS,
            strict_timeout: false,
        }
    }
}

impl AcquisitionConfig {
    /// Build the runtime polling policy.
    pub fn policy(&self) -> AcquisitionPolicy {
        AcquisitionPolicy::new(
            Duration::from_millis(self.poll_interval_ms),
            self.max_poll_attempts,
            self.strict_timeout,
        )
    }
}

impl Settings {
    /// Load configuration from [`DEFAULT_CONFIG_PATH`] and environment variables
    ///
    /// # Errors
    ///
    /// Returns a ConfigError if a provider is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file falls back to the defaults; environment variables are
    /// applied on top either way.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Self = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::LoadError(Box::new(e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration after loading
    ///
    /// Checks:
    /// - Log level is valid (trace, debug, info, warn, error)
    /// - Device address fits in 7 bits
    /// - Poll attempts are within 1-16
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.device.address > 0x7f {
            return Err(ConfigError::ValidationError(format!(
                "Invalid device address {:#04x}. Must be a 7-bit address",
                self.device.address
            )));
        }

        if self.device.bus.is_empty() {
            return Err(ConfigError::ValidationError(
                "'device.bus' cannot be empty".to_string(),
            ));
        }

        let attempts = self.acquisition.max_poll_attempts;
        if attempts == 0 || attempts > MAX_POLL_ATTEMPTS {
            return Err(ConfigError::ValidationError(format!(
                "Invalid max_poll_attempts {}. Must be 1-{}",
                attempts, MAX_POLL_ATTEMPTS
            )));
        }

        Ok(())
    }

    /// Render the settings as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.device.address, 0x40);
        assert_eq!(settings.acquisition.max_poll_attempts, 16);
        assert!(!settings.acquisition.strict_timeout);
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[device]
name = "greenhouse"
address = 0x41

[acquisition]
max_poll_attempts = 8
strict_timeout = true
"#
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.device.name, "greenhouse");
        assert_eq!(settings.device.address, 0x41);
        assert_eq!(settings.device.bus, "/dev/i2c-1");
        assert_eq!(settings.acquisition.max_poll_attempts, 8);
        assert!(settings.acquisition.strict_timeout);
        assert_eq!(settings.application.log_level, "info");
    }

    #[test]
    #[serial]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("TH02_APPLICATION__LOG_LEVEL", "debug");
        std::env::set_var("TH02_ACQUISITION__POLL_INTERVAL_MS", "5");
        let result = Settings::load_from(dir.path().join("absent.toml"));
        std::env::remove_var("TH02_APPLICATION__LOG_LEVEL");
        std::env::remove_var("TH02_ACQUISITION__POLL_INTERVAL_MS");

        let settings = result.unwrap();
        assert_eq!(settings.application.log_level, "debug");
        assert_eq!(settings.acquisition.poll_interval_ms, 5);
    }

    #[test]
    fn test_rejects_bad_log_level() {
        let mut settings = Settings::default();
        settings.application.log_level = "chatty".to_string();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid log_level"));
    }

    #[test]
    fn test_rejects_poll_attempts_out_of_range() {
        let mut settings = Settings::default();
        settings.acquisition.max_poll_attempts = 0;
        assert!(settings.validate().is_err());

        settings.acquisition.max_poll_attempts = 17;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_ten_bit_address() {
        let mut settings = Settings::default();
        settings.device.address = 0x80;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_toml_rendering() {
        let rendered = Settings::default().to_toml().unwrap();
        assert!(rendered.contains("[acquisition]"));
        assert!(rendered.contains("max_poll_attempts = 16"));
    }
}
