//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{FasciaError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Device configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DeviceConfig {
    /// MAC address used to derive the data and command topics
    #[serde(default)]
    pub mac_address: String,
}

/// Session configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Rendered packets kept for display
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Delivery guarantee for stream commands (0, 1 or 2)
    #[serde(default = "default_command_qos")]
    pub command_qos: u8,
}

/// Output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_format")]
    pub format: OutputFormat,
}

/// How decoded packets are written
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Multi-line `name: value` blocks
    Text,
    /// One JSON object per packet
    Jsonl,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            command_qos: default_command_qos(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { format: default_output_format() }
    }
}

// Default value functions
fn default_history_limit() -> usize { 1000 }
fn default_command_qos() -> u8 { 2 }
fn default_output_format() -> OutputFormat { OutputFormat::Text }

/// Upper bound for `history_limit`
const MAX_HISTORY_LIMIT: usize = 100_000;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fascia_telemetry::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // MAC address may be empty here and supplied on the command line
        if self.device.mac_address.chars().any(char::is_whitespace) {
            return Err(FasciaError::Config(
                toml::de::Error::custom("mac_address cannot contain whitespace")
            ));
        }

        if self.session.history_limit == 0 || self.session.history_limit > MAX_HISTORY_LIMIT {
            return Err(FasciaError::Config(
                toml::de::Error::custom(format!("history_limit must be between 1 and {}", MAX_HISTORY_LIMIT))
            ));
        }

        if self.session.command_qos > 2 {
            return Err(FasciaError::Config(
                toml::de::Error::custom("command_qos must be one of: 0, 1, 2")
            ));
        }

        Ok(())
    }
}
