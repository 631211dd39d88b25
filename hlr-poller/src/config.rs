//! Configuration for the HLR sensor poller.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use hlr_common::config::LoggingConfig;
use hlr_common::reading::SensorKind;
use hlr_common::serialization::Format;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete poller service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Polling schedule settings
    #[serde(default)]
    pub poller: PollingConfig,

    /// Reading persistence settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Sensors to poll
    pub sensors: Vec<SensorConfig>,
}

/// Polling schedule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between polls of each sensor
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    10
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl PollingConfig {
    /// Poll interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Reading persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory the row files are written into
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Row encoding: "json" or "cbor"
    #[serde(default)]
    pub format: Format,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            format: Format::default(),
        }
    }
}

/// Configuration for a single sensor unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Sensor type: "interlock" or "tongdy"
    pub kind: SensorKind,

    /// Display name, used as `sensor_id` in readings
    pub name: String,

    /// Modbus slave address (1-247)
    pub address: u8,

    /// Serial port path (e.g., "/dev/ttyUSB0")
    #[serde(default = "default_port")]
    pub port: String,

    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Per-register response timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Minimum quiet period between bus transactions in milliseconds
    #[serde(default = "default_pre_delay_ms")]
    pub pre_delay_ms: u64,
}

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    19200
}

fn default_timeout_ms() -> u64 {
    1500
}

fn default_pre_delay_ms() -> u64 {
    30
}

impl SensorConfig {
    /// Response timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Bus quiet period as a duration.
    pub fn pre_delay(&self) -> Duration {
        Duration::from_millis(self.pre_delay_ms)
    }
}

impl PollerConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: PollerConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensors.is_empty() {
            return Err(ConfigError::Validation(
                "At least one sensor must be configured".to_string(),
            ));
        }

        if self.poller.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "Poll interval must be at least 1 second".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for sensor in &self.sensors {
            if sensor.name.is_empty() {
                return Err(ConfigError::Validation(
                    "Sensor name cannot be empty".to_string(),
                ));
            }

            if !names.insert(sensor.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate sensor name '{}'",
                    sensor.name
                )));
            }

            if sensor.address == 0 || sensor.address > 247 {
                return Err(ConfigError::Validation(format!(
                    "Sensor '{}': address must be 1-247",
                    sensor.name
                )));
            }

            if sensor.port.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Sensor '{}': port cannot be empty",
                    sensor.name
                )));
            }
        }

        Ok(())
    }
}
