//! Session configuration
//!
//! The target device, characteristic and connect timeout for one run.
//! Values come from compiled-in defaults, optionally a JSON file named by
//! `SENSORLINK_CONFIG`, then individual environment overrides.

use core::fmt;
use core::str::FromStr;
use core::time::Duration;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Environment keys ---
pub const ENV_CONFIG_FILE: &str = "SENSORLINK_CONFIG";
pub const ENV_DEVICE_ADDRESS: &str = "SENSORLINK_DEVICE_ADDRESS";
pub const ENV_CHARACTERISTIC_UUID: &str = "SENSORLINK_CHARACTERISTIC_UUID";
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "SENSORLINK_CONNECT_TIMEOUT_SECS";
pub const ENV_OUTPUT: &str = "SENSORLINK_OUTPUT";

/// Sensor node MAC the monitor talks to out of the box.
pub const DEFAULT_DEVICE_ADDRESS: &str = "98:88:E0:10:1F:2E";
/// Sensor-data characteristic (read + notify) on the node.
pub const DEFAULT_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x12345678_1234_5678_1234_56789abcdef1);
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;
const MAX_CONNECT_TIMEOUT_SECS: u64 = 300;

/// How readings are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Multi-line block per reading on stdout.
    #[default]
    Pretty,
    /// One structured log line per reading.
    Log,
}

impl FromStr for OutputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "log" => Ok(Self::Log),
            other => Err(ConfigError::invalid(
                "output",
                format!("expected 'pretty' or 'log', got '{other}'"),
            )),
        }
    }
}

/// Everything the session manager needs to know about its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// BLE MAC of the peripheral (`AA:BB:CC:DD:EE:FF`).
    pub device_address: String,
    /// Characteristic to subscribe to.
    pub characteristic_uuid: Uuid,
    /// Upper bound on link establishment (seconds).
    pub connect_timeout_secs: u64,
    /// Presenter selection for the binary.
    pub output: OutputMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_address: DEFAULT_DEVICE_ADDRESS.to_owned(),
            characteristic_uuid: DEFAULT_CHARACTERISTIC_UUID,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            output: OutputMode::Pretty,
        }
    }
}

impl SessionConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup (the environment in production,
    /// a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(ENV_CONFIG_FILE) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.  Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&text)
    }

    /// Parse a JSON config document.  Missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_overrides(
        &mut self,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(addr) = lookup(ENV_DEVICE_ADDRESS) {
            self.device_address = addr.trim().to_owned();
        }
        if let Some(raw) = lookup(ENV_CHARACTERISTIC_UUID) {
            self.characteristic_uuid = Uuid::parse_str(raw.trim())
                .map_err(|e| ConfigError::invalid("characteristic_uuid", e.to_string()))?;
        }
        if let Some(raw) = lookup(ENV_CONNECT_TIMEOUT_SECS) {
            self.connect_timeout_secs = raw.trim().parse().map_err(|_| {
                ConfigError::invalid("connect_timeout_secs", format!("not a number: '{raw}'"))
            })?;
        }
        if let Some(raw) = lookup(ENV_OUTPUT) {
            self.output = raw.parse()?;
        }
        Ok(())
    }

    /// Reject values the session manager cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_mac_address(&self.device_address) {
            return Err(ConfigError::invalid(
                "device_address",
                format!("expected six colon-separated hex octets, got '{}'", self.device_address),
            ));
        }
        if !(1..=MAX_CONNECT_TIMEOUT_SECS).contains(&self.connect_timeout_secs) {
            return Err(ConfigError::invalid(
                "connect_timeout_secs",
                format!(
                    "must be 1..={MAX_CONNECT_TIMEOUT_SECS}, got {}",
                    self.connect_timeout_secs
                ),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn is_mac_address(s: &str) -> bool {
    let octets: Vec<&str> = s.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.bytes().all(|b| b.is_ascii_hexdigit()))
}

// ───────────────────────────────────────────────────────────────
// Error type
// ───────────────────────────────────────────────────────────────

/// Errors from loading or validating a [`SessionConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The config file could not be read.
    Io { path: String, reason: String },
    /// The config file is not valid JSON for this schema.
    Parse(String),
    /// A field failed validation.  `key` names the field.
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, reason } => write!(f, "cannot read {path}: {reason}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::Invalid { key, reason } => write!(f, "invalid {key}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}
