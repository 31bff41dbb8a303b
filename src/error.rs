//! Unified error types for the SensorLink monitor.
//!
//! A single [`Error`] enum that every fatal path converts into, so the
//! binary's top-level handling stays uniform.  Payload decode failures are
//! deliberately absent: they live in [`crate::payload::DecodeError`] and
//! never leave the notification sink.

use core::fmt;
use core::time::Duration;

use uuid::Uuid;

use crate::config::ConfigError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fatal failure of a run funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// The BLE session could not be established or was lost.
    Session(SessionError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Session(e) => write!(f, "session: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Session(e) => Some(e),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<SessionError> for Error {
    fn from(e: SessionError) -> Self {
        Self::Session(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failures reported by a [`BleTransport`](crate::app::ports::BleTransport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The host has no usable Bluetooth adapter.
    NoAdapter,
    /// The configured device address could not be parsed.
    InvalidAddress(String),
    /// The peripheral was not reachable within the connect timeout.
    ConnectTimeout(Duration),
    /// The peripheral disappeared before a link was established.
    DeviceNotFound,
    /// The connected peripheral does not expose the characteristic.
    CharacteristicNotFound(Uuid),
    /// The characteristic exists but does not support notifications.
    NotNotifiable(Uuid),
    /// An operation needed a live link and there was none.
    NotConnected,
    /// Anything the BLE backend reported that has no finer classification.
    Backend(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAdapter => write!(f, "no Bluetooth adapter available"),
            Self::InvalidAddress(addr) => write!(f, "invalid device address '{addr}'"),
            Self::ConnectTimeout(t) => write!(f, "connect timed out after {}s", t.as_secs()),
            Self::DeviceNotFound => write!(f, "device not found"),
            Self::CharacteristicNotFound(uuid) => write!(f, "characteristic {uuid} not found"),
            Self::NotNotifiable(uuid) => {
                write!(f, "characteristic {uuid} does not support notifications")
            }
            Self::NotConnected => write!(f, "not connected"),
            Self::Backend(msg) => write!(f, "BLE backend: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

// ---------------------------------------------------------------------------
// Session errors
// ---------------------------------------------------------------------------

/// Transport-fatal failures of a session.  None of these are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Link establishment failed or timed out.
    ConnectFailed(TransportError),
    /// Notifications could not be enabled on the characteristic.
    SubscribeFailed(TransportError),
    /// The link dropped while notifications were active.
    LinkLost(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed(e) => write!(f, "connect failed: {e}"),
            Self::SubscribeFailed(e) => write!(f, "enabling notifications failed: {e}"),
            Self::LinkLost(reason) => write!(f, "link lost: {reason}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConnectFailed(e) | Self::SubscribeFailed(e) => Some(e),
            Self::LinkLost(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
