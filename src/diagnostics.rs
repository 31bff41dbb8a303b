//! Run statistics.
//!
//! Counts what the notification sink saw during one session so the
//! operator gets a one-line summary on exit.

use core::fmt;

use crate::payload::DecodeError;

/// Per-session counters.  Never reset; a session is one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub records: u64,
    pub invalid_encoding: u64,
    pub malformed_json: u64,
    pub missing_field: u64,
    pub unexpected: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ok(&mut self) {
        self.records += 1;
    }

    pub fn record_failure(&mut self, err: &DecodeError) {
        let counter = match err {
            DecodeError::InvalidEncoding(_) => &mut self.invalid_encoding,
            DecodeError::MalformedJson(_) => &mut self.malformed_json,
            DecodeError::MissingField { .. } => &mut self.missing_field,
            DecodeError::UnexpectedError { .. } => &mut self.unexpected,
        };
        *counter += 1;
    }

    /// Total decode failures of any kind.
    pub fn decode_failures(&self) -> u64 {
        self.invalid_encoding + self.malformed_json + self.missing_field + self.unexpected
    }

    /// Every notification the sink handled.
    pub fn notifications(&self) -> u64 {
        self.records + self.decode_failures()
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} notifications, {} readings, {} rejected \
             (encoding={} json={} missing={} other={})",
            self.notifications(),
            self.records,
            self.decode_failures(),
            self.invalid_encoding,
            self.malformed_json,
            self.missing_field,
            self.unexpected,
        )
    }
}
