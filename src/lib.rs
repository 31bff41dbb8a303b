//! SensorLink BLE telemetry monitor library.
//!
//! Exposes the session core, payload codec and adapters for the binary,
//! integration tests and the fuzz harness.  The btleplug transport is
//! only built with the `host-ble` feature; everything else runs on any
//! host without a Bluetooth adapter.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod payload;
