//! Application core — session lifecycle and notification handling, zero I/O.
//!
//! All interaction with the Bluetooth stack and the operator's screen
//! happens through **port traits** defined in [`ports`], keeping this layer
//! fully testable without a radio.

pub mod channels;
pub mod events;
pub mod ports;
pub mod session;
pub mod sink;
