//! Inbound transport events.
//!
//! A [`BleTransport`](super::ports::BleTransport) pushes these onto the
//! session's [`EventChannel`](super::channels::EventChannel).  The
//! [`SessionManager`](super::session::SessionManager) is the only consumer.

use uuid::Uuid;

/// Something the BLE link reported while notifications were active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The subscribed characteristic changed value.
    Notification { source: Uuid, payload: Vec<u8> },

    /// The link to the peripheral dropped.  Always the last event a
    /// transport sends for a session.
    LinkLost { reason: String },
}
