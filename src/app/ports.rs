//! Port traits — the hexagonal boundary between session logic and the outside world.
//!
//! ```text
//!   BleTransport ──▶ SessionManager ──▶ NotificationSink ──▶ Presenter
//! ```
//!
//! Driven adapters (btleplug, console, log) implement these traits.  The
//! [`SessionManager`](super::session::SessionManager) and
//! [`NotificationSink`](super::sink::NotificationSink) consume them via
//! generics, so the core never touches the Bluetooth stack directly.

use core::fmt;
use core::time::Duration;
use std::sync::Arc;

use uuid::Uuid;

use super::channels::EventChannel;
use crate::error::TransportError;
use crate::payload::SensorRecord;

// ───────────────────────────────────────────────────────────────
// Transport port (driven adapter: domain ↔ BLE stack)
// ───────────────────────────────────────────────────────────────

/// One BLE central link to one peripheral.
///
/// The session manager calls these strictly in lifecycle order and awaits
/// each to completion before the next.  Implementations are only ever
/// polled from a single task.
#[allow(async_fn_in_trait)]
pub trait BleTransport {
    /// Resolve `address` and establish a link within `timeout`.
    async fn connect(&mut self, address: &str, timeout: Duration) -> Result<(), TransportError>;

    /// Subscribe to `characteristic`.  From the moment this returns `Ok`
    /// every value change must be pushed onto `events` in arrival order,
    /// followed by a single [`LinkLost`](super::events::TransportEvent::LinkLost)
    /// if the link drops.
    async fn enable_notifications(
        &mut self,
        characteristic: Uuid,
        events: Arc<EventChannel>,
    ) -> Result<(), TransportError>;

    /// Stop delivery and unsubscribe.  No events are pushed afterwards.
    async fn disable_notifications(&mut self, characteristic: Uuid) -> Result<(), TransportError>;

    /// Release the link.
    async fn disconnect(&mut self) -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Presenter port (driven adapter: domain → operator)
// ───────────────────────────────────────────────────────────────

/// Renders decoded readings and payload diagnostics.
pub trait Presenter {
    fn display_record(&mut self, record: &SensorRecord);

    /// `raw` is the offending payload, as text when it was valid UTF-8.
    fn display_error(&mut self, message: &str, raw: RawPayload<'_>);
}

/// The original payload attached to a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawPayload<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
}

/// Text verbatim, bytes as lowercase hex.
impl fmt::Display for RawPayload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Bytes(bytes) => bytes.iter().try_for_each(|b| write!(f, "{b:02x}")),
        }
    }
}
