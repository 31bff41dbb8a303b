//! Session communication channels.
//!
//! Uses `embassy-sync` primitives to bridge the transport's delivery task
//! with the session manager's receive loop.
//!
//! ```text
//! ┌──────────────┐ TransportEvent ┌────────────────┐
//! │  Transport   │───────────────▶│ SessionManager │
//! │  (producer)  │                │ (sole consumer)│
//! └──────────────┘                └────────────────┘
//!                                         ▲
//! ┌──────────────┐      stop              │
//! │ Ctrl+C task  │────────────────────────┘
//! └──────────────┘
//! ```

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use super::events::TransportEvent;

/// Channel depth for transport events.  Producers wait when it is full,
/// so this bounds memory, not delivery.
pub const EVENT_DEPTH: usize = 16;

/// Transport → session manager, FIFO.
pub type EventChannel = Channel<CriticalSectionRawMutex, TransportEvent, EVENT_DEPTH>;

/// Operator stop request.
pub type StopSignal = Signal<CriticalSectionRawMutex, ()>;

pub fn event_channel() -> Arc<EventChannel> {
    Arc::new(Channel::new())
}

pub fn stop_signal() -> Arc<StopSignal> {
    Arc::new(Signal::new())
}
