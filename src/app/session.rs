//! Session manager and the BLE connection lifecycle.
//!
//! ```text
//!  Disconnected ──▶ Connecting ──▶ Connected ──▶ NotifyingEnabled
//!       ▲                                              │ stop
//!       └──────────────── Disconnecting ◀──────────────┘
//! ```
//!
//! [`SessionManager::run`] drives one pass through the cycle.  In the
//! steady state it waits on the event channel and the stop signal
//! together; nothing is polled and nothing times out.  A raised stop is
//! honoured before the next event, however busy the channel is, and at
//! most one channel's worth of already-queued events is handled before
//! teardown.  A stop always attempts both `disable_notifications` and
//! `disconnect`, in that order, whatever the first one returns.
//!
//! Fatal paths (connect failure, subscribe failure, link loss) release the
//! link on a best-effort basis and return a [`SessionError`].  Nothing is
//! retried.

use core::fmt;
use std::sync::Arc;

use futures_lite::future;
use log::{debug, info, warn};
use uuid::Uuid;

use super::channels::{self, EVENT_DEPTH, EventChannel, StopSignal};
use super::events::TransportEvent;
use super::ports::{BleTransport, Presenter};
use super::sink::NotificationSink;
use crate::config::SessionConfig;
use crate::error::{SessionError, TransportError};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    NotifyingEnabled,
    Disconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::NotifyingEnabled => "notifying",
            Self::Disconnecting => "disconnecting",
        })
    }
}

/// Result of racing a lifecycle step against the stop signal.
enum Step<T> {
    Done(T),
    Stopped,
}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Owns the transport (and so the link) for the whole run.
pub struct SessionManager<T> {
    config: SessionConfig,
    transport: T,
    events: Arc<EventChannel>,
    state: SessionState,
    notifying: bool,
}

impl<T: BleTransport> SessionManager<T> {
    pub fn new(config: SessionConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            events: channels::event_channel(),
            state: SessionState::Disconnected,
            notifying: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the peripheral is currently delivering notifications to us.
    pub fn notifications_active(&self) -> bool {
        self.notifying
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run one session: connect, subscribe, feed `sink` until `stop` fires
    /// or the link fails, then tear down.
    ///
    /// `Ok(())` means a clean operator-initiated exit, including one
    /// whose teardown calls reported errors.
    pub async fn run<P: Presenter>(
        &mut self,
        sink: &mut NotificationSink<P>,
        stop: &StopSignal,
    ) -> Result<(), SessionError> {
        let outcome = self.run_cycle(sink, stop).await;
        info!("session summary: {}", sink.stats());
        outcome
    }

    async fn run_cycle<P: Presenter>(
        &mut self,
        sink: &mut NotificationSink<P>,
        stop: &StopSignal,
    ) -> Result<(), SessionError> {
        let characteristic = self.config.characteristic_uuid;

        // ── Connect ───────────────────────────────────────────
        self.transition(SessionState::Connecting);
        let address = self.config.device_address.clone();
        let timeout = self.config.connect_timeout();
        info!("connecting to {address} (timeout {}s)", timeout.as_secs());

        let transport = &mut self.transport;
        match until_stopped(transport.connect(&address, timeout), stop).await {
            Step::Stopped => {
                info!("stop requested while connecting");
                self.release_link().await;
                return Ok(());
            }
            Step::Done(Err(e)) => {
                warn!("connecting to {address} failed: {e}");
                self.release_link().await;
                return Err(SessionError::ConnectFailed(e));
            }
            Step::Done(Ok(())) => self.transition(SessionState::Connected),
        }
        info!("connected to {address}");

        // ── Subscribe ─────────────────────────────────────────
        let events = Arc::clone(&self.events);
        let transport = &mut self.transport;
        match until_stopped(transport.enable_notifications(characteristic, events), stop).await {
            Step::Stopped => {
                info!("stop requested while enabling notifications");
                self.teardown(characteristic).await;
                return Ok(());
            }
            Step::Done(Err(e)) => {
                warn!("enabling notifications on {characteristic} failed: {e}");
                self.release_link().await;
                return Err(SessionError::SubscribeFailed(e));
            }
            Step::Done(Ok(())) => {
                self.notifying = true;
                self.transition(SessionState::NotifyingEnabled);
            }
        }
        info!("notifications enabled on {characteristic}, receiving (Ctrl+C to stop)");

        // ── Steady state ──────────────────────────────────────
        loop {
            let events = &*self.events;
            match stop_first(events.receive(), stop).await {
                Step::Done(TransportEvent::Notification { source, payload }) => {
                    sink.on_notification(source, &payload);
                }
                Step::Done(TransportEvent::LinkLost { reason }) => {
                    warn!("link to {address} lost: {reason}");
                    self.notifying = false;
                    self.release_link().await;
                    return Err(SessionError::LinkLost(reason));
                }
                Step::Stopped => break,
            }
        }

        info!("stopping");
        self.drain_queued(sink);
        self.teardown(characteristic).await;
        info!("disconnected from {address}");
        Ok(())
    }

    /// Handle what was already queued when the stop won, bounded by the
    /// channel depth so a busy producer cannot hold teardown off.
    fn drain_queued<P: Presenter>(&mut self, sink: &mut NotificationSink<P>) {
        for _ in 0..EVENT_DEPTH {
            match self.events.try_receive() {
                Ok(TransportEvent::Notification { source, payload }) => {
                    sink.on_notification(source, &payload);
                }
                Ok(TransportEvent::LinkLost { reason }) => {
                    debug!("link lost while stopping: {reason}");
                    break;
                }
                Err(_) => break,
            }
        }
    }

    // ── Teardown ──────────────────────────────────────────────

    /// Disable notifications, then disconnect.  Both are always attempted.
    async fn teardown(&mut self, characteristic: Uuid) {
        self.transition(SessionState::Disconnecting);
        let disabled = self.transport.disable_notifications(characteristic).await;
        log_teardown("disabling notifications", disabled);
        self.notifying = false;
        log_teardown("disconnect", self.transport.disconnect().await);
        self.transition(SessionState::Disconnected);
    }

    /// Disconnect only; used when no subscription is in place.
    async fn release_link(&mut self) {
        self.transition(SessionState::Disconnecting);
        log_teardown("disconnect", self.transport.disconnect().await);
        self.transition(SessionState::Disconnected);
    }

    fn transition(&mut self, to: SessionState) {
        if self.state != to {
            info!("STATE | {} -> {}", self.state, to);
            self.state = to;
        }
    }
}

/// Race a lifecycle step against `stop`.  A step that is already complete
/// wins, so a finished connect or subscribe is always torn down in full.
async fn until_stopped<F: Future>(step: F, stop: &StopSignal) -> Step<F::Output> {
    future::or(async { Step::Done(step.await) }, async {
        stop.wait().await;
        Step::Stopped
    })
    .await
}

/// Race a steady-state receive against `stop`.  A raised stop wins even
/// when an event is ready.
async fn stop_first<F: Future>(step: F, stop: &StopSignal) -> Step<F::Output> {
    future::or(
        async {
            stop.wait().await;
            Step::Stopped
        },
        async { Step::Done(step.await) },
    )
    .await
}

fn log_teardown(what: &str, result: Result<(), TransportError>) {
    match result {
        Ok(()) => {}
        Err(TransportError::NotConnected) => debug!("{what}: no link to release"),
        Err(e) => warn!("{what} failed during teardown: {e}"),
    }
}
