//! Host BLE transport adapter.
//!
//! Implements [`BleTransport`] on top of `btleplug`, which wraps BlueZ on
//! Linux, CoreBluetooth on macOS and WinRT on Windows.
//!
//! ## Address resolution
//!
//! Host stacks only hand out a connectable handle for peripherals they
//! have seen advertise.  `connect` therefore checks the adapter's known
//! peripherals first and otherwise runs a passive scan until the
//! configured address shows up, all inside the connect timeout.  The scan
//! is stopped before the link is opened, and again by `disconnect` if a
//! connect attempt was abandoned mid-scan.
//!
//! The peripheral is held from the moment a connect is attempted, so a
//! failed, timed-out or dropped attempt still leaves a handle that
//! `disconnect` can close.
//!
//! ## Delivery
//!
//! After subscribing, a tokio task forwards `ValueNotification`s for the
//! target characteristic onto the session's event channel and watches the
//! adapter's event stream for the peripheral's disconnect, which it
//! reports as a final `LinkLost`.

use core::str::FromStr;
use core::time::Duration;
use std::pin::Pin;
use std::sync::Arc;

use btleplug::api::{
    BDAddr, Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _,
    ScanFilter, ValueNotification,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures_lite::{Stream, StreamExt};
use log::{debug, info, trace};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::app::channels::EventChannel;
use crate::app::events::TransportEvent;
use crate::app::ports::BleTransport;
use crate::error::TransportError;

type NotificationStream = Pin<Box<dyn Stream<Item = ValueNotification> + Send>>;
type CentralEventStream = Pin<Box<dyn Stream<Item = CentralEvent> + Send>>;

fn backend(e: btleplug::Error) -> TransportError {
    TransportError::Backend(e.to_string())
}

/// btleplug-backed link to a single peripheral.
#[derive(Default)]
pub struct BtleplugTransport {
    adapter: Option<Adapter>,
    peripheral: Option<Peripheral>,
    subscribed: Option<Characteristic>,
    forwarder: Option<JoinHandle<()>>,
    scanning: bool,
}

impl BtleplugTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn stop_forwarder(&mut self) {
        if let Some(task) = self.forwarder.take() {
            task.abort();
        }
    }

    async fn stop_scan(&mut self) {
        if !core::mem::take(&mut self.scanning) {
            return;
        }
        if let Some(adapter) = &self.adapter {
            if let Err(e) = adapter.stop_scan().await {
                debug!("stop_scan: {e}");
            }
        }
    }

    /// Resolve, connect and discover.  Every step that leaves state behind
    /// records it on `self` first.
    async fn open_link(&mut self, adapter: &Adapter, target: BDAddr) -> Result<(), TransportError> {
        self.scanning = true;
        let found = resolve(adapter, target).await;
        self.stop_scan().await;
        let peripheral = found?;

        self.peripheral = Some(peripheral.clone());
        peripheral.connect().await.map_err(backend)?;
        peripheral.discover_services().await.map_err(backend)
    }

    /// Close whatever a failed connect attempt left open.
    async fn abandon(&mut self) {
        self.stop_scan().await;
        if let Some(peripheral) = self.peripheral.take() {
            if let Err(e) = peripheral.disconnect().await {
                debug!("disconnect after failed connect: {e}");
            }
        }
        self.adapter = None;
    }
}

impl Drop for BtleplugTransport {
    fn drop(&mut self) {
        self.stop_forwarder();
    }
}

impl BleTransport for BtleplugTransport {
    async fn connect(&mut self, address: &str, timeout: Duration) -> Result<(), TransportError> {
        let target = BDAddr::from_str(address)
            .map_err(|_| TransportError::InvalidAddress(address.to_owned()))?;

        let manager = Manager::new().await.map_err(backend)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(backend)?
            .into_iter()
            .next()
            .ok_or(TransportError::NoAdapter)?;
        if let Ok(info) = adapter.adapter_info().await {
            debug!("using adapter {info}");
        }

        self.adapter = Some(adapter.clone());
        let attempt = tokio::time::timeout(timeout, self.open_link(&adapter, target))
            .await
            .unwrap_or(Err(TransportError::ConnectTimeout(timeout)));
        if let Err(e) = attempt {
            self.abandon().await;
            return Err(e);
        }

        if let Some(peripheral) = &self.peripheral {
            info!(
                "link up to {} ({} characteristics)",
                peripheral.address(),
                peripheral.characteristics().len()
            );
        }
        Ok(())
    }

    async fn enable_notifications(
        &mut self,
        characteristic: Uuid,
        events: Arc<EventChannel>,
    ) -> Result<(), TransportError> {
        let (Some(adapter), Some(peripheral)) = (&self.adapter, &self.peripheral) else {
            return Err(TransportError::NotConnected);
        };

        let target = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == characteristic)
            .ok_or(TransportError::CharacteristicNotFound(characteristic))?;
        if !target
            .properties
            .intersects(CharPropFlags::NOTIFY | CharPropFlags::INDICATE)
        {
            return Err(TransportError::NotNotifiable(characteristic));
        }

        // Open both streams before subscribing so the first value is not missed.
        let notifications = peripheral.notifications().await.map_err(backend)?;
        let central_events = adapter.events().await.map_err(backend)?;
        peripheral.subscribe(&target).await.map_err(backend)?;

        self.forwarder = Some(tokio::spawn(forward(
            characteristic,
            peripheral.id(),
            notifications,
            central_events,
            events,
        )));
        self.subscribed = Some(target);
        Ok(())
    }

    async fn disable_notifications(&mut self, characteristic: Uuid) -> Result<(), TransportError> {
        self.stop_forwarder();
        let peripheral = self.peripheral.as_ref().ok_or(TransportError::NotConnected)?;
        let target = match self.subscribed.take() {
            Some(c) if c.uuid == characteristic => c,
            _ => peripheral
                .characteristics()
                .into_iter()
                .find(|c| c.uuid == characteristic)
                .ok_or(TransportError::CharacteristicNotFound(characteristic))?,
        };
        peripheral.unsubscribe(&target).await.map_err(backend)
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.stop_forwarder();
        self.stop_scan().await;
        self.subscribed = None;
        self.adapter = None;
        let peripheral = self.peripheral.take().ok_or(TransportError::NotConnected)?;
        peripheral.disconnect().await.map_err(backend)
    }
}

/// Find the peripheral with `target` address, scanning if the adapter does
/// not know it yet.
async fn resolve(adapter: &Adapter, target: BDAddr) -> Result<Peripheral, TransportError> {
    let mut events = adapter.events().await.map_err(backend)?;
    adapter
        .start_scan(ScanFilter::default())
        .await
        .map_err(backend)?;

    for p in adapter.peripherals().await.map_err(backend)? {
        if p.address() == target {
            debug!("{target} already known to adapter");
            return Ok(p);
        }
    }

    while let Some(event) = events.next().await {
        if let CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) = event {
            let p = adapter.peripheral(&id).await.map_err(backend)?;
            if p.address() == target {
                debug!("{target} seen during scan");
                return Ok(p);
            }
        }
    }
    Err(TransportError::DeviceNotFound)
}

/// Pump notifications onto `events` until the link goes away.
async fn forward(
    characteristic: Uuid,
    peripheral: PeripheralId,
    mut notifications: NotificationStream,
    mut central_events: CentralEventStream,
    events: Arc<EventChannel>,
) {
    let reason = loop {
        tokio::select! {
            n = notifications.next() => match n {
                Some(n) if n.uuid == characteristic => {
                    events
                        .send(TransportEvent::Notification { source: n.uuid, payload: n.value })
                        .await;
                }
                Some(n) => trace!("ignoring notification from {}", n.uuid),
                None => break "notification stream closed".to_owned(),
            },
            e = central_events.next() => match e {
                Some(CentralEvent::DeviceDisconnected(id)) if id == peripheral => {
                    break "peripheral disconnected".to_owned();
                }
                Some(_) => {}
                None => break "adapter event stream closed".to_owned(),
            },
        }
    };
    events.send(TransportEvent::LinkLost { reason }).await;
}
