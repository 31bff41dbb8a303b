//! SensorLink — Main Entry Point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  BtleplugTransport        ConsolePresenter / LogPresenter    │
//! │  (BleTransport)           (Presenter)                        │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  SessionManager ──▶ NotificationSink ──▶ payload codec │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  Ctrl+C ──▶ StopSignal                                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};

use sensorlink::adapters::ble_transport::BtleplugTransport;
use sensorlink::adapters::console::ConsolePresenter;
use sensorlink::adapters::log_sink::LogPresenter;
use sensorlink::app::channels::{self, StopSignal};
use sensorlink::app::ports::Presenter;
use sensorlink::app::session::SessionManager;
use sensorlink::app::sink::NotificationSink;
use sensorlink::config::{OutputMode, SessionConfig};
use sensorlink::error::Error;

/// Exit status used when a second Ctrl+C abandons teardown.
const FORCED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("SensorLink v{}", env!("CARGO_PKG_VERSION"));

    let config = SessionConfig::load()
        .map_err(Error::from)
        .context("loading configuration")?;
    info!(
        "target {} characteristic {} output {:?}",
        config.device_address, config.characteristic_uuid, config.output
    );

    let stop = channels::stop_signal();
    watch_ctrl_c(Arc::clone(&stop));

    let output = config.output;
    match output {
        OutputMode::Pretty => run(config, ConsolePresenter::stdout(), &stop).await,
        OutputMode::Log => run(config, LogPresenter::new(), &stop).await,
    }
}

async fn run<P: Presenter>(config: SessionConfig, presenter: P, stop: &StopSignal) -> Result<()> {
    let address = config.device_address.clone();
    let mut manager = SessionManager::new(config, BtleplugTransport::new());
    let mut sink = NotificationSink::new(presenter);

    manager
        .run(&mut sink, stop)
        .await
        .map_err(Error::from)
        .with_context(|| format!("BLE session with {address}"))?;

    info!("bye");
    Ok(())
}

/// First Ctrl+C requests a clean stop; a second one exits immediately.
fn watch_ctrl_c(stop: Arc<StopSignal>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl+C received, stopping session");
        stop.signal(());

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("second Ctrl+C, exiting without teardown");
            std::process::exit(FORCED_EXIT_CODE);
        }
    });
}
