//! Log-based presenter adapter.
//!
//! Implements [`Presenter`] by writing one structured line per reading to
//! the `log` facade.  Useful when output is captured by a service manager
//! rather than watched on a terminal.

use log::{info, warn};

use crate::app::ports::{Presenter, RawPayload};
use crate::payload::SensorRecord;

/// Adapter that logs every reading and diagnostic.
#[derive(Debug, Default)]
pub struct LogPresenter;

impl LogPresenter {
    pub fn new() -> Self {
        Self
    }
}

impl Presenter for LogPresenter {
    fn display_record(&mut self, r: &SensorRecord) {
        info!(
            "READING | T={:.1}\u{00b0}C | accel=({:+.2}, {:+.2}, {:+.2}) m/s\u{00b2} | batt={:.2}V",
            r.temperature_c, r.accel_x, r.accel_y, r.accel_z, r.battery_v,
        );
    }

    fn display_error(&mut self, message: &str, raw: RawPayload<'_>) {
        warn!("PAYLOAD | {message} | raw={raw}");
    }
}
