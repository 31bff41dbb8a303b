//! Console presenter adapter.
//!
//! Renders each reading as a framed block on the output writer and each
//! payload diagnostic as a two-line warning on the error writer:
//!
//! ```text
//! ==================================================
//! SENSOR DATA
//! ==================================================
//! Temperature:   23.5 °C
//! Accelerometer:
//!      X:   +0.01 m/s²
//!      Y:   -9.80 m/s²
//!      Z:   +0.02 m/s²
//! Battery:       3.91 V
//! ==================================================
//! ```

use std::io::{self, Stderr, Stdout, Write};

use log::debug;

use crate::app::ports::{Presenter, RawPayload};
use crate::payload::SensorRecord;

const RULE: &str = "==================================================";

pub struct ConsolePresenter<W, E> {
    out: W,
    err: E,
}

impl ConsolePresenter<Stdout, Stderr> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<W: Write, E: Write> ConsolePresenter<W, E> {
    pub fn new(out: W, err: E) -> Self {
        Self { out, err }
    }

    pub fn into_inner(self) -> (W, E) {
        (self.out, self.err)
    }
}

impl<W: Write, E: Write> Presenter for ConsolePresenter<W, E> {
    fn display_record(&mut self, r: &SensorRecord) {
        let res = writeln!(
            self.out,
            "\n{RULE}\nSENSOR DATA\n{RULE}\n\
             Temperature:  {:>5.1} \u{00b0}C\n\
             Accelerometer:\n\
             \x20    X: {:+7.2} m/s\u{00b2}\n\
             \x20    Y: {:+7.2} m/s\u{00b2}\n\
             \x20    Z: {:+7.2} m/s\u{00b2}\n\
             Battery:       {:.2} V\n{RULE}",
            r.temperature_c, r.accel_x, r.accel_y, r.accel_z, r.battery_v,
        )
        .and_then(|()| self.out.flush());
        if let Err(e) = res {
            debug!("console write failed: {e}");
        }
    }

    fn display_error(&mut self, message: &str, raw: RawPayload<'_>) {
        let res = writeln!(self.err, "warning: {message}\n    raw: {raw}")
            .and_then(|()| self.err.flush());
        if let Err(e) = res {
            debug!("console write failed: {e}");
        }
    }
}
