//! Fuzz target: `NotificationSink::on_notification`
//!
//! Splits the input into notifications on `0x00` and feeds them through a
//! sink.  Every notification must produce exactly one presenter call.
//!
//! cargo fuzz run fuzz_notification_sink

#![no_main]

use libfuzzer_sys::fuzz_target;
use sensorlink::app::ports::{Presenter, RawPayload};
use sensorlink::app::sink::NotificationSink;
use sensorlink::payload::SensorRecord;
use uuid::Uuid;

#[derive(Default)]
struct Count(u64);

impl Presenter for Count {
    fn display_record(&mut self, _record: &SensorRecord) {
        self.0 += 1;
    }

    fn display_error(&mut self, _message: &str, raw: RawPayload<'_>) {
        // Rendering the raw payload must not panic either.
        let _ = raw.to_string();
        self.0 += 1;
    }
}

fuzz_target!(|data: &[u8]| {
    let mut sink = NotificationSink::new(Count::default());
    let mut n = 0u64;
    for chunk in data.split(|b| *b == 0) {
        sink.on_notification(Uuid::nil(), chunk);
        n += 1;
    }
    assert_eq!(sink.presenter().0, n);
    assert_eq!(sink.stats().notifications(), n);
});
