//! Fuzz target: `payload::decode`
//!
//! Drives arbitrary byte sequences into the decoder and asserts that it
//! never panics, is deterministic, and that every failure carries the
//! original payload back unchanged.
//!
//! cargo fuzz run fuzz_payload_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use sensorlink::payload::{self, DecodeError, SensorRecord};

fuzz_target!(|data: &[u8]| {
    let first = payload::decode(data);
    // Debug output compares NaN readings as equal.
    assert_eq!(
        format!("{first:?}"),
        format!("{:?}", payload::decode(data)),
        "decode must be deterministic"
    );

    match first {
        Ok(record) if is_finite(&record) => {
            // Anything finite that decodes re-encodes to something that
            // decodes to the same values.
            let wire = payload::encode(&record);
            assert_eq!(payload::decode(wire.as_bytes()), Ok(record));
        }
        Ok(_) => {}
        Err(DecodeError::InvalidEncoding(bytes) | DecodeError::UnexpectedError { bytes, .. }) => {
            assert_eq!(bytes, data);
        }
        Err(DecodeError::MalformedJson(text) | DecodeError::MissingField { text, .. }) => {
            assert_eq!(text.as_bytes(), data);
        }
    }
});


fn is_finite(r: &SensorRecord) -> bool {
    [r.temperature_c, r.accel_x, r.accel_y, r.accel_z, r.battery_v]
        .iter()
        .all(|v| v.is_finite())
}
