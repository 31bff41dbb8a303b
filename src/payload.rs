//! Sensor payload codec.
//!
//! Each notification carries one UTF-8 JSON object:
//!
//! ```text
//! {"temp":23.5,"ax":0.01,"ay":-9.8,"az":0.02,"batt":3.91}
//! ```
//!
//! [`decode`] validates in a fixed order and stops at the first problem:
//!
//! 1. UTF-8            → [`DecodeError::InvalidEncoding`]
//! 2. JSON syntax      → [`DecodeError::MalformedJson`]
//! 3. required keys    → [`DecodeError::MissingField`] / [`DecodeError::UnexpectedError`]
//!
//! Values pass through unchanged: no unit conversion, no range checks.
//! The bare literals `NaN`, `Infinity` and `-Infinity` are accepted as
//! numbers.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Required keys, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 5] = ["temp", "ax", "ay", "az", "batt"];

/// One decoded reading from the sensor node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Die / ambient temperature (°C).
    #[serde(rename = "temp")]
    pub temperature_c: f64,
    /// Acceleration X axis (m/s²).
    #[serde(rename = "ax")]
    pub accel_x: f64,
    /// Acceleration Y axis (m/s²).
    #[serde(rename = "ay")]
    pub accel_y: f64,
    /// Acceleration Z axis (m/s²).
    #[serde(rename = "az")]
    pub accel_z: f64,
    /// Battery terminal voltage (V).
    #[serde(rename = "batt")]
    pub battery_v: f64,
}

/// Why a payload could not be turned into a [`SensorRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Payload bytes are not valid UTF-8.
    InvalidEncoding(Vec<u8>),
    /// Text is not valid JSON.
    MalformedJson(String),
    /// JSON parsed but the first required key in check order is absent.
    MissingField { field: &'static str, text: String },
    /// Any other failure (non-object document, non-numeric value).
    UnexpectedError { description: String, bytes: Vec<u8> },
}

impl DecodeError {
    /// Short stable label, used for statistics and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEncoding(_) => "invalid_encoding",
            Self::MalformedJson(_) => "malformed_json",
            Self::MissingField { .. } => "missing_field",
            Self::UnexpectedError { .. } => "unexpected",
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEncoding(_) => write!(f, "invalid UTF-8 payload"),
            Self::MalformedJson(_) => write!(f, "invalid JSON"),
            Self::MissingField { field, .. } => write!(f, "missing key '{field}'"),
            Self::UnexpectedError { description, .. } => {
                write!(f, "unexpected payload error: {description}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Outcome of decoding one notification.
pub type DecodeOutcome = Result<SensorRecord, DecodeError>;

/// Decode one notification payload.  Total: never panics, whatever the input.
pub fn decode(bytes: &[u8]) -> DecodeOutcome {
    let Ok(text) = core::str::from_utf8(bytes) else {
        return Err(DecodeError::InvalidEncoding(bytes.to_vec()));
    };

    let (value, marked) =
        parse_json(text).map_err(|_| DecodeError::MalformedJson(text.to_owned()))?;

    let Value::Object(map) = &value else {
        return Err(DecodeError::UnexpectedError {
            description: format!("expected a JSON object, got {}", json_type_name(&value)),
            bytes: bytes.to_vec(),
        });
    };

    let mut fields = [0.0_f64; REQUIRED_FIELDS.len()];
    for (slot, key) in fields.iter_mut().zip(REQUIRED_FIELDS) {
        let Some(raw) = map.get(key) else {
            return Err(DecodeError::MissingField {
                field: key,
                text: text.to_owned(),
            });
        };
        *slot = as_number(raw, marked).ok_or_else(|| DecodeError::UnexpectedError {
            description: format!("key '{key}' is {}, expected a number", json_type_name(raw)),
            bytes: bytes.to_vec(),
        })?;
    }

    let [temperature_c, accel_x, accel_y, accel_z, battery_v] = fields;
    Ok(SensorRecord {
        temperature_c,
        accel_x,
        accel_y,
        accel_z,
        battery_v,
    })
}

// ---------------------------------------------------------------------------
// Non-finite literals
// ---------------------------------------------------------------------------

/// Literals outside strict JSON that still count as numbers.  No entry is a
/// prefix of another.
const NON_FINITE: [(&str, f64); 3] = [
    ("-Infinity", f64::NEG_INFINITY),
    ("Infinity", f64::INFINITY),
    ("NaN", f64::NAN),
];

/// Parse strict JSON, falling back to a pass that rewrites non-finite
/// literals into marker strings.  The flag is set when markers are present.
fn parse_json(text: &str) -> Result<(Value, bool), serde_json::Error> {
    match serde_json::from_str(text) {
        Ok(value) => Ok((value, false)),
        Err(strict) => match mark_non_finite(text) {
            Some(marked) => serde_json::from_str(&marked)
                .map(|value| (value, true))
                .map_err(|_| strict),
            None => Err(strict),
        },
    }
}

/// Replace every `NaN` / `Infinity` / `-Infinity` outside a string literal
/// with `"\u0000<literal>"`.  `None` when there is nothing to replace.
fn mark_non_finite(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + 16);
    let mut copied = 0;
    let mut i = 0;
    let mut in_string = false;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 2,
            b'"' => {
                in_string = !in_string;
                i += 1;
            }
            _ if !in_string => {
                match NON_FINITE
                    .iter()
                    .find(|(literal, _)| bytes[i..].starts_with(literal.as_bytes()))
                {
                    Some((literal, _)) => {
                        out.push_str(&text[copied..i]);
                        out.push_str("\"\\u0000");
                        out.push_str(literal);
                        out.push('"');
                        i += literal.len();
                        copied = i;
                    }
                    None => i += 1,
                }
            }
            _ => i += 1,
        }
    }

    if copied == 0 {
        return None;
    }
    out.push_str(&text[copied..]);
    Some(out)
}

fn as_number(raw: &Value, marked: bool) -> Option<f64> {
    match raw {
        Value::String(s) if marked => {
            let literal = s.strip_prefix('\0')?;
            NON_FINITE
                .iter()
                .find(|(name, _)| *name == literal)
                .map(|(_, value)| *value)
        }
        _ => raw.as_f64(),
    }
}

/// Encode a record in the node's wire format.
///
/// Non-finite values have no JSON representation and come out as `null`,
/// which [`decode`] then rejects.
pub fn encode(record: &SensorRecord) -> String {
    // Serialising five f64 fields into a String cannot fail.
    serde_json::to_string(record).unwrap_or_default()
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
