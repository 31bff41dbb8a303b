//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements    | Connects to                       |
//! |-----------------|---------------|-----------------------------------|
//! | `ble_transport` | BleTransport  | Host BLE stack via btleplug       |
//! | `console`       | Presenter     | stdout / stderr, multi-line       |
//! | `log_sink`      | Presenter     | `log` facade, one line per event  |

#[cfg(feature = "host-ble")]
pub mod ble_transport;
pub mod console;
pub mod log_sink;
