//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                      |
//! |------------|--------------|----------------------------------|
//! | `nvs`      | StoragePort  | NVS blob / in-memory region      |
//! | `time`     | TimePort     | ESP32 system timer               |
//! | `log_sink` | EventSink    | Serial log output                |
//! | `bridge`   | EventSink    | `embassy-sync` channels to a UI  |
//!
//! GPIO-backed ports live next to their hardware: the float switch and
//! ranger in [`crate::sensors`], the pump relay in [`crate::drivers`].

pub mod bridge;
pub mod log_sink;
pub mod nvs;
pub mod time;
