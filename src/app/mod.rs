//! Application core: pure domain logic, zero I/O.
//!
//! Holds the top-off rules: measurement scheduling, alarm evaluation, pump
//! sequencing, and configuration edits.  All interaction with hardware
//! happens through **port traits** defined in [`ports`], keeping this layer
//! fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
