//! Actuator drivers and peripheral helpers.

pub mod pump;
pub mod watchdog;
