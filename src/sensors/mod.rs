//! Sensor subsystem.
//!
//! - [`range_finder`]: non-blocking ultrasonic burst sampler with median.
//! - [`level_filter`]: slew-limited EMA plus level/volume conversions.
//! - [`water_presence`]: float switch at the pump inlet.

pub mod level_filter;
pub mod range_finder;
pub mod water_presence;
