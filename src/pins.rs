//! GPIO assignments for the HydroSense controller board.
//!
//! Single source of truth: `main` builds every pin driver from these
//! numbers rather than hard-coding them.

// ---------------------------------------------------------------------------
// Ultrasonic range finder (JSN-SR04T, mounted in the tank lid)
// ---------------------------------------------------------------------------

/// Digital output: 10 µs HIGH pulse starts a sounding.
pub const RANGE_TRIGGER_GPIO: i32 = 5;
/// Digital input: HIGH for the echo round trip.  5 V sensor, level-shifted.
pub const RANGE_ECHO_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// Float switch at the pump inlet
// ---------------------------------------------------------------------------

/// Digital input with internal pull-up.  LOW = water present.
pub const FLOAT_SWITCH_GPIO: i32 = 19;

// ---------------------------------------------------------------------------
// Pump relay
// ---------------------------------------------------------------------------

/// Digital output: HIGH energises the relay coil.  Boots LOW.
pub const PUMP_RELAY_GPIO: i32 = 23;
