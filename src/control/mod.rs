//! Actuator control loops.

pub mod pump;
