//! Persisted controller configuration.
//!
//! [`ConfigRecord`] holds every calibration and timing value that survives a
//! power cycle.  It is encoded field by field, little-endian, into a fixed
//! [`RECORD_LEN`]-byte image that ends in an XOR checksum:
//!
//! ```text
//!  0        1      2      4       6         8      10       12     14     16        18
//!  ┌───────┬──────┬──────┬───────┬─────────┬──────┬────────┬──────┬──────┬─────────┬─────┐
//!  │version│sound │ full │ empty │ reserve │ hyst │diameter│delay │ work │interval │ xor │
//!  │  u8   │  u8  │ u16  │  u16  │   u16   │ u16  │  u16   │ u16  │ u16  │   u16   │ u8  │
//!  └───────┴──────┴──────┴───────┴─────────┴──────┴────────┴──────┴──────┴─────────┴─────┘
//! ```
//!
//! Distances are millimetres from the sensor face, so a *larger* distance
//! means a *lower* water level.  Values change only through validated
//! [`ConfigField`] edits or a validated bulk replace.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Layout version written into byte 0.  Records with another version are
/// treated as unreadable.
pub const CONFIG_VERSION: u8 = 1;

/// Encoded size of a [`ConfigRecord`], checksum included.
pub const RECORD_LEN: usize = 19;

/// Closest distance the ultrasonic sensor can resolve (mm).
pub const MIN_SENSOR_RANGE_MM: u16 = 20;

/// Farthest distance the ultrasonic sensor can resolve (mm).
pub const MAX_SENSOR_RANGE_MM: u16 = 4000;

/// Every persisted setting of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// Layout version, always [`CONFIG_VERSION`] for records built here.
    pub version: u8,
    /// Audible reminders while locked or in service mode.
    pub sound_enabled: bool,

    // --- Tank geometry (mm from sensor) ---
    /// Distance reading when the tank is full.
    pub tank_full_mm: u16,
    /// Distance reading when the tank is empty; water alarm threshold.
    pub tank_empty_mm: u16,
    /// Distance at which the reserve warning is raised.
    pub reserve_level_mm: u16,
    /// Band below each threshold that must be crossed to clear an alarm.
    pub hysteresis_mm: u16,
    /// Inner tank diameter, for volume estimates.
    pub tank_diameter_mm: u16,

    // --- Pump ---
    /// Water must be present this long before the pump starts.
    pub pump_delay_secs: u16,
    /// Longest allowed continuous run before the safety lock latches.
    pub pump_work_time_secs: u16,

    // --- Timing ---
    /// Period between ultrasonic bursts.
    pub measurement_interval_secs: u16,
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            sound_enabled: true,

            tank_full_mm: 50,
            tank_empty_mm: 1050,
            reserve_level_mm: 550,
            hysteresis_mm: 10,
            tank_diameter_mm: 100,

            pump_delay_secs: 5,
            pump_work_time_secs: 30,

            measurement_interval_secs: 60,
        }
    }
}

/// A single validated edit to a [`ConfigRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    SoundEnabled(bool),
    TankFull(u16),
    TankEmpty(u16),
    ReserveLevel(u16),
    Hysteresis(u16),
    TankDiameter(u16),
    PumpDelay(u16),
    PumpWorkTime(u16),
    MeasurementInterval(u16),
}

impl ConfigRecord {
    /// Check every range and cross-field invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::VersionMismatch(self.version));
        }
        if self.tank_full_mm < MIN_SENSOR_RANGE_MM {
            return Err(ConfigError::ValidationFailed(
                "tank_full_mm must be >= 20 (sensor blind zone)",
            ));
        }
        if self.tank_empty_mm > MAX_SENSOR_RANGE_MM {
            return Err(ConfigError::ValidationFailed(
                "tank_empty_mm must be <= 4000 (sensor range)",
            ));
        }
        if !(self.tank_full_mm < self.reserve_level_mm && self.reserve_level_mm < self.tank_empty_mm)
        {
            return Err(ConfigError::ValidationFailed(
                "thresholds must satisfy tank_full < reserve_level < tank_empty",
            ));
        }
        if !(1..=100).contains(&self.hysteresis_mm) {
            return Err(ConfigError::ValidationFailed("hysteresis_mm must be 1–100"));
        }
        if self.hysteresis_mm >= self.reserve_level_mm - self.tank_full_mm
            || self.hysteresis_mm >= self.tank_empty_mm - self.reserve_level_mm
        {
            return Err(ConfigError::ValidationFailed(
                "hysteresis_mm must be smaller than the gap between thresholds",
            ));
        }
        if !(10..=5000).contains(&self.tank_diameter_mm) {
            return Err(ConfigError::ValidationFailed("tank_diameter_mm must be 10–5000"));
        }
        if !(1..=600).contains(&self.pump_delay_secs) {
            return Err(ConfigError::ValidationFailed("pump_delay_secs must be 1–600"));
        }
        if !(1..=3600).contains(&self.pump_work_time_secs) {
            return Err(ConfigError::ValidationFailed(
                "pump_work_time_secs must be 1–3600",
            ));
        }
        if !(1..=3600).contains(&self.measurement_interval_secs) {
            return Err(ConfigError::ValidationFailed(
                "measurement_interval_secs must be 1–3600",
            ));
        }
        Ok(())
    }

    /// Apply one field edit.  On rejection the record is left untouched.
    pub fn apply(&mut self, field: ConfigField) -> Result<(), ConfigError> {
        let mut candidate = *self;
        match field {
            ConfigField::SoundEnabled(v) => candidate.sound_enabled = v,
            ConfigField::TankFull(v) => candidate.tank_full_mm = v,
            ConfigField::TankEmpty(v) => candidate.tank_empty_mm = v,
            ConfigField::ReserveLevel(v) => candidate.reserve_level_mm = v,
            ConfigField::Hysteresis(v) => candidate.hysteresis_mm = v,
            ConfigField::TankDiameter(v) => candidate.tank_diameter_mm = v,
            ConfigField::PumpDelay(v) => candidate.pump_delay_secs = v,
            ConfigField::PumpWorkTime(v) => candidate.pump_work_time_secs = v,
            ConfigField::MeasurementInterval(v) => candidate.measurement_interval_secs = v,
        }
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    pub fn thresholds(&self) -> TankThresholds {
        TankThresholds {
            full_mm: self.tank_full_mm,
            empty_mm: self.tank_empty_mm,
            reserve_mm: self.reserve_level_mm,
            hysteresis_mm: self.hysteresis_mm,
            diameter_mm: self.tank_diameter_mm,
        }
    }

    pub fn pump_timing(&self) -> PumpTiming {
        PumpTiming {
            delay_ms: u32::from(self.pump_delay_secs) * 1000,
            work_time_ms: u32::from(self.pump_work_time_secs) * 1000,
        }
    }

    pub fn measurement_interval_ms(&self) -> u32 {
        u32::from(self.measurement_interval_secs) * 1000
    }

    // ── Wire image ────────────────────────────────────────────

    /// Encode into the fixed little-endian image, checksum appended.
    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        out[0] = self.version;
        out[1] = u8::from(self.sound_enabled);
        let words = [
            self.tank_full_mm,
            self.tank_empty_mm,
            self.reserve_level_mm,
            self.hysteresis_mm,
            self.tank_diameter_mm,
            self.pump_delay_secs,
            self.pump_work_time_secs,
            self.measurement_interval_secs,
        ];
        for (i, w) in words.iter().enumerate() {
            let at = 2 + i * 2;
            out[at..at + 2].copy_from_slice(&w.to_le_bytes());
        }
        out[RECORD_LEN - 1] = checksum(&out[..RECORD_LEN - 1]);
        out
    }

    /// Decode an image produced by [`to_bytes`](Self::to_bytes).
    ///
    /// Checks the checksum and version only; call [`validate`](Self::validate)
    /// for range checks.
    pub fn from_bytes(bytes: &[u8; RECORD_LEN]) -> Result<Self, ConfigError> {
        if checksum(&bytes[..RECORD_LEN - 1]) != bytes[RECORD_LEN - 1] {
            return Err(ConfigError::Corrupted);
        }
        if bytes[0] != CONFIG_VERSION {
            return Err(ConfigError::VersionMismatch(bytes[0]));
        }
        let word = |i: usize| u16::from_le_bytes([bytes[2 + i * 2], bytes[3 + i * 2]]);
        Ok(Self {
            version: bytes[0],
            sound_enabled: bytes[1] != 0,
            tank_full_mm: word(0),
            tank_empty_mm: word(1),
            reserve_level_mm: word(2),
            hysteresis_mm: word(3),
            tank_diameter_mm: word(4),
            pump_delay_secs: word(5),
            pump_work_time_secs: word(6),
            measurement_interval_secs: word(7),
        })
    }
}

/// XOR of every byte.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Tank calibration consumed by the level filter and alarm engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TankThresholds {
    pub full_mm: u16,
    pub empty_mm: u16,
    pub reserve_mm: u16,
    pub hysteresis_mm: u16,
    pub diameter_mm: u16,
}

/// Pump sequencing limits in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpTiming {
    pub delay_ms: u32,
    pub work_time_ms: u32,
}
