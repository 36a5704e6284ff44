//! Outbound application events.
//!
//! The core emits these through the [`EventSink`](super::ports::EventSink)
//! port.  Adapters on the other side decide what to do with them: log to
//! serial, hand them to the network bridge, record them in a test.

use serde::Serialize;

use super::ports::{ConfigSource, SaveReceipt};
use crate::error::SafetyFault;
use crate::fsm::StateId;
use crate::fsm::context::StopReason;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// The application service has started.
    Started { config: ConfigSource, state: StateId },

    /// A burst produced a new filtered reading.
    Telemetry(TelemetryData),

    /// A burst had too few usable soundings; nothing was updated.
    MeasurementSkipped,

    /// Water alarm switched on or off.
    WaterAlarm(bool),

    /// Reserve warning switched on or off.
    WaterReserve(bool),

    /// Float switch changed.
    WaterSensor(bool),

    /// The pump state machine changed state.
    StateChanged { from: StateId, to: StateId },

    /// A run ended; `ran_secs` is the pump work time of that run.
    PumpStopped { reason: StopReason, ran_secs: u32 },

    /// A latched fault put the pump into `SafetyLocked`.
    SafetyFault(SafetyFault),

    /// The safety lock was cleared by command.
    SafetyLockCleared,

    ServiceMode(bool),

    SoundEnabled(bool),

    /// Periodic audible reminder request (tone generation is external).
    AudibleAlert(AlertReason),

    /// The in-memory configuration changed (not yet persisted).
    ConfigChanged,

    /// The configuration was persisted.
    ConfigSaved(SaveReceipt),
}

/// Why the buzzer should chirp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertReason {
    SafetyLocked,
    ServiceMode,
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryData {
    /// Filtered distance from sensor to surface.
    pub distance_mm: f32,
    pub level_percent: u8,
    pub volume_liters: f32,
    pub water_alarm: bool,
    pub water_reserve: bool,
    pub water_present: bool,
    pub pump_state: StateId,
    pub service_mode: bool,
    pub safety_locked: bool,
    pub sound_enabled: bool,
    /// Duration of the most recent pump run.
    pub last_run_secs: u32,
}

impl TelemetryData {
    /// Compact JSON for the network bridge.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
